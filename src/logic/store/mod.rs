//! Store Module - Model artifact persistence
//!
//! # Architecture
//! - `types.rs`: `ModelBundle`, `Manifest`, file names
//! - `validate.rs`: checksum and consistency checks
//! - `storage.rs`: staged save, validated load
//!
//! # Failure Strategy
//! Missing files -> `NotFound`. Inconsistent files -> `CorruptArtifact`.
//! Nothing is repaired or defaulted on load.

pub mod storage;
pub mod types;
pub mod validate;
#[cfg(test)]
mod tests;

pub use storage::{get_default_model_dir, load_model, read_manifest, save_model};
pub use types::{Manifest, ModelBundle, ARTIFACT_FILES, MANIFEST_FILE, THRESHOLD_FILE, WEIGHTS_FILE};
