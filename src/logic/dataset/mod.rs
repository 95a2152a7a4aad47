//! Dataset Module - Metric table input, labelled evaluation, result export
//!
//! Collaborators around the detector: they turn files into batches and
//! scored batches back into files. None of them hold model state.

pub mod evaluate;
pub mod export;
pub mod loader;


pub use evaluate::ConfusionMatrix;
pub use export::{export_csv, export_json, ExtraColumn};
pub use loader::{load_csv, MetricTable};
