//! Feature Layout - Column schema of a trained model
//!
//! The layout is captured at training time and persisted with the model.
//! A model must only ever be fed rows in the same column order.
//!
//! ## Rules:
//! 1. Add column → new layout hash
//! 2. Change order → new layout hash
//! 3. Rename column → new layout hash

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

/// Layout schema version, part of the hash
pub const LAYOUT_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT
// ============================================================================

/// Ordered feature (column) names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLayout {
    pub names: Vec<String>,
}

impl FeatureLayout {
    pub fn new<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Anonymous layout `f0..f{d-1}` for callers without column names
    pub fn anonymous(dimensionality: usize) -> Self {
        Self::new((0..dimensionality).map(|i| format!("f{}", i)))
    }

    pub fn dimensionality(&self) -> usize {
        self.names.len()
    }

    /// CRC32 over version + names in order
    pub fn layout_hash(&self) -> u32 {
        let mut hasher = Hasher::new();
        hasher.update(&[LAYOUT_VERSION]);
        for name in &self.names {
            hasher.update(name.as_bytes());
            hasher.update(&[0]); // Separator
        }
        hasher.finalize()
    }
}
