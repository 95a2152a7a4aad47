use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{APP_VERSION, ARTIFACT_FORMAT_VERSION};
use crate::logic::config::Architecture;
use crate::logic::features::{FeatureLayout, ScalerState};
use crate::logic::model::{Tensor, Threshold, TrainingResult};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const WEIGHTS_FILE: &str = "weights.json";
pub const THRESHOLD_FILE: &str = "threshold.json";

/// Every file a complete artifact needs
pub const ARTIFACT_FILES: [&str; 3] = [MANIFEST_FILE, WEIGHTS_FILE, THRESHOLD_FILE];

// ============================================================================
// MODEL BUNDLE
// ============================================================================

/// Everything a detector needs to score, passed explicitly between
/// train, save, load and score
#[derive(Debug, Clone, PartialEq)]
pub struct ModelBundle {
    pub dimensionality: usize,
    pub architecture: Architecture,
    pub layout: FeatureLayout,
    pub scaler: Option<ScalerState>,
    pub threshold: Threshold,
    pub tensors: Vec<Tensor>,
    pub training: Option<TrainingResult>,
}

// ============================================================================
// ON-DISK FILES
// ============================================================================

/// `manifest.json`: configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub id: String,
    pub dimensionality: usize,
    pub architecture: Architecture,
    pub layout: FeatureLayout,
    pub layout_hash: u32,
    pub scaler: Option<ScalerState>,
    pub training: Option<TrainingResult>,
    /// SHA-256 of `weights.json`
    pub weights_sha256: String,
    /// SHA-256 of `threshold.json`
    pub threshold_sha256: String,
    pub created_at: DateTime<Utc>,
    pub app_version: String,
}

impl Manifest {
    pub fn for_bundle(
        bundle: &ModelBundle,
        weights_sha256: String,
        threshold_sha256: String,
    ) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            id: uuid::Uuid::new_v4().to_string(),
            dimensionality: bundle.dimensionality,
            architecture: bundle.architecture.clone(),
            layout: bundle.layout.clone(),
            layout_hash: bundle.layout.layout_hash(),
            scaler: bundle.scaler.clone(),
            training: bundle.training.clone(),
            weights_sha256,
            threshold_sha256,
            created_at: Utc::now(),
            app_version: APP_VERSION.to_string(),
        }
    }
}

/// `weights.json`: parameter tensors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightsFile {
    pub tensors: Vec<Tensor>,
}
