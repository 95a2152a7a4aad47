//! Central Configuration Constants
//!
//! Single source of truth for all training and detection defaults.
//! Environment variables override these at startup, CLI flags override both.

use std::path::PathBuf;

/// Default number of full passes over the training batch
pub const DEFAULT_EPOCHS: usize = 20;

/// Default mini-batch size
pub const DEFAULT_BATCH_SIZE: usize = 8;

/// Default Adam learning rate
pub const DEFAULT_LEARNING_RATE: f32 = 1e-3;

/// Default dense encoder widths (last entry is the bottleneck)
pub const DEFAULT_HIDDEN_SIZES: &[usize] = &[8, 4];

/// Default LSTM hidden width
pub const DEFAULT_RECURRENT_HIDDEN: usize = 16;

/// Default recurrent window length (rows per window)
pub const DEFAULT_WINDOW: usize = 5;

/// Default fraction of calibration errors expected below the threshold
pub const DEFAULT_NEGATIVE_RATIO: f32 = 0.9;

/// Default trailing fraction of the training batch held out for validation
pub const DEFAULT_VALIDATION_SPLIT: f32 = 0.3;

/// Default RNG seed for weight init and shuffling
pub const DEFAULT_SEED: u64 = 42;

/// Added to a degenerate (all identical) error distribution
pub const CALIBRATION_EPSILON: f32 = 1e-6;

/// Artifact format written by the model store
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// App name
pub const APP_NAME: &str = "metrics-anomaly";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get model directory from environment or use the per-user data dir
pub fn get_model_dir() -> PathBuf {
    std::env::var("ANOMALY_MODEL_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_NAME)
                .join("models")
        })
}

/// Get epochs from environment or use default
pub fn get_epochs() -> usize {
    std::env::var("ANOMALY_EPOCHS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_EPOCHS)
}

/// Get batch size from environment or use default
pub fn get_batch_size() -> usize {
    std::env::var("ANOMALY_BATCH_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_BATCH_SIZE)
}

/// Get learning rate from environment or use default
pub fn get_learning_rate() -> f32 {
    std::env::var("ANOMALY_LEARNING_RATE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_LEARNING_RATE)
}

/// Get estimated negative ratio from environment or use default
pub fn get_negative_ratio() -> f32 {
    std::env::var("ANOMALY_NEGATIVE_RATIO")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_NEGATIVE_RATIO)
}
