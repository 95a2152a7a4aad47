//! Error handling

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, DetectorError>;

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    // Rejected before training starts
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // Rejected per call
    #[error("dimension mismatch at row {index}: expected {expected}, got {actual}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("non-finite value at row {index}, column {column}")]
    NonFiniteValue { index: usize, column: usize },

    #[error("model has not been trained or loaded")]
    NotTrained,

    #[error("threshold has not been calibrated or loaded")]
    NotCalibrated,

    #[error("training cancelled after {epochs_completed} epoch(s)")]
    Cancelled { epochs_completed: usize },

    #[error("training diverged at epoch {epoch} (learning rate {learning_rate})")]
    TrainingDiverged { epoch: usize, learning_rate: f32 },

    // Persistence integrity
    #[error("no complete model artifact at {}", .0.display())]
    NotFound(PathBuf),

    #[error("corrupt model artifact: {0}")]
    CorruptArtifact(String),

    // Input collaborators
    #[error("invalid input data: {0}")]
    InvalidData(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Storage medium
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DetectorError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        DetectorError::InvalidConfig(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        DetectorError::CorruptArtifact(msg.into())
    }
}
