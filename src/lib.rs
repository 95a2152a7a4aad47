//! Metrics Anomaly - reconstruction-based anomaly detection for service metrics
//!
//! An autoencoder learns to reproduce normal metric rows; rows it cannot
//! reproduce well (error above a calibrated threshold) are anomalies.

pub mod api;
pub mod constants;
pub mod logic;

pub use logic::dataset::{ConfusionMatrix, MetricTable};
pub use logic::features::{FeatureLayout, FeatureVector, MinMaxScaler, SampleBatch, ScalerState};
pub use logic::model::{
    AnomalyRecord, AnomalyScorer, Autoencoder, ScoreReport, Threshold, TrainingResult,
};
pub use logic::{
    Architecture, CalibrationPolicy, Detector, DetectorConfig, DetectorError, FitReport, Result,
    TrainConfig,
};
