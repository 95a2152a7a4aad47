//! Model Module - Autoencoder, calibration and scoring
//!
//! `autoencoder` owns parameters and the train/reconstruct lifecycle,
//! `threshold` turns errors into a cutoff, `scorer` applies it.

pub mod autoencoder;
pub mod dense;
pub mod lstm;
pub mod network;
pub mod optim;
pub mod scorer;
pub mod tensor;
pub mod threshold;

// Re-export common types
pub use autoencoder::{Autoencoder, EpochLoss, TrainingResult};
pub use scorer::{is_anomaly, reconstruction_error, AnomalyRecord, AnomalyScorer, ScoreReport};
pub use tensor::Tensor;
pub use threshold::{calibrate, calibrate_with, Threshold, ThresholdStats};
