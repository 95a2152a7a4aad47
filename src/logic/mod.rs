//! Logic Module - Detection engine
//!
//! ## Layout
//! - `features/` - Column layout, min-max scaling, windowing
//! - `model/` - Autoencoders, threshold calibration, scoring
//! - `store/` - Model artifact persistence
//! - `dataset/` - CSV input, labelled evaluation, result export
//! - `detector` - Lifecycle facade over all of the above

pub mod config;
pub mod error;

pub mod dataset;
pub mod detector;
pub mod features;
pub mod model;
pub mod store;

pub use config::{Activation, Architecture, CalibrationPolicy, DetectorConfig, TrainConfig};
pub use detector::{Detector, FitReport};
pub use error::{DetectorError, Result};
