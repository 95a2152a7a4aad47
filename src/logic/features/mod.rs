//! Features Module - Row schema, normalization and windowing
//!
//! Everything that happens to raw metric rows before they reach the model.

pub mod layout;
pub mod scaler;
pub mod vector;
pub mod window;


// Re-export common types
pub use layout::FeatureLayout;
pub use scaler::{MinMaxScaler, ScalerState};
pub use vector::{check_batch, check_dimensions, FeatureVector, SampleBatch};
