//! Detector Configuration
//!
//! Hyperparameters, architecture and calibration policy.
//! Every struct validates itself before any training work starts.

use serde::{Deserialize, Serialize};

use crate::constants;
use super::error::{DetectorError, Result};

// ============================================================================
// ARCHITECTURE
// ============================================================================

/// Hidden-layer activation for the dense variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Tanh,
    Relu,
}

impl Default for Activation {
    fn default() -> Self {
        Activation::Tanh
    }
}

/// Autoencoder family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Architecture {
    /// Row-wise encoder `D → h1 → … → hk` with a mirrored decoder
    Dense {
        hidden_sizes: Vec<usize>,
        #[serde(default)]
        activation: Activation,
    },
    /// LSTM encoder over `window` rows, dense decoder for the whole window
    Recurrent { hidden_size: usize, window: usize },
}

impl Default for Architecture {
    fn default() -> Self {
        Architecture::Dense {
            hidden_sizes: constants::DEFAULT_HIDDEN_SIZES.to_vec(),
            activation: Activation::Tanh,
        }
    }
}

impl Architecture {
    pub fn name(&self) -> &'static str {
        match self {
            Architecture::Dense { .. } => "dense",
            Architecture::Recurrent { .. } => "lstm",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Architecture::Dense { hidden_sizes, .. } => {
                if hidden_sizes.is_empty() {
                    return Err(DetectorError::invalid_config(
                        "dense architecture needs at least one hidden size",
                    ));
                }
                if hidden_sizes.iter().any(|&h| h == 0) {
                    return Err(DetectorError::invalid_config("hidden sizes must be positive"));
                }
            }
            Architecture::Recurrent { hidden_size, window } => {
                if *hidden_size == 0 {
                    return Err(DetectorError::invalid_config("hidden_size must be positive"));
                }
                if *window == 0 {
                    return Err(DetectorError::invalid_config("window must be positive"));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// TRAINING
// ============================================================================

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Full passes over the batch
    pub epochs: usize,
    pub learning_rate: f32,
    pub batch_size: usize,
    /// Trailing fraction held out to pick the best epoch
    pub validation_split: f32,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: constants::DEFAULT_EPOCHS,
            learning_rate: constants::DEFAULT_LEARNING_RATE,
            batch_size: constants::DEFAULT_BATCH_SIZE,
            validation_split: constants::DEFAULT_VALIDATION_SPLIT,
            seed: constants::DEFAULT_SEED,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(DetectorError::invalid_config("epochs must be positive"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(DetectorError::invalid_config(format!(
                "learning_rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if self.batch_size == 0 {
            return Err(DetectorError::invalid_config("batch_size must be positive"));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(DetectorError::invalid_config(format!(
                "validation_split must be in [0, 1), got {}",
                self.validation_split
            )));
        }
        Ok(())
    }
}

// ============================================================================
// CALIBRATION
// ============================================================================

/// How reconstruction errors become a threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum CalibrationPolicy {
    /// Interpolated empirical quantile at the negative ratio
    Quantile,
    /// `mean + k * stddev`; the negative ratio is not used
    MeanStd { k: f32 },
}

impl Default for CalibrationPolicy {
    fn default() -> Self {
        CalibrationPolicy::Quantile
    }
}

// ============================================================================
// DETECTOR
// ============================================================================

/// Everything needed to build an untrained detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Feature dimensionality `D`
    pub dimensionality: usize,
    pub architecture: Architecture,
    pub policy: CalibrationPolicy,
    pub negative_ratio: f32,
}

impl DetectorConfig {
    pub fn new(dimensionality: usize) -> Self {
        Self {
            dimensionality,
            architecture: Architecture::default(),
            policy: CalibrationPolicy::default(),
            negative_ratio: constants::get_negative_ratio(),
        }
    }

    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = architecture;
        self
    }

    pub fn with_policy(mut self, policy: CalibrationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_negative_ratio(mut self, ratio: f32) -> Self {
        self.negative_ratio = ratio;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimensionality == 0 {
            return Err(DetectorError::invalid_config("dimensionality must be positive"));
        }
        if !(self.negative_ratio > 0.0 && self.negative_ratio <= 1.0) {
            return Err(DetectorError::invalid_config(format!(
                "negative ratio must be in (0, 1], got {}",
                self.negative_ratio
            )));
        }
        if let CalibrationPolicy::MeanStd { k } = self.policy {
            if !(k.is_finite() && k >= 0.0) {
                return Err(DetectorError::invalid_config("k must be finite and non-negative"));
            }
        }
        self.architecture.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_train_config_is_valid() {
        assert!(TrainConfig::default().validate().is_ok());
    }

    #[test]
    fn test_reject_bad_hyperparameters() {
        let bad = [
            TrainConfig { epochs: 0, ..Default::default() },
            TrainConfig { learning_rate: 0.0, ..Default::default() },
            TrainConfig { learning_rate: f32::NAN, ..Default::default() },
            TrainConfig { batch_size: 0, ..Default::default() },
            TrainConfig { validation_split: 1.0, ..Default::default() },
        ];
        for cfg in bad {
            assert!(matches!(cfg.validate(), Err(DetectorError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_reject_bad_architecture() {
        let empty = Architecture::Dense { hidden_sizes: vec![], activation: Activation::Tanh };
        assert!(empty.validate().is_err());

        let zero = Architecture::Dense { hidden_sizes: vec![4, 0], activation: Activation::Relu };
        assert!(zero.validate().is_err());

        let no_window = Architecture::Recurrent { hidden_size: 4, window: 0 };
        assert!(no_window.validate().is_err());
    }

    #[test]
    fn test_detector_config_ratio_bounds() {
        assert!(DetectorConfig::new(3).with_negative_ratio(1.0).validate().is_ok());
        assert!(DetectorConfig::new(3).with_negative_ratio(0.0).validate().is_err());
        assert!(DetectorConfig::new(3).with_negative_ratio(1.5).validate().is_err());
        assert!(DetectorConfig::new(0).validate().is_err());
    }

    #[test]
    fn test_architecture_serde_tag() {
        let arch = Architecture::Recurrent { hidden_size: 8, window: 3 };
        let json = serde_json::to_string(&arch).unwrap();
        assert!(json.contains("\"kind\":\"recurrent\""));
        let back: Architecture = serde_json::from_str(&json).unwrap();
        assert_eq!(back, arch);
    }
}
