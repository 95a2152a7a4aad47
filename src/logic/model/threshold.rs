//! Threshold Calibration
//!
//! Turns the reconstruction errors of (mostly) normal data into one cutoff.
//!
//! Policies:
//! - `Quantile` (default): linear interpolation between the two order
//!   statistics around position `ratio * (n - 1)`.
//! - `MeanStd { k }`: `mean + k * std` over the same errors.
//!
//! Both are pure functions of their inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::CALIBRATION_EPSILON;
use crate::logic::config::CalibrationPolicy;
use crate::logic::error::{DetectorError, Result};

/// Calibrated cutoff plus how it was obtained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub value: f32,
    pub policy: CalibrationPolicy,
    pub negative_ratio: f32,
    pub sample_count: usize,
    pub stats: ThresholdStats,
    pub calibrated_at: DateTime<Utc>,
}

/// Summary of the calibration errors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdStats {
    pub mean: f32,
    pub std: f32,
    pub min: f32,
    pub max: f32,
}

impl ThresholdStats {
    fn from_errors(errors: &[f32]) -> Self {
        let n = errors.len() as f32;
        let mean = errors.iter().sum::<f32>() / n;
        let variance = errors.iter().map(|e| (e - mean).powi(2)).sum::<f32>() / n;
        Self {
            mean,
            std: variance.sqrt(),
            min: errors.iter().copied().fold(f32::INFINITY, f32::min),
            max: errors.iter().copied().fold(f32::NEG_INFINITY, f32::max),
        }
    }
}

/// Quantile-policy calibration
pub fn calibrate(errors: &[f32], estimated_negative_ratio: f32) -> Result<Threshold> {
    calibrate_with(errors, estimated_negative_ratio, CalibrationPolicy::Quantile)
}

/// Calibrate with an explicit policy
pub fn calibrate_with(
    errors: &[f32],
    estimated_negative_ratio: f32,
    policy: CalibrationPolicy,
) -> Result<Threshold> {
    if !(estimated_negative_ratio > 0.0 && estimated_negative_ratio <= 1.0) {
        return Err(DetectorError::invalid_config(format!(
            "estimated negative ratio must be in (0, 1], got {}",
            estimated_negative_ratio
        )));
    }
    if errors.is_empty() {
        return Err(DetectorError::invalid_config(
            "calibration needs at least one reconstruction error",
        ));
    }
    if errors.iter().any(|e| !e.is_finite()) {
        return Err(DetectorError::invalid_config(
            "calibration errors must be finite",
        ));
    }

    let stats = ThresholdStats::from_errors(errors);

    // Degenerate distribution: keep the whole calibration set normal
    let value = if stats.max - stats.min == 0.0 {
        stats.max + CALIBRATION_EPSILON
    } else {
        match policy {
            CalibrationPolicy::Quantile => quantile(errors, estimated_negative_ratio),
            CalibrationPolicy::MeanStd { k } => {
                if !(k.is_finite() && k >= 0.0) {
                    return Err(DetectorError::invalid_config(
                        "k must be finite and non-negative",
                    ));
                }
                stats.mean + k * stats.std
            }
        }
    };

    log::debug!(
        "Calibrated threshold {:.6} from {} errors ({:?}, ratio {})",
        value,
        errors.len(),
        policy,
        estimated_negative_ratio
    );

    Ok(Threshold {
        value,
        policy,
        negative_ratio: estimated_negative_ratio,
        sample_count: errors.len(),
        stats,
        calibrated_at: Utc::now(),
    })
}

/// Interpolated quantile; non-decreasing in `ratio`
fn quantile(errors: &[f32], ratio: f32) -> f32 {
    let mut sorted = errors.to_vec();
    sorted.sort_by(f32::total_cmp);

    let position = ratio as f64 * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = (position - lower as f64) as f32;

    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skewed_errors() -> Vec<f32> {
        let mut errors = vec![0.1f32; 90];
        errors.extend(vec![5.0f32; 10]);
        errors
    }

    #[test]
    fn test_ninety_percent_sits_between_clusters() {
        let t = calibrate(&skewed_errors(), 0.9).unwrap();
        assert!(t.value > 0.1, "threshold {} too low", t.value);
        assert!(t.value < 5.0, "threshold {} equals the maximum", t.value);
        assert_eq!(t.sample_count, 100);
    }

    #[test]
    fn test_order_of_errors_does_not_matter() {
        let mut reversed = skewed_errors();
        reversed.reverse();
        let a = calibrate(&skewed_errors(), 0.9).unwrap();
        let b = calibrate(&reversed, 0.9).unwrap();
        assert_eq!(a.value, b.value);
    }

    #[test]
    fn test_threshold_monotone_in_ratio() {
        let errors: Vec<f32> = (0..57).map(|i| ((i * 37) % 101) as f32 / 10.0).collect();
        let mut previous = f32::NEG_INFINITY;
        for step in 1..=100 {
            let ratio = step as f32 / 100.0;
            let t = calibrate(&errors, ratio).unwrap().value;
            assert!(t >= previous, "ratio {} gave {} < {}", ratio, t, previous);
            previous = t;
        }
    }

    #[test]
    fn test_ratio_one_is_maximum() {
        let t = calibrate(&[0.2, 0.4, 0.9], 1.0).unwrap();
        assert_eq!(t.value, 0.9);
    }

    #[test]
    fn test_identical_errors_get_epsilon() {
        let t = calibrate(&[0.3; 20], 0.9).unwrap();
        assert!(t.value > 0.3);
        assert!((t.value - 0.3 - CALIBRATION_EPSILON).abs() < 1e-7);

        let t = calibrate_with(&[0.3; 20], 0.9, CalibrationPolicy::MeanStd { k: 2.0 }).unwrap();
        assert!(t.value > 0.3);
    }

    #[test]
    fn test_mean_std_policy() {
        let t = calibrate_with(&[1.0, 3.0], 0.9, CalibrationPolicy::MeanStd { k: 2.0 }).unwrap();
        // mean 2, std 1
        assert!((t.value - 4.0).abs() < 1e-6);
        assert!((t.stats.mean - 2.0).abs() < 1e-6);
        assert!((t.stats.std - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_invalid_inputs() {
        assert!(matches!(calibrate(&[], 0.9), Err(DetectorError::InvalidConfig(_))));
        assert!(matches!(calibrate(&[0.1], 0.0), Err(DetectorError::InvalidConfig(_))));
        assert!(matches!(calibrate(&[0.1], 1.1), Err(DetectorError::InvalidConfig(_))));
        assert!(matches!(calibrate(&[0.1, f32::NAN], 0.5), Err(DetectorError::InvalidConfig(_))));
        assert!(matches!(
            calibrate_with(&[0.1, 0.2], 0.5, CalibrationPolicy::MeanStd { k: -1.0 }),
            Err(DetectorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_deterministic_for_same_input() {
        let a = calibrate(&skewed_errors(), 0.75).unwrap();
        let b = calibrate(&skewed_errors(), 0.75).unwrap();
        assert_eq!(a.value, b.value);
        assert_eq!(a.stats, b.stats);
    }
}
