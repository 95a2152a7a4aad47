//! Anomaly Scorer
//!
//! Reconstruction error per sample compared against the calibrated threshold.

use serde::{Deserialize, Serialize};

use crate::logic::error::{DetectorError, Result};
use crate::logic::features::FeatureVector;
use super::autoencoder::Autoencoder;
use super::threshold::Threshold;

/// One scored sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub index: usize,
    pub is_anomaly: bool,
    pub reconstruction_error: f32,
}

/// Scored batch plus the threshold it was scored against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub threshold: f32,
    pub records: Vec<AnomalyRecord>,
}

impl ScoreReport {
    pub fn anomalies(&self) -> impl Iterator<Item = &AnomalyRecord> {
        self.records.iter().filter(|r| r.is_anomaly)
    }

    pub fn anomaly_count(&self) -> usize {
        self.anomalies().count()
    }

    pub fn errors(&self) -> Vec<f32> {
        self.records.iter().map(|r| r.reconstruction_error).collect()
    }
}

/// The anomaly decision
pub fn is_anomaly(reconstruction_error: f32, threshold: f32) -> bool {
    reconstruction_error > threshold
}

/// L2 norm of the elementwise difference
pub fn reconstruction_error(input: &[f32], reconstruction: &[f32]) -> f32 {
    input
        .iter()
        .zip(reconstruction)
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f32>()
        .sqrt()
}

/// Holds the threshold; the model is borrowed per call
#[derive(Debug, Clone, Default)]
pub struct AnomalyScorer {
    threshold: Option<Threshold>,
}

impl AnomalyScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(threshold: Threshold) -> Self {
        Self {
            threshold: Some(threshold),
        }
    }

    pub fn threshold(&self) -> Option<&Threshold> {
        self.threshold.as_ref()
    }

    pub fn set_threshold(&mut self, threshold: Threshold) {
        self.threshold = Some(threshold);
    }

    /// One record per input row, in input order
    pub fn score(&self, model: &Autoencoder, batch: &[FeatureVector]) -> Result<ScoreReport> {
        let threshold = self
            .threshold
            .as_ref()
            .ok_or(DetectorError::NotCalibrated)?
            .value;

        let errors = model.reconstruction_errors(batch)?;
        let records = errors
            .into_iter()
            .enumerate()
            .map(|(index, error)| AnomalyRecord {
                index,
                is_anomaly: is_anomaly(error, threshold),
                reconstruction_error: error,
            })
            .collect();

        Ok(ScoreReport { threshold, records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_anomaly_is_strict() {
        assert!(!is_anomaly(0.5, 0.5));
        assert!(is_anomaly(0.5000001, 0.5));
        assert!(!is_anomaly(0.0, 0.5));
    }

    #[test]
    fn test_reconstruction_error_is_l2() {
        assert_eq!(reconstruction_error(&[3.0, 0.0], &[0.0, 4.0]), 5.0);
        assert_eq!(reconstruction_error(&[1.0, 1.0], &[1.0, 1.0]), 0.0);
        assert!(reconstruction_error(&[-2.0], &[7.0]) >= 0.0);
    }

    #[test]
    fn test_report_counts() {
        let report = ScoreReport {
            threshold: 1.0,
            records: vec![
                AnomalyRecord { index: 0, is_anomaly: false, reconstruction_error: 0.2 },
                AnomalyRecord { index: 1, is_anomaly: true, reconstruction_error: 2.0 },
            ],
        };
        assert_eq!(report.anomaly_count(), 1);
        assert_eq!(report.errors(), vec![0.2, 2.0]);
    }

    #[test]
    fn test_uncalibrated_scorer_fails() {
        let scorer = AnomalyScorer::new();
        let model = Autoencoder::new(2, Default::default()).unwrap();
        let result = scorer.score(&model, &[vec![0.1, 0.2]]);
        assert!(matches!(result, Err(DetectorError::NotCalibrated)));
    }
}
