//! Detector - train / calibrate / save / load / score lifecycle
//!
//! Ties the autoencoder, calibrator, scorer and store together. All state a
//! scoring call depends on lives in this struct and travels as a
//! `ModelBundle`; nothing is kept in globals.

use std::path::Path;
use std::sync::atomic::AtomicBool;

use serde::{Deserialize, Serialize};

use super::config::{DetectorConfig, TrainConfig};
use super::error::{DetectorError, Result};
use super::features::{FeatureLayout, FeatureVector, SampleBatch, ScalerState};
use super::model::{
    calibrate_with, AnomalyScorer, Autoencoder, ScoreReport, Threshold, TrainingResult,
};
use super::store::{self, ModelBundle};

/// Result of `Detector::fit`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReport {
    pub training: TrainingResult,
    pub threshold: Threshold,
}

#[derive(Debug)]
pub struct Detector {
    config: DetectorConfig,
    layout: FeatureLayout,
    scaler: Option<ScalerState>,
    model: Autoencoder,
    scorer: AnomalyScorer,
    training: Option<TrainingResult>,
}

impl Detector {
    /// Untrained, uncalibrated detector
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        let model = Autoencoder::new(config.dimensionality, config.architecture.clone())?;
        Ok(Self {
            layout: FeatureLayout::anonymous(config.dimensionality),
            config,
            scaler: None,
            model,
            scorer: AnomalyScorer::new(),
            training: None,
        })
    }

    /// Name the feature columns
    pub fn with_layout(mut self, layout: FeatureLayout) -> Result<Self> {
        if layout.dimensionality() != self.config.dimensionality {
            return Err(DetectorError::invalid_config(format!(
                "layout has {} columns, detector expects {}",
                layout.dimensionality(),
                self.config.dimensionality
            )));
        }
        self.layout = layout;
        Ok(self)
    }

    /// Attach the scaler the caller fitted; persisted with the model
    pub fn set_scaler(&mut self, scaler: ScalerState) -> Result<()> {
        scaler.validate()?;
        if scaler.dimensionality() != self.config.dimensionality {
            return Err(DetectorError::invalid_config(format!(
                "scaler covers {} columns, detector expects {}",
                scaler.dimensionality(),
                self.config.dimensionality
            )));
        }
        self.scaler = Some(scaler);
        Ok(())
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn layout(&self) -> &FeatureLayout {
        &self.layout
    }

    pub fn scaler(&self) -> Option<&ScalerState> {
        self.scaler.as_ref()
    }

    pub fn threshold(&self) -> Option<&Threshold> {
        self.scorer.threshold()
    }

    pub fn training(&self) -> Option<&TrainingResult> {
        self.training.as_ref()
    }

    pub fn model(&self) -> &Autoencoder {
        &self.model
    }

    // ========================================================================
    // TRAINING
    // ========================================================================

    /// Train, then calibrate on the same batch's reconstruction errors
    pub fn fit(&mut self, batch: &[FeatureVector], config: &TrainConfig) -> Result<FitReport> {
        self.fit_with_cancel(batch, config, &AtomicBool::new(false))
    }

    /// `fit` with cooperative cancellation between epochs
    ///
    /// The current model and threshold are replaced only when a candidate
    /// with at least one completed epoch has also been calibrated.
    pub fn fit_with_cancel(
        &mut self,
        batch: &[FeatureVector],
        config: &TrainConfig,
        cancel: &AtomicBool,
    ) -> Result<FitReport> {
        let mut candidate =
            Autoencoder::new(self.config.dimensionality, self.config.architecture.clone())?;
        let training = candidate.train_with_cancel(batch, config, cancel)?;
        if training.epochs_completed == 0 {
            return Err(DetectorError::Cancelled { epochs_completed: 0 });
        }

        let errors = candidate.reconstruction_errors(batch)?;
        let threshold = calibrate_with(&errors, self.config.negative_ratio, self.config.policy)?;

        log::info!(
            "Detector fitted: threshold {:.6} ({} of {} training rows above)",
            threshold.value,
            errors.iter().filter(|&&e| e > threshold.value).count(),
            errors.len()
        );

        self.model = candidate;
        self.scorer.set_threshold(threshold.clone());
        self.training = Some(training.clone());

        Ok(FitReport { training, threshold })
    }

    /// Re-derive the threshold from a held-out batch
    pub fn calibrate(&mut self, batch: &[FeatureVector]) -> Result<Threshold> {
        let errors = self.model.reconstruction_errors(batch)?;
        let threshold = calibrate_with(&errors, self.config.negative_ratio, self.config.policy)?;
        self.scorer.set_threshold(threshold.clone());
        Ok(threshold)
    }

    // ========================================================================
    // INFERENCE
    // ========================================================================

    pub fn score(&self, batch: &[FeatureVector]) -> Result<ScoreReport> {
        self.scorer.score(&self.model, batch)
    }

    pub fn reconstruct(&self, batch: &[FeatureVector]) -> Result<SampleBatch> {
        self.model.reconstruct(batch)
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Snapshot of everything scoring depends on
    pub fn bundle(&self) -> Result<ModelBundle> {
        let tensors = self.model.tensors()?;
        let threshold = self.scorer.threshold().ok_or(DetectorError::NotCalibrated)?.clone();
        Ok(ModelBundle {
            dimensionality: self.config.dimensionality,
            architecture: self.config.architecture.clone(),
            layout: self.layout.clone(),
            scaler: self.scaler.clone(),
            threshold,
            tensors,
            training: self.training.clone(),
        })
    }

    pub fn from_bundle(bundle: ModelBundle) -> Result<Self> {
        let config = DetectorConfig {
            dimensionality: bundle.dimensionality,
            architecture: bundle.architecture.clone(),
            policy: bundle.threshold.policy,
            negative_ratio: bundle.threshold.negative_ratio,
        };
        let model =
            Autoencoder::from_tensors(bundle.dimensionality, bundle.architecture, &bundle.tensors)?;
        Ok(Self {
            config,
            layout: bundle.layout,
            scaler: bundle.scaler,
            model,
            scorer: AnomalyScorer::with_threshold(bundle.threshold),
            training: bundle.training,
        })
    }

    pub fn save(&self, location: &Path) -> Result<()> {
        store::save_model(location, &self.bundle()?)
    }

    pub fn load(location: &Path) -> Result<Self> {
        Self::from_bundle(store::load_model(location)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::config::{Architecture, CalibrationPolicy};

    fn rows(n: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| {
                let t = i as f32 * 0.2;
                vec![0.5 + 0.3 * t.sin(), 0.5 + 0.3 * (2.0 * t).cos(), 0.4]
            })
            .collect()
    }

    fn train_config() -> TrainConfig {
        TrainConfig {
            epochs: 5,
            learning_rate: 0.01,
            batch_size: 8,
            validation_split: 0.2,
            seed: 3,
        }
    }

    #[test]
    fn test_fresh_detector_is_not_calibrated() {
        let detector = Detector::new(DetectorConfig::new(3)).unwrap();
        assert!(matches!(detector.score(&rows(4)), Err(DetectorError::NotCalibrated)));
        assert!(matches!(detector.bundle(), Err(DetectorError::NotTrained)));

        let mut detector = detector;
        assert!(matches!(detector.calibrate(&rows(4)), Err(DetectorError::NotTrained)));
    }

    #[test]
    fn test_fit_then_score_every_row() {
        let mut detector = Detector::new(DetectorConfig::new(3).with_negative_ratio(0.9)).unwrap();
        let report = detector.fit(&rows(50), &train_config()).unwrap();
        assert_eq!(report.training.epochs_completed, 5);

        let scored = detector.score(&rows(50)).unwrap();
        assert_eq!(scored.records.len(), 50);
        assert_eq!(scored.threshold, report.threshold.value);
        for (i, r) in scored.records.iter().enumerate() {
            assert_eq!(r.index, i);
            assert!(r.reconstruction_error >= 0.0);
        }
        // Roughly the top 10% of training rows sit above the threshold
        assert!(scored.anomaly_count() <= 6);
    }

    #[test]
    fn test_wrong_width_fails_after_fit() {
        let mut detector = Detector::new(DetectorConfig::new(3)).unwrap();
        detector.fit(&rows(20), &train_config()).unwrap();
        for width in [0usize, 1, 2, 4, 7] {
            let result = detector.score(&[vec![0.5; width]]);
            assert!(matches!(result, Err(DetectorError::DimensionMismatch { .. })));
        }
    }

    #[test]
    fn test_failed_fit_keeps_previous_state() {
        let mut detector = Detector::new(DetectorConfig::new(3)).unwrap();
        detector.fit(&rows(20), &train_config()).unwrap();
        let before = detector.bundle().unwrap();

        let bad = TrainConfig { epochs: 0, ..train_config() };
        assert!(detector.fit(&rows(20), &bad).is_err());
        assert!(detector.fit(&[vec![0.1, 0.2]], &train_config()).is_err());
        let explosive = TrainConfig { learning_rate: 1e30, ..train_config() };
        assert!(matches!(
            detector.fit(&rows(20), &explosive),
            Err(DetectorError::TrainingDiverged { .. })
        ));

        assert_eq!(detector.bundle().unwrap(), before);
    }

    #[test]
    fn test_cancelled_fit_is_an_error_and_keeps_state() {
        let mut detector = Detector::new(DetectorConfig::new(3)).unwrap();
        let cancel = AtomicBool::new(true);
        let result = detector.fit_with_cancel(&rows(20), &train_config(), &cancel);
        assert!(matches!(result, Err(DetectorError::Cancelled { epochs_completed: 0 })));
        assert!(!detector.model().is_trained());
        assert!(detector.threshold().is_none());
    }

    #[test]
    fn test_recalibrate_on_held_out_slice() {
        let config = DetectorConfig::new(3).with_policy(CalibrationPolicy::MeanStd { k: 3.0 });
        let mut detector = Detector::new(config).unwrap();
        detector.fit(&rows(40), &train_config()).unwrap();
        let held_out: Vec<_> = rows(60).into_iter().skip(40).collect();
        let threshold = detector.calibrate(&held_out).unwrap();
        assert_eq!(threshold.sample_count, 20);
        assert_eq!(detector.threshold().unwrap().value, threshold.value);
    }

    #[test]
    fn test_layout_and_scaler_width_checked() {
        let detector = Detector::new(DetectorConfig::new(3)).unwrap();
        assert!(detector.with_layout(FeatureLayout::new(["a", "b"])).is_err());

        let mut detector = Detector::new(DetectorConfig::new(3)).unwrap();
        let scaler = ScalerState { min_vals: vec![0.0], max_vals: vec![1.0] };
        assert!(detector.set_scaler(scaler).is_err());

        // Right minima count, short maxima
        let lopsided = ScalerState { min_vals: vec![0.0; 3], max_vals: vec![1.0; 2] };
        assert!(matches!(detector.set_scaler(lopsided), Err(DetectorError::InvalidConfig(_))));
        assert!(detector.scaler().is_none());
    }

    #[test]
    fn test_non_finite_rows_are_rejected_not_scored() {
        let mut detector = Detector::new(DetectorConfig::new(3)).unwrap();
        detector.fit(&rows(30), &train_config()).unwrap();

        for bad in [
            vec![f32::NAN, 0.5, 0.5],
            vec![f32::INFINITY, f32::NEG_INFINITY, 0.5],
        ] {
            let batch = vec![vec![0.5; 3], bad];
            assert!(matches!(
                detector.score(&batch),
                Err(DetectorError::NonFiniteValue { index: 1, column: 0 })
            ));
            assert!(detector.calibrate(&batch).is_err());
        }

        let mut poisoned = rows(30);
        poisoned[4][2] = f32::NAN;
        let before = detector.bundle().unwrap();
        assert!(matches!(
            detector.fit(&poisoned, &train_config()),
            Err(DetectorError::NonFiniteValue { index: 4, column: 2 })
        ));
        assert_eq!(detector.bundle().unwrap(), before);
    }

    #[test]
    fn test_bundle_round_trip_in_memory() {
        let config = DetectorConfig::new(3)
            .with_architecture(Architecture::Recurrent { hidden_size: 4, window: 4 });
        let mut detector = Detector::new(config).unwrap();
        detector.fit(&rows(30), &train_config()).unwrap();

        let restored = Detector::from_bundle(detector.bundle().unwrap()).unwrap();
        assert_eq!(
            detector.score(&rows(30)).unwrap(),
            restored.score(&rows(30)).unwrap()
        );
    }
}
