//! Autoencoder Model
//!
//! Owns the network parameters and the train / reconstruct lifecycle.
//! Dense models reconstruct single rows; recurrent models reconstruct
//! stride-1 windows and fold the window errors back onto rows.

use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::logic::config::{Architecture, TrainConfig};
use crate::logic::error::{DetectorError, Result};
use crate::logic::features::vector::{check_batch, from_matrix, to_matrix};
use crate::logic::features::window::{covering_windows, sliding_windows, window_count};
use crate::logic::features::{FeatureVector, SampleBatch};
use super::dense::DenseAutoencoder;
use super::lstm::LstmAutoencoder;
use super::network::{mae, mse, Reconstructor};
use super::optim::Adam;
use super::scorer::reconstruction_error;
use super::tensor::Tensor;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Outcome of one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingResult {
    pub epochs_completed: usize,
    /// Mean training loss (MSE) per completed epoch
    pub train_losses: Vec<f32>,
    /// Validation loss per completed epoch (training loss when no validation slice)
    pub validation_losses: Vec<f32>,
    /// 1-based epoch whose parameters were kept
    pub best_epoch: usize,
    /// Mean absolute error of the kept parameters over the whole batch
    pub mean_absolute_error: Option<f32>,
    pub training_units: usize,
    pub validation_units: usize,
    pub cancelled: bool,
}

/// Losses of one completed epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochLoss {
    /// 1-based
    pub epoch: usize,
    pub train_loss: f32,
    pub validation_loss: f32,
}

pub struct Autoencoder {
    dimensionality: usize,
    architecture: Architecture,
    network: Option<Box<dyn Reconstructor>>,
}

impl std::fmt::Debug for Autoencoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autoencoder")
            .field("dimensionality", &self.dimensionality)
            .field("architecture", &self.architecture)
            .field("trained", &self.is_trained())
            .finish()
    }
}

fn build_network(
    dimensionality: usize,
    architecture: &Architecture,
    seed: u64,
) -> Box<dyn Reconstructor> {
    let mut rng = StdRng::seed_from_u64(seed);
    match architecture {
        Architecture::Dense { hidden_sizes, activation } => Box::new(DenseAutoencoder::new(
            dimensionality,
            hidden_sizes,
            *activation,
            &mut rng,
        )),
        Architecture::Recurrent { hidden_size, window } => Box::new(LstmAutoencoder::new(
            dimensionality,
            *hidden_size,
            *window,
            &mut rng,
        )),
    }
}

impl Autoencoder {
    /// Untrained model of dimensionality `D`
    pub fn new(dimensionality: usize, architecture: Architecture) -> Result<Self> {
        if dimensionality == 0 {
            return Err(DetectorError::invalid_config("dimensionality must be positive"));
        }
        architecture.validate()?;
        Ok(Self {
            dimensionality,
            architecture,
            network: None,
        })
    }

    /// Rebuild a trained model from stored parameters
    pub fn from_tensors(
        dimensionality: usize,
        architecture: Architecture,
        tensors: &[Tensor],
    ) -> Result<Self> {
        let mut model = Self::new(dimensionality, architecture)?;
        let mut network = build_network(dimensionality, &model.architecture, 0);
        network.set_tensors(tensors)?;
        model.network = Some(network);
        Ok(model)
    }

    pub fn dimensionality(&self) -> usize {
        self.dimensionality
    }

    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    pub fn is_trained(&self) -> bool {
        self.network.is_some()
    }

    pub fn tensors(&self) -> Result<Vec<Tensor>> {
        self.network
            .as_ref()
            .map(|n| n.tensors())
            .ok_or(DetectorError::NotTrained)
    }

    // ========================================================================
    // UNITS
    // ========================================================================

    /// Rows (dense) or flattened windows (recurrent) as a matrix
    fn units(&self, batch: &[FeatureVector]) -> Result<Array2<f32>> {
        match &self.architecture {
            Architecture::Dense { .. } => to_matrix(batch, self.dimensionality),
            Architecture::Recurrent { window, .. } => {
                let flattened: SampleBatch = sliding_windows(batch, *window)
                    .into_iter()
                    .map(|w| w.concat())
                    .collect();
                to_matrix(&flattened, window * self.dimensionality)
            }
        }
    }

    fn network(&self) -> Result<&dyn Reconstructor> {
        self.network.as_deref().ok_or(DetectorError::NotTrained)
    }

    // ========================================================================
    // TRAINING
    // ========================================================================

    pub fn train(
        &mut self,
        batch: &[FeatureVector],
        config: &TrainConfig,
    ) -> Result<TrainingResult> {
        self.train_with_cancel(batch, config, &AtomicBool::new(false))
    }

    /// Train; `cancel` is honoured between epochs only
    pub fn train_with_cancel(
        &mut self,
        batch: &[FeatureVector],
        config: &TrainConfig,
        cancel: &AtomicBool,
    ) -> Result<TrainingResult> {
        self.train_with_progress(batch, config, cancel, |_| {})
    }

    /// `train_with_cancel` plus a callback after every completed epoch
    pub fn train_with_progress<F>(
        &mut self,
        batch: &[FeatureVector],
        config: &TrainConfig,
        cancel: &AtomicBool,
        mut on_epoch: F,
    ) -> Result<TrainingResult>
    where
        F: FnMut(&EpochLoss),
    {
        config.validate()?;
        if batch.is_empty() {
            return Err(DetectorError::invalid_config("training batch is empty"));
        }
        check_batch(batch, self.dimensionality)?;
        let units = self.units(batch)?;

        // Validation slice is the tail of the batch, never shuffled in
        let total = units.nrows();
        let mut validation_units = (total as f32 * config.validation_split).floor() as usize;
        if validation_units >= total {
            validation_units = 0;
        }
        let training_units = total - validation_units;
        let train_set = units.slice(ndarray::s![..training_units, ..]).to_owned();
        let validation_set = units.slice(ndarray::s![training_units.., ..]).to_owned();

        let mut network = build_network(self.dimensionality, &self.architecture, config.seed);
        let mut optimizer = Adam::new(&network.shapes(), config.learning_rate);
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut order: Vec<usize> = (0..training_units).collect();

        log::info!(
            "Training {} autoencoder: {} training / {} validation units, {} epochs",
            self.architecture.name(),
            training_units,
            validation_units,
            config.epochs
        );

        let mut train_losses = Vec::with_capacity(config.epochs);
        let mut validation_losses = Vec::with_capacity(config.epochs);
        let mut best: Option<(usize, f32, Vec<Tensor>)> = None;
        let mut cancelled = false;

        for epoch in 1..=config.epochs {
            if cancel.load(Ordering::Relaxed) {
                log::info!("Training cancelled before epoch {}", epoch);
                cancelled = true;
                break;
            }

            order.shuffle(&mut rng);
            let mut loss_sum = 0.0f32;
            for chunk in order.chunks(config.batch_size) {
                let mini_batch = train_set.select(Axis(0), chunk);
                let (loss, grads) = network.gradients(&mini_batch);
                optimizer.step(network.params_mut(), &grads);
                loss_sum += loss * chunk.len() as f32;
            }
            let train_loss = loss_sum / training_units as f32;

            let validation_loss = if validation_units > 0 {
                mse(&network.forward(&validation_set), &validation_set)
            } else {
                train_loss
            };

            if !train_loss.is_finite() || !validation_loss.is_finite() {
                return Err(DetectorError::TrainingDiverged {
                    epoch,
                    learning_rate: config.learning_rate,
                });
            }

            log::debug!(
                "epoch {}/{}: loss {:.6}, val_loss {:.6}",
                epoch,
                config.epochs,
                train_loss,
                validation_loss
            );

            train_losses.push(train_loss);
            validation_losses.push(validation_loss);

            // Keep the best epoch's parameters
            if best.as_ref().map_or(true, |(_, b, _)| validation_loss < *b) {
                best = Some((epoch, validation_loss, network.tensors()));
            }

            on_epoch(&EpochLoss {
                epoch,
                train_loss,
                validation_loss,
            });
        }

        let epochs_completed = train_losses.len();
        let Some((best_epoch, _, best_tensors)) = best else {
            // Nothing completed: previous parameters stay in place
            return Ok(TrainingResult {
                epochs_completed: 0,
                train_losses,
                validation_losses,
                best_epoch: 0,
                mean_absolute_error: None,
                training_units,
                validation_units,
                cancelled,
            });
        };

        network.set_tensors(&best_tensors)?;
        let mean_absolute_error = Some(mae(&network.forward(&units), &units));
        self.network = Some(network);

        log::info!(
            "Training finished after {} epoch(s), best epoch {}, MAE {:.6}",
            epochs_completed,
            best_epoch,
            mean_absolute_error.unwrap_or_default()
        );

        Ok(TrainingResult {
            epochs_completed,
            train_losses,
            validation_losses,
            best_epoch,
            mean_absolute_error,
            training_units,
            validation_units,
            cancelled,
        })
    }

    // ========================================================================
    // INFERENCE
    // ========================================================================

    /// Reconstruct every row; recurrent rows average all covering windows
    pub fn reconstruct(&self, batch: &[FeatureVector]) -> Result<SampleBatch> {
        let network = self.network()?;
        check_batch(batch, self.dimensionality)?;
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let units = self.units(batch)?;
        let output = network.forward(&units);

        match &self.architecture {
            Architecture::Dense { .. } => Ok(from_matrix(&output)),
            Architecture::Recurrent { window, .. } => {
                let d = self.dimensionality;
                let count = window_count(batch.len(), *window);
                let rows = (0..batch.len())
                    .map(|row| {
                        let mut sum = vec![0.0f32; d];
                        let mut n = 0usize;
                        for (start, offset) in covering_windows(row, *window, count) {
                            for (j, s) in sum.iter_mut().enumerate() {
                                *s += output[[start, offset * d + j]];
                            }
                            n += 1;
                        }
                        sum.into_iter().map(|s| s / n.max(1) as f32).collect()
                    })
                    .collect();
                Ok(rows)
            }
        }
    }

    /// Per-row reconstruction error (L2); recurrent rows take the mean over windows
    pub fn reconstruction_errors(&self, batch: &[FeatureVector]) -> Result<Vec<f32>> {
        let network = self.network()?;
        check_batch(batch, self.dimensionality)?;
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let units = self.units(batch)?;
        let output = network.forward(&units);

        match &self.architecture {
            Architecture::Dense { .. } => Ok(batch
                .iter()
                .zip(output.outer_iter())
                .map(|(row, recon)| reconstruction_error(row, &recon.to_vec()))
                .collect()),
            Architecture::Recurrent { window, .. } => {
                let d = self.dimensionality;
                let count = window_count(batch.len(), *window);
                Ok(batch
                    .iter()
                    .enumerate()
                    .map(|(row, values)| {
                        let errors: Vec<f32> = covering_windows(row, *window, count)
                            .map(|(start, offset)| {
                                let recon = output
                                    .slice(ndarray::s![start, offset * d..(offset + 1) * d])
                                    .to_vec();
                                reconstruction_error(values, &recon)
                            })
                            .collect();
                        errors.iter().sum::<f32>() / errors.len().max(1) as f32
                    })
                    .collect())
            }
        }
    }
}
