//! Min-Max Normalizer
//!
//! Fit once on training rows, applied identically at inference.
//! Values outside the fitted range are NOT clamped: an out-of-range metric
//! is exactly what the detector needs to see.

use serde::{Deserialize, Serialize};

use crate::logic::error::{DetectorError, Result};
use super::vector::{check_batch, check_dimensions, FeatureVector, SampleBatch};

/// Ranges narrower than this are treated as constant columns
const MIN_RANGE: f32 = 1e-8;

/// Normalization parameters from training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    pub min_vals: Vec<f32>,
    pub max_vals: Vec<f32>,
}

impl ScalerState {
    pub fn dimensionality(&self) -> usize {
        self.min_vals.len()
    }

    /// Bounds must pair up column by column, be finite and satisfy min <= max
    pub fn validate(&self) -> Result<()> {
        if self.min_vals.len() != self.max_vals.len() {
            return Err(DetectorError::invalid_config(format!(
                "scaler has {} minima but {} maxima",
                self.min_vals.len(),
                self.max_vals.len()
            )));
        }
        for (i, (&lo, &hi)) in self.min_vals.iter().zip(&self.max_vals).enumerate() {
            if !(lo.is_finite() && hi.is_finite()) || lo > hi {
                return Err(DetectorError::invalid_config(format!(
                    "scaler column {} has invalid bounds [{}, {}]",
                    i, lo, hi
                )));
            }
        }
        Ok(())
    }

    fn scale(&self, i: usize) -> f32 {
        let range = self.max_vals[i] - self.min_vals[i];
        if range.abs() < MIN_RANGE {
            1.0
        } else {
            range
        }
    }
}

/// Per-column scaling into [0, 1]
pub struct MinMaxScaler;

impl MinMaxScaler {
    /// Learn column minima and maxima
    pub fn fit(rows: &[FeatureVector]) -> Result<ScalerState> {
        let first = rows
            .first()
            .ok_or_else(|| DetectorError::invalid_config("cannot fit scaler on an empty batch"))?;
        let dim = first.len();
        check_batch(rows, dim)?;

        let mut min_vals = vec![f32::INFINITY; dim];
        let mut max_vals = vec![f32::NEG_INFINITY; dim];
        for row in rows {
            for (i, &v) in row.iter().enumerate() {
                min_vals[i] = min_vals[i].min(v);
                max_vals[i] = max_vals[i].max(v);
            }
        }

        Ok(ScalerState { min_vals, max_vals })
    }

    /// Normalize rows with a fitted state
    pub fn transform(rows: &[FeatureVector], state: &ScalerState) -> Result<SampleBatch> {
        state.validate()?;
        check_dimensions(rows, state.dimensionality())?;
        Ok(rows
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(i, &v)| (v - state.min_vals[i]) / state.scale(i))
                    .collect()
            })
            .collect())
    }

    /// Map normalized rows back to raw units
    pub fn inverse_transform(rows: &[FeatureVector], state: &ScalerState) -> Result<SampleBatch> {
        state.validate()?;
        check_dimensions(rows, state.dimensionality())?;
        Ok(rows
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(i, &v)| v * state.scale(i) + state.min_vals[i])
                    .collect()
            })
            .collect())
    }

    pub fn fit_transform(rows: &[FeatureVector]) -> Result<(ScalerState, SampleBatch)> {
        let state = Self::fit(rows)?;
        let scaled = Self::transform(rows, &state)?;
        Ok((state, scaled))
    }
}
