//! Labelled evaluation of a scored batch

use serde::{Deserialize, Serialize};

use crate::logic::error::{DetectorError, Result};
use crate::logic::model::AnomalyRecord;

/// Counts with "anomaly" as the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 {
        0.0
    } else {
        num as f32 / den as f32
    }
}

impl ConfusionMatrix {
    pub fn evaluate(records: &[AnomalyRecord], labels: &[bool]) -> Result<Self> {
        if records.len() != labels.len() {
            return Err(DetectorError::InvalidData(format!(
                "{} scored rows but {} labels",
                records.len(),
                labels.len()
            )));
        }

        let mut m = Self::default();
        for (record, &actual) in records.iter().zip(labels) {
            match (record.is_anomaly, actual) {
                (true, true) => m.true_positives += 1,
                (true, false) => m.false_positives += 1,
                (false, false) => m.true_negatives += 1,
                (false, true) => m.false_negatives += 1,
            }
        }
        Ok(m)
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    pub fn precision(&self) -> f32 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f32 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn f1(&self) -> f32 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    pub fn accuracy(&self) -> f32 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }
}
