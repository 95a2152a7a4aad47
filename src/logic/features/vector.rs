//! Feature vectors and batches
//!
//! Rows arrive as plain `Vec<f32>`; the model works on `ndarray` matrices.
//! Conversion is where dimensionality is enforced.

use ndarray::Array2;

use crate::logic::error::{DetectorError, Result};

/// One sample, `D` values
pub type FeatureVector = Vec<f32>;

/// Ordered samples (time order)
pub type SampleBatch = Vec<FeatureVector>;

/// Fail on the first row whose length is not `expected`
pub fn check_dimensions(batch: &[FeatureVector], expected: usize) -> Result<()> {
    for (index, row) in batch.iter().enumerate() {
        if row.len() != expected {
            return Err(DetectorError::DimensionMismatch {
                index,
                expected,
                actual: row.len(),
            });
        }
    }
    Ok(())
}

/// Fail on the first NaN or infinite value
pub fn check_finite(batch: &[FeatureVector]) -> Result<()> {
    for (index, row) in batch.iter().enumerate() {
        if let Some(column) = row.iter().position(|v| !v.is_finite()) {
            return Err(DetectorError::NonFiniteValue { index, column });
        }
    }
    Ok(())
}

/// Width and finiteness guard applied to every model input
pub fn check_batch(batch: &[FeatureVector], expected: usize) -> Result<()> {
    check_dimensions(batch, expected)?;
    check_finite(batch)
}

/// Stack rows into an `(n, d)` matrix
pub fn to_matrix(batch: &[FeatureVector], dimensionality: usize) -> Result<Array2<f32>> {
    check_dimensions(batch, dimensionality)?;
    let mut data = Vec::with_capacity(batch.len() * dimensionality);
    for row in batch {
        data.extend_from_slice(row);
    }
    Array2::from_shape_vec((batch.len(), dimensionality), data)
        .map_err(|e| DetectorError::InvalidData(format!("Array error: {}", e)))
}

/// Split an `(n, d)` matrix back into rows
pub fn from_matrix(matrix: &Array2<f32>) -> SampleBatch {
    matrix.outer_iter().map(|row| row.to_vec()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_dimensions_reports_first_bad_row() {
        let batch = vec![vec![0.0, 1.0], vec![1.0], vec![1.0, 2.0, 3.0]];
        match check_dimensions(&batch, 2) {
            Err(DetectorError::DimensionMismatch { index, expected, actual }) => {
                assert_eq!(index, 1);
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("Expected DimensionMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_check_batch_rejects_nan_and_infinity() {
        let nan = vec![vec![0.1, 0.2], vec![0.3, f32::NAN]];
        assert!(matches!(
            check_batch(&nan, 2),
            Err(DetectorError::NonFiniteValue { index: 1, column: 1 })
        ));

        let inf = vec![vec![f32::INFINITY, f32::NEG_INFINITY]];
        assert!(matches!(
            check_batch(&inf, 2),
            Err(DetectorError::NonFiniteValue { index: 0, column: 0 })
        ));

        // Width is checked before values
        assert!(matches!(
            check_batch(&[vec![f32::NAN]], 2),
            Err(DetectorError::DimensionMismatch { .. })
        ));
        assert!(check_batch(&[vec![0.0, -1.0]], 2).is_ok());
    }

    #[test]
    fn test_matrix_conversion_keeps_order() {
        let batch = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let m = to_matrix(&batch, 2).unwrap();
        assert_eq!(m.dim(), (3, 2));
        assert_eq!(m[[2, 0]], 5.0);
        assert_eq!(from_matrix(&m), batch);
    }

    #[test]
    fn test_empty_batch_is_valid() {
        let m = to_matrix(&[], 4).unwrap();
        assert_eq!(m.dim(), (0, 4));
        assert!(from_matrix(&m).is_empty());
    }
}
