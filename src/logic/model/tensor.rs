//! Named parameter tensors
//!
//! Flat, shape-tagged copies of the network weights. Used for the best-epoch
//! snapshot during training and as the on-disk weight format.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::logic::error::{DetectorError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub name: String,
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
}

impl Tensor {
    pub fn from_array(name: impl Into<String>, array: &Array2<f32>) -> Self {
        let (rows, cols) = array.dim();
        Self {
            name: name.into(),
            rows,
            cols,
            data: array.iter().copied().collect(),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn to_array(&self) -> Result<Array2<f32>> {
        Array2::from_shape_vec((self.rows, self.cols), self.data.clone()).map_err(|e| {
            DetectorError::corrupt(format!("tensor '{}' has inconsistent data: {}", self.name, e))
        })
    }
}

/// Overwrite `targets` from `tensors`, requiring identical names and shapes
pub fn assign_tensors(targets: Vec<(&str, &mut Array2<f32>)>, tensors: &[Tensor]) -> Result<()> {
    if targets.len() != tensors.len() {
        return Err(DetectorError::corrupt(format!(
            "expected {} parameter tensors, found {}",
            targets.len(),
            tensors.len()
        )));
    }

    // Validate everything before touching any parameter
    let mut arrays = Vec::with_capacity(tensors.len());
    for ((name, target), tensor) in targets.iter().zip(tensors) {
        if *name != tensor.name {
            return Err(DetectorError::corrupt(format!(
                "expected tensor '{}', found '{}'",
                name, tensor.name
            )));
        }
        if target.dim() != tensor.shape() {
            return Err(DetectorError::corrupt(format!(
                "tensor '{}' has shape {:?}, architecture requires {:?}",
                name,
                tensor.shape(),
                target.dim()
            )));
        }
        arrays.push(tensor.to_array()?);
    }

    for ((_, target), array) in targets.into_iter().zip(arrays) {
        *target = array;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_tensor_keeps_row_major_order() {
        let a = array![[1.0f32, 2.0], [3.0, 4.0]];
        let t = Tensor::from_array("w", &a);
        assert_eq!(t.data, vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(t.to_array().unwrap(), a);
    }

    #[test]
    fn test_inconsistent_tensor_is_corrupt() {
        let t = Tensor { name: "w".into(), rows: 2, cols: 2, data: vec![1.0] };
        assert!(matches!(t.to_array(), Err(DetectorError::CorruptArtifact(_))));
    }

    #[test]
    fn test_assign_rejects_shape_mismatch_without_partial_write() {
        let mut a = Array2::<f32>::zeros((1, 2));
        let mut b = Array2::<f32>::zeros((2, 2));
        let tensors = vec![
            Tensor::from_array("a", &array![[5.0f32, 5.0]]),
            Tensor::from_array("b", &array![[1.0f32, 1.0, 1.0]]),
        ];
        let result = assign_tensors(vec![("a", &mut a), ("b", &mut b)], &tensors);
        assert!(matches!(result, Err(DetectorError::CorruptArtifact(_))));
        assert_eq!(a[[0, 0]], 0.0);
    }
}
