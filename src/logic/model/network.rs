//! Network trait shared by the dense and recurrent autoencoders
//!
//! A "unit" is one row of the training matrix: a single feature vector for
//! the dense model, a flattened window for the recurrent one.

use ndarray::Array2;

use crate::logic::error::Result;
use super::tensor::Tensor;

pub trait Reconstructor: Send {
    /// Values per unit
    fn unit_len(&self) -> usize;

    /// Reconstruct a `(n, unit_len)` matrix
    fn forward(&self, units: &Array2<f32>) -> Array2<f32>;

    /// MSE loss and parameter gradients, in `params_mut` order
    fn gradients(&self, units: &Array2<f32>) -> (f32, Vec<Array2<f32>>);

    fn params_mut(&mut self) -> Vec<&mut Array2<f32>>;

    /// Snapshot of all parameters
    fn tensors(&self) -> Vec<Tensor>;

    /// Restore parameters; fails without side effects on any shape mismatch
    fn set_tensors(&mut self, tensors: &[Tensor]) -> Result<()>;

    fn shapes(&self) -> Vec<(usize, usize)> {
        self.tensors().iter().map(Tensor::shape).collect()
    }
}

/// Mean squared error over all elements and its gradient w.r.t. `output`
pub fn mse_gradient(output: &Array2<f32>, target: &Array2<f32>) -> (f32, Array2<f32>) {
    let diff = output - target;
    let n = diff.len().max(1) as f32;
    let loss = diff.iter().map(|d| d * d).sum::<f32>() / n;
    (loss, diff * (2.0 / n))
}

/// Mean squared error only
pub fn mse(output: &Array2<f32>, target: &Array2<f32>) -> f32 {
    let n = output.len().max(1) as f32;
    output
        .iter()
        .zip(target.iter())
        .map(|(o, t)| (o - t) * (o - t))
        .sum::<f32>()
        / n
}

/// Mean absolute error (reported metric)
pub fn mae(output: &Array2<f32>, target: &Array2<f32>) -> f32 {
    let n = output.len().max(1) as f32;
    output
        .iter()
        .zip(target.iter())
        .map(|(o, t)| (o - t).abs())
        .sum::<f32>()
        / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mse_gradient() {
        let out = array![[1.0f32, 2.0]];
        let target = array![[0.0f32, 0.0]];
        let (loss, grad) = mse_gradient(&out, &target);
        assert!((loss - 2.5).abs() < 1e-6);
        assert_eq!(grad, array![[1.0f32, 2.0]]);
        assert!((mse(&out, &target) - loss).abs() < 1e-6);
        assert!((mae(&out, &target) - 1.5).abs() < 1e-6);
    }
}
