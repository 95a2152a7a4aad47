//! Dense autoencoder
//!
//! Architecture: D → h1 → … → hk → … → h1 → D
//! Hidden layers use the configured activation, the output layer is linear.

use ndarray::{Array2, Axis};
use rand::rngs::StdRng;
use rand::Rng;

use crate::logic::config::Activation;
use crate::logic::error::Result;
use super::network::{mse_gradient, Reconstructor};
use super::tensor::{assign_tensors, Tensor};

/// Xavier/Glorot uniform init
pub(crate) fn xavier(rows: usize, cols: usize, rng: &mut StdRng) -> Array2<f32> {
    let limit = (6.0 / (rows + cols) as f32).sqrt();
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-limit..limit))
}

#[derive(Debug, Clone)]
struct DenseLayer {
    /// [input x output]
    weights: Array2<f32>,
    /// [1 x output]
    bias: Array2<f32>,
    activation: Option<Activation>,
}

impl DenseLayer {
    fn new(input: usize, output: usize, activation: Option<Activation>, rng: &mut StdRng) -> Self {
        Self {
            weights: xavier(input, output, rng),
            bias: Array2::zeros((1, output)),
            activation,
        }
    }

    fn forward(&self, x: &Array2<f32>) -> Array2<f32> {
        let z = x.dot(&self.weights) + &self.bias;
        match self.activation {
            Some(Activation::Tanh) => z.mapv(f32::tanh),
            Some(Activation::Relu) => z.mapv(|v| v.max(0.0)),
            None => z,
        }
    }

    /// Gradient w.r.t. pre-activation, given the layer output
    fn activation_grad(&self, grad: Array2<f32>, output: &Array2<f32>) -> Array2<f32> {
        match self.activation {
            Some(Activation::Tanh) => grad * &output.mapv(|a| 1.0 - a * a),
            Some(Activation::Relu) => grad * &output.mapv(|a| if a > 0.0 { 1.0 } else { 0.0 }),
            None => grad,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DenseAutoencoder {
    layers: Vec<DenseLayer>,
    dimensionality: usize,
}

impl DenseAutoencoder {
    pub fn new(
        dimensionality: usize,
        hidden_sizes: &[usize],
        activation: Activation,
        rng: &mut StdRng,
    ) -> Self {
        // Encoder widths followed by the mirrored decoder widths
        let mut widths = vec![dimensionality];
        widths.extend_from_slice(hidden_sizes);
        widths.extend(hidden_sizes.iter().rev().skip(1));
        widths.push(dimensionality);

        let last = widths.len() - 2;
        let layers = widths
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let act = if i == last { None } else { Some(activation) };
                DenseLayer::new(pair[0], pair[1], act, rng)
            })
            .collect();

        Self { layers, dimensionality }
    }

    /// Width of the bottleneck layer
    pub fn latent_size(&self) -> usize {
        self.layers
            .iter()
            .map(|l| l.weights.ncols())
            .min()
            .unwrap_or(self.dimensionality)
    }

    fn names(&self) -> Vec<String> {
        (0..self.layers.len())
            .flat_map(|i| [format!("dense{}.weights", i), format!("dense{}.bias", i)])
            .collect()
    }
}

impl Reconstructor for DenseAutoencoder {
    fn unit_len(&self) -> usize {
        self.dimensionality
    }

    fn forward(&self, units: &Array2<f32>) -> Array2<f32> {
        self.layers
            .iter()
            .fold(units.clone(), |x, layer| layer.forward(&x))
    }

    fn gradients(&self, units: &Array2<f32>) -> (f32, Vec<Array2<f32>>) {
        // Forward, keeping every layer input
        let mut activations = Vec::with_capacity(self.layers.len() + 1);
        activations.push(units.clone());
        for layer in &self.layers {
            let next = layer.forward(activations.last().unwrap_or(units));
            activations.push(next);
        }

        let output = &activations[self.layers.len()];
        let (loss, mut grad) = mse_gradient(output, units);

        let mut grads = vec![Array2::zeros((0, 0)); self.layers.len() * 2];
        for (i, layer) in self.layers.iter().enumerate().rev() {
            let dz = layer.activation_grad(grad, &activations[i + 1]);
            grads[i * 2] = activations[i].t().dot(&dz);
            grads[i * 2 + 1] = dz.sum_axis(Axis(0)).insert_axis(Axis(0));
            grad = dz.dot(&layer.weights.t());
        }

        (loss, grads)
    }

    fn params_mut(&mut self) -> Vec<&mut Array2<f32>> {
        self.layers
            .iter_mut()
            .flat_map(|l| [&mut l.weights, &mut l.bias])
            .collect()
    }

    fn tensors(&self) -> Vec<Tensor> {
        let names = self.names();
        self.layers
            .iter()
            .flat_map(|l| [&l.weights, &l.bias])
            .zip(names)
            .map(|(array, name)| Tensor::from_array(name, array))
            .collect()
    }

    fn set_tensors(&mut self, tensors: &[Tensor]) -> Result<()> {
        let names = self.names();
        let targets = self
            .layers
            .iter_mut()
            .flat_map(|l| [&mut l.weights, &mut l.bias])
            .zip(names.iter())
            .map(|(array, name)| (name.as_str(), array))
            .collect();
        assign_tensors(targets, tensors)
    }
}
