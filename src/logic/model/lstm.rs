//! Recurrent (LSTM) autoencoder
//!
//! Encoder: one LSTM layer run over the `window` rows of a unit; the final
//! hidden state is the latent vector.
//! Decoder: linear layer from the latent vector to the full `window × D` block.
//!
//! Gate layout inside the 4H pre-activation: [input | forget | cell | output].

use ndarray::{s, Array2, Axis};
use rand::rngs::StdRng;

use crate::logic::error::Result;
use super::dense::xavier;
use super::network::{mse_gradient, Reconstructor};
use super::tensor::{assign_tensors, Tensor};

const TENSOR_NAMES: [&str; 5] = [
    "lstm.input_weights",
    "lstm.recurrent_weights",
    "lstm.bias",
    "decoder.weights",
    "decoder.bias",
];

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Per-timestep values kept for backprop through time
struct StepCache {
    x: Array2<f32>,
    h_prev: Array2<f32>,
    c_prev: Array2<f32>,
    input_gate: Array2<f32>,
    forget_gate: Array2<f32>,
    cell_candidate: Array2<f32>,
    output_gate: Array2<f32>,
    cell_tanh: Array2<f32>,
}

#[derive(Debug, Clone)]
pub struct LstmAutoencoder {
    /// [D x 4H]
    input_weights: Array2<f32>,
    /// [H x 4H]
    recurrent_weights: Array2<f32>,
    /// [1 x 4H]
    bias: Array2<f32>,
    /// [H x W*D]
    decoder_weights: Array2<f32>,
    /// [1 x W*D]
    decoder_bias: Array2<f32>,
    dimensionality: usize,
    hidden: usize,
    window: usize,
}

impl LstmAutoencoder {
    pub fn new(dimensionality: usize, hidden: usize, window: usize, rng: &mut StdRng) -> Self {
        let gates = 4 * hidden;
        let mut bias = Array2::zeros((1, gates));
        // Forget gate starts open
        bias.slice_mut(s![.., hidden..2 * hidden]).fill(1.0);

        Self {
            input_weights: xavier(dimensionality, gates, rng),
            recurrent_weights: xavier(hidden, gates, rng),
            bias,
            decoder_weights: xavier(hidden, window * dimensionality, rng),
            decoder_bias: Array2::zeros((1, window * dimensionality)),
            dimensionality,
            hidden,
            window,
        }
    }

    fn encode(&self, units: &Array2<f32>) -> (Array2<f32>, Vec<StepCache>) {
        let batch = units.nrows();
        let (d, h) = (self.dimensionality, self.hidden);
        let mut hidden = Array2::<f32>::zeros((batch, h));
        let mut cell = Array2::<f32>::zeros((batch, h));
        let mut caches = Vec::with_capacity(self.window);

        for t in 0..self.window {
            let x = units.slice(s![.., t * d..(t + 1) * d]).to_owned();
            let z = x.dot(&self.input_weights) + &hidden.dot(&self.recurrent_weights) + &self.bias;

            let input_gate = z.slice(s![.., 0..h]).mapv(sigmoid);
            let forget_gate = z.slice(s![.., h..2 * h]).mapv(sigmoid);
            let cell_candidate = z.slice(s![.., 2 * h..3 * h]).mapv(f32::tanh);
            let output_gate = z.slice(s![.., 3 * h..4 * h]).mapv(sigmoid);

            let next_cell = &forget_gate * &cell + &input_gate * &cell_candidate;
            let cell_tanh = next_cell.mapv(f32::tanh);
            let next_hidden = &output_gate * &cell_tanh;

            caches.push(StepCache {
                x,
                h_prev: hidden,
                c_prev: cell,
                input_gate,
                forget_gate,
                cell_candidate,
                output_gate,
                cell_tanh,
            });
            hidden = next_hidden;
            cell = next_cell;
        }

        (hidden, caches)
    }

    fn decode(&self, latent: &Array2<f32>) -> Array2<f32> {
        latent.dot(&self.decoder_weights) + &self.decoder_bias
    }
}

impl Reconstructor for LstmAutoencoder {
    fn unit_len(&self) -> usize {
        self.window * self.dimensionality
    }

    fn forward(&self, units: &Array2<f32>) -> Array2<f32> {
        let (latent, _) = self.encode(units);
        self.decode(&latent)
    }

    fn gradients(&self, units: &Array2<f32>) -> (f32, Vec<Array2<f32>>) {
        let batch = units.nrows();
        let h = self.hidden;

        let (latent, caches) = self.encode(units);
        let output = self.decode(&latent);
        let (loss, d_output) = mse_gradient(&output, units);

        let d_decoder_weights = latent.t().dot(&d_output);
        let d_decoder_bias = d_output.sum_axis(Axis(0)).insert_axis(Axis(0));

        let mut d_input_weights = Array2::<f32>::zeros(self.input_weights.dim());
        let mut d_recurrent_weights = Array2::<f32>::zeros(self.recurrent_weights.dim());
        let mut d_bias = Array2::<f32>::zeros(self.bias.dim());

        // Backprop through time
        let mut d_hidden = d_output.dot(&self.decoder_weights.t());
        let mut d_cell = Array2::<f32>::zeros((batch, h));

        for step in caches.iter().rev() {
            let d_output_gate = &d_hidden * &step.cell_tanh;
            let tanh_grad = step.cell_tanh.mapv(|t| 1.0 - t * t);
            d_cell = d_cell + &(&d_hidden * &step.output_gate * &tanh_grad);

            let d_input_gate = &d_cell * &step.cell_candidate;
            let d_candidate = &d_cell * &step.input_gate;
            let d_forget_gate = &d_cell * &step.c_prev;

            let mut dz = Array2::<f32>::zeros((batch, 4 * h));
            dz.slice_mut(s![.., 0..h])
                .assign(&(d_input_gate * &step.input_gate.mapv(|g| g * (1.0 - g))));
            dz.slice_mut(s![.., h..2 * h])
                .assign(&(d_forget_gate * &step.forget_gate.mapv(|g| g * (1.0 - g))));
            dz.slice_mut(s![.., 2 * h..3 * h])
                .assign(&(d_candidate * &step.cell_candidate.mapv(|g| 1.0 - g * g)));
            dz.slice_mut(s![.., 3 * h..4 * h])
                .assign(&(d_output_gate * &step.output_gate.mapv(|g| g * (1.0 - g))));

            d_input_weights += &step.x.t().dot(&dz);
            d_recurrent_weights += &step.h_prev.t().dot(&dz);
            d_bias += &dz.sum_axis(Axis(0)).insert_axis(Axis(0));

            d_hidden = dz.dot(&self.recurrent_weights.t());
            d_cell = d_cell * &step.forget_gate;
        }

        (
            loss,
            vec![
                d_input_weights,
                d_recurrent_weights,
                d_bias,
                d_decoder_weights,
                d_decoder_bias,
            ],
        )
    }

    fn params_mut(&mut self) -> Vec<&mut Array2<f32>> {
        vec![
            &mut self.input_weights,
            &mut self.recurrent_weights,
            &mut self.bias,
            &mut self.decoder_weights,
            &mut self.decoder_bias,
        ]
    }

    fn tensors(&self) -> Vec<Tensor> {
        [
            &self.input_weights,
            &self.recurrent_weights,
            &self.bias,
            &self.decoder_weights,
            &self.decoder_bias,
        ]
        .into_iter()
        .zip(TENSOR_NAMES)
        .map(|(array, name)| Tensor::from_array(name, array))
        .collect()
    }

    fn set_tensors(&mut self, tensors: &[Tensor]) -> Result<()> {
        let targets = TENSOR_NAMES.into_iter().zip(self.params_mut()).collect();
        assign_tensors(targets, tensors)
    }
}
