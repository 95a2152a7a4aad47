//! Adam optimizer
//!
//! One moment pair per parameter tensor, stepped in lockstep.

use ndarray::Array2;

const BETA1: f32 = 0.9;
const BETA2: f32 = 0.999;
const EPSILON: f32 = 1e-7;

#[derive(Debug, Clone)]
struct Moments {
    m: Array2<f32>,
    v: Array2<f32>,
}

#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    t: i32,
    moments: Vec<Moments>,
}

impl Adam {
    pub fn new(shapes: &[(usize, usize)], learning_rate: f32) -> Self {
        Self {
            learning_rate,
            t: 0,
            moments: shapes
                .iter()
                .map(|&shape| Moments {
                    m: Array2::zeros(shape),
                    v: Array2::zeros(shape),
                })
                .collect(),
        }
    }

    /// Apply one update; `params` and `grads` share the order given to `new`
    pub fn step(&mut self, params: Vec<&mut Array2<f32>>, grads: &[Array2<f32>]) {
        debug_assert_eq!(params.len(), self.moments.len());
        debug_assert_eq!(grads.len(), self.moments.len());

        self.t += 1;
        let correction1 = 1.0 - BETA1.powi(self.t);
        let correction2 = 1.0 - BETA2.powi(self.t);
        let step_size = self.learning_rate * correction2.sqrt() / correction1;

        for ((param, grad), state) in params.into_iter().zip(grads).zip(self.moments.iter_mut()) {
            state.m.zip_mut_with(grad, |m, &g| *m = BETA1 * *m + (1.0 - BETA1) * g);
            state.v.zip_mut_with(grad, |v, &g| *v = BETA2 * *v + (1.0 - BETA2) * g * g);

            ndarray::Zip::from(param)
                .and(&state.m)
                .and(&state.v)
                .for_each(|p, &m, &v| *p -= step_size * m / (v.sqrt() + EPSILON));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_step_moves_against_gradient() {
        let mut w = array![[1.0f32, -1.0]];
        let mut adam = Adam::new(&[(1, 2)], 0.1);
        let grad = array![[1.0f32, -1.0]];
        adam.step(vec![&mut w], &[grad]);
        assert!(w[[0, 0]] < 1.0);
        assert!(w[[0, 1]] > -1.0);
    }

    #[test]
    fn test_minimizes_quadratic() {
        // f(w) = (w - 3)^2
        let mut w = array![[0.0f32]];
        let mut adam = Adam::new(&[(1, 1)], 0.1);
        for _ in 0..500 {
            let grad = w.mapv(|x| 2.0 * (x - 3.0));
            adam.step(vec![&mut w], &[grad]);
        }
        assert!((w[[0, 0]] - 3.0).abs() < 0.05);
    }
}
