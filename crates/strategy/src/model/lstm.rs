use ndarray::{Array1, Array2, ArrayView3, Axis, s};
use rand::Rng;

use super::ModelError;
use super::layers::uniform;

/// Single-layer, batch-first LSTM. Gate rows are stacked in the order
/// input, forget, cell, output.
#[derive(Debug, Clone)]
pub struct Lstm {
    /// `[4H, I]`
    pub(crate) w_ih: Array2<f32>,
    /// `[4H, H]`
    pub(crate) w_hh: Array2<f32>,
    pub(crate) b_ih: Array1<f32>,
    pub(crate) b_hh: Array1<f32>,
}

fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

impl Lstm {
    /// Every parameter drawn from U(±1/sqrt(hidden)).
    pub fn init<R: Rng>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (hidden_size as f32).sqrt();
        Self {
            w_ih: uniform((4 * hidden_size, input_size), bound, rng),
            w_hh: uniform((4 * hidden_size, hidden_size), bound, rng),
            b_ih: uniform(4 * hidden_size, bound, rng),
            b_hh: uniform(4 * hidden_size, bound, rng),
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.w_hh.ncols()
    }

    pub fn input_size(&self) -> usize {
        self.w_ih.ncols()
    }

    /// Runs `[B, T, I]` through the recurrence from zero state and returns the
    /// hidden state after the last step, `[B, H]`.
    pub fn forward(&self, seq: ArrayView3<f32>) -> Result<Array2<f32>, ModelError> {
        let (batch, steps, input) = seq.dim();
        if input != self.input_size() || steps == 0 {
            return Err(ModelError::InputShape {
                actual: seq.shape().to_vec(),
                expected: format!("[B, T >= 1, {}]", self.input_size()),
            });
        }

        let hidden = self.hidden_size();
        let bias = &self.b_ih + &self.b_hh;
        let mut h = Array2::<f32>::zeros((batch, hidden));
        let mut c = Array2::<f32>::zeros((batch, hidden));

        for t in 0..steps {
            let x_t = seq.index_axis(Axis(1), t);
            let gates = x_t.dot(&self.w_ih.t()) + h.dot(&self.w_hh.t()) + &bias;

            let i = gates.slice(s![.., 0..hidden]).mapv(sigmoid);
            let f = gates.slice(s![.., hidden..2 * hidden]).mapv(sigmoid);
            let g = gates.slice(s![.., 2 * hidden..3 * hidden]).mapv(f32::tanh);
            let o = gates.slice(s![.., 3 * hidden..4 * hidden]).mapv(sigmoid);

            c = &f * &c + &i * &g;
            h = &o * &c.mapv(f32::tanh);
        }

        Ok(h)
    }
}
