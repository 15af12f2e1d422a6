use ndarray::{Array2, ArrayView5};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{CnnLstmConfig, Lstm, Linear, ModelError, TinyCnn};

/// Per-frame CNN features fed through an LSTM; the class logits come from the
/// hidden state after the last frame.
#[derive(Debug, Clone)]
pub struct CnnLstm {
    config: CnnLstmConfig,
    cnn: TinyCnn,
    lstm: Lstm,
    head: Linear,
}

impl CnnLstm {
    pub fn init<R: Rng>(config: CnnLstmConfig, rng: &mut R) -> Result<Self, ModelError> {
        config.validate()?;
        let cnn = TinyCnn::init(&config, rng);
        let lstm = Lstm::init(config.cnn_embed, config.lstm_hidden, rng);
        let head = Linear::init(config.lstm_hidden, config.num_classes, rng);
        Ok(Self {
            config,
            cnn,
            lstm,
            head,
        })
    }

    /// Freshly initialised network; `seed` makes the weights reproducible.
    pub fn seeded(config: CnnLstmConfig, seed: Option<u64>) -> Result<Self, ModelError> {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self::init(config, &mut rng)
    }

    pub fn config(&self) -> &CnnLstmConfig {
        &self.config
    }

    /// `[B, T, C, S, S] -> [B, classes]` logits.
    pub fn forward(&self, input: ArrayView5<f32>) -> Result<Array2<f32>, ModelError> {
        let (b, t, c, h, w) = input.dim();
        let size = self.config.image_size;
        if b == 0 || t == 0 || c != self.config.in_channels || h != size || w != size {
            return Err(ModelError::InputShape {
                actual: input.shape().to_vec(),
                expected: format!(
                    "[B, T, {}, {}, {}]",
                    self.config.in_channels, size, size
                ),
            });
        }

        let frames = input.to_shape((b * t, c, h, w))?;
        let feats = self.cnn.forward(frames.view())?;
        let feats = feats.into_shape_with_order((b, t, self.config.cnn_embed))?;

        let last_hidden = self.lstm.forward(feats.view())?;
        self.head.forward(last_hidden.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array5;

    fn small_config() -> CnnLstmConfig {
        CnnLstmConfig {
            image_size: 16,
            conv_channels: [4, 4, 8],
            cnn_embed: 6,
            lstm_hidden: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_forward_shape() {
        let model = CnnLstm::seeded(small_config(), Some(1)).unwrap();
        let input = Array5::<f32>::from_elem((2, 3, 3, 16, 16), 0.5);

        let logits = model.forward(input.view()).unwrap();

        assert_eq!(logits.shape(), &[2, 3]);
        assert!(logits.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_same_seed_same_logits() {
        let input = Array5::<f32>::from_shape_fn((1, 2, 3, 16, 16), |(_, t, c, y, x)| {
            ((t + c + y * x) % 7) as f32 / 7.0
        });

        let a = CnnLstm::seeded(small_config(), Some(9)).unwrap();
        let b = CnnLstm::seeded(small_config(), Some(9)).unwrap();

        assert_eq!(
            a.forward(input.view()).unwrap(),
            b.forward(input.view()).unwrap()
        );
    }

    #[test]
    fn test_frame_order_matters() {
        let model = CnnLstm::seeded(small_config(), Some(5)).unwrap();
        let mut input = Array5::<f32>::zeros((1, 2, 3, 16, 16));
        input.slice_mut(ndarray::s![0, 1, .., .., ..]).fill(1.0);
        let mut swapped = Array5::<f32>::zeros((1, 2, 3, 16, 16));
        swapped.slice_mut(ndarray::s![0, 0, .., .., ..]).fill(1.0);

        let a = model.forward(input.view()).unwrap();
        let b = model.forward(swapped.view()).unwrap();

        assert!(a.iter().zip(b.iter()).any(|(x, y)| (x - y).abs() > 1e-7));
    }

    #[test]
    fn test_rejects_wrong_image_size() {
        let model = CnnLstm::seeded(small_config(), Some(1)).unwrap();
        let input = Array5::<f32>::zeros((1, 2, 3, 32, 32));

        assert!(matches!(
            model.forward(input.view()),
            Err(ModelError::InputShape { .. })
        ));
    }

    #[test]
    fn test_default_config_matches_reference_architecture() {
        let model = CnnLstm::seeded(CnnLstmConfig::default(), Some(0)).unwrap();

        assert_eq!(model.cnn.flatten_width(), 64 * 16 * 16);
        assert_eq!(model.lstm.hidden_size(), 64);
        assert_eq!(model.head.weight.dim(), (3, 64));
    }
}
