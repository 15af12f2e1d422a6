use ndarray::{Array2, ArrayView4, Axis};
use rand::Rng;

use super::layers::{Conv2d, Linear, max_pool2, relu_inplace};
use super::{CnnLstmConfig, ModelError};

/// Three conv → ReLU → 2×2 max-pool stages followed by a linear embedding.
#[derive(Debug, Clone)]
pub struct TinyCnn {
    convs: [Conv2d; 3],
    fc: Linear,
}

impl TinyCnn {
    pub fn init<R: Rng>(config: &CnnLstmConfig, rng: &mut R) -> Self {
        let [c1, c2, c3] = config.conv_channels;
        let (k, p) = (config.kernel_size, config.padding());
        Self {
            convs: [
                Conv2d::init(config.in_channels, c1, k, p, rng),
                Conv2d::init(c1, c2, k, p, rng),
                Conv2d::init(c2, c3, k, p, rng),
            ],
            fc: Linear::init(config.flatten_size(), config.cnn_embed, rng),
        }
    }

    /// Width of the flattened conv output.
    pub fn flatten_width(&self) -> usize {
        self.fc.in_features()
    }

    /// `[N, C, S, S] -> [N, embed]`.
    pub fn forward(&self, frames: ArrayView4<f32>) -> Result<Array2<f32>, ModelError> {
        let n = frames.len_of(Axis(0));
        let mut flat = Array2::<f32>::zeros((n, self.fc.in_features()));

        for (idx, frame) in frames.outer_iter().enumerate() {
            let mut x = frame.to_owned();
            for conv in &self.convs {
                let mut y = conv.forward(x.view())?;
                relu_inplace(&mut y);
                x = max_pool2(y.view());
            }

            if x.len() != self.fc.in_features() {
                return Err(ModelError::InputShape {
                    actual: frames.shape().to_vec(),
                    expected: format!("frames that flatten to {}", self.fc.in_features()),
                });
            }
            // Channel-major flatten, same order as a contiguous [C, H, W] view.
            flat.row_mut(idx)
                .assign(&x.into_shape_with_order(self.fc.in_features())?);
        }

        self.fc.forward(flat.view())
    }
}
