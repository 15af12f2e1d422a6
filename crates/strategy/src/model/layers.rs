use ndarray::{Array, Array1, Array2, Array3, ArrayView2, ArrayView3, Axis, Dimension, ShapeBuilder};
use rand::Rng;
use rand::distributions::Uniform;

use super::ModelError;

/// Array with entries drawn from U(-bound, bound).
pub(crate) fn uniform<R, D, Sh>(shape: Sh, bound: f32, rng: &mut R) -> Array<f32, D>
where
    R: Rng,
    D: Dimension,
    Sh: ShapeBuilder<Dim = D>,
{
    let dist = Uniform::new_inclusive(-bound, bound);
    Array::from_shape_fn(shape, |_| rng.sample(&dist))
}

/// 2D convolution with stride 1, evaluated as an im2col matrix product.
#[derive(Debug, Clone)]
pub struct Conv2d {
    /// `[out, in * k * k]`, the row-major flattening of `[out, in, k, k]`.
    pub(crate) weight: Array2<f32>,
    pub(crate) bias: Array1<f32>,
    pub(crate) in_channels: usize,
    pub(crate) kernel: usize,
    pub(crate) padding: usize,
}

impl Conv2d {
    /// U(±1/sqrt(fan_in)) for weight and bias.
    pub fn init<R: Rng>(
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        padding: usize,
        rng: &mut R,
    ) -> Self {
        let fan_in = in_channels * kernel * kernel;
        let bound = 1.0 / (fan_in as f32).sqrt();
        Self {
            weight: uniform((out_channels, fan_in), bound, rng),
            bias: uniform(out_channels, bound, rng),
            in_channels,
            kernel,
            padding,
        }
    }

    pub fn out_channels(&self) -> usize {
        self.weight.nrows()
    }

    /// `[C, H, W] -> [out, H', W']`.
    pub fn forward(&self, x: ArrayView3<f32>) -> Result<Array3<f32>, ModelError> {
        let (c, h, w) = x.dim();
        if c != self.in_channels || h + 2 * self.padding < self.kernel || w + 2 * self.padding < self.kernel {
            return Err(ModelError::InputShape {
                actual: x.shape().to_vec(),
                expected: format!("[{}, >= {k}, >= {k}]", self.in_channels, k = self.kernel),
            });
        }

        let k = self.kernel;
        let p = self.padding as isize;
        let out_h = h + 2 * self.padding - k + 1;
        let out_w = w + 2 * self.padding - k + 1;

        let mut cols = Array2::<f32>::zeros((c * k * k, out_h * out_w));
        for ci in 0..c {
            for ky in 0..k {
                for kx in 0..k {
                    let row = (ci * k + ky) * k + kx;
                    for oy in 0..out_h {
                        let iy = oy as isize + ky as isize - p;
                        if iy < 0 || iy >= h as isize {
                            continue;
                        }
                        for ox in 0..out_w {
                            let ix = ox as isize + kx as isize - p;
                            if ix < 0 || ix >= w as isize {
                                continue;
                            }
                            cols[[row, oy * out_w + ox]] = x[[ci, iy as usize, ix as usize]];
                        }
                    }
                }
            }
        }

        let mut out = self.weight.dot(&cols);
        out += &self.bias.view().insert_axis(Axis(1));
        Ok(out.into_shape_with_order((self.out_channels(), out_h, out_w))?)
    }
}

/// Fully connected layer, `y = x Wᵀ + b`.
#[derive(Debug, Clone)]
pub struct Linear {
    /// `[out, in]`
    pub(crate) weight: Array2<f32>,
    pub(crate) bias: Array1<f32>,
}

impl Linear {
    pub fn init<R: Rng>(in_features: usize, out_features: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (in_features as f32).sqrt();
        Self {
            weight: uniform((out_features, in_features), bound, rng),
            bias: uniform(out_features, bound, rng),
        }
    }

    pub fn in_features(&self) -> usize {
        self.weight.ncols()
    }

    /// `[N, in] -> [N, out]`.
    pub fn forward(&self, x: ArrayView2<f32>) -> Result<Array2<f32>, ModelError> {
        if x.ncols() != self.in_features() {
            return Err(ModelError::InputShape {
                actual: x.shape().to_vec(),
                expected: format!("[N, {}]", self.in_features()),
            });
        }
        Ok(x.dot(&self.weight.t()) + &self.bias)
    }
}

pub(crate) fn relu_inplace<D: Dimension>(x: &mut Array<f32, D>) {
    x.mapv_inplace(|v| v.max(0.0));
}

/// 2×2 max pooling with stride 2; odd trailing rows/columns are dropped.
pub(crate) fn max_pool2(x: ArrayView3<f32>) -> Array3<f32> {
    let (c, h, w) = x.dim();
    let (oh, ow) = (h / 2, w / 2);
    Array3::from_shape_fn((c, oh, ow), |(ci, y, xx)| {
        let (y0, x0) = (2 * y, 2 * xx);
        x[[ci, y0, x0]]
            .max(x[[ci, y0, x0 + 1]])
            .max(x[[ci, y0 + 1, x0]])
            .max(x[[ci, y0 + 1, x0 + 1]])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, arr1, arr2};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_conv_same_padding_sums_neighbourhood() {
        let conv = Conv2d {
            weight: Array2::ones((1, 9)),
            bias: arr1(&[0.0]),
            in_channels: 1,
            kernel: 3,
            padding: 1,
        };
        let x = Array3::<f32>::ones((1, 3, 3));
        let y = conv.forward(x.view()).unwrap();

        assert_eq!(y.shape(), &[1, 3, 3]);
        assert_eq!(y[[0, 1, 1]], 9.0);
        assert_eq!(y[[0, 0, 0]], 4.0);
        assert_eq!(y[[0, 0, 1]], 6.0);
    }

    #[test]
    fn test_conv_weight_layout_matches_out_in_k_k() {
        // Two input channels, kernel picks only the centre tap of channel 1.
        let mut weight = Array2::<f32>::zeros((1, 2 * 9));
        weight[[0, 9 + 4]] = 2.0;
        let conv = Conv2d {
            weight,
            bias: arr1(&[0.5]),
            in_channels: 2,
            kernel: 3,
            padding: 1,
        };
        let x = Array::from_shape_fn((2, 2, 2), |(c, y, x)| (c * 10 + y * 2 + x) as f32);
        let y = conv.forward(x.view()).unwrap();

        assert_eq!(y[[0, 0, 0]], 2.0 * 10.0 + 0.5);
        assert_eq!(y[[0, 1, 1]], 2.0 * 13.0 + 0.5);
    }

    #[test]
    fn test_conv_rejects_wrong_channel_count() {
        let mut rng = StdRng::seed_from_u64(0);
        let conv = Conv2d::init(3, 4, 3, 1, &mut rng);
        assert!(conv.forward(Array3::zeros((1, 8, 8)).view()).is_err());
    }

    #[test]
    fn test_linear_forward() {
        let linear = Linear {
            weight: arr2(&[[1.0, 2.0], [0.0, -1.0], [0.5, 0.5]]),
            bias: arr1(&[0.0, 1.0, -1.0]),
        };
        let y = linear.forward(arr2(&[[1.0, 1.0]]).view()).unwrap();

        assert_eq!(y, arr2(&[[3.0_f32, 0.0, 0.0]]));
    }

    #[test]
    fn test_max_pool_and_relu() {
        let x = Array::from_shape_vec(
            (1, 2, 4),
            vec![1.0, -3.0, 0.0, 2.0, -1.0, 5.0, -4.0, -2.0],
        )
        .unwrap();
        let mut pooled = max_pool2(x.view());
        assert_eq!(pooled.shape(), &[1, 1, 2]);
        assert_eq!(pooled[[0, 0, 0]], 5.0);
        assert_eq!(pooled[[0, 0, 1]], 2.0);

        pooled[[0, 0, 1]] = -7.0;
        relu_inplace(&mut pooled);
        assert_eq!(pooled[[0, 0, 1]], 0.0);
    }

    #[test]
    fn test_init_respects_fan_in_bound() {
        let mut rng = StdRng::seed_from_u64(3);
        let linear = Linear::init(100, 10, &mut rng);
        let bound = 1.0 / 10.0;

        assert!(linear.weight.iter().all(|w| w.abs() <= bound));
        assert!(linear.bias.iter().all(|b| b.abs() <= bound));
    }
}
