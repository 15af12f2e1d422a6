use serde::{Deserialize, Serialize};

use super::ModelError;

/// Three conv/pool stages halve the image three times.
const DOWNSAMPLE: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CnnLstmConfig {
    /// Side of the square input frames.
    pub image_size: usize,
    pub in_channels: usize,
    pub conv_channels: [usize; 3],
    pub kernel_size: usize,
    pub cnn_embed: usize,
    pub lstm_hidden: usize,
    pub num_classes: usize,
}

impl Default for CnnLstmConfig {
    fn default() -> Self {
        Self {
            image_size: 128,
            in_channels: 3,
            conv_channels: [16, 32, 64],
            kernel_size: 3,
            cnn_embed: 64,
            lstm_hidden: 64,
            num_classes: 3,
        }
    }
}

impl CnnLstmConfig {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.image_size < DOWNSAMPLE || self.image_size % DOWNSAMPLE != 0 {
            return Err(ModelError::InvalidConfig(format!(
                "image_size must be a positive multiple of {}, got {}",
                DOWNSAMPLE, self.image_size
            )));
        }
        if self.kernel_size % 2 == 0 {
            return Err(ModelError::InvalidConfig(format!(
                "kernel_size must be odd, got {}",
                self.kernel_size
            )));
        }
        if self.num_classes == 0 || self.cnn_embed == 0 || self.lstm_hidden == 0 {
            return Err(ModelError::InvalidConfig("layer sizes must be positive".into()));
        }
        Ok(())
    }

    /// Padding that keeps the spatial size through each convolution.
    pub fn padding(&self) -> usize {
        self.kernel_size / 2
    }

    /// Width of the flattened CNN output fed to the embedding layer
    /// (64·16·16 for 128×128 frames).
    pub fn flatten_size(&self) -> usize {
        let side = self.image_size / DOWNSAMPLE;
        self.conv_channels[2] * side * side
    }
}
