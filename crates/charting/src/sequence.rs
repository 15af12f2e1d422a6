use common::models::PriceBar;
use image::RgbImage;
use image::imageops::{self, FilterType};
use tracing::debug;

use crate::error::ChartError;
use crate::panel::{PanelStyle, render_panel};

#[derive(Debug, Clone)]
pub struct SequenceConfig {
    /// Number of snapshots fed to the model.
    pub frames: usize,
    /// Daily bars drawn in each snapshot.
    pub window: usize,
    /// Side of the square model input.
    pub image_size: u32,
    pub style: PanelStyle,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            frames: 10,
            window: 260,
            image_size: 128,
            style: PanelStyle::default(),
        }
    }
}

impl SequenceConfig {
    fn validate(&self) -> Result<(), ChartError> {
        if self.frames == 0 {
            return Err(ChartError::InvalidConfig("frames must be positive".into()));
        }
        if self.window == 0 {
            return Err(ChartError::InvalidConfig("window must be positive".into()));
        }
        if self.image_size == 0 || self.style.size == 0 {
            return Err(ChartError::InvalidConfig("image sizes must be positive".into()));
        }
        Ok(())
    }
}

/// Slices of `bars` for each frame, oldest frame first.
///
/// Frame `t` (counted back from the latest) ends `t` bars before the last bar
/// and spans at most `window` bars; slices near the start of the history are
/// shorter rather than padded.
pub fn frame_slices(
    bars: &[PriceBar],
    frames: usize,
    window: usize,
) -> Result<Vec<&[PriceBar]>, ChartError> {
    let mut slices = Vec::with_capacity(frames);
    for t in 0..frames {
        let end = bars.len().saturating_sub(t);
        if end == 0 {
            return Err(ChartError::InsufficientHistory {
                frame: t,
                available: bars.len(),
            });
        }
        let start = end.saturating_sub(window);
        slices.push(&bars[start..end]);
    }
    slices.reverse();
    Ok(slices)
}

/// Renders each frame slice and scales it down to the model input size.
/// The last image is the most recent window.
pub fn make_sequence_images(
    bars: &[PriceBar],
    config: &SequenceConfig,
) -> Result<Vec<RgbImage>, ChartError> {
    config.validate()?;

    let slices = frame_slices(bars, config.frames, config.window)?;
    debug!(
        "Rendering {} frames of up to {} bars from {} bars",
        slices.len(),
        config.window,
        bars.len()
    );

    slices
        .into_iter()
        .map(|slice| -> Result<RgbImage, ChartError> {
            let panel = render_panel(slice, &config.style)?;
            Ok(imageops::resize(
                &panel,
                config.image_size,
                config.image_size,
                FilterType::Lanczos3,
            ))
        })
        .collect()
}
