use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("cannot render an empty price series")]
    EmptySeries,

    #[error("not enough history for frame {frame}: {available} bars available")]
    InsufficientHistory { frame: usize, available: usize },

    #[error("invalid sequence config: {0}")]
    InvalidConfig(String),

    #[error("frame {index} is {width}x{height}, expected {expected_width}x{expected_height}")]
    ShapeMismatch {
        index: usize,
        width: u32,
        height: u32,
        expected_width: u32,
        expected_height: u32,
    },

    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}
