//! CNN feature extractor + LSTM sequence head, evaluated on ndarray.

mod cnn;
mod cnn_lstm;
mod config;
mod layers;
mod lstm;

pub use cnn::TinyCnn;
pub use cnn_lstm::CnnLstm;
pub use config::CnnLstmConfig;
pub use layers::{Conv2d, Linear};
pub use lstm::Lstm;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid model config: {0}")]
    InvalidConfig(String),

    #[error("unexpected input shape {actual:?}, expected {expected}")]
    InputShape { actual: Vec<usize>, expected: String },

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}
