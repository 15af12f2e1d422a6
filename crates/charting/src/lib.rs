//! Turns a daily price/volume series into the sequence of chart snapshots the
//! classifier consumes.

pub mod error;
pub mod panel;
pub mod sequence;
pub mod tensor;

pub use error::ChartError;
pub use panel::{PanelStyle, encode_png, render_panel};
pub use sequence::{SequenceConfig, frame_slices, make_sequence_images};
pub use tensor::images_to_tensor;
