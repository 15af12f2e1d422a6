pub mod decision;
pub mod inference;
pub mod model;

pub use decision::{Decision, DecisionConfig};
pub use inference::{InferenceEngine, InferenceError};
pub use model::{CnnLstm, CnnLstmConfig, ModelError};
