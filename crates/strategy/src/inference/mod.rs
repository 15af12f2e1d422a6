use std::path::Path;
use std::sync::Arc;

use ndarray::Array5;
use thiserror::Error;
use tract_onnx::prelude::*;
use tracing::{debug, error, info, warn};

use crate::model::{CnnLstm, CnnLstmConfig, ModelError};

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("onnx runtime error: {0}")]
    Onnx(#[from] TractError),

    #[error("invalid model input: {0}")]
    InvalidInput(String),

    #[error("invalid model output: {0}")]
    InvalidOutput(String),
}

#[derive(Clone)]
enum Backend {
    Onnx(Arc<RunnableModel>),
    Native(Arc<CnnLstm>),
}

/// Runs `[1, T, C, S, S]` frame tensors through either an exported ONNX graph
/// or the in-process network.
#[derive(Clone)]
pub struct InferenceEngine {
    backend: Backend,
    frames: usize,
    config: CnnLstmConfig,
}

impl InferenceEngine {
    pub fn new(
        model_path: &Path,
        frames: usize,
        config: CnnLstmConfig,
        seed: Option<u64>,
    ) -> Result<Self, InferenceError> {
        config.validate()?;
        if frames == 0 {
            return Err(InferenceError::InvalidInput("frame count must be positive".into()));
        }

        let onnx = if model_path.exists() {
            info!("Loading ONNX model from {:?}", model_path);
            match Self::load_model(model_path, frames, &config) {
                Ok(plan) => Some(Arc::new(plan)),
                Err(e) => {
                    error!("Failed to load model: {}", e);
                    None
                }
            }
        } else {
            warn!(
                "ONNX model not found at {:?}. Using randomly initialised CNN-LSTM weights.",
                model_path
            );
            None
        };

        let backend = match onnx {
            Some(plan) => Backend::Onnx(plan),
            None => Backend::Native(Arc::new(CnnLstm::seeded(config.clone(), seed)?)),
        };

        Ok(Self {
            backend,
            frames,
            config,
        })
    }

    /// Engine backed by an already built network.
    pub fn native(model: CnnLstm, frames: usize) -> Self {
        let config = model.config().clone();
        Self {
            backend: Backend::Native(Arc::new(model)),
            frames,
            config,
        }
    }

    fn load_model(path: &Path, frames: usize, config: &CnnLstmConfig) -> TractResult<RunnableModel> {
        let size = config.image_size;
        let model = tract_onnx::onnx()
            .model_for_path(path)?
            .with_input_fact(0, f32::fact([1, frames, config.in_channels, size, size]).into())?
            .into_optimized()?
            .into_runnable()?;
        Ok(model)
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Onnx(_) => "onnx",
            Backend::Native(_) => "native",
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn config(&self) -> &CnnLstmConfig {
        &self.config
    }

    /// Class logits for a single sequence.
    pub fn predict(&self, input: &Array5<f32>) -> Result<Vec<f32>, InferenceError> {
        let size = self.config.image_size;
        let expected = [1, self.frames, self.config.in_channels, size, size];
        if input.shape() != expected {
            return Err(InferenceError::InvalidInput(format!(
                "tensor shape {:?}, expected {:?}",
                input.shape(),
                expected
            )));
        }

        let logits = match &self.backend {
            Backend::Onnx(model) => {
                let data: Vec<f32> = input.iter().copied().collect();
                let tensor = Tensor::from_shape(&expected, &data)?;

                let result = model.run(tvec!(tensor.into()))?;
                let output = result
                    .first()
                    .ok_or_else(|| InferenceError::InvalidOutput("model returned no outputs".into()))?;
                output.to_array_view::<f32>()?.iter().copied().collect::<Vec<f32>>()
            }
            Backend::Native(model) => model.forward(input.view())?.row(0).to_vec(),
        };

        if logits.len() != self.config.num_classes {
            return Err(InferenceError::InvalidOutput(format!(
                "expected {} logits, got {}",
                self.config.num_classes,
                logits.len()
            )));
        }
        debug!(backend = self.backend_name(), ?logits, "model forward pass");
        Ok(logits)
    }
}
