use std::sync::Arc;

use charting::{ChartError, SequenceConfig, encode_png, images_to_tensor, make_sequence_images};
use common::models::{DataOrigin, TradeSignal};
use market_data::{FetchError, HistoryService};
use strategy::{Decision, DecisionConfig, InferenceEngine, InferenceError};
use thiserror::Error;
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("prediction task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("misconfigured pipeline: {0}")]
    Config(String),
}

#[derive(Debug, Clone)]
pub struct PredictionConfig {
    /// Days of daily history requested per prediction.
    pub history_days: u32,
    pub sequence: SequenceConfig,
    pub decision: DecisionConfig,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            history_days: 400,
            sequence: SequenceConfig::default(),
            decision: DecisionConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Prediction {
    pub signal: TradeSignal,
    pub origin: DataOrigin,
    pub decision: Decision,
    /// PNG of the most recent frame fed to the model.
    pub latest_frame_png: Vec<u8>,
}

#[derive(Clone)]
pub struct PredictionService {
    history: HistoryService,
    engine: Arc<InferenceEngine>,
    config: PredictionConfig,
}

impl PredictionService {
    pub fn new(
        history: HistoryService,
        engine: Arc<InferenceEngine>,
        config: PredictionConfig,
    ) -> Result<Self, PredictionError> {
        if config.sequence.frames != engine.frames() {
            return Err(PredictionError::Config(format!(
                "sequence has {} frames but the model expects {}",
                config.sequence.frames,
                engine.frames()
            )));
        }
        if config.sequence.image_size as usize != engine.config().image_size {
            return Err(PredictionError::Config(format!(
                "frames are {}px but the model expects {}px",
                config.sequence.image_size,
                engine.config().image_size
            )));
        }

        Ok(Self {
            history,
            engine,
            config,
        })
    }

    pub async fn predict(&self, symbol: &str) -> Result<Prediction, PredictionError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("predict", %request_id, symbol);
        self.run(symbol).instrument(span).await
    }

    async fn run(&self, symbol: &str) -> Result<Prediction, PredictionError> {
        let history = self
            .history
            .history(symbol, self.config.history_days)
            .await?;
        let origin = history.origin;
        debug!("Loaded {} bars ({:?})", history.len(), origin);

        // Only the bars that some frame actually draws.
        let needed = self.config.sequence.window + self.config.sequence.frames - 1;
        let bars = history.tail(needed).to_vec();

        let engine = Arc::clone(&self.engine);
        let sequence = self.config.sequence.clone();
        let decision_config = self.config.decision;

        let (decision, latest_frame_png) =
            tokio::task::spawn_blocking(move || -> Result<_, PredictionError> {
                let images = make_sequence_images(&bars, &sequence)?;
                let tensor = images_to_tensor(&images)?;
                let logits = engine.predict(&tensor)?;
                let decision = Decision::from_logits(&logits, &decision_config)?;

                let latest = images.last().ok_or(ChartError::EmptySeries)?;
                Ok((decision, encode_png(latest)?))
            })
            .await??;

        info!(
            "{} -> {} (confidence {:.3}, raw {:.3}, {:?} data, {} backend)",
            symbol,
            decision.action,
            decision.confidence,
            decision.raw_confidence,
            origin,
            self.engine.backend_name()
        );

        Ok(Prediction {
            signal: TradeSignal {
                symbol: symbol.to_string(),
                action: decision.action,
                confidence: decision.confidence,
            },
            origin,
            decision,
            latest_frame_png,
        })
    }
}
