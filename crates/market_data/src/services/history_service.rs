use std::sync::Arc;

use chrono::Utc;
use common::models::PriceHistory;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::synthetic;
use crate::traits::HistorySource;

/// Fetches daily history and, when allowed, substitutes a synthetic random
/// walk for failed or empty remote results.
#[derive(Clone)]
pub struct HistoryService {
    source: Arc<dyn HistorySource>,
    synthetic_fallback: bool,
}

impl HistoryService {
    pub fn new(source: Arc<dyn HistorySource>, synthetic_fallback: bool) -> Self {
        Self {
            source,
            synthetic_fallback,
        }
    }

    pub async fn history(
        &self,
        symbol: &str,
        period_days: u32,
    ) -> Result<PriceHistory, FetchError> {
        let remote = self.source.fetch_history(symbol, period_days).await;

        let reason = match remote {
            Ok(history) if !history.is_empty() => {
                debug!("Using {} remote bars for {}", history.len(), symbol);
                return Ok(history);
            }
            Ok(_) => FetchError::NoData(symbol.to_string()),
            Err(e) => e,
        };

        if !self.synthetic_fallback {
            return Err(reason);
        }

        warn!(
            "No usable history for {} ({}). Falling back to a synthetic random walk.",
            symbol, reason
        );
        let mut rng = rand::thread_rng();
        Ok(synthetic::random_walk(
            symbol,
            Utc::now(),
            period_days as usize,
            &mut rng,
        ))
    }
}
