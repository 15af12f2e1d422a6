use async_trait::async_trait;
use common::models::PriceHistory;

use crate::error::FetchError;

/// Converts a decoded remote payload into the domain type.
pub trait RemoteResponse<T> {
    fn to_domain(&self, symbol: &str) -> Result<T, FetchError>;
}

/// Anything that can produce the daily history of a symbol.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetches at least `period_days` of daily bars ending today.
    async fn fetch_history(&self, symbol: &str, period_days: u32)
    -> Result<PriceHistory, FetchError>;
}
