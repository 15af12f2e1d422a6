use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use common::models::PriceHistory;
use reqwest::{Client, StatusCode};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::remote::ChartResponse;
use crate::traits::{HistorySource, RemoteResponse};

/// Extra calendar days requested on top of the period, so weekends and
/// holidays never leave the window short.
const EXTRA_DAYS: i64 = 300;
const MAX_RETRIES: u32 = 3;
const RETRY_BASE: Duration = Duration::from_secs(1);

/// Client for the Yahoo Finance v8 chart endpoint (daily bars).
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    base_url: String,
    /// Backoff after the n-th 429 is `retry_base * 2^n`.
    retry_base: Duration,
}

impl YahooClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; chart-signal/0.1)")
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry_base: RETRY_BASE,
        })
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!("{}/v8/finance/chart/{}", self.base_url, symbol)
    }

    async fn make_request(
        &self,
        symbol: &str,
        period_days: u32,
    ) -> Result<ChartResponse, FetchError> {
        let url = self.chart_url(symbol);
        let now = Utc::now();
        let start = now - ChronoDuration::days(period_days as i64 + EXTRA_DAYS);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("interval", "1d".to_string()),
                ("period1", start.timestamp().to_string()),
                ("period2", now.timestamp().to_string()),
                ("includeAdjustedClose", "true".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited(0));
        }
        // Yahoo answers unknown symbols with 404 and a chart.error body.
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url,
            });
        }

        Ok(response.json::<ChartResponse>().await?)
    }
}

#[async_trait]
impl HistorySource for YahooClient {
    async fn fetch_history(
        &self,
        symbol: &str,
        period_days: u32,
    ) -> Result<PriceHistory, FetchError> {
        let mut retry_count = 0;

        loop {
            match self.make_request(symbol, period_days).await {
                Ok(response) => {
                    let history = response.to_domain(symbol)?;
                    debug!("Fetched {} daily bars for {}", history.len(), symbol);
                    return Ok(history);
                }
                Err(FetchError::RateLimited(_)) => {
                    retry_count += 1;
                    if retry_count > MAX_RETRIES {
                        return Err(FetchError::RateLimited(MAX_RETRIES));
                    }

                    let backoff = self.retry_base * 2_u32.pow(retry_count);
                    warn!(
                        "Rate limited for symbol {}, backing off for {:?} (attempt {}/{})",
                        symbol, backoff, retry_count, MAX_RETRIES
                    );
                    sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
