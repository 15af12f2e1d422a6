use chrono::{TimeZone, Utc};
use common::models::{DataOrigin, PriceBar, PriceHistory};
use serde::Deserialize;

use crate::{error::FetchError, traits::RemoteResponse};

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Deserialize)]
pub struct Chart {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<Quote>,
    #[serde(default)]
    pub adjclose: Vec<AdjClose>,
}

#[derive(Debug, Deserialize)]
pub struct Quote {
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
pub struct AdjClose {
    #[serde(default)]
    pub adjclose: Vec<Option<f64>>,
}

impl RemoteResponse<PriceHistory> for ChartResponse {
    fn to_domain(&self, symbol: &str) -> Result<PriceHistory, FetchError> {
        if let Some(ref e) = self.chart.error {
            return Err(FetchError::Api {
                code: e.code.clone(),
                description: e.description.clone(),
            });
        }

        let result = self
            .chart
            .result
            .as_ref()
            .and_then(|r| r.first())
            .ok_or_else(|| FetchError::NoData(symbol.to_string()))?;

        let quote = result
            .indicators
            .quote
            .first()
            .ok_or_else(|| FetchError::Malformed("missing quote indicator".to_string()))?;
        let adjclose = result.indicators.adjclose.first().map(|a| &a.adjclose);

        let mut bars = Vec::with_capacity(result.timestamp.len());
        for (i, &ts) in result.timestamp.iter().enumerate() {
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();

            // Yahoo leaves holes (null) for halted or not-yet-settled days.
            let (Some(close), Some(volume)) = (close, volume) else {
                continue;
            };
            let adj_close = adjclose
                .and_then(|a| a.get(i).copied().flatten())
                .unwrap_or(close);
            let Some(timestamp) = Utc.timestamp_opt(ts, 0).single() else {
                return Err(FetchError::Malformed(format!("bad timestamp {}", ts)));
            };

            bars.push(PriceBar {
                timestamp,
                close,
                adj_close,
                volume,
            });
        }

        Ok(PriceHistory::new(symbol, DataOrigin::Remote, bars))
    }
}
