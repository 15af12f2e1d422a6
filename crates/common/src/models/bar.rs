use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One daily bar. Only the fields the chart renderer draws are kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub adj_close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOrigin {
    Remote,
    Synthetic,
}

/// Daily history of one symbol, oldest bar first.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    pub symbol: String,
    pub origin: DataOrigin,
    pub bars: Vec<PriceBar>,
}

impl PriceHistory {
    pub fn new(symbol: impl Into<String>, origin: DataOrigin, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        Self {
            symbol: symbol.into(),
            origin,
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// The most recent `n` bars (all of them when fewer exist).
    pub fn tail(&self, n: usize) -> &[PriceBar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn bar(day: i64, close: f64) -> PriceBar {
        PriceBar {
            timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + Duration::days(day),
            close,
            adj_close: close,
            volume: 1_000.0,
        }
    }

    #[test]
    fn test_new_sorts_bars_by_time() {
        let history = PriceHistory::new(
            "AAPL",
            DataOrigin::Remote,
            vec![bar(2, 3.0), bar(0, 1.0), bar(1, 2.0)],
        );

        let closes: Vec<f64> = history.bars.iter().map(|b| b.close).collect();
        assert_eq!(closes, vec![1.0, 2.0, 3.0]);
        assert_eq!(history.last().map(|b| b.close), Some(3.0));
    }

    #[test]
    fn test_tail_is_clamped_to_history_length() {
        let history = PriceHistory::new("AAPL", DataOrigin::Remote, vec![bar(0, 1.0), bar(1, 2.0)]);

        assert_eq!(history.tail(1).len(), 1);
        assert_eq!(history.tail(1)[0].close, 2.0);
        assert_eq!(history.tail(10).len(), 2);
        assert!(PriceHistory::new("X", DataOrigin::Synthetic, vec![]).tail(3).is_empty());
    }
}
