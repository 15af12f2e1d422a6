//! Random-walk price history used when no real data can be fetched.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use common::models::{DataOrigin, PriceBar, PriceHistory};
use rand::Rng;
use rand::distributions::Uniform;
use rand_distr::StandardNormal;

const START_PRICE: f64 = 100.0;
const MIN_VOLUME: u64 = 10_000;
const MAX_VOLUME: u64 = 1_000_000;

/// `days` business days ending on the last weekday not after `end`.
pub fn business_days(end: DateTime<Utc>, days: usize) -> Vec<DateTime<Utc>> {
    let midnight = end
        .date_naive()
        .and_time(NaiveTime::MIN)
        .and_utc();

    let mut dates = Vec::with_capacity(days);
    let mut cursor = midnight;
    while dates.len() < days {
        if !matches!(cursor.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(cursor);
        }
        cursor -= Duration::days(1);
    }
    dates.reverse();
    dates
}

/// Cumulative sum of standard-normal steps starting at 100, with uniform
/// integer volumes in `[10_000, 1_000_000)`.
pub fn random_walk<R: Rng>(
    symbol: &str,
    end: DateTime<Utc>,
    days: usize,
    rng: &mut R,
) -> PriceHistory {
    let volume_dist = Uniform::new(MIN_VOLUME, MAX_VOLUME);

    let mut price = START_PRICE;
    let bars = business_days(end, days)
        .into_iter()
        .map(|timestamp| {
            let step: f64 = rng.sample(StandardNormal);
            price += step;
            PriceBar {
                timestamp,
                close: price,
                adj_close: price,
                volume: rng.sample(&volume_dist) as f64,
            }
        })
        .collect();

    PriceHistory::new(symbol, DataOrigin::Synthetic, bars)
}
