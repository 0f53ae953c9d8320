use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One (trading date, adjusted close) observation for a security.
///
/// The close is adjusted for all splits and dividends upstream, so the ratio
/// between any two points in a series is a true price ratio. Price history is
/// append-only and unique per (security, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub adj_close: f64,
    pub volume: Option<i64>,
}

impl PricePoint {
    /// Creates a new price point.
    pub fn new(date: NaiveDate, adj_close: f64, volume: Option<i64>) -> Self {
        PricePoint {
            date,
            adj_close,
            volume,
        }
    }
}

/// Finds the adjusted close of the first point dated on or after `target`.
///
/// `prices` must be sorted ascending by date. Returns `None` when every
/// point precedes `target`.
pub fn price_on_or_after(prices: &[PricePoint], target: NaiveDate) -> Option<f64> {
    let idx = prices.partition_point(|p| p.date < target);
    prices.get(idx).map(|p| p.adj_close)
}
