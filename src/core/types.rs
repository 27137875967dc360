use serde::{Deserialize, Serialize};

/// A single price observation for one symbol.
///
/// Timestamps must be strictly increasing per symbol; the window rejects
/// anything else on ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSample {
    pub symbol: String,
    pub timestamp: i64,
    pub price: f64,
    pub volume: Option<f64>,
}

impl PriceSample {
    pub fn new(symbol: impl Into<String>, timestamp: i64, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            price,
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }
}

/// Derived metrics over one symbol's current window.
///
/// Recomputed on every ingest; only the latest snapshot per symbol is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub symbol: String,
    /// Timestamp of the newest sample in the window.
    pub timestamp: i64,
    /// Price of the newest sample.
    pub last_price: f64,
    /// Volume of the newest sample, when the feed supplies one.
    pub volume: Option<f64>,
    /// Change from the oldest to the newest window price, in percent.
    pub percent_change: f64,
    /// Change from the oldest to the newest window price, absolute.
    pub absolute_change: f64,
    /// Population standard deviation of per-step returns.
    pub volatility: f64,
    /// Least-squares slope of price against sample index over the
    /// configured momentum lookback.
    pub momentum: f64,
    /// Newest price cleared the prior window extreme by more than the
    /// configured breakout fraction.
    pub breakout: bool,
}
