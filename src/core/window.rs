use std::collections::{HashMap, VecDeque};

use crate::core::types::{MetricSnapshot, PriceSample};
use crate::error::StockWatchError;

/// Fixed-capacity, time-ordered buffer of price samples for one symbol.
///
/// Oldest samples are evicted first once the capacity is reached. A fresh
/// [`MetricSnapshot`] is computed on every accepted ingest; volatility is the
/// population standard deviation of per-step returns, momentum the
/// least-squares slope of price against sample index over the momentum
/// lookback.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    capacity: usize,
    momentum_period: usize,
    breakout_fraction: f64,
    samples: VecDeque<PriceSample>,
    snapshot: Option<MetricSnapshot>,
}

impl SlidingWindow {
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize, momentum_period: usize, breakout_fraction: f64) -> Self {
        assert!(capacity > 0, "SlidingWindow capacity must be positive");
        Self {
            capacity,
            momentum_period,
            breakout_fraction,
            samples: VecDeque::with_capacity(capacity),
            snapshot: None,
        }
    }

    /// Appends a sample, evicting the oldest when over capacity, and
    /// recomputes the snapshot. Rejected samples leave the window untouched.
    pub fn ingest(&mut self, sample: PriceSample) -> Result<&MetricSnapshot, StockWatchError> {
        if !sample.price.is_finite() || sample.price <= 0.0 {
            return Err(StockWatchError::InvalidPrice {
                symbol: sample.symbol,
                price: sample.price,
            });
        }
        if let Some(last) = self.samples.back() {
            // Timestamps are unique and monotonic per symbol, so equality is
            // a regression too.
            if sample.timestamp <= last.timestamp {
                return Err(StockWatchError::OutOfOrderSample {
                    symbol: sample.symbol,
                    last: last.timestamp,
                    got: sample.timestamp,
                });
            }
        }

        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }

        self.snapshot = Some(self.compute_snapshot());
        Ok(self.snapshot.as_ref().expect("snapshot just set"))
    }

    /// Latest snapshot, `None` until the first accepted sample.
    pub fn metrics(&self) -> Option<&MetricSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = &PriceSample> {
        self.samples.iter()
    }

    fn compute_snapshot(&self) -> MetricSnapshot {
        let newest = self.samples.back().expect("ingest pushed a sample");
        let oldest = self.samples.front().expect("ingest pushed a sample");

        let absolute_change = newest.price - oldest.price;
        let percent_change = absolute_change / oldest.price * 100.0;

        MetricSnapshot {
            symbol: newest.symbol.clone(),
            timestamp: newest.timestamp,
            last_price: newest.price,
            volume: newest.volume,
            percent_change,
            absolute_change,
            volatility: self.volatility(),
            momentum: self.momentum(),
            breakout: self.breakout(),
        }
    }

    /// Population standard deviation of per-step simple returns. Zero until
    /// two samples are present.
    fn volatility(&self) -> f64 {
        if self.samples.len() < 2 {
            return 0.0;
        }
        let returns: Vec<f64> = self
            .samples
            .iter()
            .zip(self.samples.iter().skip(1))
            .map(|(prev, next)| (next.price - prev.price) / prev.price)
            .collect();
        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        let variance =
            returns.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / returns.len() as f64;
        variance.sqrt()
    }

    /// Least-squares slope of price against sample index over the last
    /// `momentum_period` samples. Zero until two samples are present.
    fn momentum(&self) -> f64 {
        let len = self.samples.len();
        let span = len.min(self.momentum_period.max(2));
        if span < 2 {
            return 0.0;
        }
        let tail = self.samples.iter().skip(len - span);
        let x_mean = (span - 1) as f64 / 2.0;
        let y_mean = tail.clone().map(|s| s.price).sum::<f64>() / span as f64;

        let mut num = 0.0;
        let mut den = 0.0;
        for (i, sample) in tail.enumerate() {
            let dx = i as f64 - x_mean;
            num += dx * (sample.price - y_mean);
            den += dx * dx;
        }
        num / den
    }

    /// Newest price cleared the pre-existing window extreme by more than the
    /// breakout fraction, in either direction.
    fn breakout(&self) -> bool {
        if self.samples.len() < 2 {
            return false;
        }
        let newest = self.samples.back().expect("len checked").price;
        let mut prior_max = f64::MIN;
        let mut prior_min = f64::MAX;
        for sample in self.samples.iter().take(self.samples.len() - 1) {
            prior_max = prior_max.max(sample.price);
            prior_min = prior_min.min(sample.price);
        }
        newest > prior_max * (1.0 + self.breakout_fraction)
            || newest < prior_min * (1.0 - self.breakout_fraction)
    }
}

/// Per-symbol windows sharing one configuration. Symbols are independent;
/// a window is created on a symbol's first sample.
#[derive(Debug, Clone)]
pub struct WindowSet {
    capacity: usize,
    momentum_period: usize,
    breakout_fraction: f64,
    windows: HashMap<String, SlidingWindow>,
}

impl WindowSet {
    pub fn new(capacity: usize, momentum_period: usize, breakout_fraction: f64) -> Self {
        assert!(capacity > 0, "WindowSet capacity must be positive");
        Self {
            capacity,
            momentum_period,
            breakout_fraction,
            windows: HashMap::new(),
        }
    }

    pub fn ingest(&mut self, sample: PriceSample) -> Result<MetricSnapshot, StockWatchError> {
        match self.windows.get_mut(&sample.symbol) {
            Some(window) => window.ingest(sample).cloned(),
            None => {
                // A window is only kept once its first sample is accepted.
                let mut window = SlidingWindow::new(
                    self.capacity,
                    self.momentum_period,
                    self.breakout_fraction,
                );
                let snapshot = window.ingest(sample).cloned()?;
                self.windows.insert(snapshot.symbol.clone(), window);
                Ok(snapshot)
            }
        }
    }

    pub fn metrics(&self, symbol: &str) -> Option<&MetricSnapshot> {
        self.windows.get(symbol).and_then(SlidingWindow::metrics)
    }

    /// Drops a symbol's window and snapshot. `false` if never tracked.
    pub fn remove(&mut self, symbol: &str) -> bool {
        self.windows.remove(symbol).is_some()
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &MetricSnapshot> {
        self.windows.values().filter_map(SlidingWindow::metrics)
    }
}
