/// Symbols tracked when none are supplied on the command line.
pub const DEFAULT_SYMBOLS: [&str; 15] = [
    "AAPL", "MSFT", "GOOGL", "AMZN", "META", "TSLA", "NVDA", "JPM", "V", "WMT", "PG", "JNJ", "MA",
    "DIS", "NFLX",
];

/// Capacity of the sample channel between the feed task and the analyzer.
pub const SAMPLE_CHANNEL_CAPACITY: usize = 100;

/// Seconds between alert drains / summary reports in the reporting task.
pub const REPORT_INTERVAL_SECS: u64 = 60;

/// Construction-time configuration for the analysis core.
///
/// All knobs are explicit here; the core never reads environment state.
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Samples retained per symbol, oldest evicted first.
    pub window_size: usize,
    /// Symbols retained per ranking side (gainers / losers).
    pub heap_size: usize,
    /// Lookback (in samples) for the momentum slope.
    pub momentum_period: usize,
    /// Fraction by which the newest price must clear the prior window
    /// extreme to count as a breakout (0.05 = 5%).
    pub breakout_fraction: f64,
    /// Margin a value must clear past a rule threshold before the rule
    /// re-arms. Zero re-arms as soon as the condition is no longer met.
    pub hysteresis: f64,
    /// Alert events buffered before drop-oldest kicks in.
    pub event_capacity: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            window_size: 60,
            heap_size: 10,
            momentum_period: 5,
            breakout_fraction: 0.05,
            hysteresis: 0.0,
            event_capacity: 100,
        }
    }
}
