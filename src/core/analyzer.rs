use serde::Serialize;

use crate::config::AnalyzerConfig;
use crate::core::alerts::{AlertCondition, AlertEngine, AlertEvent, AlertRule, RuleId};
use crate::core::ranking::RankedSet;
use crate::core::types::{MetricSnapshot, PriceSample};
use crate::core::window::WindowSet;
use crate::error::StockWatchError;

/// Entries in a summary report's ranking tables.
#[derive(Debug, Clone, Serialize)]
pub struct RankedEntry {
    pub symbol: String,
    pub percent_change: f64,
}

/// Periodic market overview, serialized to JSON by the reporting task.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    pub timestamp: Option<i64>,
    pub top_gainers: Vec<RankedEntry>,
    pub top_losers: Vec<RankedEntry>,
    pub momentum_leaders: Vec<MetricSnapshot>,
    pub volatility_leaders: Vec<MetricSnapshot>,
    pub breakouts: Vec<MetricSnapshot>,
}

/// Rows per table in [`SummaryReport`].
const REPORT_DEPTH: usize = 5;

/// Owns the per-symbol windows, the percent-change ranking, and the alert
/// engine; every sample flows through [`ingest`](Self::ingest).
///
/// Constructed once and passed explicitly to the ingestion and query call
/// sites; there is no process-wide instance.
#[derive(Debug, Clone)]
pub struct TrendAnalyzer {
    windows: WindowSet,
    ranking: RankedSet,
    alerts: AlertEngine,
    last_update: Option<i64>,
}

impl TrendAnalyzer {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            windows: WindowSet::new(
                config.window_size,
                config.momentum_period,
                config.breakout_fraction,
            ),
            ranking: RankedSet::new(config.heap_size),
            alerts: AlertEngine::new(config.hysteresis, config.event_capacity),
            last_update: None,
        }
    }

    /// Runs one sample through window, ranking, and alerts. A rejected
    /// sample leaves all three untouched and surfaces the rejection to the
    /// caller, which decides whether to retry or skip.
    pub fn ingest(&mut self, sample: PriceSample) -> Result<MetricSnapshot, StockWatchError> {
        let symbol = sample.symbol.clone();
        let snapshot = self.windows.ingest(sample)?;
        self.ranking.update(&symbol, snapshot.percent_change)?;
        self.alerts.evaluate(&symbol, &snapshot);
        self.last_update = Some(snapshot.timestamp);
        Ok(snapshot)
    }

    /// Delisting: drops the symbol from windows and ranking. Rules stay
    /// until removed explicitly; they can never fire without a window.
    pub fn remove_symbol(&mut self, symbol: &str) -> bool {
        let had_window = self.windows.remove(symbol);
        let had_rank = self.ranking.remove(symbol);
        had_window || had_rank
    }

    pub fn top_gainers(&self, k: usize) -> Vec<(String, f64)> {
        self.ranking.top_gainers(k)
    }

    pub fn top_losers(&self, k: usize) -> Vec<(String, f64)> {
        self.ranking.top_losers(k)
    }

    pub fn metrics(&self, symbol: &str) -> Option<&MetricSnapshot> {
        self.windows.metrics(symbol)
    }

    pub fn add_rule(
        &mut self,
        symbol: &str,
        condition: AlertCondition,
    ) -> Result<RuleId, StockWatchError> {
        self.alerts.add_rule(symbol, condition)
    }

    pub fn add_rule_expiring(
        &mut self,
        symbol: &str,
        condition: AlertCondition,
        expires_at: i64,
    ) -> Result<RuleId, StockWatchError> {
        self.alerts.add_rule_expiring(symbol, condition, expires_at)
    }

    pub fn remove_rule(&mut self, id: RuleId) -> bool {
        self.alerts.remove_rule(id)
    }

    pub fn rules(&self) -> &[AlertRule] {
        self.alerts.rules()
    }

    pub fn drain_alerts(&mut self) -> Vec<AlertEvent> {
        self.alerts.drain_events()
    }

    pub fn dropped_alerts(&self) -> u64 {
        self.alerts.dropped_events()
    }

    /// Symbols with the steepest upward momentum slope, descending.
    pub fn momentum_leaders(&self, n: usize) -> Vec<MetricSnapshot> {
        self.sorted_snapshots(n, |s| s.momentum)
    }

    /// Most volatile symbols first.
    pub fn volatility_leaders(&self, n: usize) -> Vec<MetricSnapshot> {
        self.sorted_snapshots(n, |s| s.volatility)
    }

    /// Symbols currently flagged as breakouts, largest move first.
    pub fn breakouts(&self) -> Vec<MetricSnapshot> {
        let mut out: Vec<MetricSnapshot> = self
            .windows
            .snapshots()
            .filter(|s| s.breakout)
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.percent_change
                .abs()
                .total_cmp(&a.percent_change.abs())
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        out
    }

    pub fn summary_report(&self) -> SummaryReport {
        let ranked = |rows: Vec<(String, f64)>| {
            rows.into_iter()
                .map(|(symbol, percent_change)| RankedEntry {
                    symbol,
                    percent_change,
                })
                .collect()
        };
        SummaryReport {
            timestamp: self.last_update,
            top_gainers: ranked(self.top_gainers(REPORT_DEPTH)),
            top_losers: ranked(self.top_losers(REPORT_DEPTH)),
            momentum_leaders: self.momentum_leaders(REPORT_DEPTH),
            volatility_leaders: self.volatility_leaders(REPORT_DEPTH),
            breakouts: self.breakouts().into_iter().take(REPORT_DEPTH).collect(),
        }
    }

    fn sorted_snapshots<F>(&self, n: usize, key: F) -> Vec<MetricSnapshot>
    where
        F: Fn(&MetricSnapshot) -> f64,
    {
        let mut out: Vec<MetricSnapshot> = self.windows.snapshots().cloned().collect();
        out.sort_by(|a, b| {
            key(b)
                .total_cmp(&key(a))
                .then_with(|| a.symbol.cmp(&b.symbol))
        });
        out.truncate(n);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> TrendAnalyzer {
        TrendAnalyzer::new(&AnalyzerConfig {
            window_size: 3,
            heap_size: 10,
            momentum_period: 3,
            breakout_fraction: 0.05,
            hysteresis: 0.0,
            event_capacity: 100,
        })
    }

    fn ingest(a: &mut TrendAnalyzer, symbol: &str, timestamp: i64, price: f64) -> MetricSnapshot {
        a.ingest(PriceSample::new(symbol, timestamp, price)).unwrap()
    }

    #[test]
    fn ingest_feeds_window_ranking_and_alerts() {
        let mut a = analyzer();
        a.add_rule("A", AlertCondition::ChangeAbove(5.0)).unwrap();

        ingest(&mut a, "A", 1, 10.0);
        ingest(&mut a, "B", 1, 10.0);
        ingest(&mut a, "A", 2, 11.0);
        ingest(&mut a, "B", 2, 9.0);

        assert_eq!(a.top_gainers(2)[0].0, "A");
        assert_eq!(a.top_losers(2)[0].0, "B");
        assert_eq!(a.metrics("A").unwrap().last_price, 11.0);

        let events = a.drain_alerts();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].symbol, "A");
    }

    #[test]
    fn rejected_sample_changes_nothing() {
        let mut a = analyzer();
        ingest(&mut a, "A", 5, 10.0);
        let before_rank = a.top_gainers(5);

        let err = a.ingest(PriceSample::new("A", 4, 99.0)).unwrap_err();
        assert!(matches!(err, StockWatchError::OutOfOrderSample { .. }));
        assert_eq!(a.metrics("A").unwrap().last_price, 10.0);
        assert_eq!(a.top_gainers(5), before_rank);
    }

    #[test]
    fn remove_symbol_clears_window_and_ranking() {
        let mut a = analyzer();
        ingest(&mut a, "A", 1, 10.0);
        ingest(&mut a, "B", 1, 10.0);
        assert!(a.remove_symbol("A"));
        assert!(a.metrics("A").is_none());
        assert_eq!(a.top_gainers(5).len(), 1);
        assert!(!a.remove_symbol("A"));
    }

    #[test]
    fn leaders_sort_by_their_metric() {
        let mut a = analyzer();
        // A rises steeply, B gently, C falls.
        for (i, (pa, pb, pc)) in [(10.0, 10.0, 10.0), (20.0, 11.0, 9.0), (30.0, 12.0, 8.0)]
            .into_iter()
            .enumerate()
        {
            let t = i as i64 + 1;
            ingest(&mut a, "A", t, pa);
            ingest(&mut a, "B", t, pb);
            ingest(&mut a, "C", t, pc);
        }
        let leaders = a.momentum_leaders(3);
        let momentum: Vec<&str> = leaders.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(momentum, ["A", "B", "C"]);
        assert_eq!(a.volatility_leaders(1)[0].symbol, "A");
    }

    #[test]
    fn breakouts_are_flagged_and_ordered() {
        let mut a = analyzer();
        ingest(&mut a, "A", 1, 10.0);
        ingest(&mut a, "A", 2, 12.0); // +20% past the 5% band
        ingest(&mut a, "B", 1, 10.0);
        ingest(&mut a, "B", 2, 10.2); // within the band
        let breakouts = a.breakouts();
        assert_eq!(breakouts.len(), 1);
        assert_eq!(breakouts[0].symbol, "A");
    }

    #[test]
    fn summary_report_serializes() {
        let mut a = analyzer();
        ingest(&mut a, "A", 1, 10.0);
        ingest(&mut a, "A", 2, 11.0);
        let report = a.summary_report();
        assert_eq!(report.timestamp, Some(2));
        assert_eq!(report.top_gainers.len(), 1);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"top_gainers\""));
    }
}
