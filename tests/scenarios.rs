//! End-to-end scenarios driven through the public `TrendAnalyzer` API.

use stockwatch::core::{AlertCondition, PriceSample, TrendAnalyzer};
use stockwatch::{AnalyzerConfig, StockWatchError};

fn analyzer(window_size: usize, heap_size: usize) -> TrendAnalyzer {
    TrendAnalyzer::new(&AnalyzerConfig {
        window_size,
        heap_size,
        ..AnalyzerConfig::default()
    })
}

fn ingest(a: &mut TrendAnalyzer, symbol: &str, timestamp: i64, price: f64) {
    a.ingest(PriceSample::new(symbol, timestamp, price))
        .unwrap_or_else(|e| panic!("ingest {symbol}@{timestamp} rejected: {e}"));
}

fn ranked_symbols(rows: &[(String, f64)]) -> Vec<&str> {
    rows.iter().map(|(s, _)| s.as_str()).collect()
}

#[test]
fn window_percent_change_over_three_samples() {
    let mut a = analyzer(3, 10);
    for (t, price) in [(1, 10.0), (2, 12.0), (3, 11.0)] {
        ingest(&mut a, "X", t, price);
    }
    assert_eq!(a.metrics("X").unwrap().percent_change, 10.0);
}

#[test]
fn ranking_with_heap_size_two() {
    let mut a = analyzer(3, 2);
    // Establish a baseline, then move each symbol by its target percentage.
    for symbol in ["A", "B", "C", "D"] {
        ingest(&mut a, symbol, 1, 100.0);
    }
    ingest(&mut a, "A", 2, 105.0); // +5%
    ingest(&mut a, "B", 2, 103.0); // +3%
    ingest(&mut a, "C", 2, 108.0); // +8%
    ingest(&mut a, "D", 2, 101.0); // +1%

    assert_eq!(ranked_symbols(&a.top_gainers(2)), ["C", "A"]);
    assert_eq!(ranked_symbols(&a.top_losers(2)), ["D", "B"]);
}

#[test]
fn out_of_order_sample_is_rejected_and_window_preserved() {
    let mut a = analyzer(5, 10);
    ingest(&mut a, "X", 1, 10.0);
    ingest(&mut a, "X", 2, 11.0);

    let err = a.ingest(PriceSample::new("X", 1, 12.0)).unwrap_err();
    assert!(matches!(err, StockWatchError::OutOfOrderSample { .. }));

    let snap = a.metrics("X").unwrap();
    assert_eq!(snap.timestamp, 2);
    assert_eq!(snap.last_price, 11.0);
}

#[test]
fn eviction_keeps_the_newest_n_samples() {
    let mut a = analyzer(3, 10);
    for t in 1..=10 {
        ingest(&mut a, "X", t, f64::from(t as i32));
    }
    // Window now spans prices [8, 9, 10].
    let snap = a.metrics("X").unwrap();
    assert_eq!(snap.timestamp, 10);
    assert_eq!(snap.absolute_change, 2.0);
    assert_eq!(snap.percent_change, 25.0);
}

#[test]
fn metrics_requery_is_idempotent() {
    let mut a = analyzer(3, 10);
    ingest(&mut a, "X", 1, 10.0);
    ingest(&mut a, "X", 2, 12.0);
    let first = a.metrics("X").unwrap().clone();
    let second = a.metrics("X").unwrap().clone();
    assert_eq!(first, second);
}

#[test]
fn alert_hysteresis_reference_sequence() {
    // Threshold 100, direction above, hysteresis 0. The sequence crosses
    // twice; the 100 in between re-arms the rule without firing it.
    let mut a = analyzer(10, 10);
    a.add_rule("X", AlertCondition::PriceAbove(100.0)).unwrap();

    for (t, price) in [(1, 99.0), (2, 101.0), (3, 100.0), (4, 101.0)] {
        ingest(&mut a, "X", t, price);
    }

    let events = a.drain_alerts();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].timestamp, 2);
    assert_eq!(events[1].timestamp, 4);
}

#[test]
fn alert_events_preserve_per_symbol_order() {
    let mut a = analyzer(10, 10);
    a.add_rule("X", AlertCondition::PriceAbove(10.0)).unwrap();
    a.add_rule("X", AlertCondition::PriceAbove(20.0)).unwrap();

    ingest(&mut a, "X", 1, 15.0); // first rule only
    ingest(&mut a, "X", 2, 25.0); // second rule

    let events = a.drain_alerts();
    assert_eq!(events.len(), 2);
    assert!(events[0].timestamp < events[1].timestamp);
}

#[test]
fn delisted_symbol_vanishes_from_queries() {
    let mut a = analyzer(3, 10);
    ingest(&mut a, "A", 1, 10.0);
    ingest(&mut a, "B", 1, 10.0);

    assert!(a.remove_symbol("B"));
    assert!(a.metrics("B").is_none());
    assert_eq!(ranked_symbols(&a.top_gainers(10)), ["A"]);
    assert_eq!(ranked_symbols(&a.top_losers(10)), ["A"]);
}

#[test]
fn breakout_flag_drives_breakout_rules() {
    let mut a = analyzer(5, 10);
    a.add_rule("X", AlertCondition::Breakout).unwrap();

    ingest(&mut a, "X", 1, 100.0);
    ingest(&mut a, "X", 2, 101.0); // within the 5% band
    assert!(a.drain_alerts().is_empty());

    ingest(&mut a, "X", 3, 120.0); // clears 101 * 1.05
    let events = a.drain_alerts();
    assert_eq!(events.len(), 1);
    assert!(events[0].snapshot.breakout);
}

#[test]
fn rule_lifecycle_through_the_facade() {
    let mut a = analyzer(5, 10);
    let id = a.add_rule("X", AlertCondition::PriceAbove(100.0)).unwrap();
    a.add_rule_expiring("X", AlertCondition::PriceBelow(50.0), 2)
        .unwrap();
    assert!(matches!(
        a.add_rule("X", AlertCondition::PriceAbove(100.0)),
        Err(StockWatchError::DuplicateRule { .. })
    ));
    assert_eq!(a.rules().len(), 2);

    ingest(&mut a, "X", 3, 60.0); // past the expiring rule's deadline
    assert_eq!(a.rules().len(), 1);

    assert!(a.remove_rule(id));
    assert!(a.rules().is_empty());
    ingest(&mut a, "X", 4, 200.0);
    assert!(a.drain_alerts().is_empty());
    assert_eq!(a.dropped_alerts(), 0);
}

#[test]
fn summary_report_reflects_current_state() {
    let mut a = analyzer(5, 10);
    ingest(&mut a, "A", 1, 100.0);
    ingest(&mut a, "A", 2, 110.0);
    ingest(&mut a, "B", 1, 100.0);
    ingest(&mut a, "B", 2, 90.0);

    let report = a.summary_report();
    assert_eq!(report.timestamp, Some(2));
    assert_eq!(report.top_gainers[0].symbol, "A");
    assert_eq!(report.top_losers[0].symbol, "B");
    assert_eq!(report.breakouts.len(), 2);

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"momentum_leaders\""));
}
