//! Real-time stock performance ranking and alerting.
//!
//! A market-data feed pushes [`PriceSample`](core::PriceSample)s into a
//! [`TrendAnalyzer`](core::TrendAnalyzer), which maintains per-symbol
//! sliding windows, a dual-heap gainer/loser ranking, and an alert engine
//! with exactly-once trigger semantics. The binary in `main.rs` wires the
//! feed, analysis, and reporting tasks together.

pub mod api;
pub mod config;
pub mod core;
pub mod error;

pub use config::AnalyzerConfig;
pub use error::StockWatchError;
