pub mod alerts;
pub mod analyzer;
pub mod ranking;
pub mod types;
pub mod window;

pub use alerts::{AlertCondition, AlertEngine, AlertEvent, AlertRule, RuleId};
pub use analyzer::{SummaryReport, TrendAnalyzer};
pub use ranking::RankedSet;
pub use types::{MetricSnapshot, PriceSample};
pub use window::{SlidingWindow, WindowSet};
