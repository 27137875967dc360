use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::types::MetricSnapshot;
use crate::error::StockWatchError;

pub type RuleId = u64;

/// What a rule watches and where its threshold sits.
///
/// Price conditions compare the newest price, change conditions the window
/// percent change, volume conditions the newest sample's volume. `Breakout`
/// has no threshold of its own; it follows the snapshot's breakout flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AlertCondition {
    PriceAbove(f64),
    PriceBelow(f64),
    ChangeAbove(f64),
    ChangeBelow(f64),
    VolumeAbove(f64),
    VolumeBelow(f64),
    Breakout,
}

impl AlertCondition {
    fn observed(&self, snapshot: &MetricSnapshot) -> Option<f64> {
        match self {
            Self::PriceAbove(_) | Self::PriceBelow(_) => Some(snapshot.last_price),
            Self::ChangeAbove(_) | Self::ChangeBelow(_) => Some(snapshot.percent_change),
            Self::VolumeAbove(_) | Self::VolumeBelow(_) => snapshot.volume,
            Self::Breakout => None,
        }
    }

    /// Whether an armed rule fires on this snapshot. Above-conditions
    /// trigger strictly past the threshold; the threshold itself belongs to
    /// the re-arm band. `None` when the snapshot lacks the observed value.
    fn triggers(&self, snapshot: &MetricSnapshot) -> Option<bool> {
        match self {
            Self::Breakout => Some(snapshot.breakout),
            Self::PriceAbove(t) | Self::ChangeAbove(t) | Self::VolumeAbove(t) => {
                self.observed(snapshot).map(|v| v > *t)
            }
            Self::PriceBelow(t) | Self::ChangeBelow(t) | Self::VolumeBelow(t) => {
                self.observed(snapshot).map(|v| v < *t)
            }
        }
    }

    /// Whether a triggered rule may re-arm: the value is back at or beyond
    /// the threshold less (above) / plus (below) the hysteresis margin.
    fn clears(&self, snapshot: &MetricSnapshot, hysteresis: f64) -> Option<bool> {
        match self {
            Self::Breakout => Some(!snapshot.breakout),
            Self::PriceAbove(t) | Self::ChangeAbove(t) | Self::VolumeAbove(t) => {
                self.observed(snapshot).map(|v| v <= *t - hysteresis)
            }
            Self::PriceBelow(t) | Self::ChangeBelow(t) | Self::VolumeBelow(t) => {
                self.observed(snapshot).map(|v| v >= *t + hysteresis)
            }
        }
    }
}

impl fmt::Display for AlertCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PriceAbove(t) => write!(f, "price above {t}"),
            Self::PriceBelow(t) => write!(f, "price below {t}"),
            Self::ChangeAbove(t) => write!(f, "change above {t}%"),
            Self::ChangeBelow(t) => write!(f, "change below {t}%"),
            Self::VolumeAbove(t) => write!(f, "volume above {t}"),
            Self::VolumeBelow(t) => write!(f, "volume below {t}"),
            Self::Breakout => write!(f, "breakout"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertRule {
    pub id: RuleId,
    pub name: String,
    pub symbol: String,
    pub condition: AlertCondition,
    pub armed: bool,
    pub last_triggered_at: Option<i64>,
    /// Rules past this timestamp are swept during evaluation.
    pub expires_at: Option<i64>,
}

/// Emitted exactly once per condition crossing.
#[derive(Debug, Clone, Serialize)]
pub struct AlertEvent {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub symbol: String,
    pub snapshot: MetricSnapshot,
    pub timestamp: i64,
}

/// Rule set plus bounded event queue.
///
/// Rules evaluate in insertion order. A rule fires once per crossing, then
/// stays disarmed until its value clears the threshold by the hysteresis
/// margin. Events overflow drop-oldest; the drop count is surfaced.
#[derive(Debug, Clone)]
pub struct AlertEngine {
    hysteresis: f64,
    next_id: RuleId,
    rules: Vec<AlertRule>,
    events: VecDeque<AlertEvent>,
    event_capacity: usize,
    dropped_events: u64,
}

impl AlertEngine {
    /// Panics if `event_capacity` is zero.
    pub fn new(hysteresis: f64, event_capacity: usize) -> Self {
        assert!(event_capacity > 0, "AlertEngine event capacity must be positive");
        Self {
            hysteresis,
            next_id: 0,
            rules: Vec::new(),
            events: VecDeque::with_capacity(event_capacity),
            event_capacity,
            dropped_events: 0,
        }
    }

    /// Registers a rule; duplicates (same symbol and condition) are
    /// rejected.
    pub fn add_rule(
        &mut self,
        symbol: &str,
        condition: AlertCondition,
    ) -> Result<RuleId, StockWatchError> {
        self.insert_rule(symbol, condition, None)
    }

    /// Like [`add_rule`](Self::add_rule) but swept once sample timestamps
    /// pass `expires_at`.
    pub fn add_rule_expiring(
        &mut self,
        symbol: &str,
        condition: AlertCondition,
        expires_at: i64,
    ) -> Result<RuleId, StockWatchError> {
        self.insert_rule(symbol, condition, Some(expires_at))
    }

    fn insert_rule(
        &mut self,
        symbol: &str,
        condition: AlertCondition,
        expires_at: Option<i64>,
    ) -> Result<RuleId, StockWatchError> {
        if self
            .rules
            .iter()
            .any(|r| r.symbol == symbol && r.condition == condition)
        {
            return Err(StockWatchError::DuplicateRule {
                symbol: symbol.to_string(),
            });
        }
        self.next_id += 1;
        let id = self.next_id;
        self.rules.push(AlertRule {
            id,
            name: format!("{symbol} {condition}"),
            symbol: symbol.to_string(),
            condition,
            armed: true,
            last_triggered_at: None,
            expires_at,
        });
        Ok(id)
    }

    pub fn remove_rule(&mut self, id: RuleId) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.id != id);
        self.rules.len() != before
    }

    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    pub fn rules_for<'a>(&'a self, symbol: &'a str) -> impl Iterator<Item = &'a AlertRule> {
        self.rules.iter().filter(move |r| r.symbol == symbol)
    }

    /// Evaluates the symbol's rules against a fresh snapshot, in insertion
    /// order. Returns the number of events emitted. A rule never both
    /// re-arms and fires on the same snapshot.
    ///
    /// Expiry is judged against sample timestamps, not wall clock, so
    /// replayed feeds evaluate deterministically.
    pub fn evaluate(&mut self, symbol: &str, snapshot: &MetricSnapshot) -> usize {
        self.rules
            .retain(|r| r.symbol != symbol || r.expires_at.is_none_or(|e| snapshot.timestamp <= e));

        let hysteresis = self.hysteresis;
        let mut fired = Vec::new();
        for rule in self.rules.iter_mut().filter(|r| r.symbol == symbol) {
            if rule.armed {
                if rule.condition.triggers(snapshot) == Some(true) {
                    rule.armed = false;
                    rule.last_triggered_at = Some(snapshot.timestamp);
                    fired.push(AlertEvent {
                        rule_id: rule.id,
                        rule_name: rule.name.clone(),
                        symbol: rule.symbol.clone(),
                        snapshot: snapshot.clone(),
                        timestamp: snapshot.timestamp,
                    });
                }
            } else if rule.condition.clears(snapshot, hysteresis) == Some(true) {
                rule.armed = true;
            }
        }

        let count = fired.len();
        for event in fired {
            self.push_event(event);
        }
        count
    }

    fn push_event(&mut self, event: AlertEvent) {
        if self.events.len() == self.event_capacity {
            self.events.pop_front();
            self.dropped_events += 1;
        }
        self.events.push_back(event);
    }

    /// Empties the queue in emission order.
    pub fn drain_events(&mut self) -> Vec<AlertEvent> {
        self.events.drain(..).collect()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Events discarded by drop-oldest overflow since construction.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events
    }
}
