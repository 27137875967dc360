use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::error::StockWatchError;

#[derive(Debug, Clone)]
struct HeapEntry {
    symbol: String,
    value: f64,
    seq: u64,
}

/// Max-ordered entry: highest value pops first, ties pop the
/// lexicographically smaller symbol first.
#[derive(Debug, Clone)]
struct GainerEntry(HeapEntry);

/// Min-ordered entry: lowest value pops first, same tie-break.
#[derive(Debug, Clone)]
struct LoserEntry(HeapEntry);

impl Ord for GainerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .value
            .total_cmp(&other.0.value)
            .then_with(|| other.0.symbol.cmp(&self.0.symbol))
    }
}

impl Ord for LoserEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .0
            .value
            .total_cmp(&self.0.value)
            .then_with(|| other.0.symbol.cmp(&self.0.symbol))
    }
}

macro_rules! impl_entry_eq {
    ($type:ty) => {
        impl PartialOrd for $type {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl PartialEq for $type {
            fn eq(&self, other: &Self) -> bool {
                self.cmp(other) == Ordering::Equal
            }
        }

        impl Eq for $type {}
    };
}

impl_entry_eq!(GainerEntry);
impl_entry_eq!(LoserEntry);

#[derive(Debug, Clone, Copy)]
struct LiveValue {
    seq: u64,
    value: f64,
}

/// Dual-heap top/bottom tracker over an evolving symbol → metric mapping.
///
/// Superseded heap entries are invalidated lazily: the index map holds the
/// current sequence number per symbol, queries skip entries whose sequence
/// is stale, and both heaps are rebuilt from the map once dead entries
/// outnumber live ones.
#[derive(Debug, Clone)]
pub struct RankedSet {
    capacity: usize,
    seq: u64,
    live: HashMap<String, LiveValue>,
    gainers: BinaryHeap<GainerEntry>,
    losers: BinaryHeap<LoserEntry>,
}

impl RankedSet {
    /// Panics if `capacity` is zero; that is a caller bug, not a runtime
    /// condition.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RankedSet capacity must be positive");
        Self {
            capacity,
            seq: 0,
            live: HashMap::new(),
            gainers: BinaryHeap::new(),
            losers: BinaryHeap::new(),
        }
    }

    /// Inserts or replaces the symbol's metric. The previous entry (if any)
    /// becomes stale in both heaps.
    pub fn update(&mut self, symbol: &str, value: f64) -> Result<(), StockWatchError> {
        if !value.is_finite() {
            return Err(StockWatchError::InvalidMetric {
                symbol: symbol.to_string(),
                value,
            });
        }

        self.seq += 1;
        let seq = self.seq;
        self.live
            .insert(symbol.to_string(), LiveValue { seq, value });

        let entry = HeapEntry {
            symbol: symbol.to_string(),
            value,
            seq,
        };
        self.gainers.push(GainerEntry(entry.clone()));
        self.losers.push(LoserEntry(entry));

        self.maybe_compact();
        Ok(())
    }

    /// Removes a symbol entirely (e.g. a delisting). Heap residue is
    /// filtered on query and dropped at the next compaction.
    pub fn remove(&mut self, symbol: &str) -> bool {
        self.live.remove(symbol).is_some()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.live.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// The `k` symbols with the highest current metric, descending, ties by
    /// symbol name. Capped at the configured per-side capacity; never
    /// mutates live membership.
    pub fn top_gainers(&self, k: usize) -> Vec<(String, f64)> {
        self.extract(k, &self.gainers, |e| &e.0)
    }

    /// The `k` symbols with the lowest current metric, ascending, ties by
    /// symbol name.
    pub fn top_losers(&self, k: usize) -> Vec<(String, f64)> {
        self.extract(k, &self.losers, |e| &e.0)
    }

    fn extract<E, F>(&self, k: usize, heap: &BinaryHeap<E>, inner: F) -> Vec<(String, f64)>
    where
        E: Ord + Clone,
        F: Fn(&E) -> &HeapEntry,
    {
        let want = k.min(self.capacity);
        let mut working = heap.clone();
        let mut out = Vec::with_capacity(want.min(self.live.len()));
        while out.len() < want {
            let Some(top) = working.pop() else { break };
            let entry = inner(&top);
            if self.is_live(entry) {
                out.push((entry.symbol.clone(), entry.value));
            }
        }
        out
    }

    fn is_live(&self, entry: &HeapEntry) -> bool {
        self.live
            .get(&entry.symbol)
            .is_some_and(|v| v.seq == entry.seq)
    }

    /// Rebuilds both heaps from the index map once stale entries dominate,
    /// keeping heap size proportional to the live set.
    fn maybe_compact(&mut self) {
        if self.gainers.len() <= 2 * self.live.len() + self.capacity {
            return;
        }
        self.gainers = self
            .live
            .iter()
            .map(|(symbol, v)| {
                GainerEntry(HeapEntry {
                    symbol: symbol.clone(),
                    value: v.value,
                    seq: v.seq,
                })
            })
            .collect();
        self.losers = self
            .live
            .iter()
            .map(|(symbol, v)| {
                LoserEntry(HeapEntry {
                    symbol: symbol.clone(),
                    value: v.value,
                    seq: v.seq,
                })
            })
            .collect();
    }
}
