use crate::value_objects::bar::Bar;
use std::collections::{BTreeMap, HashMap};

/// Counts of rows dropped while normalizing a raw history into a clean,
/// strictly ordered per-symbol series.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DataQualityReport {
    pub rows: usize,
    pub duplicates: usize,
    pub out_of_order: usize,
    pub invalid: usize,
}

/// Drops duplicate-timestamp, out-of-order, and invalid bars (non-finite or
/// non-positive close, negative volume). Keeps the first bar seen for a
/// timestamp so later corrections cannot rewrite history.
pub fn sanitize_series(bars: Vec<Bar>) -> (Vec<Bar>, DataQualityReport) {
    let mut report = DataQualityReport {
        rows: bars.len(),
        ..DataQualityReport::default()
    };
    let mut clean: Vec<Bar> = Vec::with_capacity(bars.len());

    for bar in bars {
        if !bar.close.is_finite() || bar.close <= 0.0 || bar.volume < 0.0 {
            report.invalid += 1;
            continue;
        }
        match clean.last() {
            Some(prev) if bar.timestamp == prev.timestamp => {
                report.duplicates += 1;
            }
            Some(prev) if bar.timestamp < prev.timestamp => {
                report.out_of_order += 1;
            }
            _ => clean.push(bar),
        }
    }

    (clean, report)
}

/// One step of the unified timeline: every bar that is fresh at this
/// timestamp, at most one per symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTick {
    pub timestamp: i64,
    pub bars: Vec<Bar>,
}

/// Merges per-symbol series onto the sorted union of their timestamps.
/// A symbol without a bar at some union timestamp simply contributes
/// nothing at that tick; its last known price carries forward downstream.
pub fn merge_timelines(series: Vec<Vec<Bar>>) -> Vec<AlignedTick> {
    let mut by_timestamp: BTreeMap<i64, Vec<Bar>> = BTreeMap::new();
    for bars in series {
        for bar in bars {
            by_timestamp.entry(bar.timestamp).or_default().push(bar);
        }
    }
    by_timestamp
        .into_iter()
        .map(|(timestamp, bars)| AlignedTick { timestamp, bars })
        .collect()
}

/// The view a strategy (and the fill loop) gets at one tick: the bars fresh
/// at this timestamp plus the last known bar per symbol. Contains only data
/// available as of this bar's close; nothing from later ticks ever leaks in.
#[derive(Debug)]
pub struct SnapshotSet<'a> {
    pub timestamp: i64,
    fresh: &'a HashMap<String, Bar>,
    latest: &'a HashMap<String, Bar>,
}

impl<'a> SnapshotSet<'a> {
    pub fn new(
        timestamp: i64,
        fresh: &'a HashMap<String, Bar>,
        latest: &'a HashMap<String, Bar>,
    ) -> Self {
        Self {
            timestamp,
            fresh,
            latest,
        }
    }

    /// The bar for `symbol` at exactly this timestamp, if it produced one.
    pub fn fresh(&self, symbol: &str) -> Option<&Bar> {
        self.fresh.get(symbol)
    }

    /// The most recent bar for `symbol` at or before this timestamp.
    pub fn latest(&self, symbol: &str) -> Option<&Bar> {
        self.latest.get(symbol)
    }

    pub fn fresh_symbols(&self) -> impl Iterator<Item = &str> {
        self.fresh.keys().map(String::as_str)
    }
}
