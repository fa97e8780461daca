//! Two-pass date-axis construction and positional alignment.
//!
//! Adapters never grow region series incrementally. They record raw
//! observations into an [`AxisBuilder`]; once a feed is fully read, the
//! builder derives the canonical axis and allocates every region series at
//! exactly the axis length, filling observations by date index. Positions
//! with no report stay explicit zeros, so downstream summation is
//! unconditional and the alignment invariant holds by construction.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use epitrack_core::models::Metric;

// ── RawDataset ────────────────────────────────────────────────────────────────

/// Output of one format adapter: the canonical date axis plus the per-metric
/// region series aligned to it.
#[derive(Debug, Default)]
pub struct RawDataset {
    /// Ordered, duplicate-free calendar days, ascending.
    pub axis: Vec<NaiveDate>,
    /// `metric → region → counts`, every series of axis length.
    pub metrics: HashMap<Metric, HashMap<String, Vec<u64>>>,
}

// ── AxisBuilder ───────────────────────────────────────────────────────────────

/// One recorded data point, kept until the full axis is known.
#[derive(Debug)]
struct Observation {
    metric: Metric,
    region: String,
    date: NaiveDate,
    count: u64,
}

/// Collects dates and observations during parsing (pass one), then aligns
/// everything onto the final axis (pass two, [`AxisBuilder::build`]).
#[derive(Debug, Default)]
pub struct AxisBuilder {
    dates: BTreeSet<NaiveDate>,
    observations: Vec<Observation>,
}

impl AxisBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note a calendar day even when no observation exists for it.
    ///
    /// Wide feeds declare the whole axis in their header row; this keeps
    /// header days on the axis even if every region cell is blank.
    pub fn insert_date(&mut self, date: NaiveDate) {
        self.dates.insert(date);
    }

    /// Record one count for `(metric, region, date)`.
    ///
    /// Multiple records for the same key accumulate: wide feeds report one
    /// row per province that all sum into the same region.
    pub fn record(&mut self, metric: Metric, region: &str, date: NaiveDate, count: u64) {
        self.dates.insert(date);
        self.observations.push(Observation {
            metric,
            region: region.to_string(),
            date,
            count,
        });
    }

    /// Pass two: derive the axis and fill fixed-length series by date index.
    pub fn build(self) -> RawDataset {
        let axis: Vec<NaiveDate> = self.dates.into_iter().collect();
        let index: HashMap<NaiveDate, usize> =
            axis.iter().enumerate().map(|(i, &d)| (d, i)).collect();

        let mut metrics: HashMap<Metric, HashMap<String, Vec<u64>>> = HashMap::new();
        for obs in self.observations {
            let series = metrics
                .entry(obs.metric)
                .or_default()
                .entry(obs.region)
                .or_insert_with(|| vec![0; axis.len()]);
            // The date is guaranteed present: record() inserted it.
            if let Some(&i) = index.get(&obs.date) {
                series[i] += obs.count;
            }
        }

        RawDataset { axis, metrics }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
