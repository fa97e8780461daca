//! Region-set aggregation over the repository's aligned series.
//!
//! Summation is purely positional: every series already matches the date
//! axis, so a figure's combined series is the elementwise sum over its
//! region set, metric by metric.

use std::collections::HashMap;

use epitrack_core::models::Metric;
use tracing::warn;

use crate::repository::SeriesRepository;

// ── AggregatedSeries ──────────────────────────────────────────────────────────

/// Combined series for one figure's region set.
///
/// Fresh storage per request; never aliases the repository.
#[derive(Debug, Clone)]
pub struct AggregatedSeries {
    /// The region set that was summed, in request (or sorted-union) order.
    pub regions: Vec<String>,
    /// `metric → summed series`, one entry per metric the feed carries.
    pub metrics: HashMap<Metric, Vec<u64>>,
    /// Non-fatal notes, e.g. a requested region missing from one metric.
    pub warnings: Vec<String>,
}

impl AggregatedSeries {
    pub fn metric(&self, metric: Metric) -> Option<&[u64]> {
        self.metrics.get(&metric).map(|series| series.as_slice())
    }
}

// ── RegionAggregator ──────────────────────────────────────────────────────────

/// Stateless summation over a caller-supplied region set.
pub struct RegionAggregator;

impl RegionAggregator {
    /// Sum every metric's series over `regions`.
    ///
    /// `None` selects the union of all region names known to any metric (the
    /// whole-territory figure). A named region absent from one metric's
    /// mapping contributes zero there and surfaces a warning; the figure
    /// still succeeds. Union aggregation skips absent regions silently, the
    /// union is expected to be ragged across metrics.
    pub fn aggregate(
        repository: &SeriesRepository,
        regions: Option<&[String]>,
    ) -> AggregatedSeries {
        let explicit = regions.is_some();
        let resolved: Vec<String> = match regions {
            Some(set) => set.to_vec(),
            None => repository.regions().into_iter().collect(),
        };
        let axis_len = repository.axis().len();

        let mut metrics = HashMap::new();
        let mut warnings = Vec::new();
        for metric in Metric::ALL {
            let Some(by_region) = repository.metric(metric) else {
                continue;
            };
            let mut combined = vec![0u64; axis_len];
            for region in &resolved {
                match by_region.get(region) {
                    Some(series) => {
                        for (total, &value) in combined.iter_mut().zip(series.iter()) {
                            *total += value;
                        }
                    }
                    None if explicit => {
                        warn!(
                            region = %region,
                            metric = %metric,
                            "requested region missing from metric; contributing zeros"
                        );
                        warnings.push(format!("region '{region}' has no {metric} series"));
                    }
                    None => {}
                }
            }
            metrics.insert(metric, combined);
        }

        AggregatedSeries {
            regions: resolved,
            metrics,
            warnings,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
