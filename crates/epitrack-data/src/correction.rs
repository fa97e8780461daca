//! Feed-specific data corrections applied before values are exposed.
//!
//! The only correction in use is a monotonicity clamp for cumulative
//! counters: the French key-figures feed occasionally revises totals
//! downward between publications, which would produce negative daily deltas
//! and break the log-linear fit. The other feeds do not exhibit the artifact
//! and pass through untouched.

use epitrack_core::models::{DataFormat, Metric};
use tracing::debug;

use crate::axis::RawDataset;

/// Replace every value lower than the running maximum with that maximum.
///
/// Idempotent: re-applying to an already-clamped series changes nothing.
/// Returns the number of replaced positions.
pub fn clamp_non_decreasing(series: &mut [u64]) -> usize {
    let mut running_max = 0u64;
    let mut replaced = 0usize;
    for value in series.iter_mut() {
        if *value < running_max {
            *value = running_max;
            replaced += 1;
        } else {
            running_max = *value;
        }
    }
    replaced
}

/// Whether a feed is known to regress its cumulative counters.
pub fn applies_to(format: DataFormat) -> bool {
    matches!(format, DataFormat::Ofr)
}

/// Apply the clamp to every cumulative series of a dataset, when the feed
/// needs it.
pub fn apply(dataset: &mut RawDataset, format: DataFormat) {
    if !applies_to(format) {
        return;
    }
    let mut replaced = 0usize;
    for metric in Metric::CUMULATIVE {
        if let Some(by_region) = dataset.metrics.get_mut(&metric) {
            for series in by_region.values_mut() {
                replaced += clamp_non_decreasing(series);
            }
        }
    }
    if replaced > 0 {
        debug!(format = %format, replaced, "clamped regressing cumulative values");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
