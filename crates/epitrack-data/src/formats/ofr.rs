//! Adapter for the long-format French key-figures feed.
//!
//! The file mixes reporting sources and administrative levels; only the rows
//! carrying national or regional figures from the health ministry are kept.
//! The feed has no active-cases column: [`append_active`] computes it per
//! region once the cumulative metrics are corrected.

use std::collections::BTreeSet;
use std::fs::File;
use std::path::{Path, PathBuf};

use epitrack_core::derive;
use epitrack_core::models::{FieldValue, Metric};
use epitrack_core::{Result, TrackError};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::axis::{AxisBuilder, RawDataset};

/// Key-figures file, relative to the checkout root.
const KEY_FIGURES_FILE: &[&str] = &["dist", "chiffres-cles.csv"];

/// Administrative levels that represent official aggregates.
const KEPT_GRANULARITIES: [&str; 2] = ["pays", "region"];

/// The reporting source whose rows are authoritative.
const OFFICIAL_SOURCE: &str = "ministere-sante";

#[derive(Debug, Deserialize)]
struct KeyFigureRow {
    date: String,
    granularite: String,
    maille_nom: String,
    #[serde(default)]
    cas_confirmes: Option<String>,
    #[serde(default)]
    deces: Option<String>,
    #[serde(default)]
    gueris: Option<String>,
    #[serde(default)]
    reanimation: Option<String>,
    #[serde(default)]
    source_type: String,
}

pub fn parse(root: &Path) -> Result<RawDataset> {
    let path = key_figures_path(root);
    let file = File::open(&path).map_err(|source| TrackError::FileRead {
        path: path.clone(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(file);
    let mut builder = AxisBuilder::new();

    let mut rows = 0u64;
    let mut skipped = 0u64;
    let mut malformed = 0u64;
    for result in reader.deserialize() {
        let row: KeyFigureRow = result?;
        if !KEPT_GRANULARITIES.contains(&row.granularite.as_str())
            || row.source_type != OFFICIAL_SOURCE
        {
            skipped += 1;
            continue;
        }
        let date = super::calendar_date(&row.date)?;
        let region = row.maille_nom.trim().to_string();
        if region.is_empty() {
            warn!(file = %path.display(), "row without a region name skipped");
            continue;
        }

        let cells = [
            (Metric::Confirmed, row.cas_confirmes.as_deref()),
            (Metric::Deaths, row.deces.as_deref()),
            (Metric::Recovered, row.gueris.as_deref()),
            (Metric::Intensive, row.reanimation.as_deref()),
        ];
        for (metric, raw) in cells {
            let value = FieldValue::parse(raw);
            if value.is_malformed() {
                malformed += 1;
                warn!(
                    file = %path.display(),
                    region = %region,
                    metric = %metric,
                    "malformed numeric cell treated as zero"
                );
            }
            builder.record(metric, &region, date, value.count());
        }
        rows += 1;
    }

    debug!(
        file = %path.display(),
        rows,
        skipped,
        malformed,
        "parsed key-figures file"
    );
    Ok(builder.build())
}

/// Compute the per-region active series `confirmed − deaths − recovered`.
///
/// Called after monotonicity correction so the computed series reflects the
/// corrected counters. Artifacts that would push a value below zero clamp to
/// zero; raw series are unsigned.
pub(crate) fn append_active(dataset: &mut RawDataset) {
    let regions: BTreeSet<String> = Metric::CUMULATIVE
        .iter()
        .filter_map(|metric| dataset.metrics.get(metric))
        .flat_map(|by_region| by_region.keys().cloned())
        .collect();
    let axis_len = dataset.axis.len();
    let zeros = vec![0u64; axis_len];

    let mut active_by_region = std::collections::HashMap::new();
    for region in regions {
        let active = derive::active_series(
            series_or(dataset, Metric::Confirmed, &region, &zeros),
            series_or(dataset, Metric::Recovered, &region, &zeros),
            series_or(dataset, Metric::Deaths, &region, &zeros),
        );
        let clamped: Vec<u64> = active.into_iter().map(|v| v.max(0) as u64).collect();
        active_by_region.insert(region, clamped);
    }
    dataset.metrics.insert(Metric::Active, active_by_region);
}

fn series_or<'a>(
    dataset: &'a RawDataset,
    metric: Metric,
    region: &str,
    zeros: &'a [u64],
) -> &'a [u64] {
    dataset
        .metrics
        .get(&metric)
        .and_then(|by_region| by_region.get(region))
        .map(|series| series.as_slice())
        .unwrap_or(zeros)
}

fn key_figures_path(root: &Path) -> PathBuf {
    KEY_FIGURES_FILE
        .iter()
        .fold(root.to_path_buf(), |path, segment| path.join(segment))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
