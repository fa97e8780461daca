use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TrackError;

// ── Metric ────────────────────────────────────────────────────────────────────

/// A tracked case-count category.
///
/// `Confirmed`, `Recovered` and `Deaths` are cumulative counters present in
/// every feed. `Active` and `Intensive` are only published by the richer
/// feeds; `Active` is otherwise derived downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Confirmed,
    Recovered,
    Deaths,
    Active,
    Intensive,
}

impl Metric {
    /// Every metric the pipeline knows about, in display order.
    pub const ALL: [Metric; 5] = [
        Metric::Confirmed,
        Metric::Recovered,
        Metric::Deaths,
        Metric::Active,
        Metric::Intensive,
    ];

    /// The cumulative counters subject to monotonicity correction.
    pub const CUMULATIVE: [Metric; 3] = [Metric::Confirmed, Metric::Recovered, Metric::Deaths];

    /// Lowercase label used in log messages and warnings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Confirmed => "confirmed",
            Metric::Recovered => "recovered",
            Metric::Deaths => "deaths",
            Metric::Active => "active",
            Metric::Intensive => "intensive",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── DataFormat ────────────────────────────────────────────────────────────────

/// The closed set of recognised publisher schemas.
///
/// * `Jhu` – wide time-series CSV, one file per metric, one column per date.
/// * `Dpc` – long-format Italian regional bulletin, one row per region per day.
/// * `Ofr` – long-format French key-figures file, mixed reporting sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Jhu,
    Dpc,
    Ofr,
}

impl DataFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataFormat::Jhu => "jhu",
            DataFormat::Dpc => "dpc",
            DataFormat::Ofr => "ofr",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataFormat {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jhu" => Ok(DataFormat::Jhu),
            "dpc" => Ok(DataFormat::Dpc),
            "ofr" => Ok(DataFormat::Ofr),
            other => Err(TrackError::UnknownFormat(other.to_string())),
        }
    }
}

// ── Load configuration ────────────────────────────────────────────────────────

/// Connection parameters for the external sync collaborator.
///
/// The core never fetches data itself; these values are carried so that the
/// component responsible for keeping the raw checkout current can read them
/// from the same configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Upstream git URL of the raw-data repository.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_url: Option<String>,
    /// HTTPS proxy in `host:port` form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
}

/// Explicit dataset-load configuration.
///
/// Passed to the load entry point instead of being read from ambient process
/// state; everything the pipeline needs to locate and interpret one dataset.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Root directory of the raw-data checkout.
    pub root: PathBuf,
    /// Publisher schema of the files under `root`.
    pub format: DataFormat,
    /// Settings for the external sync collaborator, if any.
    pub sync: Option<SyncOptions>,
}

impl LoadConfig {
    pub fn new(root: impl Into<PathBuf>, format: DataFormat) -> Self {
        Self {
            root: root.into(),
            format,
            sync: None,
        }
    }
}

// ── Figure options ────────────────────────────────────────────────────────────

/// Per-figure computation options.
#[derive(Debug, Clone)]
pub struct FigureOptions {
    /// Day offset into the future at which logistic projections are evaluated.
    pub future_days: i64,
    /// Number of most recent points used by the exponential fit.
    pub growth_window: usize,
}

impl Default for FigureOptions {
    fn default() -> Self {
        Self {
            future_days: 7,
            growth_window: 4,
        }
    }
}

// ── FieldValue ────────────────────────────────────────────────────────────────

/// Parse outcome for a single numeric CSV cell.
///
/// Upstream feeds sporadically drop values mid-row, so both an absent and a
/// malformed cell contribute zero; the distinction is kept so that adapters
/// can log malformed cells without conflating them with legitimate blanks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    /// The cell was absent or blank.
    Missing,
    /// The cell held text that is not a number.
    Malformed,
    /// A successfully parsed count.
    Count(u64),
}

impl FieldValue {
    /// Parse an optional raw cell into a [`FieldValue`].
    ///
    /// Accepts plain integers and decimal representations (some feeds emit
    /// `"12.0"`); decimals are truncated toward zero. Negative numbers are
    /// treated as malformed, cumulative counts cannot be negative.
    pub fn parse(raw: Option<&str>) -> FieldValue {
        let Some(raw) = raw else {
            return FieldValue::Missing;
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return FieldValue::Missing;
        }
        if let Ok(n) = trimmed.parse::<u64>() {
            return FieldValue::Count(n);
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() && f >= 0.0 => FieldValue::Count(f as u64),
            _ => FieldValue::Malformed,
        }
    }

    /// The zero-substitution policy: the parsed count, or zero for anything
    /// that could not be read.
    pub fn count(self) -> u64 {
        match self {
            FieldValue::Count(n) => n,
            FieldValue::Missing | FieldValue::Malformed => 0,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, FieldValue::Malformed)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
