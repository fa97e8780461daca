//! Adapter for the wide time-series-per-metric CSV layout.
//!
//! One file per metric, one row per province/state, one column per date.
//! The date axis comes from the header row; province rows are summed into
//! their country/region entry.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use epitrack_core::models::{FieldValue, Metric};
use epitrack_core::{Result, TrackError};
use tracing::{debug, warn};

use crate::axis::{AxisBuilder, RawDataset};

/// Directory holding the time-series files, relative to the checkout root.
const TIME_SERIES_DIR: &[&str] = &["csse_covid_19_data", "csse_covid_19_time_series"];

/// One wide CSV per cumulative metric.
const FILES: [(Metric, &str); 3] = [
    (Metric::Confirmed, "time_series_19-covid-Confirmed.csv"),
    (Metric::Recovered, "time_series_19-covid-Recovered.csv"),
    (Metric::Deaths, "time_series_19-covid-Deaths.csv"),
];

/// Column layout: province, region, latitude, longitude, then one column per
/// date.
const REGION_COLUMN: usize = 1;
const FIRST_DATE_COLUMN: usize = 4;

pub fn parse(root: &Path) -> Result<RawDataset> {
    let mut builder = AxisBuilder::new();
    for (metric, file_name) in FILES {
        let path = time_series_path(root).join(file_name);
        read_metric_file(&path, metric, &mut builder)?;
    }
    Ok(builder.build())
}

fn time_series_path(root: &Path) -> PathBuf {
    TIME_SERIES_DIR
        .iter()
        .fold(root.to_path_buf(), |path, segment| path.join(segment))
}

fn read_metric_file(path: &Path, metric: Metric, builder: &mut AxisBuilder) -> Result<()> {
    let file = File::open(path).map_err(|source| TrackError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(file);
    let mut records = reader.records();

    let header = match records.next() {
        Some(record) => record?,
        None => {
            return Err(TrackError::Config(format!(
                "{}: missing header row",
                path.display()
            )))
        }
    };

    // Header dates use month/day/2-digit-year.
    let mut dates = Vec::new();
    for cell in header.iter().skip(FIRST_DATE_COLUMN) {
        let date = NaiveDate::parse_from_str(cell.trim(), "%m/%d/%y")
            .map_err(|_| TrackError::DateParse(cell.to_string()))?;
        builder.insert_date(date);
        dates.push(date);
    }

    let mut rows = 0u64;
    let mut malformed = 0u64;
    for record in records {
        let record = record?;
        let region = record.get(REGION_COLUMN).unwrap_or("").trim().to_string();
        if region.is_empty() {
            warn!(file = %path.display(), "row without a region name skipped");
            continue;
        }
        for (i, &date) in dates.iter().enumerate() {
            let value = FieldValue::parse(record.get(FIRST_DATE_COLUMN + i));
            if value.is_malformed() {
                malformed += 1;
                warn!(
                    file = %path.display(),
                    region = %region,
                    "malformed numeric cell treated as zero"
                );
            }
            builder.record(metric, &region, date, value.count());
        }
        rows += 1;
    }

    debug!(
        file = %path.display(),
        metric = %metric,
        rows,
        malformed,
        "parsed wide time-series file"
    );
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
