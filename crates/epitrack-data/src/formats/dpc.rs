//! Adapter for the long-format Italian civil-protection regional bulletin.
//!
//! One row per region per day, named columns. This is the richest feed: it
//! publishes active and intensive-care counts directly, so neither is
//! derived downstream.

use std::fs::File;
use std::path::{Path, PathBuf};

use epitrack_core::models::{FieldValue, Metric};
use epitrack_core::{Result, TrackError};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::axis::{AxisBuilder, RawDataset};

/// Bulletin file, relative to the checkout root.
const REGIONS_FILE: &[&str] = &["dati-regioni", "dpc-covid19-ita-regioni.csv"];

/// The columns the pipeline consumes; the feed carries many more, which the
/// deserializer ignores. Numeric columns stay raw strings so that absent and
/// malformed cells can be told apart.
#[derive(Debug, Deserialize)]
struct BulletinRow {
    data: String,
    denominazione_regione: String,
    #[serde(default)]
    terapia_intensiva: Option<String>,
    #[serde(default)]
    totale_positivi: Option<String>,
    #[serde(default)]
    dimessi_guariti: Option<String>,
    #[serde(default)]
    deceduti: Option<String>,
    #[serde(default)]
    totale_casi: Option<String>,
}

pub fn parse(root: &Path) -> Result<RawDataset> {
    let path = bulletin_path(root);
    let file = File::open(&path).map_err(|source| TrackError::FileRead {
        path: path.clone(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(file);
    let mut builder = AxisBuilder::new();

    let mut rows = 0u64;
    let mut malformed = 0u64;
    for result in reader.deserialize() {
        let row: BulletinRow = result?;
        let date = super::calendar_date(&row.data)?;
        let region = row.denominazione_regione.trim().to_string();
        if region.is_empty() {
            warn!(file = %path.display(), "row without a region name skipped");
            continue;
        }

        let cells = [
            (Metric::Confirmed, row.totale_casi.as_deref()),
            (Metric::Recovered, row.dimessi_guariti.as_deref()),
            (Metric::Deaths, row.deceduti.as_deref()),
            (Metric::Active, row.totale_positivi.as_deref()),
            (Metric::Intensive, row.terapia_intensiva.as_deref()),
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

    debug!(file = %path.display(), rows, malformed, "parsed regional bulletin");
    Ok(builder.build())
}

fn bulletin_path(root: &Path) -> PathBuf {
    REGIONS_FILE
        .iter()
        .fold(root.to_path_buf(), |path, segment| path.join(segment))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;
    use tempfile::TempDir;

    const HEADER: &str = "data,stato,codice_regione,denominazione_regione,lat,long,\
                          ricoverati_con_sintomi,terapia_intensiva,totale_ospedalizzati,\
                          isolamento_domiciliare,totale_positivi,nuovi_positivi,\
                          dimessi_guariti,deceduti,totale_casi,tamponi";

    fn write_bulletin(root: &Path, rows: &[&str]) {
        let dir = root.join("dati-regioni");
        std::fs::create_dir_all(&dir).unwrap();
        let mut file = std::fs::File::create(dir.join("dpc-covid19-ita-regioni.csv")).unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 3, d).unwrap()
    }

    #[test]
    fn test_parse_reads_all_five_metrics() {
        let tmp = TempDir::new().unwrap();
        write_bulletin(
            tmp.path(),
            &[
                "2020-03-01T18:00:00,ITA,03,Lombardia,45.4,9.1,100,40,140,800,940,0,73,38,1051,5723",
                "2020-03-02T18:00:00,ITA,03,Lombardia,45.4,9.1,120,55,175,900,1075,0,139,55,1269,7925",
            ],
        );

        let dataset = parse(tmp.path()).unwrap();
        assert_eq!(dataset.axis, vec![day(1), day(2)]);
        assert_eq!(dataset.metrics[&Metric::Confirmed]["Lombardia"], vec![1051, 1269]);
        assert_eq!(dataset.metrics[&Metric::Recovered]["Lombardia"], vec![73, 139]);
        assert_eq!(dataset.metrics[&Metric::Deaths]["Lombardia"], vec![38, 55]);
        assert_eq!(dataset.metrics[&Metric::Active]["Lombardia"], vec![940, 1075]);
        assert_eq!(dataset.metrics[&Metric::Intensive]["Lombardia"], vec![40, 55]);
    }

    #[test]
    fn test_parse_truncates_timestamps_and_deduplicates_dates() {
        let tmp = TempDir::new().unwrap();
        write_bulletin(
            tmp.path(),
            &[
                "2020-03-01T18:00:00,ITA,03,Lombardia,45.4,9.1,0,0,0,0,10,0,0,0,10,0",
                "2020-03-01T18:00:00,ITA,05,Veneto,45.4,11.9,0,0,0,0,5,0,0,0,5,0",
            ],
        );

        let dataset = parse(tmp.path()).unwrap();
        // Both rows carry the same day; the axis holds it once.
        assert_eq!(dataset.axis, vec![day(1)]);
        assert_eq!(dataset.metrics[&Metric::Confirmed].len(), 2);
    }

    #[test]
    fn test_parse_late_region_is_zero_padded() {
        let tmp = TempDir::new().unwrap();
        write_bulletin(
            tmp.path(),
            &[
                "2020-03-01T18:00:00,ITA,03,Lombardia,45.4,9.1,0,0,0,0,10,0,0,0,10,0",
                "2020-03-02T18:00:00,ITA,03,Lombardia,45.4,9.1,0,0,0,0,12,0,0,0,12,0",
                "2020-03-02T18:00:00,ITA,05,Veneto,45.4,11.9,0,0,0,0,5,0,0,0,5,0",
            ],
        );

        let dataset = parse(tmp.path()).unwrap();
        assert_eq!(dataset.metrics[&Metric::Confirmed]["Veneto"], vec![0, 5]);
    }

    #[test]
    fn test_parse_malformed_cell_is_zero() {
        let tmp = TempDir::new().unwrap();
        write_bulletin(
            tmp.path(),
            &["2020-03-01T18:00:00,ITA,03,Lombardia,45.4,9.1,0,n/a,0,0,10,0,0,0,10,0"],
        );

        let dataset = parse(tmp.path()).unwrap();
        assert_eq!(dataset.metrics[&Metric::Intensive]["Lombardia"], vec![0]);
        assert_eq!(dataset.metrics[&Metric::Confirmed]["Lombardia"], vec![10]);
    }

    #[test]
    fn test_parse_missing_file_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let err = parse(tmp.path()).unwrap_err();
        assert!(matches!(err, TrackError::FileRead { .. }));
    }

    #[test]
    fn test_parse_bad_date_is_fatal() {
        let tmp = TempDir::new().unwrap();
        write_bulletin(
            tmp.path(),
            &["soon,ITA,03,Lombardia,45.4,9.1,0,0,0,0,10,0,0,0,10,0"],
        );

        let err = parse(tmp.path()).unwrap_err();
        assert!(matches!(err, TrackError::DateParse(_)));
    }
}
