//! In-memory store of per-region metric series for one loaded dataset.
//!
//! Built once per dataset load and read-only afterwards: aggregation and
//! derivation always copy into fresh series, so repeated figure requests
//! never observe mutation.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use epitrack_core::models::{DataFormat, LoadConfig, Metric};
use epitrack_core::{Result, TrackError};
use tracing::info;

use crate::axis::RawDataset;
use crate::{correction, formats};

/// One loaded dataset: the frozen date axis and every raw metric series.
#[derive(Debug)]
pub struct SeriesRepository {
    format: DataFormat,
    axis: Vec<NaiveDate>,
    metrics: HashMap<Metric, HashMap<String, Vec<u64>>>,
}

impl SeriesRepository {
    /// Load and normalise the dataset described by `config`.
    ///
    /// Runs the per-dataset half of the pipeline: parse the raw files, apply
    /// feed-specific corrections, and fill in the computed active series for
    /// the feed that does not publish one. Fatal on a missing root, missing
    /// raw file, or unparseable structure.
    pub fn load(config: &LoadConfig) -> Result<Self> {
        if !config.root.is_dir() {
            return Err(TrackError::DataPathNotFound(config.root.clone()));
        }
        info!(
            root = %config.root.display(),
            format = %config.format,
            "loading dataset"
        );

        let mut raw = formats::parse(config)?;
        correction::apply(&mut raw, config.format);
        if config.format == DataFormat::Ofr {
            formats::ofr::append_active(&mut raw);
        }

        let repository = Self::from_raw(config.format, raw);
        info!(
            days = repository.axis.len(),
            regions = repository.regions().len(),
            metrics = repository.metrics.len(),
            "dataset loaded"
        );
        Ok(repository)
    }

    /// Freeze an already-normalised dataset. Used by `load` and by tests
    /// that build synthetic datasets without touching the filesystem.
    pub(crate) fn from_raw(format: DataFormat, raw: RawDataset) -> Self {
        #[cfg(debug_assertions)]
        for by_region in raw.metrics.values() {
            for series in by_region.values() {
                debug_assert_eq!(series.len(), raw.axis.len());
            }
        }
        Self {
            format,
            axis: raw.axis,
            metrics: raw.metrics,
        }
    }

    pub fn format(&self) -> DataFormat {
        self.format
    }

    /// The canonical date axis every series aligns to.
    pub fn axis(&self) -> &[NaiveDate] {
        &self.axis
    }

    /// Per-region series for one metric, when the feed carries it.
    pub fn metric(&self, metric: Metric) -> Option<&HashMap<String, Vec<u64>>> {
        self.metrics.get(&metric)
    }

    pub fn has_metric(&self, metric: Metric) -> bool {
        self.metrics.contains_key(&metric)
    }

    /// Union of all region names across all metrics, sorted.
    pub fn regions(&self) -> BTreeSet<String> {
        self.metrics
            .values()
            .flat_map(|by_region| by_region.keys().cloned())
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_jhu_checkout(root: &Path) {
        let dir = root
            .join("csse_covid_19_data")
            .join("csse_covid_19_time_series");
        std::fs::create_dir_all(&dir).unwrap();
        let header = "Province/State,Country/Region,Lat,Long,1/22/20,1/23/20,1/24/20,1/25/20";
        let files = [
            (
                "time_series_19-covid-Confirmed.csv",
                format!("{header}\n,region1,0,0,1,2,4,8\n,region2,0,0,0,1,1,2\n"),
            ),
            (
                "time_series_19-covid-Recovered.csv",
                format!("{header}\n,region1,0,0,0,0,1,2\n,region2,0,0,0,0,0,1\n"),
            ),
            (
                "time_series_19-covid-Deaths.csv",
                format!("{header}\n,region1,0,0,0,0,0,1\n,region2,0,0,0,0,0,0\n"),
            ),
        ];
        for (name, content) in files {
            let mut file = std::fs::File::create(dir.join(name)).unwrap();
            write!(file, "{}", content).unwrap();
        }
    }

    #[test]
    fn test_load_jhu_end_to_end() {
        let tmp = TempDir::new().unwrap();
        write_jhu_checkout(tmp.path());
        let config = LoadConfig::new(tmp.path(), DataFormat::Jhu);

        let repository = SeriesRepository::load(&config).unwrap();
        assert_eq!(repository.format(), DataFormat::Jhu);
        assert_eq!(repository.axis().len(), 4);
        assert!(repository.has_metric(Metric::Confirmed));
        assert!(!repository.has_metric(Metric::Active));
        assert_eq!(
            repository.regions().into_iter().collect::<Vec<_>>(),
            vec!["region1", "region2"]
        );
    }

    #[test]
    fn test_load_missing_root_is_fatal() {
        let config = LoadConfig::new("/does/not/exist/epitrack", DataFormat::Jhu);
        let err = SeriesRepository::load(&config).unwrap_err();
        assert!(matches!(err, TrackError::DataPathNotFound(_)));
    }

    #[test]
    fn test_load_ofr_applies_clamp_and_active() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("dist");
        std::fs::create_dir_all(&dir).unwrap();
        let mut file = std::fs::File::create(dir.join("chiffres-cles.csv")).unwrap();
        writeln!(
            file,
            "date,granularite,maille_code,maille_nom,cas_confirmes,deces,reanimation,hospitalises,gueris,depistes,source_nom,source_type"
        )
        .unwrap();
        // Confirmed regresses on day two; the clamp must hold it at 130.
        writeln!(file, "2020-03-01,pays,FRA,France,130,2,9,0,12,0,M,ministere-sante").unwrap();
        writeln!(file, "2020-03-02,pays,FRA,France,100,3,9,0,15,0,M,ministere-sante").unwrap();
        writeln!(file, "2020-03-03,pays,FRA,France,191,4,9,0,20,0,M,ministere-sante").unwrap();

        let config = LoadConfig::new(tmp.path(), DataFormat::Ofr);
        let repository = SeriesRepository::load(&config).unwrap();

        let confirmed = &repository.metric(Metric::Confirmed).unwrap()["France"];
        assert_eq!(confirmed, &vec![130, 130, 191]);
        // Active is computed from the corrected counters:
        // 130-2-12=116, 130-3-15=112, 191-4-20=167.
        let active = &repository.metric(Metric::Active).unwrap()["France"];
        assert_eq!(active, &vec![116, 112, 167]);
    }

    #[test]
    fn test_repository_alignment_invariant() {
        let tmp = TempDir::new().unwrap();
        write_jhu_checkout(tmp.path());
        let config = LoadConfig::new(tmp.path(), DataFormat::Jhu);
        let repository = SeriesRepository::load(&config).unwrap();

        for metric in Metric::ALL {
            if let Some(by_region) = repository.metric(metric) {
                for series in by_region.values() {
                    assert_eq!(series.len(), repository.axis().len());
                }
            }
        }
    }
}
