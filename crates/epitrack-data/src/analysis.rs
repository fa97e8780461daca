//! Per-figure computation pipeline.
//!
//! Runs the per-figure half of the pipeline against a loaded repository:
//! aggregate the region set, derive the secondary metrics, and fit both
//! projection models. The result carries everything a renderer or the CLI
//! needs for one figure; nothing in it aliases the repository.

use std::collections::HashMap;

use chrono::NaiveDate;
use epitrack_core::derive;
use epitrack_core::fit::{ExponentialFit, FitError, LogisticFit, LogisticFitter};
use epitrack_core::models::{FigureOptions, Metric};
use tracing::debug;

use crate::aggregator::RegionAggregator;
use crate::repository::SeriesRepository;

/// Outcome of one fit attempt; an `Err` marks the projection unavailable
/// without failing the figure.
pub type FitOutcome<T> = std::result::Result<T, FitError>;

// ── FigureSummary ─────────────────────────────────────────────────────────────

/// Everything computed for one figure.
#[derive(Debug)]
pub struct FigureSummary {
    /// Region set that was aggregated.
    pub regions: Vec<String>,
    /// Copy of the dataset's date axis.
    pub axis: Vec<NaiveDate>,
    pub confirmed: Vec<u64>,
    pub recovered: Vec<u64>,
    pub deaths: Vec<u64>,
    /// Feed-supplied where available, otherwise confirmed − recovered − deaths.
    pub active: Vec<i64>,
    /// Only feeds that publish intensive-care occupancy.
    pub intensive: Option<Vec<u64>>,
    /// First difference of confirmed; position 0 is defined as zero.
    pub new_daily: Vec<i64>,
    /// Day-over-day relative change per metric; `None` where undefined.
    pub deltas: HashMap<Metric, Option<f64>>,
    /// Short-horizon log-linear fit per metric.
    pub exponential: HashMap<Metric, FitOutcome<ExponentialFit>>,
    /// Long-horizon joint sigmoid fit.
    pub logistic: FitOutcome<LogisticFit>,
    /// Axis index of the active-cases maximum.
    pub peak_active: Option<usize>,
    /// Axis index of the new-daily maximum.
    pub peak_new_daily: Option<usize>,
    /// Non-fatal notes accumulated along the pipeline.
    pub warnings: Vec<String>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Compute one figure over `regions` (`None` = all known regions).
pub fn analyze_figure(
    repository: &SeriesRepository,
    regions: Option<&[String]>,
    options: &FigureOptions,
) -> FigureSummary {
    // ── Step 1: Aggregate the region set ──────────────────────────────────────
    let aggregated = RegionAggregator::aggregate(repository, regions);
    let axis = repository.axis().to_vec();
    let len = axis.len();
    let take = |metric: Metric| -> Vec<u64> {
        aggregated
            .metrics
            .get(&metric)
            .cloned()
            .unwrap_or_else(|| vec![0; len])
    };
    let confirmed = take(Metric::Confirmed);
    let recovered = take(Metric::Recovered);
    let deaths = take(Metric::Deaths);

    // ── Step 2: Derived series ────────────────────────────────────────────────
    let active: Vec<i64> = match aggregated.metrics.get(&Metric::Active) {
        Some(series) => series.iter().map(|&v| v as i64).collect(),
        None => derive::active_series(&confirmed, &recovered, &deaths),
    };
    let intensive = aggregated.metrics.get(&Metric::Intensive).cloned();
    let new_daily = derive::new_daily_series(&confirmed);

    // ── Step 3: Day-over-day deltas and exponential fits ──────────────────────
    let confirmed_f = to_f64_u(&confirmed);
    let recovered_f = to_f64_u(&recovered);
    let deaths_f = to_f64_u(&deaths);
    let active_f = to_f64_i(&active);

    let mut curves: Vec<(Metric, Vec<f64>)> = vec![
        (Metric::Confirmed, confirmed_f.clone()),
        (Metric::Recovered, recovered_f.clone()),
        (Metric::Deaths, deaths_f.clone()),
        (Metric::Active, active_f),
    ];
    if let Some(series) = &intensive {
        curves.push((Metric::Intensive, to_f64_u(series)));
    }

    let mut deltas = HashMap::new();
    let mut exponential = HashMap::new();
    for (metric, values) in &curves {
        deltas.insert(*metric, derive::day_over_day_delta(values));
        exponential.insert(*metric, ExponentialFit::fit(values, options.growth_window));
    }

    // ── Step 4: Logistic joint fit ────────────────────────────────────────────
    let days: Vec<f64> = (0..len).map(|i| i as f64 - (len as f64 - 1.0)).collect();
    let fitter = LogisticFitter {
        future_days: options.future_days as f64,
        ..LogisticFitter::default()
    };
    let logistic = fitter.fit(&days, &confirmed_f, &deaths_f, &recovered_f);

    // ── Step 5: Peaks ─────────────────────────────────────────────────────────
    let peak_active = argmax(&active);
    let peak_new_daily = argmax(&new_daily);

    debug!(
        regions = aggregated.regions.len(),
        days = len,
        logistic_ok = logistic.is_ok(),
        "figure analysed"
    );

    FigureSummary {
        regions: aggregated.regions,
        axis,
        confirmed,
        recovered,
        deaths,
        active,
        intensive,
        new_daily,
        deltas,
        exponential,
        logistic,
        peak_active,
        peak_new_daily,
        warnings: aggregated.warnings,
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn to_f64_u(values: &[u64]) -> Vec<f64> {
    values.iter().map(|&v| v as f64).collect()
}

fn to_f64_i(values: &[i64]) -> Vec<f64> {
    values.iter().map(|&v| v as f64).collect()
}

/// Index of the first maximum, `None` for an empty series.
fn argmax(values: &[i64]) -> Option<usize> {
    let mut best: Option<(usize, i64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, max)) if v <= max => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::AxisBuilder;
    use epitrack_core::models::DataFormat;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, 21 + d).unwrap()
    }

    fn fixture_repository() -> SeriesRepository {
        let mut builder = AxisBuilder::new();
        let series = [
            (Metric::Confirmed, "region1", [1u64, 2, 4, 8]),
            (Metric::Confirmed, "region2", [0, 1, 1, 2]),
            (Metric::Recovered, "region1", [0, 0, 1, 2]),
            (Metric::Recovered, "region2", [0, 0, 0, 1]),
            (Metric::Deaths, "region1", [0, 0, 0, 1]),
            (Metric::Deaths, "region2", [0, 0, 0, 0]),
        ];
        for (metric, region, values) in series {
            for (i, value) in values.into_iter().enumerate() {
                builder.record(metric, region, day(1 + i as u32), value);
            }
        }
        SeriesRepository::from_raw(DataFormat::Jhu, builder.build())
    }

    #[test]
    fn test_end_to_end_two_region_figure() {
        let repository = fixture_repository();
        let summary = analyze_figure(&repository, None, &FigureOptions::default());

        assert_eq!(summary.confirmed, vec![1, 3, 5, 10]);
        assert_eq!(summary.active, vec![1, 3, 4, 6]);
        assert_eq!(summary.new_daily, vec![0, 2, 2, 5]);
        assert_eq!(summary.axis.len(), 4);
        assert!(summary.intensive.is_none());
    }

    #[test]
    fn test_confirmed_delta_and_exponential_fit() {
        let repository = fixture_repository();
        let summary = analyze_figure(&repository, None, &FigureOptions::default());

        // confirmed: [1, 3, 5, 10] → (10 - 5) / 5 = 1.0
        let delta = summary.deltas[&Metric::Confirmed].unwrap();
        assert!((delta - 1.0).abs() < 1e-12);

        let fit = summary.exponential[&Metric::Confirmed]
            .as_ref()
            .expect("window is strictly positive");
        assert!(fit.growth_rate > 0.0);
        assert!(fit.doubling_time().is_some());
    }

    #[test]
    fn test_exponential_unavailable_without_failing_figure() {
        // deaths: [0, 0, 0, 1] contains zeros; the exponential fit for
        // deaths is marked unavailable while the figure still succeeds.
        let repository = fixture_repository();
        let summary = analyze_figure(&repository, None, &FigureOptions::default());

        assert!(matches!(
            summary.exponential[&Metric::Deaths],
            Err(FitError::NonPositiveWindow(_))
        ));
        assert_eq!(summary.confirmed, vec![1, 3, 5, 10]);
    }

    #[test]
    fn test_delta_undefined_on_zero_prior() {
        // deaths: [0, 0, 0, 1] → prior day is zero → undefined.
        let repository = fixture_repository();
        let summary = analyze_figure(&repository, None, &FigureOptions::default());
        assert!(summary.deltas[&Metric::Deaths].is_none());
    }

    #[test]
    fn test_absent_region_yields_warning_not_panic() {
        let mut builder = AxisBuilder::new();
        for (i, value) in [3u64, 6, 12, 24].into_iter().enumerate() {
            builder.record(Metric::Confirmed, "region1", day(1 + i as u32), value);
        }
        builder.record(Metric::Deaths, "other", day(1), 0);
        let repository = SeriesRepository::from_raw(DataFormat::Jhu, builder.build());

        let set = vec!["region1".to_string()];
        let summary = analyze_figure(&repository, Some(&set), &FigureOptions::default());

        assert_eq!(summary.deaths, vec![0, 0, 0, 0]);
        assert_eq!(summary.warnings.len(), 1);
        assert!(summary.warnings[0].contains("deaths"));
    }

    #[test]
    fn test_peaks_track_maxima() {
        let repository = fixture_repository();
        let summary = analyze_figure(&repository, None, &FigureOptions::default());
        // active: [1, 3, 4, 6] peaks at the end; new_daily: [0, 2, 2, 5] too.
        assert_eq!(summary.peak_active, Some(3));
        assert_eq!(summary.peak_new_daily, Some(3));
    }

    #[test]
    fn test_feed_supplied_active_is_used_verbatim() {
        let mut builder = AxisBuilder::new();
        for (i, value) in [10u64, 20, 30].into_iter().enumerate() {
            builder.record(Metric::Confirmed, "Lombardia", day(1 + i as u32), value);
            // Published active counts that deliberately disagree with
            // confirmed − recovered − deaths.
            builder.record(Metric::Active, "Lombardia", day(1 + i as u32), value / 2);
        }
        let repository = SeriesRepository::from_raw(DataFormat::Dpc, builder.build());

        let summary = analyze_figure(&repository, None, &FigureOptions::default());
        assert_eq!(summary.active, vec![5, 10, 15]);
    }

    #[test]
    fn test_empty_axis_marks_fits_unavailable() {
        let repository = SeriesRepository::from_raw(DataFormat::Jhu, AxisBuilder::new().build());
        let summary = analyze_figure(&repository, None, &FigureOptions::default());

        assert!(summary.confirmed.is_empty());
        assert!(matches!(summary.logistic, Err(FitError::WindowTooShort(0))));
        assert!(summary.peak_active.is_none());
    }

    #[test]
    fn test_figure_from_files_end_to_end() {
        use epitrack_core::models::LoadConfig;
        use std::io::Write;

        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp
            .path()
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

        let config = LoadConfig::new(tmp.path(), DataFormat::Jhu);
        let repository = SeriesRepository::load(&config).unwrap();
        let set = vec!["region1".to_string(), "region2".to_string()];
        let summary = analyze_figure(&repository, Some(&set), &FigureOptions::default());

        assert_eq!(summary.confirmed, vec![1, 3, 5, 10]);
        assert_eq!(summary.active, vec![1, 3, 4, 6]);
        assert_eq!(summary.new_daily, vec![0, 2, 2, 5]);
        assert!(summary.warnings.is_empty());
    }

    // ── argmax ───────────────────────────────────────────────────────────────

    #[test]
    fn test_argmax_first_of_ties() {
        assert_eq!(argmax(&[1, 5, 5, 2]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
