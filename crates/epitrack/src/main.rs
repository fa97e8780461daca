mod bootstrap;

use anyhow::Result;
use clap::Parser;
use epitrack_core::fit::Sigmoid;
use epitrack_core::models::{DataFormat, FigureOptions, LoadConfig, Metric};
use epitrack_core::settings::Settings;
use epitrack_data::analysis::{analyze_figure, FigureSummary};
use epitrack_data::repository::SeriesRepository;

fn main() -> Result<()> {
    let settings = Settings::parse();
    bootstrap::setup_logging(&settings.log_level, settings.debug)?;

    tracing::info!("epitrack v{} starting", env!("CARGO_PKG_VERSION"));

    let format: DataFormat = settings.format.parse()?;
    let config = LoadConfig::new(settings.data_path.clone(), format);
    let repository = SeriesRepository::load(&config)?;

    let figures = bootstrap::load_figures(settings.figures.as_deref(), &settings.regions)?;
    let options = FigureOptions {
        future_days: settings.future_days,
        growth_window: settings.growth_window as usize,
    };

    for (name, regions) in &figures {
        let summary = analyze_figure(&repository, regions.as_deref(), &options);
        print_figure(name, &summary);
    }

    Ok(())
}

// ── Report printing ────────────────────────────────────────────────────────────

/// Print the projection table for one figure.
///
/// The layout mirrors the daily bulletin: observed value today with its
/// change since yesterday, the model's value and slope one day out, and the
/// fitted final total.
fn print_figure(name: &str, summary: &FigureSummary) {
    let last_day = summary
        .axis
        .last()
        .map(|day| day.to_string())
        .unwrap_or_else(|| "no data".to_string());
    println!();
    println!("{name}: {last_day}");
    for warning in &summary.warnings {
        println!(" ! {warning}");
    }

    match &summary.logistic {
        Ok(fit) => {
            println!("           |      today      |    tomorrow     | final");
            println!("-----------+-----------------+-----------------+--------");
            print_row("confirmed", &summary.confirmed, &fit.confirmed);
            print_row("deaths", &summary.deaths, &fit.deaths);
            print_row("recovered", &summary.recovered, &fit.recovered);
        }
        Err(err) => {
            println!(" logistic projection unavailable: {err}");
        }
    }

    let confirmed_doubling = summary
        .exponential
        .get(&Metric::Confirmed)
        .and_then(|outcome| outcome.as_ref().ok())
        .and_then(|fit| fit.doubling_time());
    match confirmed_doubling {
        Some(days) => println!(" confirmed doubling time: {days:.1} days"),
        None => println!(" confirmed doubling time: not computable"),
    }

    if let Some(Some(delta)) = summary.deltas.get(&Metric::Active) {
        println!(" active cases: {:+.1}%/day", delta * 100.0);
    }
}

fn print_row(label: &str, series: &[u64], curve: &Sigmoid) {
    let today = series.last().copied().unwrap_or(0);
    let prev = if series.len() >= 2 {
        series[series.len() - 2]
    } else {
        0
    };
    let change = today as i64 - prev as i64;
    println!(
        " {label:<9} | {today:>6} ({change:+6}) | {:>6} ({:+6}) | {:>6}",
        curve.value_at(1.0).round() as i64,
        curve.derivative_at(1.0).round() as i64,
        curve.asymptote.round() as i64,
    );
}
