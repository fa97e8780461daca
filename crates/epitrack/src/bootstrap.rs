use std::collections::BTreeMap;
use std::path::Path;

use epitrack_core::{Result, TrackError};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a CLI log-level name to a `tracing` filter directive.
pub fn normalise_level(log_level: &str) -> &'static str {
    match log_level.to_uppercase().as_str() {
        "DEBUG" | "CRITICAL" => "debug",
        "INFO" => "info",
        "WARNING" => "warn",
        "ERROR" => "error",
        _ => "info",
    }
}

/// Initialise the global `tracing` subscriber.
///
/// `debug` overrides the configured level. Output goes to stderr so the
/// figure tables on stdout stay machine-readable.
pub fn setup_logging(log_level: &str, debug: bool) -> anyhow::Result<()> {
    let directive = if debug { "debug" } else { normalise_level(log_level) };
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .init();

    Ok(())
}

// ── Figure map ─────────────────────────────────────────────────────────────────

/// Figure name → region set; `None` selects every known region.
pub type FigureMap = BTreeMap<String, Option<Vec<String>>>;

/// Resolve the figure map for this run.
///
/// Priority: an explicit JSON file (`{"Italy": ["Italy"], "World": null}`),
/// then an ad-hoc `--regions` list as a single figure, then the default
/// whole-territory figure.
pub fn load_figures(path: Option<&Path>, regions: &[String]) -> Result<FigureMap> {
    if let Some(path) = path {
        let content = std::fs::read_to_string(path).map_err(|source| TrackError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let figures: FigureMap = serde_json::from_str(&content)?;
        if figures.is_empty() {
            return Err(TrackError::Config(format!(
                "{}: figure map is empty",
                path.display()
            )));
        }
        return Ok(figures);
    }

    let mut figures = FigureMap::new();
    if regions.is_empty() {
        figures.insert("World".to_string(), None);
    } else {
        figures.insert(regions.join(" + "), Some(regions.to_vec()));
    }
    Ok(figures)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
