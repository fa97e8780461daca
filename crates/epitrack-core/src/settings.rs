use clap::Parser;
use std::path::PathBuf;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Case-count trend analysis for epidemiological data feeds
#[derive(Parser, Debug, Clone)]
#[command(
    name = "epitrack",
    about = "Case-count trend analysis for epidemiological data feeds",
    version
)]
pub struct Settings {
    /// Root directory of the raw-data checkout
    #[arg(long, default_value = "data")]
    pub data_path: PathBuf,

    /// Publisher format of the dataset
    #[arg(long, default_value = "jhu", value_parser = ["jhu", "dpc", "ofr"])]
    pub format: String,

    /// JSON file mapping figure names to region lists (null = all regions)
    #[arg(long)]
    pub figures: Option<PathBuf>,

    /// Regions summed into a single ad-hoc figure (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub regions: Vec<String>,

    /// Days projected into the future
    #[arg(long, default_value = "7", value_parser = clap::value_parser!(i64).range(1..=60))]
    pub future_days: i64,

    /// Points in the exponential fit window
    #[arg(long, default_value = "4", value_parser = clap::value_parser!(u32).range(2..=14))]
    pub growth_window: u32,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── Tests ──────────────────────────────────────────────────────────────────────
