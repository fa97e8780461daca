//! Format adapters for the three publisher schemas.
//!
//! Each adapter reads one feed's raw file tree into a [`RawDataset`]
//! (canonical date axis plus per-metric region series). Dispatch is over the
//! closed [`DataFormat`] set; there is no string-tag lookup at this level.
//!
//! Error policy: a missing or unreadable raw file aborts the dataset load;
//! a malformed numeric cell contributes zero and is logged, because upstream
//! feeds are known to drop values mid-row.

pub mod dpc;
pub mod jhu;
pub mod ofr;

use chrono::NaiveDate;
use epitrack_core::models::{DataFormat, LoadConfig};
use epitrack_core::{Result, TrackError};

use crate::axis::RawDataset;

/// Parse the raw file tree under `config.root` according to its format.
pub fn parse(config: &LoadConfig) -> Result<RawDataset> {
    match config.format {
        DataFormat::Jhu => jhu::parse(&config.root),
        DataFormat::Dpc => dpc::parse(&config.root),
        DataFormat::Ofr => ofr::parse(&config.root),
    }
}

/// Truncate a feed timestamp to its bare calendar date.
///
/// Long-format feeds mix plain dates with full timestamps
/// (`2020-03-01T17:00:00`, sometimes space-separated); the time of day is
/// never meaningful on the daily axis and is discarded.
pub(crate) fn calendar_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| TrackError::DateParse(trimmed.to_string()))
}
