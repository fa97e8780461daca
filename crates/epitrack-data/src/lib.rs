//! Data ingestion and aggregation layer for epitrack.
//!
//! Responsible for parsing the three raw feed formats into an aligned
//! in-memory series repository, applying feed-specific corrections, and
//! running the per-figure aggregation and projection pipeline.

pub mod aggregator;
pub mod analysis;
pub mod axis;
pub mod correction;
pub mod formats;
pub mod repository;

pub use epitrack_core as core;
