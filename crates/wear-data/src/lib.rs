//! Data layer for the wear report.
//!
//! Responsible for reading the characteristics and chassis tables, bucketing
//! usage readings, aggregating consumption-rate and durability statistics,
//! exporting the reports and preparing filtered summaries.

pub mod aggregator;
pub mod analysis;
pub mod bucketizer;
pub mod capacity;
pub mod export;
pub mod presenter;
pub mod reader;

pub use wear_core as core;
