//! Core types for the part wear reports.
//!
//! Holds the error taxonomy, the catalog/ledger/report data model, the
//! capacity and ratio rules shared by both report branches, number formatting
//! and the command-line settings.

pub mod calculations;
pub mod data_processors;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{Result, WearError};
