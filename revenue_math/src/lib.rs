//! # Revenue Math
//!
//! Numeric helpers shared by the revenue forecasting crates.
//! This crate provides descriptive statistics over revenue series and the
//! growth calculations used by the forecast and scenario engines.

use thiserror::Error;

pub mod growth;
pub mod statistics;

/// Errors that can occur in revenue calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for revenue math operations
pub type Result<T> = std::result::Result<T, MathError>;

pub use growth::{compound_growth, growth_percentage, pct_change, pct_changes};
pub use statistics::{mean, population_std_dev, sample_std_dev, SeriesStats};
