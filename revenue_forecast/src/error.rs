//! Error types for the revenue_forecast crate

use std::path::PathBuf;

use revenue_math::MathError;
use thiserror::Error;

/// Reasons a model artifact could not be turned into a usable model
#[derive(Debug, Error)]
pub enum ModelLoadError {
    /// No artifact at the configured path
    #[error("Model artifact not found: {0}")]
    NotFound(PathBuf),

    /// The artifact exists but could not be read
    #[error("Failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The artifact could not be decoded in the requested mode
    #[error("Failed to decode model artifact: {0}")]
    Decode(String),

    /// The artifact declares a format version this decoder does not read
    #[error("Unsupported artifact format version {0}")]
    UnsupportedVersion(u32),

    /// The artifact decoded but exposes no prediction capability
    #[error("Artifact of type '{0}' has no predict capability")]
    MissingPredict(String),
}

/// Custom error types for the revenue_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A model artifact could not be loaded
    #[error("Model load error: {0}")]
    ModelLoad(#[from] ModelLoadError),

    /// A loaded model failed while predicting
    #[error("Prediction error: {0}")]
    Prediction(String),

    /// The scenario simulator has no historical observation to start from
    #[error("No baseline data available")]
    NoBaselineData,

    /// The CSV comparison mode has no scenario dataset
    #[error("No scenario data available")]
    NoScenarioData,

    /// Too few component streams to compose total revenue
    #[error("Insufficient components for {month}: {found} valid, {required} required")]
    InsufficientComponents {
        month: chrono::NaiveDate,
        found: usize,
        required: usize,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    Data(String),

    /// Error from CSV parsing
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be converted to a transport-safe form
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error from numeric helpers
    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<toml::de::Error> for ForecastError {
    fn from(err: toml::de::Error) -> Self {
        ForecastError::Config(err.to_string())
    }
}
