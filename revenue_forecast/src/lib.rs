//! # Revenue Forecast
//!
//! Monthly tax revenue forecasting and tax-rate scenario simulation.
//!
//! ## Features
//!
//! - Per-stream trained model artifacts (time-series regression, gradient
//!   boosted trees, lightweight heuristics) loaded from a models directory
//! - Seeded statistical fallback patterns for any stream without a usable model
//! - Total revenue composed from its component streams
//! - Elasticity-based what-if scenarios for VAT, corporate and income tax rates
//! - Anomaly reporting and trend analysis over historical data
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use revenue_forecast::{DataLoader, EngineConfig, ForecastEngine, ScenarioSimulator};
//!
//! let config = EngineConfig::load("revenue.toml")?;
//! let engine = ForecastEngine::from_config(&config)?;
//!
//! // Forecast the configured horizon for every stream
//! let annual = engine.generate_annual_forecast()?;
//! for line in &annual.summary {
//!     println!("{}", line);
//! }
//!
//! // What happens to revenue with VAT at 18%?
//! let baseline = DataLoader::baseline_from_csv("data/baseline.csv")?;
//! let simulator = ScenarioSimulator::new(&config, engine.models(), baseline)?;
//! let result = simulator.simulate(18.0, 35.0, 37.5)?;
//! println!("{:+.1}%", result.impact_percentage);
//! # Ok::<(), revenue_forecast::ForecastError>(())
//! ```

pub mod analytics;
pub mod anomaly;
pub mod config;
pub mod data;
pub mod error;
pub mod generator;
pub mod loader;
pub mod models;
pub mod patterns;
pub mod scenario;
pub mod serialization;
pub mod series;
pub mod stream;
pub mod utils;

// Re-export commonly used types
pub use crate::anomaly::{AnomalyDetector, AnomalyReport, DashboardKpis, Severity};
pub use crate::config::{EngineConfig, ForecastSettings, ScenarioSettings};
pub use crate::data::{ActualVsPredicted, BaselineDataset, BaselineRecord, DataLoader};
pub use crate::error::{ForecastError, ModelLoadError, Result};
pub use crate::generator::{AnnualForecast, ForecastEngine, ResolvedSeries, StreamState};
pub use crate::loader::{LoadOutcome, LoadedModels, ModelLoader};
pub use crate::models::{ModelFamily, ModelHandle, PredictiveModel};
pub use crate::patterns::{FallbackPattern, PatternRegistry};
pub use crate::scenario::{Methodology, ScenarioResult, ScenarioSimulator};
pub use crate::serialization::ToTransport;
pub use crate::series::{ForecastMethod, ForecastPoint, ForecastSeries, ForecastSummary};
pub use crate::stream::RevenueStream;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
