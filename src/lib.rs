//! # Revenue Dashboard
//!
//! The service object behind the revenue dashboard. It owns one forecast
//! engine, one scenario simulator and the historical datasets, and is built
//! once at startup then shared read-only by every request handler.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use revenue_dashboard::{DashboardConfig, RevenueDashboard};
//!
//! let config = DashboardConfig::load("revenue.toml")?;
//! let dashboard = Arc::new(RevenueDashboard::from_config(&config)?);
//!
//! let annual = dashboard.generate_annual_forecast()?;
//! let scenario = dashboard.simulate_scenario(18.0, 30.0, 35.0)?;
//! println!("{} streams, {:+.1}% impact", annual.forecasts.len(), scenario.impact_percentage);
//! # Ok::<(), revenue_forecast::ForecastError>(())
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use revenue_forecast::analytics::{self, SeasonalPattern, StreamTrend};
use revenue_forecast::scenario::RatesApplied;
use revenue_forecast::{
    ActualVsPredicted, AnnualForecast, AnomalyDetector, AnomalyReport, BaselineDataset,
    DashboardKpis, DataLoader, EngineConfig, ForecastEngine, ForecastError, LoadOutcome,
    ModelFamily, Result, RevenueStream, ScenarioResult, ScenarioSimulator,
};

/// Where the historical datasets live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSources {
    pub data_dir: PathBuf,
    /// Wide monthly revenue history
    pub baseline_file: String,
    /// Historical predictions against collected revenue
    pub actuals_file: String,
    /// Precomputed scenario history for the comparison method
    pub scenario_file: String,
}

impl Default for DataSources {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            baseline_file: "revpredict_baseline_forecast.csv".to_string(),
            actuals_file: "revpredict_test_results.csv".to_string(),
            scenario_file: "revpredict_scenario_data.csv".to_string(),
        }
    }
}

impl DataSources {
    pub fn baseline_path(&self) -> PathBuf {
        self.data_dir.join(&self.baseline_file)
    }

    pub fn actuals_path(&self) -> PathBuf {
        self.data_dir.join(&self.actuals_file)
    }

    pub fn scenario_path(&self) -> PathBuf {
        self.data_dir.join(&self.scenario_file)
    }
}

/// Engine configuration plus the `[data]` table
#[derive(Debug, Clone, Default)]
pub struct DashboardConfig {
    pub engine: EngineConfig,
    pub data: DataSources,
}

#[derive(Deserialize)]
struct DataTable {
    #[serde(default)]
    data: DataSources,
}

impl DashboardConfig {
    /// Load a TOML file. Relative directories resolve against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let engine = EngineConfig::load(path)?;

        let text = std::fs::read_to_string(path)?;
        let DataTable { mut data } = toml::from_str(&text)?;
        if data.data_dir.is_relative() {
            if let Some(parent) = path.parent() {
                data.data_dir = parent.join(&data.data_dir);
            }
        }

        Ok(Self { engine, data })
    }
}

/// Historical inputs the dashboard reports on
#[derive(Debug, Clone, Default)]
pub struct DashboardData {
    pub baseline: BaselineDataset,
    pub actuals: Vec<ActualVsPredicted>,
    pub scenario: Option<BaselineDataset>,
}

impl DashboardData {
    /// Load every dataset. Missing files leave that dataset empty; files that
    /// exist but do not parse are errors.
    pub fn load(sources: &DataSources) -> Result<Self> {
        let baseline = match existing(sources.baseline_path()) {
            Some(path) => DataLoader::baseline_from_csv(path)?,
            None => BaselineDataset::empty(),
        };
        let actuals = match existing(sources.actuals_path()) {
            Some(path) => DataLoader::actuals_from_csv(path)?,
            None => Vec::new(),
        };
        let scenario = existing(sources.scenario_path())
            .map(DataLoader::baseline_from_csv)
            .transpose()?;

        info!(
            baseline = baseline.len(),
            actuals = actuals.len(),
            scenario = scenario.as_ref().map_or(0, BaselineDataset::len),
            "Dashboard data loaded"
        );

        Ok(Self {
            baseline,
            actuals,
            scenario,
        })
    }
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    if path.exists() {
        Some(path)
    } else {
        warn!(path = %path.display(), "Data file not found");
        None
    }
}

/// Load state of one stream's model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStatus {
    pub stream: RevenueStream,
    pub loaded: bool,
    pub family: Option<ModelFamily>,
    pub detail: String,
}

/// The dashboard backend service
#[derive(Debug, Clone)]
pub struct RevenueDashboard {
    engine: ForecastEngine,
    simulator: ScenarioSimulator,
    data: DashboardData,
    detector: AnomalyDetector,
}

impl RevenueDashboard {
    pub fn new(engine: ForecastEngine, simulator: ScenarioSimulator, data: DashboardData) -> Self {
        Self {
            engine,
            simulator,
            data,
            detector: AnomalyDetector::default(),
        }
    }

    /// Load models and data, then wire the engine and simulator together
    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        let engine = ForecastEngine::from_config(&config.engine)?;
        let data = DashboardData::load(&config.data)?;

        let mut simulator =
            ScenarioSimulator::new(&config.engine, engine.models(), data.baseline.clone())?;
        if let Some(scenario) = &data.scenario {
            simulator = simulator.with_scenario_data(scenario.clone());
        }

        Ok(Self::new(engine, simulator, data))
    }

    pub fn with_detector(mut self, detector: AnomalyDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn engine(&self) -> &ForecastEngine {
        &self.engine
    }

    pub fn simulator(&self) -> &ScenarioSimulator {
        &self.simulator
    }

    pub fn data(&self) -> &DashboardData {
        &self.data
    }

    pub fn generate_annual_forecast(&self) -> Result<AnnualForecast> {
        self.engine.generate_annual_forecast()
    }

    pub fn simulate_scenario(
        &self,
        vat_rate: f64,
        corporate_tax_rate: f64,
        income_tax_rate: f64,
    ) -> Result<ScenarioResult> {
        self.simulator
            .simulate(vat_rate, corporate_tax_rate, income_tax_rate)
    }

    /// Compare the loaded scenario dataset against the baseline.
    ///
    /// Runs regardless of which models loaded; the rates are echoed in the result.
    pub fn compare_scenario_data(
        &self,
        vat_rate: f64,
        corporate_tax_rate: f64,
        income_tax_rate: f64,
    ) -> Result<ScenarioResult> {
        self.simulator.compare_csv(RatesApplied {
            vat: vat_rate,
            corporate: corporate_tax_rate,
            income: income_tax_rate,
        })
    }

    /// Every stream's model load state, in stream order
    pub fn model_status(&self) -> Vec<ModelStatus> {
        let models = self.engine.models();

        RevenueStream::ALL
            .into_iter()
            .map(|stream| {
                let outcome = models.outcome(stream).cloned().unwrap_or(LoadOutcome::Missing);
                let family = match &outcome {
                    LoadOutcome::Loaded { family, .. } => Some(*family),
                    _ => None,
                };
                ModelStatus {
                    stream,
                    loaded: outcome.is_loaded(),
                    family,
                    detail: outcome.to_string(),
                }
            })
            .collect()
    }

    pub fn anomaly_report(&self) -> Result<AnomalyReport> {
        if self.data.actuals.is_empty() {
            return Err(ForecastError::Data("No anomaly data available".to_string()));
        }
        Ok(self.detector.report(&self.data.actuals))
    }

    pub fn kpis(&self) -> Result<DashboardKpis> {
        self.detector.kpis(&self.data.baseline, &self.data.actuals)
    }

    pub fn revenue_trends(&self) -> Result<Vec<StreamTrend>> {
        analytics::revenue_trends(&self.data.baseline)
    }

    pub fn seasonal_patterns(&self) -> Result<Vec<SeasonalPattern>> {
        analytics::seasonal_patterns(&self.data.baseline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revenue_forecast::{LoadedModels, PatternRegistry};

    fn fallback_dashboard(data: DashboardData) -> RevenueDashboard {
        let config = EngineConfig::default();
        let engine =
            ForecastEngine::new(&config, LoadedModels::empty(), PatternRegistry::standard()).unwrap();
        let simulator =
            ScenarioSimulator::new(&config, engine.models(), data.baseline.clone()).unwrap();
        RevenueDashboard::new(engine, simulator, data)
    }

    #[test]
    fn test_dashboard_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RevenueDashboard>();
    }

    #[test]
    fn test_default_data_sources() {
        let sources = DataSources::default();
        assert_eq!(
            sources.baseline_path(),
            PathBuf::from("data/revpredict_baseline_forecast.csv")
        );
    }

    #[test]
    fn test_model_status_without_models() {
        let dashboard = fallback_dashboard(DashboardData::default());
        let status = dashboard.model_status();

        assert_eq!(status.len(), 7);
        assert!(status.iter().all(|s| !s.loaded && s.family.is_none()));
        assert_eq!(status[0].detail, "missing");
    }

    #[test]
    fn test_empty_data_queries() {
        let dashboard = fallback_dashboard(DashboardData::default());

        assert!(matches!(dashboard.anomaly_report(), Err(ForecastError::Data(_))));
        assert!(matches!(dashboard.kpis(), Err(ForecastError::NoBaselineData)));
        assert!(matches!(
            dashboard.simulate_scenario(16.0, 35.0, 37.5),
            Err(ForecastError::NoBaselineData)
        ));
        assert!(matches!(
            dashboard.compare_scenario_data(16.0, 35.0, 37.5),
            Err(ForecastError::NoBaselineData)
        ));
    }
}
