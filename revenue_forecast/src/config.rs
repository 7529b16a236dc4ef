//! Engine configuration
//!
//! Every numeric constant the forecast and scenario engines depend on lives
//! here. The compiled defaults are the canonical constant set; a TOML file
//! may override any of them:
//!
//! ```toml
//! models_dir = "trained_models"
//!
//! [forecast]
//! horizon_months = 12
//! min_components = 4
//!
//! [forecast.scaling_factors]
//! VAT = 25.0
//!
//! [scenario.elasticities]
//! VAT = 0.7
//! ```
//!
//! Per-stream tables are merged over the defaults, so a file only lists the
//! streams it changes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ForecastError, Result};
use crate::stream::RevenueStream;

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the per-stream `<label>_model.json` artifacts
    pub models_dir: PathBuf,
    pub forecast: ForecastSettings,
    pub scenario: ScenarioSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("trained_models"),
            forecast: ForecastSettings::default(),
            scenario: ScenarioSettings::default(),
        }
    }
}

/// Forecast generator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastSettings {
    /// Months covered by `generate_annual_forecast`
    pub horizon_months: usize,
    /// Base seed for the fallback pattern generators
    pub seed: u64,
    /// Components that must be valid in every month to compose total revenue
    pub min_components: usize,
    /// Relative noise applied to model output, e.g. `0.05` for ±5%
    pub model_noise: f64,
    /// Half-width of the uncertainty band as a fraction of the series' std dev
    pub uncertainty_fraction: f64,
    /// Model output is clipped to `[min * model_floor_factor, max * model_ceiling_factor]`
    pub model_floor_factor: f64,
    pub model_ceiling_factor: f64,
    /// Fallback output is clipped to `[min * pattern_floor_factor, max * pattern_ceiling_factor]`
    pub pattern_floor_factor: f64,
    pub pattern_ceiling_factor: f64,
    /// Multiplier from raw model units to millions, per stream
    #[serde(deserialize_with = "merge_scaling_factors")]
    pub scaling_factors: BTreeMap<RevenueStream, f64>,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            horizon_months: 12,
            seed: 42,
            min_components: 4,
            model_noise: 0.05,
            uncertainty_fraction: 0.15,
            model_floor_factor: 0.8,
            model_ceiling_factor: 1.1,
            pattern_floor_factor: 0.9,
            pattern_ceiling_factor: 1.1,
            scaling_factors: default_scaling_factors(),
        }
    }
}

impl ForecastSettings {
    /// Scaling factor for a stream, `1.0` when none is configured
    pub fn scaling_factor(&self, stream: RevenueStream) -> f64 {
        self.scaling_factors.get(&stream).copied().unwrap_or(1.0)
    }
}

/// Scenario simulator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSettings {
    /// Reference rates in percent; deltas are measured against these
    pub reference_vat_rate: f64,
    pub reference_corporate_rate: f64,
    pub reference_income_rate: f64,
    /// Mean and std dev of the organic monthly growth multiplier `1 + N(mean, std)`
    pub growth_noise_mean: f64,
    pub growth_noise_std: f64,
    /// Predictions never drop below this fraction of the base value
    pub floor_fraction: f64,
    /// Share of income-tax revenue attributed to corporate filers
    pub corporate_share: f64,
    /// Damping applied when spreading the impact over the baseline timeline
    pub timeline_damping: f64,
    #[serde(deserialize_with = "merge_elasticities")]
    pub elasticities: BTreeMap<RevenueStream, f64>,
    /// Reference values used when the baseline lacks a stream
    #[serde(deserialize_with = "merge_base_values")]
    pub base_values: BTreeMap<RevenueStream, f64>,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            reference_vat_rate: 16.0,
            reference_corporate_rate: 35.0,
            reference_income_rate: 37.5,
            growth_noise_mean: 0.015,
            growth_noise_std: 0.005,
            floor_fraction: 0.7,
            corporate_share: 0.4,
            timeline_damping: 0.3,
            elasticities: default_elasticities(),
            base_values: default_base_values(),
        }
    }
}

impl ScenarioSettings {
    pub const DEFAULT_ELASTICITY: f64 = 0.5;
    pub const DEFAULT_BASE_VALUE: f64 = 1000.0;

    pub fn elasticity(&self, stream: RevenueStream) -> f64 {
        self.elasticities
            .get(&stream)
            .copied()
            .unwrap_or(Self::DEFAULT_ELASTICITY)
    }

    pub fn base_value(&self, stream: RevenueStream) -> f64 {
        self.base_values
            .get(&stream)
            .copied()
            .unwrap_or(Self::DEFAULT_BASE_VALUE)
    }
}

fn default_scaling_factors() -> BTreeMap<RevenueStream, f64> {
    BTreeMap::from([
        (RevenueStream::Vat, 25.0),
        (RevenueStream::CorporateTax, 12.0),
        (RevenueStream::CustomsDuties, 10.0),
        (RevenueStream::ExciseTax, 6.0),
        (RevenueStream::MineralRoyalty, 8.0),
        (RevenueStream::Paye, 15.0),
        (RevenueStream::TotalRevenue, 80.0),
    ])
}

fn default_elasticities() -> BTreeMap<RevenueStream, f64> {
    BTreeMap::from([
        (RevenueStream::Vat, 0.7),
        (RevenueStream::CorporateTax, 0.5),
        (RevenueStream::CustomsDuties, 0.2),
        (RevenueStream::ExciseTax, 0.4),
    ])
}

fn default_base_values() -> BTreeMap<RevenueStream, f64> {
    BTreeMap::from([
        (RevenueStream::Vat, 4500.0),
        (RevenueStream::CorporateTax, 3200.0),
        (RevenueStream::CustomsDuties, 1800.0),
        (RevenueStream::ExciseTax, 1200.0),
    ])
}

fn merge_over<'de, D>(
    deserializer: D,
    mut defaults: BTreeMap<RevenueStream, f64>,
) -> std::result::Result<BTreeMap<RevenueStream, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let overrides = BTreeMap::<RevenueStream, f64>::deserialize(deserializer)?;
    defaults.extend(overrides);
    Ok(defaults)
}

fn merge_scaling_factors<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<RevenueStream, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    merge_over(deserializer, default_scaling_factors())
}

fn merge_elasticities<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<RevenueStream, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    merge_over(deserializer, default_elasticities())
}

fn merge_base_values<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<RevenueStream, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    merge_over(deserializer, default_base_values())
}

impl EngineConfig {
    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&text)?;

        // Relative model directories are resolved against the config file
        if config.models_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.models_dir = parent.join(&config.models_dir);
            }
        }

        Ok(config)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Point the engine at a models directory
    pub fn with_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.models_dir = dir.into();
        self
    }

    /// Validate the configuration values
    pub fn validate(&self) -> Result<()> {
        let forecast = &self.forecast;

        if forecast.horizon_months == 0 {
            return Err(invalid("forecast.horizon_months", "must be greater than 0"));
        }
        if !(1..=RevenueStream::COMPONENTS.len()).contains(&forecast.min_components) {
            return Err(invalid(
                "forecast.min_components",
                "must be between 1 and 6",
            ));
        }
        for (field, value) in [
            ("forecast.model_noise", forecast.model_noise),
            ("forecast.uncertainty_fraction", forecast.uncertainty_fraction),
            ("forecast.model_floor_factor", forecast.model_floor_factor),
            ("forecast.pattern_floor_factor", forecast.pattern_floor_factor),
            ("forecast.model_ceiling_factor", forecast.model_ceiling_factor),
            ("forecast.pattern_ceiling_factor", forecast.pattern_ceiling_factor),
            ("scenario.growth_noise_std", self.scenario.growth_noise_std),
            ("scenario.floor_fraction", self.scenario.floor_fraction),
            ("scenario.corporate_share", self.scenario.corporate_share),
            ("scenario.timeline_damping", self.scenario.timeline_damping),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(field, "must be a non-negative number"));
            }
        }
        if !self.scenario.growth_noise_mean.is_finite() {
            return Err(invalid("scenario.growth_noise_mean", "must be a finite number"));
        }
        if forecast.model_noise >= 1.0 {
            return Err(invalid("forecast.model_noise", "must be below 1.0"));
        }
        if forecast.model_ceiling_factor < forecast.model_floor_factor
            || forecast.pattern_ceiling_factor < forecast.pattern_floor_factor
        {
            return Err(invalid(
                "forecast",
                "ceiling factors must not be below floor factors",
            ));
        }
        for (stream, factor) in &forecast.scaling_factors {
            if !factor.is_finite() || *factor <= 0.0 {
                return Err(invalid(
                    &format!("forecast.scaling_factors.{}", stream),
                    "must be a positive number",
                ));
            }
        }
        for (field, rate) in [
            ("scenario.reference_vat_rate", self.scenario.reference_vat_rate),
            (
                "scenario.reference_corporate_rate",
                self.scenario.reference_corporate_rate,
            ),
            (
                "scenario.reference_income_rate",
                self.scenario.reference_income_rate,
            ),
        ] {
            if !rate.is_finite() || rate <= 0.0 {
                return Err(invalid(field, "must be a positive rate"));
            }
        }
        for (stream, elasticity) in &self.scenario.elasticities {
            if !elasticity.is_finite() || *elasticity <= 0.0 {
                return Err(invalid(
                    &format!("scenario.elasticities.{}", stream),
                    "must be a positive number",
                ));
            }
        }
        for (stream, base) in &self.scenario.base_values {
            if !base.is_finite() || *base < 0.0 {
                return Err(invalid(
                    &format!("scenario.base_values.{}", stream),
                    "must be a non-negative number",
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ForecastError {
    ForecastError::Config(format!("{}: {}", field, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.forecast.scaling_factor(RevenueStream::Vat), 25.0);
        assert_eq!(config.scenario.elasticity(RevenueStream::Vat), 0.7);
        assert_eq!(config.scenario.elasticity(RevenueStream::Paye), 0.5);
        assert_eq!(config.scenario.base_value(RevenueStream::Paye), 1000.0);
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.forecast.horizon_months, 12);
        assert_eq!(config.forecast.min_components, 4);
        assert_eq!(config.models_dir, PathBuf::from("trained_models"));
    }

    #[test]
    fn test_stream_tables_merge_over_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [forecast.scaling_factors]
            VAT = 30.0

            [scenario.elasticities]
            Income_Tax = 0.6
            "#,
        )
        .unwrap();

        assert_eq!(config.forecast.scaling_factor(RevenueStream::Vat), 30.0);
        assert_eq!(config.forecast.scaling_factor(RevenueStream::Paye), 15.0);
        assert_eq!(config.scenario.elasticity(RevenueStream::CorporateTax), 0.6);
        assert_eq!(config.scenario.elasticity(RevenueStream::ExciseTax), 0.4);
    }

    #[test]
    fn test_rejects_bad_threshold() {
        let result = EngineConfig::from_toml_str("[forecast]\nmin_components = 7\n");
        assert!(matches!(result, Err(ForecastError::Config(_))));
    }

    #[test]
    fn test_rejects_non_finite_factors() {
        for text in [
            "[forecast]\npattern_ceiling_factor = nan\n",
            "[forecast]\nmodel_ceiling_factor = inf\n",
            "[scenario]\ngrowth_noise_mean = nan\n",
            "[scenario.base_values]\nVAT = nan\n",
            "[scenario.base_values]\nExcise_Tax = -5.0\n",
        ] {
            assert!(
                matches!(EngineConfig::from_toml_str(text), Err(ForecastError::Config(_))),
                "accepted: {}",
                text
            );
        }
    }

    #[test]
    fn test_rejects_non_positive_scaling() {
        let result = EngineConfig::from_toml_str("[forecast.scaling_factors]\nPAYE = 0.0\n");
        assert!(matches!(result, Err(ForecastError::Config(msg)) if msg.contains("PAYE")));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(matches!(
            EngineConfig::from_toml_str("[forecast\n"),
            Err(ForecastError::Config(_))
        ));
    }
}
