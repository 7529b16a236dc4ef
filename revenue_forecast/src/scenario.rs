//! What-if simulation of tax-rate changes
//!
//! Two methods share one result shape:
//!
//! - **Elasticity model**: each scenario stream's latest observed revenue is
//!   adjusted by its elasticity times the fractional change of its governing
//!   rate, then multiplied by a small random organic-growth term.
//! - **CSV comparison**: a precomputed scenario dataset is compared against
//!   the baseline dataset month by month. Used when no elasticity profiles
//!   are available.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{EngineConfig, ScenarioSettings};
use crate::data::BaselineDataset;
use crate::error::{ForecastError, Result};
use crate::loader::LoadedModels;
use crate::models::ModelFamily;
use crate::stream::RevenueStream;

/// How a scenario result was computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Methodology {
    ElasticityModel,
    CsvComparison,
}

impl Methodology {
    pub fn label(&self) -> &'static str {
        match self {
            Methodology::ElasticityModel => "Elasticity Model",
            Methodology::CsvComparison => "CSV Data Comparison",
        }
    }
}

impl fmt::Display for Methodology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Proposed rates, in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatesApplied {
    pub vat: f64,
    pub corporate: f64,
    pub income: f64,
}

/// Projected revenue of one stream against its baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamImpact {
    pub projected: f64,
    pub baseline: f64,
    /// `projected - baseline`
    pub delta: f64,
}

impl StreamImpact {
    fn new(projected: f64, baseline: f64) -> Self {
        Self {
            projected,
            baseline,
            delta: projected - baseline,
        }
    }
}

/// Baseline and scenario total for one month
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub baseline: f64,
    pub scenario: f64,
    pub difference: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Most recent observed total in elasticity mode, summed baseline totals in CSV mode
    pub baseline_total: f64,
    pub projected_total: f64,
    pub revenue_change: f64,
    pub impact_percentage: f64,
    pub breakdown: BTreeMap<RevenueStream, StreamImpact>,
    /// Revenue attributed to the corporate rate change
    pub corporate_impact: f64,
    pub rates_applied: RatesApplied,
    pub methodology: Methodology,
    pub models_used: Vec<String>,
    pub timeline: Vec<TimelinePoint>,
}

impl ScenarioResult {
    /// Projected revenue of one stream
    pub fn prediction(&self, stream: RevenueStream) -> Option<f64> {
        self.breakdown.get(&stream).map(|impact| impact.projected)
    }
}

/// Sensitivity of one scenario stream to its governing rate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElasticityProfile {
    pub stream: RevenueStream,
    pub elasticity: f64,
    /// Revenue used when the baseline has no observation for the stream
    pub base_value: f64,
    /// Family of the trained model backing this profile, if any
    pub family: Option<ModelFamily>,
}

impl ElasticityProfile {
    fn is_usable(&self) -> bool {
        self.elasticity.is_finite() && self.base_value.is_finite() && self.base_value > 0.0
    }

    fn source(&self) -> String {
        match self.family {
            Some(family) => format!("{}({})", self.stream.scenario_key(), family),
            None => format!("{}(fallback)", self.stream.scenario_key()),
        }
    }
}

/// Fractional rate changes against the reference rates
#[derive(Debug, Clone, Copy, PartialEq)]
struct RateDeltas {
    vat: f64,
    corporate: f64,
    income: f64,
}

impl RateDeltas {
    /// The delta a stream's revenue responds to. Customs and excise do not
    /// respond to any of the three levers.
    fn for_stream(&self, stream: RevenueStream) -> f64 {
        match stream {
            RevenueStream::Vat => self.vat,
            RevenueStream::CorporateTax => self.income,
            _ => 0.0,
        }
    }
}

/// Runs tax-rate scenarios against a baseline dataset
#[derive(Debug, Clone)]
pub struct ScenarioSimulator {
    settings: ScenarioSettings,
    profiles: Vec<ElasticityProfile>,
    baseline: BaselineDataset,
    scenario_data: Option<BaselineDataset>,
}

impl ScenarioSimulator {
    /// Elasticity-mode simulator. Streams with a trained model take its
    /// elasticity and base value, others take the configured ones.
    pub fn new(config: &EngineConfig, models: &LoadedModels, baseline: BaselineDataset) -> Result<Self> {
        config.validate()?;

        let profiles = RevenueStream::SCENARIO
            .into_iter()
            .map(|stream| match models.handle(stream) {
                Some(handle) => ElasticityProfile {
                    stream,
                    elasticity: handle.elasticity(),
                    base_value: handle.base_value(),
                    family: Some(handle.family()),
                },
                None => ElasticityProfile {
                    stream,
                    elasticity: config.scenario.elasticity(stream),
                    base_value: config.scenario.base_value(stream),
                    family: None,
                },
            })
            .collect();

        Ok(Self {
            settings: config.scenario.clone(),
            profiles,
            baseline,
            scenario_data: None,
        })
    }

    /// Simulator that can only compare a scenario dataset against the baseline
    pub fn csv_comparison(
        config: &EngineConfig,
        baseline: BaselineDataset,
        scenario_data: BaselineDataset,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            settings: config.scenario.clone(),
            profiles: Vec::new(),
            baseline,
            scenario_data: Some(scenario_data),
        })
    }

    /// Attach a scenario dataset for the CSV comparison method
    pub fn with_scenario_data(mut self, scenario_data: BaselineDataset) -> Self {
        self.scenario_data = Some(scenario_data);
        self
    }

    pub fn profiles(&self) -> &[ElasticityProfile] {
        &self.profiles
    }

    pub fn baseline(&self) -> &BaselineDataset {
        &self.baseline
    }

    /// True when every scenario stream has a usable elasticity profile
    pub fn has_elasticity_models(&self) -> bool {
        self.profiles.len() == RevenueStream::SCENARIO.len()
            && self.profiles.iter().all(ElasticityProfile::is_usable)
    }

    /// Simulate the given rates, in percent
    pub fn simulate(&self, vat_rate: f64, corporate_tax_rate: f64, income_tax_rate: f64) -> Result<ScenarioResult> {
        self.simulate_with_rng(
            vat_rate,
            corporate_tax_rate,
            income_tax_rate,
            &mut StdRng::from_entropy(),
        )
    }

    pub fn simulate_with_rng<R: Rng>(
        &self,
        vat_rate: f64,
        corporate_tax_rate: f64,
        income_tax_rate: f64,
        rng: &mut R,
    ) -> Result<ScenarioResult> {
        let rates = RatesApplied {
            vat: vat_rate,
            corporate: corporate_tax_rate,
            income: income_tax_rate,
        };
        if [rates.vat, rates.corporate, rates.income]
            .iter()
            .any(|r| !r.is_finite())
        {
            return Err(ForecastError::Data("Tax rates must be finite".to_string()));
        }

        info!(
            vat = rates.vat,
            corporate = rates.corporate,
            income = rates.income,
            "Running scenario simulation"
        );

        if self.has_elasticity_models() {
            self.simulate_elasticity(rates, rng)
        } else {
            debug!("No elasticity profiles, comparing scenario data");
            self.compare_csv(rates)
        }
    }

    fn deltas(&self, rates: RatesApplied) -> RateDeltas {
        let delta = |proposed: f64, reference: f64| (proposed - reference) / reference;
        RateDeltas {
            vat: delta(rates.vat, self.settings.reference_vat_rate),
            corporate: delta(rates.corporate, self.settings.reference_corporate_rate),
            income: delta(rates.income, self.settings.reference_income_rate),
        }
    }

    fn simulate_elasticity<R: Rng>(&self, rates: RatesApplied, rng: &mut R) -> Result<ScenarioResult> {
        let latest = self.baseline.latest().ok_or(ForecastError::NoBaselineData)?;
        let baseline_total = latest.total().ok_or(ForecastError::NoBaselineData)?;

        let growth = Normal::new(self.settings.growth_noise_mean, self.settings.growth_noise_std)
            .map_err(|e| ForecastError::Config(format!("scenario.growth_noise_std: {}", e)))?;
        let deltas = self.deltas(rates);

        let mut breakdown = BTreeMap::new();
        let mut models_used = Vec::with_capacity(self.profiles.len());

        for profile in &self.profiles {
            let base = self
                .baseline
                .latest_value(profile.stream)
                .unwrap_or(profile.base_value);

            let rate_change = deltas.for_stream(profile.stream);
            let noise = 1.0 + growth.sample(rng);
            let floor = base * self.settings.floor_fraction;
            let prediction = (base * (1.0 + profile.elasticity * rate_change) * noise).max(floor);

            debug!(
                stream = %profile.stream,
                base,
                rate_change,
                prediction,
                "Scenario stream prediction"
            );

            breakdown.insert(profile.stream, StreamImpact::new(prediction, base));
            models_used.push(profile.source());
        }

        let income_prediction = breakdown
            .get(&RevenueStream::CorporateTax)
            .map(|impact| impact.projected)
            .unwrap_or_default();
        let corporate_impact = income_prediction * self.settings.corporate_share * deltas.corporate;

        let projected_total =
            breakdown.values().map(|impact| impact.projected).sum::<f64>() + corporate_impact;
        let revenue_change = projected_total - baseline_total;
        let impact_percentage = percentage(revenue_change, baseline_total);

        info!(revenue_change, impact_percentage, "Scenario simulation finished");

        Ok(ScenarioResult {
            baseline_total,
            projected_total,
            revenue_change,
            impact_percentage,
            breakdown,
            corporate_impact,
            rates_applied: rates,
            methodology: Methodology::ElasticityModel,
            models_used,
            timeline: self.spread_impact(revenue_change, baseline_total),
        })
    }

    /// Spread the impact across the baseline months, reaching
    /// `timeline_damping` of the full impact factor in the final month
    fn spread_impact(&self, revenue_change: f64, latest_total: f64) -> Vec<TimelinePoint> {
        let totals = self.baseline.totals();
        let n = totals.len() as f64;
        let impact_factor = if latest_total == 0.0 {
            0.0
        } else {
            revenue_change / latest_total
        };

        totals
            .iter()
            .enumerate()
            .map(|(i, &(date, baseline))| {
                let ramp = (i + 1) as f64 / n;
                let scenario = baseline * (1.0 + impact_factor * ramp * self.settings.timeline_damping);
                TimelinePoint {
                    date,
                    baseline,
                    scenario,
                    difference: scenario - baseline,
                }
            })
            .collect()
    }

    /// Compare the attached scenario dataset against the baseline
    pub fn compare_csv(&self, rates: RatesApplied) -> Result<ScenarioResult> {
        if self.baseline.is_empty() {
            return Err(ForecastError::NoBaselineData);
        }
        let scenario = self
            .scenario_data
            .as_ref()
            .filter(|data| !data.is_empty())
            .ok_or(ForecastError::NoScenarioData)?;

        // headline figures follow the VAT column; the timeline stays on totals
        let baseline_total = self.baseline.column_sum(RevenueStream::Vat);
        let projected_total = scenario.column_sum(RevenueStream::Vat);
        let revenue_change = projected_total - baseline_total;

        let baseline_streams = self.baseline.streams();
        let scenario_streams = scenario.streams();
        let breakdown = RevenueStream::COMPONENTS
            .into_iter()
            .filter(|s| baseline_streams.contains(s) || scenario_streams.contains(s))
            .map(|s| {
                let impact = StreamImpact::new(scenario.column_sum(s), self.baseline.column_sum(s));
                (s, impact)
            })
            .collect();

        let timeline = self
            .baseline
            .totals()
            .into_iter()
            .zip(scenario.totals())
            .map(|((date, baseline), (_, scenario))| TimelinePoint {
                date,
                baseline,
                scenario,
                difference: scenario - baseline,
            })
            .collect();

        info!(revenue_change, "Scenario data comparison finished");

        Ok(ScenarioResult {
            baseline_total,
            projected_total,
            revenue_change,
            impact_percentage: percentage(revenue_change, baseline_total),
            breakdown,
            corporate_impact: 0.0,
            rates_applied: rates,
            methodology: Methodology::CsvComparison,
            models_used: vec!["csv_fallback".to_string()],
            timeline,
        })
    }
}

fn percentage(change: f64, base: f64) -> f64 {
    if base == 0.0 {
        0.0
    } else {
        change / base * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BaselineRecord;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn baseline() -> BaselineDataset {
        BaselineDataset::new(vec![
            BaselineRecord::new(
                date(2024, 1),
                [
                    (RevenueStream::Vat, 4400.0),
                    (RevenueStream::CorporateTax, 3100.0),
                    (RevenueStream::CustomsDuties, 1750.0),
                    (RevenueStream::ExciseTax, 1150.0),
                    (RevenueStream::TotalRevenue, 10400.0),
                ],
            ),
            BaselineRecord::new(
                date(2024, 2),
                [
                    (RevenueStream::Vat, 4500.0),
                    (RevenueStream::CorporateTax, 3200.0),
                    (RevenueStream::CustomsDuties, 1800.0),
                    (RevenueStream::ExciseTax, 1200.0),
                    (RevenueStream::TotalRevenue, 10700.0),
                ],
            ),
        ])
    }

    fn quiet_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.scenario.growth_noise_mean = 0.0;
        config.scenario.growth_noise_std = 0.0;
        config
    }

    #[test]
    fn test_deltas_against_reference_rates() {
        let simulator =
            ScenarioSimulator::new(&EngineConfig::default(), &LoadedModels::empty(), baseline()).unwrap();
        let deltas = simulator.deltas(RatesApplied {
            vat: 18.0,
            corporate: 35.0,
            income: 35.0,
        });

        assert_relative_eq!(deltas.vat, 0.125);
        assert_relative_eq!(deltas.corporate, 0.0);
        assert_relative_eq!(deltas.income, -1.0 / 15.0, epsilon = 1e-12);
        assert_eq!(deltas.for_stream(RevenueStream::ExciseTax), 0.0);
    }

    #[test]
    fn test_elasticity_without_noise() {
        let simulator = ScenarioSimulator::new(&quiet_config(), &LoadedModels::empty(), baseline()).unwrap();
        let result = simulator
            .simulate_with_rng(18.0, 30.0, 37.5, &mut StdRng::seed_from_u64(1))
            .unwrap();

        assert_eq!(result.methodology, Methodology::ElasticityModel);
        assert_relative_eq!(result.prediction(RevenueStream::Vat).unwrap(), 4500.0 * (1.0 + 0.7 * 0.125));
        assert_relative_eq!(result.prediction(RevenueStream::CorporateTax).unwrap(), 3200.0);
        assert_relative_eq!(result.corporate_impact, 3200.0 * 0.4 * (-5.0 / 35.0), epsilon = 1e-9);

        let expected_total = 4500.0 * 1.0875 + 3200.0 + 1800.0 + 1200.0 + result.corporate_impact;
        assert_relative_eq!(result.projected_total, expected_total, epsilon = 1e-9);
        assert_relative_eq!(result.revenue_change, expected_total - 10700.0, epsilon = 1e-9);
        assert_eq!(result.models_used[0], "vat(fallback)");
    }

    #[test]
    fn test_prediction_floored() {
        let simulator = ScenarioSimulator::new(&quiet_config(), &LoadedModels::empty(), baseline()).unwrap();
        // VAT at 0% is a -100% delta, 1 - 0.7 = 0.3 of base before the floor
        let result = simulator
            .simulate_with_rng(0.0, 35.0, 37.5, &mut StdRng::seed_from_u64(1))
            .unwrap();

        assert_relative_eq!(result.prediction(RevenueStream::Vat).unwrap(), 4500.0 * 0.7);
    }

    #[test]
    fn test_timeline_ramps_to_damped_impact() {
        let simulator = ScenarioSimulator::new(&quiet_config(), &LoadedModels::empty(), baseline()).unwrap();
        let result = simulator
            .simulate_with_rng(20.0, 35.0, 37.5, &mut StdRng::seed_from_u64(1))
            .unwrap();

        assert_eq!(result.timeline.len(), 2);
        let factor = result.revenue_change / 10700.0;
        let last = result.timeline[1];
        assert_relative_eq!(last.scenario, 10700.0 * (1.0 + factor * 0.3), epsilon = 1e-9);
        assert_relative_eq!(result.timeline[0].difference, 10400.0 * factor * 0.5 * 0.3, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_baseline() {
        let simulator =
            ScenarioSimulator::new(&EngineConfig::default(), &LoadedModels::empty(), BaselineDataset::empty())
                .unwrap();
        assert!(matches!(
            simulator.simulate(16.0, 35.0, 37.5),
            Err(ForecastError::NoBaselineData)
        ));
    }

    #[test]
    fn test_csv_comparison() {
        let scenario = BaselineDataset::new(vec![
            BaselineRecord::new(
                date(2024, 1),
                [(RevenueStream::Vat, 4600.0), (RevenueStream::TotalRevenue, 10600.0)],
            ),
            BaselineRecord::new(
                date(2024, 2),
                [(RevenueStream::Vat, 4700.0), (RevenueStream::TotalRevenue, 10900.0)],
            ),
        ]);
        let simulator =
            ScenarioSimulator::csv_comparison(&EngineConfig::default(), baseline(), scenario).unwrap();

        let result = simulator.simulate(18.0, 35.0, 37.5).unwrap();

        assert_eq!(result.methodology, Methodology::CsvComparison);
        assert_eq!(result.models_used, vec!["csv_fallback".to_string()]);
        assert_relative_eq!(result.baseline_total, 8900.0);
        assert_relative_eq!(result.revenue_change, 400.0);
        assert_relative_eq!(result.breakdown[&RevenueStream::Vat].delta, 400.0);
        assert_relative_eq!(result.breakdown[&RevenueStream::ExciseTax].projected, 0.0);
        assert_eq!(result.timeline.len(), 2);
        assert_relative_eq!(result.timeline[1].difference, 200.0);
    }

    #[test]
    fn test_csv_comparison_headline_follows_vat() {
        let record = |month, vat| {
            BaselineRecord::new(
                date(2024, month),
                [(RevenueStream::Vat, vat), (RevenueStream::TotalRevenue, 1000.0)],
            )
        };
        let baseline = BaselineDataset::new(vec![record(1, 100.0), record(2, 100.0)]);
        let scenario = BaselineDataset::new(vec![record(1, 150.0), record(2, 150.0)]);
        let simulator =
            ScenarioSimulator::csv_comparison(&EngineConfig::default(), baseline, scenario).unwrap();

        let result = simulator.simulate(20.0, 35.0, 37.5).unwrap();

        assert_relative_eq!(result.baseline_total, 200.0);
        assert_relative_eq!(result.projected_total, 300.0);
        assert_relative_eq!(result.revenue_change, 100.0);
        assert_relative_eq!(result.impact_percentage, 50.0);
        assert!(result.timeline.iter().all(|p| p.difference == 0.0));
    }

    #[test]
    fn test_csv_comparison_without_scenario_data() {
        let simulator = ScenarioSimulator::csv_comparison(
            &EngineConfig::default(),
            baseline(),
            BaselineDataset::empty(),
        )
        .unwrap();

        assert!(matches!(
            simulator.simulate(16.0, 35.0, 37.5),
            Err(ForecastError::NoScenarioData)
        ));
    }

    #[test]
    fn test_simulator_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ScenarioSimulator>();
    }
}
