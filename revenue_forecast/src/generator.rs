//! Forecast generation
//!
//! Every stream is resolved through a small state machine:
//!
//! ```text
//! NoHandle ───────────────────────────────┐
//! Loaded ──> PredictionOk ──> model series │
//!        └─> PredictionFailed ─────────────┴─> fallback series
//! ```
//!
//! Total revenue takes one extra step: when it has no usable model it is
//! composed from the component streams, and only if composition is not
//! possible for every month does it use its own fallback pattern.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, ForecastSettings};
use crate::error::{ForecastError, Result};
use crate::loader::{LoadedModels, ModelLoader};
use crate::models::ModelHandle;
use crate::patterns::PatternRegistry;
use crate::series::{ForecastMethod, ForecastSeries, ForecastSummary};
use crate::stream::RevenueStream;
use crate::utils::{fnv1a, future_month_starts};

/// A step in resolving one stream's forecast
#[derive(Debug, Clone, PartialEq)]
pub enum StreamState {
    /// No usable model was loaded for the stream
    NoHandle,
    /// A model is available and will be asked to predict
    Loaded,
    PredictionOk,
    PredictionFailed { reason: String },
    /// Total revenue could not be composed from its components
    CompositionFailed { reason: String },
}

/// A stream's series together with the states it passed through
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSeries {
    pub series: ForecastSeries,
    pub states: Vec<StreamState>,
}

/// Output of [`ForecastEngine::generate_annual_forecast`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualForecast {
    pub forecasts: BTreeMap<RevenueStream, ForecastSeries>,
    pub summary: Vec<ForecastSummary>,
}

/// Produces monthly forecasts for every revenue stream.
///
/// Built once and read-only afterwards. All state is owned plain data and
/// model prediction takes `&self`, so one engine can serve concurrent
/// requests from behind an `Arc`.
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    settings: ForecastSettings,
    models: LoadedModels,
    patterns: PatternRegistry,
}

impl ForecastEngine {
    /// Load models from the configured directory and use the standard patterns
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let models = ModelLoader::new(config).load_all();
        Self::new(config, models, PatternRegistry::standard())
    }

    pub fn new(config: &EngineConfig, models: LoadedModels, patterns: PatternRegistry) -> Result<Self> {
        config.validate()?;

        if models.loaded_count() > 0 {
            info!(models = models.loaded_count(), "Forecast engine initialised");
        } else {
            warn!("Forecast engine using fallback patterns only");
        }

        Ok(Self {
            settings: config.forecast.clone(),
            models,
            patterns,
        })
    }

    pub fn models(&self) -> &LoadedModels {
        &self.models
    }

    pub fn patterns(&self) -> &PatternRegistry {
        &self.patterns
    }

    pub fn settings(&self) -> &ForecastSettings {
        &self.settings
    }

    /// Forecast the next `horizon` months from today
    pub fn generate(&self, horizon: usize) -> Result<BTreeMap<RevenueStream, ForecastSeries>> {
        let today = chrono::Local::now().date_naive();
        self.generate_at(today, horizon, &mut StdRng::from_entropy())
    }

    /// Forecast the next `horizon` months after `today`, drawing model noise from `rng`
    pub fn generate_at<R: Rng>(
        &self,
        today: NaiveDate,
        horizon: usize,
        rng: &mut R,
    ) -> Result<BTreeMap<RevenueStream, ForecastSeries>> {
        let resolved = self.resolve_all(today, horizon, rng)?;
        Ok(resolved
            .into_iter()
            .map(|(stream, resolved)| (stream, resolved.series))
            .collect())
    }

    /// Forecast the configured horizon and summarise each stream
    pub fn generate_annual_forecast(&self) -> Result<AnnualForecast> {
        let today = chrono::Local::now().date_naive();
        self.generate_annual_forecast_at(today, &mut StdRng::from_entropy())
    }

    pub fn generate_annual_forecast_at<R: Rng>(
        &self,
        today: NaiveDate,
        rng: &mut R,
    ) -> Result<AnnualForecast> {
        let forecasts = self.generate_at(today, self.settings.horizon_months, rng)?;
        let summary = forecasts
            .values()
            .map(ForecastSeries::summary)
            .collect::<Result<Vec<_>>>()?;

        for line in &summary {
            debug!("{}", line);
        }

        Ok(AnnualForecast { forecasts, summary })
    }

    /// Resolve every stream, recording the states each one passed through
    pub fn resolve_all<R: Rng>(
        &self,
        today: NaiveDate,
        horizon: usize,
        rng: &mut R,
    ) -> Result<BTreeMap<RevenueStream, ResolvedSeries>> {
        if horizon == 0 {
            return Err(ForecastError::Data(
                "Forecast horizon must be at least one month".to_string(),
            ));
        }

        let dates = future_month_starts(today, horizon)?;
        info!(
            months = dates.len(),
            models = self.models.loaded_count(),
            "Generating forecast"
        );

        let mut resolved = BTreeMap::new();
        for stream in RevenueStream::COMPONENTS {
            resolved.insert(stream, self.resolve_component(stream, &dates, rng)?);
        }

        let components: BTreeMap<RevenueStream, ForecastSeries> = resolved
            .iter()
            .map(|(stream, r)| (*stream, r.series.clone()))
            .collect();
        resolved.insert(
            RevenueStream::TotalRevenue,
            self.resolve_total(&components, &dates, rng)?,
        );

        Ok(resolved)
    }

    fn resolve_component<R: Rng>(
        &self,
        stream: RevenueStream,
        dates: &[NaiveDate],
        rng: &mut R,
    ) -> Result<ResolvedSeries> {
        let mut states = Vec::new();

        if let Some(series) = self.try_model(stream, dates, rng, &mut states)? {
            return Ok(ResolvedSeries { series, states });
        }

        debug!(stream = %stream, "Using statistical pattern");
        Ok(ResolvedSeries {
            series: self.pattern_series(stream, dates)?,
            states,
        })
    }

    fn resolve_total<R: Rng>(
        &self,
        components: &BTreeMap<RevenueStream, ForecastSeries>,
        dates: &[NaiveDate],
        rng: &mut R,
    ) -> Result<ResolvedSeries> {
        let stream = RevenueStream::TotalRevenue;
        let mut states = Vec::new();

        if let Some(series) = self.try_model(stream, dates, rng, &mut states)? {
            return Ok(ResolvedSeries { series, states });
        }

        match self.compose_total(components, dates) {
            Ok(series) => {
                info!("Calculated total revenue from components");
                Ok(ResolvedSeries { series, states })
            }
            Err(err @ ForecastError::InsufficientComponents { .. }) => {
                warn!(error = %err, "Falling back to total revenue pattern");
                states.push(StreamState::CompositionFailed {
                    reason: err.to_string(),
                });
                Ok(ResolvedSeries {
                    series: self.pattern_series(stream, dates)?,
                    states,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Run the model path if the stream has a handle. Prediction failures
    /// are recorded in `states` and reported as `Ok(None)`.
    fn try_model<R: Rng>(
        &self,
        stream: RevenueStream,
        dates: &[NaiveDate],
        rng: &mut R,
        states: &mut Vec<StreamState>,
    ) -> Result<Option<ForecastSeries>> {
        let Some(handle) = self.models.handle(stream) else {
            states.push(StreamState::NoHandle);
            return Ok(None);
        };

        states.push(StreamState::Loaded);
        match self.model_series(handle, dates, rng) {
            Ok(series) => {
                states.push(StreamState::PredictionOk);
                debug!(stream = %stream, family = %handle.family(), "Used trained model");
                Ok(Some(series))
            }
            Err(ForecastError::Prediction(reason)) => {
                warn!(stream = %stream, %reason, "Model prediction failed, using fallback");
                states.push(StreamState::PredictionFailed { reason });
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Scale, perturb and clip a model's raw output.
    ///
    /// Raw values are multiplied by the stream's scaling factor, perturbed by
    /// up to ±`model_noise`, then clipped to the pattern's plausible band.
    pub fn model_series<R: Rng>(
        &self,
        handle: &ModelHandle,
        dates: &[NaiveDate],
        rng: &mut R,
    ) -> Result<ForecastSeries> {
        let stream = handle.stream();
        let raw = handle.predict(dates)?;

        let factor = self.settings.scaling_factor(stream);
        let pattern = self.patterns.get(stream);
        let floor = pattern.min_value * self.settings.model_floor_factor;
        let ceiling = pattern.max_value * self.settings.model_ceiling_factor;
        let noise = self.settings.model_noise;

        let values: Vec<f64> = raw
            .iter()
            .map(|point| {
                let jitter = 1.0 + rng.gen_range(-noise..=noise);
                (point.value * factor * jitter).clamp(floor, ceiling)
            })
            .collect();

        let half_width = self.band_half_width(&values)?;
        ForecastSeries::with_band(
            stream,
            ForecastMethod::ModelPrediction,
            dates,
            &values,
            half_width,
            floor,
        )
    }

    /// Synthesise a stream's series from its fallback pattern.
    ///
    /// Variation is drawn from a generator seeded by the configured seed and
    /// the stream label, so the same seed always yields the same series.
    pub fn pattern_series(&self, stream: RevenueStream, dates: &[NaiveDate]) -> Result<ForecastSeries> {
        let pattern = self.patterns.get(stream);
        let floor = pattern.min_value * self.settings.pattern_floor_factor;
        let ceiling = pattern.max_value * self.settings.pattern_ceiling_factor;
        let variation = pattern.monthly_variation;
        let mut rng = StdRng::seed_from_u64(self.settings.seed ^ fnv1a(stream.label()));

        let values: Vec<f64> = dates
            .iter()
            .enumerate()
            .map(|(i, date)| {
                let jitter = 1.0 + rng.gen_range(-variation..=variation);
                (pattern.shape(i, date.month()) * jitter).clamp(floor, ceiling)
            })
            .collect();

        let half_width = self.band_half_width(&values)?;
        ForecastSeries::with_band(
            stream,
            ForecastMethod::StatisticalPattern,
            dates,
            &values,
            half_width,
            floor,
        )
    }

    /// Sum component series month by month.
    ///
    /// A component counts for a month when it has a finite, positive value
    /// there. Every month needs at least `min_components` of them; otherwise
    /// the whole composition fails rather than mixing partial sums with a
    /// fallback.
    pub fn compose_total(
        &self,
        components: &BTreeMap<RevenueStream, ForecastSeries>,
        dates: &[NaiveDate],
    ) -> Result<ForecastSeries> {
        let required = self.settings.min_components;
        let mut totals = Vec::with_capacity(dates.len());

        for (i, &month) in dates.iter().enumerate() {
            let valid: Vec<f64> = RevenueStream::COMPONENTS
                .iter()
                .filter_map(|stream| components.get(stream))
                .filter_map(|series| series.points().get(i))
                .filter(|point| point.date == month && point.value.is_finite() && point.value > 0.0)
                .map(|point| point.value)
                .collect();

            if valid.len() < required {
                return Err(ForecastError::InsufficientComponents {
                    month,
                    found: valid.len(),
                    required,
                });
            }
            totals.push(valid.iter().sum::<f64>());
        }

        let half_width = self.band_half_width(&totals)?;
        ForecastSeries::with_band(
            RevenueStream::TotalRevenue,
            ForecastMethod::DerivedFromComponents,
            dates,
            &totals,
            half_width,
            0.0,
        )
    }

    fn band_half_width(&self, values: &[f64]) -> Result<f64> {
        let std_dev = revenue_math::population_std_dev(values)?;
        Ok(self.settings.uncertainty_fraction * std_dev)
    }
}
