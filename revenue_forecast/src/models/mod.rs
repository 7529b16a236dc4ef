//! Predictive models loaded from trained artifacts
//!
//! Each supported model family is a variant of [`PredictiveModel`]. All of
//! them expose the same capability: predict one point per requested month.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ForecastError, Result};
use crate::stream::RevenueStream;
use crate::utils::months_between;

pub mod gradient_boosting;
pub mod heuristic;
pub mod time_series;

pub use gradient_boosting::{GradientBoostedTrees, RegressionTree, TreeFeature, TreeNode};
pub use heuristic::LightweightHeuristic;
pub use time_series::{FourierTerm, TimeSeriesRegression};

/// Family a model artifact belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFamily {
    TimeSeriesRegression,
    GradientBoostedTree,
    LightweightHeuristic,
    Unknown,
}

impl ModelFamily {
    /// Classify a type signature such as `prophet.forecaster.Prophet`
    pub fn classify(type_signature: &str) -> Self {
        let signature = type_signature.to_ascii_lowercase();

        if ["xgb", "boost", "tree"].iter().any(|p| signature.contains(p)) {
            ModelFamily::GradientBoostedTree
        } else if ["prophet", "arima", "time_series", "timeseries"]
            .iter()
            .any(|p| signature.contains(p))
        {
            ModelFamily::TimeSeriesRegression
        } else if ["lightweight", "heuristic"]
            .iter()
            .any(|p| signature.contains(p))
        {
            ModelFamily::LightweightHeuristic
        } else {
            ModelFamily::Unknown
        }
    }

    /// Whether artifacts of this family can predict
    pub fn has_predict(&self) -> bool {
        !matches!(self, ModelFamily::Unknown)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModelFamily::TimeSeriesRegression => "time_series_regression",
            ModelFamily::GradientBoostedTree => "gradient_boosted_tree",
            ModelFamily::LightweightHeuristic => "lightweight_heuristic",
            ModelFamily::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One predicted month in raw model units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictedPoint {
    /// Point estimate
    pub value: f64,
    /// Lower prediction bound, if the family produces one
    pub lower: Option<f64>,
    /// Upper prediction bound, if the family produces one
    pub upper: Option<f64>,
}

impl PredictedPoint {
    pub fn point(value: f64) -> Self {
        Self {
            value,
            lower: None,
            upper: None,
        }
    }
}

/// A loaded, callable model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", content = "params", rename_all = "snake_case")]
pub enum PredictiveModel {
    TimeSeriesRegression(TimeSeriesRegression),
    GradientBoostedTree(GradientBoostedTrees),
    LightweightHeuristic(LightweightHeuristic),
}

impl PredictiveModel {
    pub fn family(&self) -> ModelFamily {
        match self {
            PredictiveModel::TimeSeriesRegression(_) => ModelFamily::TimeSeriesRegression,
            PredictiveModel::GradientBoostedTree(_) => ModelFamily::GradientBoostedTree,
            PredictiveModel::LightweightHeuristic(_) => ModelFamily::LightweightHeuristic,
        }
    }

    /// Predict one point per date.
    ///
    /// The output is checked before it is returned: one point per date, and
    /// every value finite. Anything else is a [`ForecastError::Prediction`].
    pub fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<PredictedPoint>> {
        let points = match self {
            PredictiveModel::TimeSeriesRegression(model) => model.predict(dates)?,
            PredictiveModel::GradientBoostedTree(model) => model.predict(dates)?,
            PredictiveModel::LightweightHeuristic(model) => model.predict(dates)?,
        };

        if points.len() != dates.len() {
            return Err(ForecastError::Prediction(format!(
                "{} model returned {} points for {} dates",
                self.family(),
                points.len(),
                dates.len()
            )));
        }

        let malformed = points.iter().any(|p| {
            !p.value.is_finite()
                || p.lower.is_some_and(|v| !v.is_finite())
                || p.upper.is_some_and(|v| !v.is_finite())
        });
        if malformed {
            return Err(ForecastError::Prediction(format!(
                "{} model returned non-finite estimates",
                self.family()
            )));
        }

        Ok(points)
    }
}

/// A model bound to its revenue stream.
///
/// `PredictiveModel` has no unknown variant, so every handle can predict;
/// artifacts without a predict capability are rejected while decoding.
#[derive(Debug, Clone)]
pub struct ModelHandle {
    stream: RevenueStream,
    elasticity: f64,
    base_value: f64,
    model: PredictiveModel,
}

impl ModelHandle {
    pub fn new(
        stream: RevenueStream,
        model: PredictiveModel,
        elasticity: f64,
        base_value: f64,
    ) -> Self {
        Self {
            stream,
            elasticity,
            base_value,
            model,
        }
    }

    pub fn stream(&self) -> RevenueStream {
        self.stream
    }

    pub fn family(&self) -> ModelFamily {
        self.model.family()
    }

    /// Sensitivity of this stream's revenue to its governing rate
    pub fn elasticity(&self) -> f64 {
        self.elasticity
    }

    /// Reference revenue used when no historical value exists
    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    pub fn model(&self) -> &PredictiveModel {
        &self.model
    }

    pub fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<PredictedPoint>> {
        self.model.predict(dates)
    }
}

/// Calendar features shared by the model families
pub(crate) struct MonthFeatures {
    /// Months elapsed since the model's reference date
    pub offset: f64,
    /// Zero-based calendar month
    pub month0: usize,
    pub year: f64,
    /// One-based quarter
    pub quarter: f64,
}

impl MonthFeatures {
    pub(crate) fn new(reference: NaiveDate, date: NaiveDate) -> Self {
        let month0 = date.month0() as usize;
        Self {
            offset: f64::from(months_between(reference, date)),
            month0,
            year: f64::from(date.year()),
            quarter: (month0 / 3 + 1) as f64,
        }
    }
}
