//! Additive time-series regression (trend plus yearly Fourier seasonality)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{ForecastError, Result};
use crate::models::{MonthFeatures, PredictedPoint};

/// One harmonic of the yearly seasonal component
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FourierTerm {
    #[serde(alias = "a")]
    pub sin: f64,
    #[serde(alias = "b")]
    pub cos: f64,
}

/// Trained additive regression:
/// `y(t) = intercept + slope * t + Σ_k (sin_k · sin(2πk·m/12) + cos_k · cos(2πk·m/12))`
/// where `t` counts months since `reference_date` and `m` is the zero-based month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesRegression {
    /// Date the trend is anchored at
    #[serde(alias = "start")]
    pub reference_date: NaiveDate,
    /// Level at the reference date
    #[serde(alias = "m")]
    pub intercept: f64,
    /// Trend increment per month
    #[serde(alias = "k")]
    pub slope: f64,
    /// Yearly seasonality harmonics, first harmonic first
    #[serde(default, alias = "yearly_seasonality")]
    pub yearly: Vec<FourierTerm>,
    /// Half-width of the prediction interval in raw units
    #[serde(default)]
    pub interval_width: f64,
}

impl TimeSeriesRegression {
    pub fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<PredictedPoint>> {
        if self.interval_width < 0.0 {
            return Err(ForecastError::Prediction(
                "Interval width must not be negative".to_string(),
            ));
        }

        let points = dates
            .iter()
            .map(|&date| {
                let features = MonthFeatures::new(self.reference_date, date);
                let value = self.intercept
                    + self.slope * features.offset
                    + self.seasonal(features.month0);

                PredictedPoint {
                    value,
                    lower: Some(value - self.interval_width),
                    upper: Some(value + self.interval_width),
                }
            })
            .collect();

        Ok(points)
    }

    fn seasonal(&self, month0: usize) -> f64 {
        self.yearly
            .iter()
            .enumerate()
            .map(|(k, term)| {
                let angle = 2.0 * PI * (k + 1) as f64 * month0 as f64 / 12.0;
                term.sin * angle.sin() + term.cos * angle.cos()
            })
            .sum()
    }
}
