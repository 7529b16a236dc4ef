//! Lightweight heuristic forecaster: compounding level with monthly factors

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::models::{MonthFeatures, PredictedPoint};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightweightHeuristic {
    pub reference_date: NaiveDate,
    /// Level at the reference date
    #[serde(alias = "base")]
    pub level: f64,
    /// Compounded once per month
    #[serde(alias = "growth")]
    pub monthly_growth: f64,
    /// Either empty or twelve multiplicative factors, January first
    #[serde(default, alias = "seasonality")]
    pub seasonal_factors: Vec<f64>,
}

impl LightweightHeuristic {
    pub fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<PredictedPoint>> {
        if !self.seasonal_factors.is_empty() && self.seasonal_factors.len() != 12 {
            return Err(ForecastError::Prediction(format!(
                "Expected 12 seasonal factors, found {}",
                self.seasonal_factors.len()
            )));
        }

        let points = dates
            .iter()
            .map(|&date| {
                let features = MonthFeatures::new(self.reference_date, date);
                let seasonal = self
                    .seasonal_factors
                    .get(features.month0)
                    .copied()
                    .unwrap_or(1.0);
                let value =
                    self.level * (1.0 + self.monthly_growth).powf(features.offset) * seasonal;
                PredictedPoint::point(value)
            })
            .collect();

        Ok(points)
    }
}
