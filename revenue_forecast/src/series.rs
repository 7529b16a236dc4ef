//! Forecast output types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ForecastError, Result};
use crate::stream::RevenueStream;

/// How a series was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ForecastMethod {
    ModelPrediction,
    StatisticalPattern,
    DerivedFromComponents,
}

impl ForecastMethod {
    /// Label shown on the dashboard
    pub fn label(&self) -> &'static str {
        match self {
            ForecastMethod::ModelPrediction => "ML Model",
            ForecastMethod::StatisticalPattern => "Statistical Pattern",
            ForecastMethod::DerivedFromComponents => "Calculated from Components",
        }
    }
}

impl fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One forecast month
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// First day of the forecast month
    pub date: NaiveDate,
    /// Point estimate, millions
    pub value: f64,
    /// Lower uncertainty bound
    pub lower: f64,
    /// Upper uncertainty bound
    pub upper: f64,
}

/// Monthly forecast for one stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    stream: RevenueStream,
    method: ForecastMethod,
    points: Vec<ForecastPoint>,
}

impl ForecastSeries {
    /// Create a series, checking that dates strictly increase
    pub fn new(
        stream: RevenueStream,
        method: ForecastMethod,
        points: Vec<ForecastPoint>,
    ) -> Result<Self> {
        if points.windows(2).any(|w| w[0].date >= w[1].date) {
            return Err(ForecastError::Data(format!(
                "Forecast dates for {} are not strictly increasing",
                stream
            )));
        }

        Ok(Self {
            stream,
            method,
            points,
        })
    }

    /// Build points from dates and values with a symmetric band of
    /// `half_width`, lower bounds floored at `floor`
    pub fn with_band(
        stream: RevenueStream,
        method: ForecastMethod,
        dates: &[NaiveDate],
        values: &[f64],
        half_width: f64,
        floor: f64,
    ) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::Data(format!(
                "Values length ({}) doesn't match dates length ({})",
                values.len(),
                dates.len()
            )));
        }

        let points = dates
            .iter()
            .zip(values)
            .map(|(&date, &value)| ForecastPoint {
                date,
                value,
                lower: (value - half_width).max(floor),
                upper: value + half_width,
            })
            .collect();

        Self::new(stream, method, points)
    }

    pub fn stream(&self) -> RevenueStream {
        self.stream
    }

    pub fn method(&self) -> ForecastMethod {
        self.method
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    /// Summary statistics over the horizon
    pub fn summary(&self) -> Result<ForecastSummary> {
        let stats = revenue_math::SeriesStats::from_values(&self.values())?;

        Ok(ForecastSummary {
            stream: self.stream,
            tax_type: self.stream.display_name(),
            total_forecast: stats.total,
            average_monthly: stats.mean,
            max_monthly: stats.max,
            min_monthly: stats.min,
            growth_rate: stats.growth_pct,
            method: self.method,
        })
    }
}

/// Per-stream statistics shown alongside the forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub stream: RevenueStream,
    /// Human-readable stream name
    pub tax_type: String,
    pub total_forecast: f64,
    pub average_monthly: f64,
    pub max_monthly: f64,
    pub min_monthly: f64,
    /// Percent growth from the first to the last month
    pub growth_rate: f64,
    pub method: ForecastMethod,
}

impl fmt::Display for ForecastSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let average = if self.average_monthly >= 1000.0 {
            format!("ZMW {:6.1}B", self.average_monthly / 1000.0)
        } else {
            format!("ZMW {:6.0}M", self.average_monthly)
        };

        write!(
            f,
            "{:18} | {} avg | {:6.1}% growth | {}",
            self.stream.label(),
            average,
            self.growth_rate,
            self.method
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn dates() -> Vec<NaiveDate> {
        (1..=3)
            .map(|m| NaiveDate::from_ymd_opt(2025, m, 1).unwrap())
            .collect()
    }

    #[test]
    fn test_band_is_floored() {
        let series = ForecastSeries::with_band(
            RevenueStream::Vat,
            ForecastMethod::StatisticalPattern,
            &dates(),
            &[100.0, 110.0, 120.0],
            15.0,
            90.0,
        )
        .unwrap();

        assert_eq!(series.points()[0].lower, 90.0);
        assert_eq!(series.points()[2].lower, 105.0);
        assert_eq!(series.points()[2].upper, 135.0);
    }

    #[test]
    fn test_rejects_unordered_dates() {
        let mut dates = dates();
        dates.swap(0, 1);

        let result = ForecastSeries::with_band(
            RevenueStream::Vat,
            ForecastMethod::StatisticalPattern,
            &dates,
            &[1.0, 2.0, 3.0],
            0.0,
            0.0,
        );
        assert!(matches!(result, Err(ForecastError::Data(_))));
    }

    #[test]
    fn test_summary() {
        let series = ForecastSeries::with_band(
            RevenueStream::ExciseTax,
            ForecastMethod::ModelPrediction,
            &dates(),
            &[8000.0, 9000.0, 10000.0],
            0.0,
            0.0,
        )
        .unwrap();

        let summary = series.summary().unwrap();
        assert_eq!(summary.tax_type, "Excise Tax");
        assert_relative_eq!(summary.total_forecast, 27000.0);
        assert_relative_eq!(summary.average_monthly, 9000.0);
        assert_relative_eq!(summary.growth_rate, 25.0);
        assert_eq!(summary.method, ForecastMethod::ModelPrediction);
        assert!(summary.to_string().contains("ZMW    9.0B"));
    }
}
