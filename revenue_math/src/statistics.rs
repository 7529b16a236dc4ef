//! Descriptive statistics over revenue series
//!
//! Thin wrappers around `statrs` that turn its NaN-on-empty convention into
//! explicit errors.

use crate::growth::growth_percentage;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Arithmetic mean of a series
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot calculate mean of an empty series".to_string(),
        ));
    }

    Ok(Statistics::mean(values.iter()))
}

/// Population standard deviation (divides by `n`)
pub fn population_std_dev(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot calculate standard deviation of an empty series".to_string(),
        ));
    }

    Ok(Statistics::population_std_dev(values.iter()))
}

/// Sample standard deviation (divides by `n - 1`)
pub fn sample_std_dev(values: &[f64]) -> Result<f64> {
    if values.len() < 2 {
        return Err(MathError::InsufficientData(format!(
            "Sample standard deviation needs at least 2 values, have {}",
            values.len()
        )));
    }

    Ok(Statistics::std_dev(values.iter()))
}

/// Summary statistics of a finite, non-empty series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    /// Sum of all values
    pub total: f64,
    /// Arithmetic mean
    pub mean: f64,
    /// Largest value
    pub max: f64,
    /// Smallest value
    pub min: f64,
    /// Percentage growth from the first to the last value
    pub growth_pct: f64,
}

impl SeriesStats {
    /// Compute the summary of a series
    pub fn from_values(values: &[f64]) -> Result<Self> {
        let (first, last) = match (values.first(), values.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => {
                return Err(MathError::InsufficientData(
                    "Cannot summarise an empty series".to_string(),
                ))
            }
        };

        if values.iter().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Series contains non-finite values".to_string(),
            ));
        }

        let total: f64 = values.iter().sum();
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);

        Ok(Self {
            total,
            mean: total / values.len() as f64,
            max,
            min,
            growth_pct: growth_percentage(first, last),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_std_dev() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];

        assert_relative_eq!(mean(&values).unwrap(), 5.0);
        assert_relative_eq!(population_std_dev(&values).unwrap(), 2.0);
        assert_relative_eq!(
            sample_std_dev(&values).unwrap(),
            2.138089935299395,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_empty_series_is_an_error() {
        assert!(matches!(mean(&[]), Err(MathError::InsufficientData(_))));
        assert!(population_std_dev(&[]).is_err());
        assert!(sample_std_dev(&[1.0]).is_err());
    }

    #[test]
    fn test_series_stats() {
        let stats = SeriesStats::from_values(&[100.0, 120.0, 90.0, 110.0]).unwrap();

        assert_relative_eq!(stats.total, 420.0);
        assert_relative_eq!(stats.mean, 105.0);
        assert_relative_eq!(stats.max, 120.0);
        assert_relative_eq!(stats.min, 90.0);
        assert_relative_eq!(stats.growth_pct, 10.0);
    }

    #[test]
    fn test_series_stats_rejects_nan() {
        let result = SeriesStats::from_values(&[1.0, f64::NAN]);
        assert!(matches!(result, Err(MathError::InvalidInput(_))));
    }
}
