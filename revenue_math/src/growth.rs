//! Growth and percentage-change calculations

use crate::{MathError, Result};

/// Percentage change from `previous` to `current`
pub fn pct_change(previous: f64, current: f64) -> Result<f64> {
    if previous == 0.0 {
        return Err(MathError::CalculationError(
            "Percentage change from a zero value is undefined".to_string(),
        ));
    }

    Ok((current - previous) / previous * 100.0)
}

/// Period-over-period percentage changes of a series.
///
/// Periods starting from zero are skipped rather than reported as infinite.
pub fn pct_changes(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter_map(|w| pct_change(w[0], w[1]).ok())
        .collect()
}

/// Growth from `first` to `last` in percent, `0.0` when `first` is zero
pub fn growth_percentage(first: f64, last: f64) -> f64 {
    pct_change(first, last).unwrap_or(0.0)
}

/// Compounding growth multiplier `(1 + rate)^periods`
pub fn compound_growth(rate: f64, periods: f64) -> f64 {
    (1.0 + rate).powf(periods)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pct_change() {
        assert_relative_eq!(pct_change(200.0, 250.0).unwrap(), 25.0);
        assert_relative_eq!(pct_change(200.0, 150.0).unwrap(), -25.0);
        assert!(pct_change(0.0, 10.0).is_err());
    }

    #[test]
    fn test_pct_changes_skip_zero_base() {
        let changes = pct_changes(&[100.0, 110.0, 0.0, 50.0]);
        assert_eq!(changes.len(), 2);
        assert_relative_eq!(changes[0], 10.0, epsilon = 1e-12);
        assert_relative_eq!(changes[1], -100.0);
    }

    #[test]
    fn test_growth_percentage_zero_first() {
        assert_eq!(growth_percentage(0.0, 100.0), 0.0);
    }

    #[test]
    fn test_compound_growth() {
        assert_relative_eq!(compound_growth(0.10, 1.0), 1.1);
        assert_relative_eq!(compound_growth(0.10, 0.0), 1.0);
        assert_relative_eq!(compound_growth(0.21, 0.5), 1.1, epsilon = 1e-12);
    }
}
