//! Trend and seasonality analysis of the baseline dataset

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::data::BaselineDataset;
use crate::error::{ForecastError, Result};
use crate::stream::RevenueStream;

/// Recent behaviour of one stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamTrend {
    pub stream: RevenueStream,
    pub current_value: f64,
    /// Latest month-over-month growth, percent
    pub growth_rate: f64,
    /// Sample standard deviation of monthly growth, percent
    pub volatility: f64,
    /// Growth from first to last observation, percent
    pub total_growth: f64,
}

/// Average revenue per calendar month for one stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalPattern {
    pub stream: RevenueStream,
    /// One-based calendar month to average value, months without data omitted
    pub monthly_averages: BTreeMap<u32, f64>,
    pub peak_month: u32,
    pub trough_month: u32,
}

/// Trend for every stream the baseline observes
pub fn revenue_trends(baseline: &BaselineDataset) -> Result<Vec<StreamTrend>> {
    if baseline.is_empty() {
        return Err(ForecastError::NoBaselineData);
    }

    let trends = baseline
        .streams()
        .into_iter()
        .filter_map(|stream| {
            let values: Vec<f64> = baseline.series(stream).into_iter().map(|(_, v)| v).collect();
            let (&first, &current) = (values.first()?, values.last()?);

            let growth_rate = match values.as_slice() {
                [.., previous, last] => revenue_math::growth_percentage(*previous, *last),
                _ => 0.0,
            };
            let changes = revenue_math::pct_changes(&values);

            Some(StreamTrend {
                stream,
                current_value: current,
                growth_rate,
                // fewer than two changes have no spread
                volatility: revenue_math::sample_std_dev(&changes).unwrap_or_default(),
                total_growth: revenue_math::growth_percentage(first, current),
            })
        })
        .collect();

    Ok(trends)
}

/// Seasonal profile of every component stream the baseline observes
pub fn seasonal_patterns(baseline: &BaselineDataset) -> Result<Vec<SeasonalPattern>> {
    if baseline.is_empty() {
        return Err(ForecastError::NoBaselineData);
    }

    let mut patterns = Vec::new();
    for stream in baseline.streams().into_iter().filter(RevenueStream::is_component) {
        let mut by_month: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for (date, value) in baseline.series(stream) {
            by_month.entry(date.month()).or_default().push(value);
        }

        let monthly_averages = by_month
            .into_iter()
            .map(|(month, values)| Ok((month, revenue_math::mean(&values)?)))
            .collect::<Result<BTreeMap<u32, f64>>>()?;

        let mut months = monthly_averages.iter();
        let Some((&first_month, &first_value)) = months.next() else {
            continue;
        };
        let (mut peak, mut trough) = ((first_month, first_value), (first_month, first_value));
        for (&month, &value) in months {
            if value > peak.1 {
                peak = (month, value);
            }
            if value < trough.1 {
                trough = (month, value);
            }
        }

        patterns.push(SeasonalPattern {
            stream,
            monthly_averages,
            peak_month: peak.0,
            trough_month: trough.0,
        });
    }

    Ok(patterns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BaselineRecord;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn dataset() -> BaselineDataset {
        let rows = [
            (2023, 1, 100.0, 1000.0),
            (2023, 2, 110.0, 1100.0),
            (2023, 3, 99.0, 1200.0),
            (2024, 1, 120.0, 1300.0),
        ];

        BaselineDataset::new(
            rows.iter()
                .map(|&(y, m, vat, total)| {
                    BaselineRecord::new(
                        NaiveDate::from_ymd_opt(y, m, 1).unwrap(),
                        [(RevenueStream::Vat, vat), (RevenueStream::TotalRevenue, total)],
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn test_trends() {
        let trends = revenue_trends(&dataset()).unwrap();
        assert_eq!(trends.len(), 2);

        let vat = trends[0];
        assert_eq!(vat.stream, RevenueStream::Vat);
        assert_relative_eq!(vat.current_value, 120.0);
        assert_relative_eq!(vat.total_growth, 20.0, epsilon = 1e-9);
        assert_relative_eq!(vat.growth_rate, (120.0 - 99.0) / 99.0 * 100.0, epsilon = 1e-9);
        assert!(vat.volatility > 0.0);
    }

    #[test]
    fn test_seasonal_pattern_components_only() {
        let patterns = seasonal_patterns(&dataset()).unwrap();
        assert_eq!(patterns.len(), 1);

        let vat = &patterns[0];
        assert_relative_eq!(vat.monthly_averages[&1], 110.0);
        assert_eq!(vat.peak_month, 1);
        assert_eq!(vat.trough_month, 3);
    }

    #[test]
    fn test_empty_baseline() {
        assert!(matches!(
            revenue_trends(&BaselineDataset::empty()),
            Err(ForecastError::NoBaselineData)
        ));
        assert!(seasonal_patterns(&BaselineDataset::empty()).is_err());
    }
}
