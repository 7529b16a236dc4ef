//! Conversion of engine outputs into plain JSON trees
//!
//! Everything leaving the engine through this module is made of strings,
//! finite numbers, arrays and objects. Dates become `YYYY-MM-DD` strings and
//! streams their canonical labels. A non-finite number is a bug upstream and
//! fails with [`ForecastError::Serialization`].

use std::fmt::Debug;

use chrono::NaiveDate;
use num_traits::ToPrimitive;
use serde_json::{json, Map, Number, Value};

use crate::error::{ForecastError, Result};
use crate::generator::AnnualForecast;
use crate::scenario::ScenarioResult;
use crate::series::{ForecastSeries, ForecastSummary};

/// Types that convert into a transport-safe JSON tree
pub trait ToTransport {
    fn to_transport(&self) -> Result<Value>;
}

/// Convert any primitive number into a finite JSON number
pub fn number<T: ToPrimitive + Debug>(value: T) -> Result<Value> {
    value
        .to_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| {
            ForecastError::Serialization(format!("{:?} is not a finite number", value))
        })
}

/// Convert a slice of primitive numbers into a JSON array
pub fn numbers<T: ToPrimitive + Debug + Copy>(values: &[T]) -> Result<Value> {
    values
        .iter()
        .map(|&v| number(v))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

fn date(value: NaiveDate) -> Value {
    Value::String(value.format("%Y-%m-%d").to_string())
}

impl ToTransport for ForecastSeries {
    fn to_transport(&self) -> Result<Value> {
        let lower: Vec<f64> = self.points().iter().map(|p| p.lower).collect();
        let upper: Vec<f64> = self.points().iter().map(|p| p.upper).collect();

        Ok(json!({
            "stream": self.stream().label(),
            "method": self.method().label(),
            "dates": self.dates().into_iter().map(date).collect::<Vec<_>>(),
            "values": numbers(&self.values())?,
            "lower_bound": numbers(&lower)?,
            "upper_bound": numbers(&upper)?,
        }))
    }
}

impl ToTransport for ForecastSummary {
    fn to_transport(&self) -> Result<Value> {
        Ok(json!({
            "tax_type": self.tax_type,
            "total_forecast": number(self.total_forecast)?,
            "average_monthly": number(self.average_monthly)?,
            "max_monthly": number(self.max_monthly)?,
            "min_monthly": number(self.min_monthly)?,
            "growth_rate": number(self.growth_rate)?,
            "method": self.method.label(),
        }))
    }
}

impl ToTransport for AnnualForecast {
    fn to_transport(&self) -> Result<Value> {
        let mut forecasts = Map::new();
        for (stream, series) in &self.forecasts {
            forecasts.insert(stream.label().to_string(), series.to_transport()?);
        }

        let summary = self
            .summary
            .iter()
            .map(ToTransport::to_transport)
            .collect::<Result<Vec<_>>>()?;

        Ok(json!({
            "forecasts": forecasts,
            "summary": summary,
        }))
    }
}

impl ToTransport for ScenarioResult {
    fn to_transport(&self) -> Result<Value> {
        let mut breakdown = Map::new();
        for (stream, impact) in &self.breakdown {
            breakdown.insert(
                stream.scenario_key().to_string(),
                json!({
                    "projected": number(impact.projected)?,
                    "baseline": number(impact.baseline)?,
                    "delta": number(impact.delta)?,
                }),
            );
        }

        let timeline = self
            .timeline
            .iter()
            .map(|point| {
                Ok(json!({
                    "date": date(point.date),
                    "baseline": number(point.baseline)?,
                    "scenario": number(point.scenario)?,
                    "difference": number(point.difference)?,
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(json!({
            "current_revenue": number(self.baseline_total)?,
            "projected_revenue": number(self.projected_total)?,
            "revenue_change": number(self.revenue_change)?,
            "impact_percentage": number(self.impact_percentage)?,
            "tax_breakdown": breakdown,
            "corporate_impact": number(self.corporate_impact)?,
            "tax_rates_applied": {
                "vat": number(self.rates_applied.vat)?,
                "corporate": number(self.rates_applied.corporate)?,
                "income": number(self.rates_applied.income)?,
            },
            "methodology": self.methodology.label(),
            "models_used": self.models_used,
            "timeline": timeline,
        }))
    }
}
