//! Deviation of historical predictions from collected revenue

use serde::{Deserialize, Serialize};
use std::fmt;

use chrono::NaiveDate;

use crate::data::{ActualVsPredicted, BaselineDataset};
use crate::error::{ForecastError, Result};
use crate::stream::RevenueStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub date: NaiveDate,
    pub stream: RevenueStream,
    pub actual: f64,
    pub predicted: f64,
    /// `|actual - predicted| / |actual| * 100`
    pub deviation_pct: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub anomalies: Vec<Anomaly>,
    pub severity_counts: SeverityCounts,
}

/// Headline figures for the dashboard overview
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DashboardKpis {
    /// Latest total revenue
    pub total_revenue: f64,
    /// Month-over-month growth of total revenue, percent
    pub growth_rate: f64,
    /// Observations deviating more than the flag threshold
    pub anomalies_count: usize,
}

/// Percentage deviation of a prediction, `None` when nothing was collected
pub fn deviation_percentage(actual: f64, predicted: f64) -> Option<f64> {
    if actual == 0.0 {
        return None;
    }
    Some((actual - predicted).abs() / actual.abs() * 100.0)
}

/// Classifies prediction deviations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyDetector {
    /// Deviation above which an observation is high severity
    pub high_pct: f64,
    /// Deviation above which an observation is medium severity
    pub medium_pct: f64,
    /// Deviation above which an observation counts towards the KPI
    pub flag_pct: f64,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self {
            high_pct: 20.0,
            medium_pct: 10.0,
            flag_pct: 15.0,
        }
    }
}

impl AnomalyDetector {
    pub fn severity(&self, deviation_pct: f64) -> Severity {
        if deviation_pct > self.high_pct {
            Severity::High
        } else if deviation_pct > self.medium_pct {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    /// Classify every observation with a non-zero actual value
    pub fn report(&self, observations: &[ActualVsPredicted]) -> AnomalyReport {
        let mut counts = SeverityCounts::default();

        let anomalies = observations
            .iter()
            .filter_map(|obs| {
                let deviation_pct = deviation_percentage(obs.actual, obs.predicted)?;
                let severity = self.severity(deviation_pct);
                match severity {
                    Severity::High => counts.high += 1,
                    Severity::Medium => counts.medium += 1,
                    Severity::Low => counts.low += 1,
                }

                Some(Anomaly {
                    date: obs.date,
                    stream: obs.stream,
                    actual: obs.actual,
                    predicted: obs.predicted,
                    deviation_pct,
                    severity,
                })
            })
            .collect();

        AnomalyReport {
            anomalies,
            severity_counts: counts,
        }
    }

    /// Observations deviating more than `flag_pct`
    pub fn count_flagged(&self, observations: &[ActualVsPredicted]) -> usize {
        observations
            .iter()
            .filter_map(|obs| deviation_percentage(obs.actual, obs.predicted))
            .filter(|&deviation| deviation > self.flag_pct)
            .count()
    }

    pub fn kpis(&self, baseline: &BaselineDataset, observations: &[ActualVsPredicted]) -> Result<DashboardKpis> {
        let totals = baseline.totals();
        let &(_, total_revenue) = totals.last().ok_or(ForecastError::NoBaselineData)?;

        let growth_rate = match totals.as_slice() {
            [.., (_, previous), (_, current)] => revenue_math::growth_percentage(*previous, *current),
            _ => 0.0,
        };

        Ok(DashboardKpis {
            total_revenue,
            growth_rate,
            anomalies_count: self.count_flagged(observations),
        })
    }
}
