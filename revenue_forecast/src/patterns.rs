//! Fallback pattern registry
//!
//! Hand-authored seasonal and growth parameters used whenever a stream has no
//! usable trained model. Values are monthly revenue in millions.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::stream::RevenueStream;

/// How a pattern modulates its base value over the calendar year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalRule {
    /// `1 + s·sin(2π(m−1)/12)`
    Sinusoidal,
    /// Collections peak in quarter-end months
    QuarterlyPeaks,
    /// Provisional returns each quarter, annual return in June
    FilingSeason,
    /// 12-month commodity price cycle, `1 + s·cos(2π(m−1)/12)`
    CommodityCycle,
}

impl SeasonalRule {
    /// Multiplier for a one-based calendar `month` with amplitude `s`
    pub fn factor(&self, month: u32, s: f64) -> f64 {
        let phase = 2.0 * PI * f64::from(month.saturating_sub(1)) / 12.0;
        let quarter_end = month % 3 == 0;

        match self {
            SeasonalRule::Sinusoidal => 1.0 + s * phase.sin(),
            SeasonalRule::CommodityCycle => 1.0 + s * phase.cos(),
            SeasonalRule::QuarterlyPeaks if quarter_end => 1.0 + s,
            SeasonalRule::QuarterlyPeaks => 1.0 - s / 2.0,
            SeasonalRule::FilingSeason if month == 6 => 1.0 + 1.5 * s,
            SeasonalRule::FilingSeason if quarter_end => 1.0 + s,
            SeasonalRule::FilingSeason => 1.0 - s / 2.0,
        }
    }
}

/// Synthetic generator parameters for one stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackPattern {
    /// Monthly value at the start of the horizon
    pub base: f64,
    /// Linear increment per month
    pub trend: f64,
    /// Fractional seasonal amplitude
    pub seasonality: f64,
    /// Annualised growth rate, compounded over the horizon
    pub growth_rate: f64,
    /// Bound of the uniform monthly variation, e.g. `0.08` for ±8%
    pub monthly_variation: f64,
    /// Lowest plausible monthly value
    pub min_value: f64,
    /// Highest plausible monthly value
    pub max_value: f64,
    pub rule: SeasonalRule,
}

impl FallbackPattern {
    /// Pattern for streams the registry does not list
    pub const GENERIC: FallbackPattern = FallbackPattern {
        base: 15_000.0,
        trend: 500.0,
        seasonality: 0.10,
        growth_rate: 0.08,
        monthly_variation: 0.10,
        min_value: 1_000.0,
        max_value: 100_000.0,
        rule: SeasonalRule::Sinusoidal,
    };

    /// The deterministic part of the value at horizon step `i` in calendar `month`:
    /// trend, seasonality and compounding growth, without random variation
    pub fn shape(&self, i: usize, month: u32) -> f64 {
        let trended = self.base + self.trend * i as f64;
        let seasonal = self.rule.factor(month, self.seasonality);
        let growth = revenue_math::compound_growth(self.growth_rate, i as f64 / 12.0);
        trended * seasonal * growth
    }
}

/// Immutable lookup of fallback patterns by stream
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    patterns: BTreeMap<RevenueStream, FallbackPattern>,
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl PatternRegistry {
    /// The canonical pattern table
    pub fn standard() -> Self {
        let pattern = |base, trend, seasonality, growth_rate, monthly_variation, min_value, max_value, rule| {
            FallbackPattern {
                base,
                trend,
                seasonality,
                growth_rate,
                monthly_variation,
                min_value,
                max_value,
                rule,
            }
        };

        let patterns = BTreeMap::from([
            (
                RevenueStream::Vat,
                pattern(28_000.0, 800.0, 0.08, 0.10, 0.08, 25_000.0, 45_000.0, SeasonalRule::QuarterlyPeaks),
            ),
            (
                RevenueStream::CorporateTax,
                pattern(15_000.0, 400.0, 0.12, 0.08, 0.10, 12_000.0, 26_000.0, SeasonalRule::FilingSeason),
            ),
            (
                RevenueStream::CustomsDuties,
                pattern(12_000.0, 300.0, 0.06, 0.07, 0.09, 10_000.0, 20_000.0, SeasonalRule::Sinusoidal),
            ),
            (
                RevenueStream::ExciseTax,
                pattern(8_000.0, 200.0, 0.10, 0.06, 0.07, 7_000.0, 14_000.0, SeasonalRule::Sinusoidal),
            ),
            (
                RevenueStream::MineralRoyalty,
                pattern(10_000.0, 500.0, 0.15, 0.12, 0.20, 8_000.0, 22_000.0, SeasonalRule::CommodityCycle),
            ),
            (
                RevenueStream::Paye,
                pattern(18_000.0, 600.0, 0.05, 0.09, 0.06, 16_000.0, 30_000.0, SeasonalRule::Sinusoidal),
            ),
            (
                RevenueStream::TotalRevenue,
                pattern(85_000.0, 2_000.0, 0.07, 0.09, 0.08, 75_000.0, 150_000.0, SeasonalRule::Sinusoidal),
            ),
        ]);

        Self { patterns }
    }

    /// Registry with explicit entries; unlisted streams get [`FallbackPattern::GENERIC`]
    pub fn from_patterns(patterns: impl IntoIterator<Item = (RevenueStream, FallbackPattern)>) -> Self {
        Self {
            patterns: patterns.into_iter().collect(),
        }
    }

    pub fn get(&self, stream: RevenueStream) -> &FallbackPattern {
        self.patterns
            .get(&stream)
            .unwrap_or(&FallbackPattern::GENERIC)
    }

    pub fn is_explicit(&self, stream: RevenueStream) -> bool {
        self.patterns.contains_key(&stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_standard_registry_covers_every_stream() {
        let registry = PatternRegistry::standard();
        for stream in RevenueStream::ALL {
            assert!(registry.is_explicit(stream), "{} missing", stream);
            let pattern = registry.get(stream);
            assert!(pattern.min_value < pattern.base && pattern.base < pattern.max_value);
        }
    }

    #[test]
    fn test_unlisted_stream_gets_generic() {
        let registry = PatternRegistry::from_patterns([]);
        assert_eq!(*registry.get(RevenueStream::Paye), FallbackPattern::GENERIC);
    }

    #[rstest]
    #[case(SeasonalRule::QuarterlyPeaks, 3, 1.1)]
    #[case(SeasonalRule::QuarterlyPeaks, 4, 0.95)]
    #[case(SeasonalRule::FilingSeason, 6, 1.15)]
    #[case(SeasonalRule::FilingSeason, 12, 1.1)]
    #[case(SeasonalRule::FilingSeason, 1, 0.95)]
    #[case(SeasonalRule::Sinusoidal, 1, 1.0)]
    #[case(SeasonalRule::Sinusoidal, 4, 1.1)]
    #[case(SeasonalRule::CommodityCycle, 1, 1.1)]
    #[case(SeasonalRule::CommodityCycle, 7, 0.9)]
    fn test_seasonal_factor(#[case] rule: SeasonalRule, #[case] month: u32, #[case] expected: f64) {
        assert_relative_eq!(rule.factor(month, 0.1), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_shape_at_origin_is_seasonal_base() {
        let pattern = PatternRegistry::standard().get(RevenueStream::Vat).to_owned();
        // month 3 is a quarter-end peak
        assert_relative_eq!(pattern.shape(0, 3), 28_000.0 * 1.08);
    }
}
