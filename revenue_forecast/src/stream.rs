//! Revenue stream identities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ForecastError;

/// One enumerated category of tax revenue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RevenueStream {
    #[serde(rename = "VAT")]
    Vat,
    /// Corporate and income tax. Baseline datasets call this `Income_Tax`.
    #[serde(rename = "Corporate_Tax", alias = "Income_Tax")]
    CorporateTax,
    #[serde(rename = "Customs_Duties")]
    CustomsDuties,
    #[serde(rename = "Excise_Tax")]
    ExciseTax,
    #[serde(rename = "Mineral_Royalty")]
    MineralRoyalty,
    #[serde(rename = "PAYE")]
    Paye,
    #[serde(rename = "Total_Revenue")]
    TotalRevenue,
}

impl RevenueStream {
    /// Every stream, total last
    pub const ALL: [RevenueStream; 7] = [
        RevenueStream::Vat,
        RevenueStream::CorporateTax,
        RevenueStream::CustomsDuties,
        RevenueStream::ExciseTax,
        RevenueStream::MineralRoyalty,
        RevenueStream::Paye,
        RevenueStream::TotalRevenue,
    ];

    /// The six streams that add up to total revenue
    pub const COMPONENTS: [RevenueStream; 6] = [
        RevenueStream::Vat,
        RevenueStream::CorporateTax,
        RevenueStream::CustomsDuties,
        RevenueStream::ExciseTax,
        RevenueStream::MineralRoyalty,
        RevenueStream::Paye,
    ];

    /// Streams the scenario simulator predicts
    pub const SCENARIO: [RevenueStream; 4] = [
        RevenueStream::Vat,
        RevenueStream::CorporateTax,
        RevenueStream::CustomsDuties,
        RevenueStream::ExciseTax,
    ];

    /// Canonical label, also used as the dataset column name
    pub fn label(&self) -> &'static str {
        match self {
            RevenueStream::Vat => "VAT",
            RevenueStream::CorporateTax => "Corporate_Tax",
            RevenueStream::CustomsDuties => "Customs_Duties",
            RevenueStream::ExciseTax => "Excise_Tax",
            RevenueStream::MineralRoyalty => "Mineral_Royalty",
            RevenueStream::Paye => "PAYE",
            RevenueStream::TotalRevenue => "Total_Revenue",
        }
    }

    /// Label with underscores replaced by spaces
    pub fn display_name(&self) -> String {
        self.label().replace('_', " ")
    }

    /// Key used in scenario breakdowns
    pub fn scenario_key(&self) -> &'static str {
        match self {
            RevenueStream::Vat => "vat",
            RevenueStream::CorporateTax => "income_tax",
            RevenueStream::CustomsDuties => "customs",
            RevenueStream::ExciseTax => "excise",
            RevenueStream::MineralRoyalty => "mineral_royalty",
            RevenueStream::Paye => "paye",
            RevenueStream::TotalRevenue => "total_revenue",
        }
    }

    /// File name of this stream's serialized model artifact
    pub fn artifact_file_name(&self) -> String {
        format!("{}_model.json", self.label())
    }

    pub fn is_component(&self) -> bool {
        !matches!(self, RevenueStream::TotalRevenue)
    }
}

impl fmt::Display for RevenueStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RevenueStream {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace(' ', "_").to_ascii_lowercase();
        let stream = match normalized.as_str() {
            "vat" => RevenueStream::Vat,
            "corporate_tax" | "income_tax" => RevenueStream::CorporateTax,
            "customs_duties" | "customs" => RevenueStream::CustomsDuties,
            "excise_tax" | "excise" => RevenueStream::ExciseTax,
            "mineral_royalty" => RevenueStream::MineralRoyalty,
            "paye" => RevenueStream::Paye,
            "total_revenue" | "total" => RevenueStream::TotalRevenue,
            _ => {
                return Err(ForecastError::Data(format!(
                    "Unknown revenue stream: {}",
                    s
                )))
            }
        };

        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trip() {
        for stream in RevenueStream::ALL {
            assert_eq!(stream.label().parse::<RevenueStream>().unwrap(), stream);
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!(
            "Income_Tax".parse::<RevenueStream>().unwrap(),
            RevenueStream::CorporateTax
        );
        assert_eq!(
            "Customs Duties".parse::<RevenueStream>().unwrap(),
            RevenueStream::CustomsDuties
        );
        assert!("Stamp_Duty".parse::<RevenueStream>().is_err());
    }

    #[test]
    fn test_components_exclude_total() {
        assert_eq!(RevenueStream::COMPONENTS.len(), 6);
        assert!(RevenueStream::COMPONENTS.iter().all(|s| s.is_component()));
        assert!(!RevenueStream::TotalRevenue.is_component());
    }

    #[test]
    fn test_artifact_file_name() {
        assert_eq!(RevenueStream::Paye.artifact_file_name(), "PAYE_model.json");
    }
}
