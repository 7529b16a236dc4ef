//! Historical revenue datasets
//!
//! Baseline files are wide: a `date` column followed by one column per
//! stream. Actual-vs-predicted files are long: `date,stream,actual,predicted`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ForecastError, Result};
use crate::stream::RevenueStream;

/// Observed revenue for one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineRecord {
    pub date: NaiveDate,
    pub values: BTreeMap<RevenueStream, f64>,
}

impl BaselineRecord {
    pub fn new(date: NaiveDate, values: impl IntoIterator<Item = (RevenueStream, f64)>) -> Self {
        Self {
            date,
            values: values.into_iter().collect(),
        }
    }

    pub fn value(&self, stream: RevenueStream) -> Option<f64> {
        self.values.get(&stream).copied()
    }

    /// Recorded total revenue, else the sum of whatever components are present
    pub fn total(&self) -> Option<f64> {
        if let Some(total) = self.value(RevenueStream::TotalRevenue) {
            return Some(total);
        }

        let components: Vec<f64> = RevenueStream::COMPONENTS
            .iter()
            .filter_map(|&stream| self.value(stream))
            .collect();

        if components.is_empty() {
            None
        } else {
            Some(components.iter().sum())
        }
    }
}

/// Date-ordered historical observations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineDataset {
    records: Vec<BaselineRecord>,
}

impl BaselineDataset {
    /// Create a dataset, sorting records by date
    pub fn new(mut records: Vec<BaselineRecord>) -> Self {
        records.sort_by_key(|r| r.date);
        Self { records }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[BaselineRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most recent observation
    pub fn latest(&self) -> Option<&BaselineRecord> {
        self.records.last()
    }

    /// Latest observed value for a stream, looking back past months that lack it
    pub fn latest_value(&self, stream: RevenueStream) -> Option<f64> {
        self.records.iter().rev().find_map(|r| r.value(stream))
    }

    /// Streams with at least one observation, in stream order
    pub fn streams(&self) -> Vec<RevenueStream> {
        RevenueStream::ALL
            .into_iter()
            .filter(|&stream| self.records.iter().any(|r| r.values.contains_key(&stream)))
            .collect()
    }

    /// Dated observations of one stream
    pub fn series(&self, stream: RevenueStream) -> Vec<(NaiveDate, f64)> {
        self.records
            .iter()
            .filter_map(|r| r.value(stream).map(|v| (r.date, v)))
            .collect()
    }

    /// Per-month totals, see [`BaselineRecord::total`]
    pub fn totals(&self) -> Vec<(NaiveDate, f64)> {
        self.records
            .iter()
            .filter_map(|r| r.total().map(|v| (r.date, v)))
            .collect()
    }

    /// Sum of a stream's column
    pub fn column_sum(&self, stream: RevenueStream) -> f64 {
        if stream == RevenueStream::TotalRevenue {
            return self.totals().iter().map(|(_, v)| v).sum();
        }
        self.series(stream).iter().map(|(_, v)| v).sum()
    }
}

/// One historical prediction checked against what was collected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualVsPredicted {
    pub date: NaiveDate,
    pub stream: RevenueStream,
    pub actual: f64,
    pub predicted: f64,
}

#[derive(Debug, Deserialize)]
struct ActualRow {
    date: String,
    stream: String,
    actual: f64,
    predicted: f64,
}

/// Loads revenue datasets from CSV
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a wide baseline dataset from a CSV file
    pub fn baseline_from_csv<P: AsRef<Path>>(path: P) -> Result<BaselineDataset> {
        let file = File::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "Loading baseline dataset");
        Self::baseline_from_reader(file)
    }

    /// Load a wide baseline dataset from any reader.
    ///
    /// Columns that are not stream labels are ignored, as are empty cells.
    pub fn baseline_from_reader<R: Read>(reader: R) -> Result<BaselineDataset> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.clone();

        let date_idx = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case("date"))
            .ok_or_else(|| ForecastError::Data("Baseline data has no date column".to_string()))?;

        let columns: Vec<(usize, RevenueStream)> = headers
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != date_idx)
            .filter_map(|(i, name)| name.parse::<RevenueStream>().ok().map(|s| (i, s)))
            .collect();

        if columns.is_empty() {
            return Err(ForecastError::Data(
                "Baseline data has no revenue stream columns".to_string(),
            ));
        }

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            let record = result?;
            let date = parse_date(record.get(date_idx).unwrap_or_default())?;

            let mut values = BTreeMap::new();
            for &(idx, stream) in &columns {
                let field = record.get(idx).unwrap_or_default().trim();
                if field.is_empty() {
                    continue;
                }
                let value = field.parse::<f64>().map_err(|_| {
                    ForecastError::Data(format!(
                        "Row {}: invalid {} value '{}'",
                        row + 1,
                        stream,
                        field
                    ))
                })?;
                values.insert(stream, value);
            }

            records.push(BaselineRecord { date, values });
        }

        debug!(records = records.len(), streams = columns.len(), "Loaded baseline dataset");
        Ok(BaselineDataset::new(records))
    }

    /// Load actual-vs-predicted observations from a CSV file
    pub fn actuals_from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<ActualVsPredicted>> {
        let file = File::open(path.as_ref())?;
        Self::actuals_from_reader(file)
    }

    /// Load actual-vs-predicted observations from any reader, sorted by date
    pub fn actuals_from_reader<R: Read>(reader: R) -> Result<Vec<ActualVsPredicted>> {
        let mut reader = csv::Reader::from_reader(reader);

        let mut rows = Vec::new();
        for result in reader.deserialize::<ActualRow>() {
            let row = result?;
            rows.push(ActualVsPredicted {
                date: parse_date(&row.date)?,
                stream: row.stream.parse()?,
                actual: row.actual,
                predicted: row.predicted,
            });
        }

        rows.sort_by_key(|r| r.date);
        Ok(rows)
    }
}

/// Parse `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM`
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(&format!("{}-01", text), "%Y-%m-%d"))
        .map_err(|_| ForecastError::Data(format!("Invalid date '{}'", text)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const BASELINE: &str = "\
date,VAT,Income_Tax,Customs_Duties,Excise_Tax,Total_Revenue,notes
2024-02-01,4600,3300,1850,1210,10960,
2024-01-01,4500,3200,1800,1200,10700,first
2024-03-01,4700,,1900,1220,11100,
";

    fn date(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_baseline_sorted_and_columns_mapped() {
        let data = DataLoader::baseline_from_reader(BASELINE.as_bytes()).unwrap();

        assert_eq!(data.len(), 3);
        assert_eq!(data.records()[0].date, date(2024, 1));
        assert_eq!(data.latest().unwrap().date, date(2024, 3));
        assert_eq!(
            data.records()[0].value(RevenueStream::CorporateTax),
            Some(3200.0)
        );
    }

    #[test]
    fn test_latest_value_skips_gaps() {
        let data = DataLoader::baseline_from_reader(BASELINE.as_bytes()).unwrap();

        assert_eq!(data.latest().unwrap().value(RevenueStream::CorporateTax), None);
        assert_eq!(data.latest_value(RevenueStream::CorporateTax), Some(3300.0));
        assert_eq!(data.latest_value(RevenueStream::Paye), None);
    }

    #[test]
    fn test_total_from_components_when_missing() {
        let record = BaselineRecord::new(
            date(2024, 1),
            [(RevenueStream::Vat, 100.0), (RevenueStream::Paye, 50.0)],
        );
        assert_eq!(record.total(), Some(150.0));
        assert_eq!(BaselineRecord::new(date(2024, 1), []).total(), None);
    }

    #[test]
    fn test_rejects_bad_number() {
        let text = "date,VAT\n2024-01-01,lots\n";
        assert!(matches!(
            DataLoader::baseline_from_reader(text.as_bytes()),
            Err(ForecastError::Data(_))
        ));
    }

    #[test]
    fn test_actuals() {
        let text = "date,stream,actual,predicted\n2024-02-01,VAT,110,100\n2024-01-01,Income_Tax,90,100\n";
        let rows = DataLoader::actuals_from_reader(text.as_bytes()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].stream, RevenueStream::CorporateTax);
        assert_eq!(rows[1].actual, 110.0);
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-05-01").unwrap(), date(2024, 5));
        assert_eq!(parse_date("2024-05-01 00:00:00").unwrap(), date(2024, 5));
        assert_eq!(parse_date("2024-05").unwrap(), date(2024, 5));
        assert!(parse_date("May 2024").is_err());
    }
}
