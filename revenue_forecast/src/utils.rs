//! Utility functions for the revenue_forecast crate

use chrono::{Datelike, NaiveDate};

use crate::error::{ForecastError, Result};

/// First day of the month following `today`
pub fn first_of_next_month(today: NaiveDate) -> Result<NaiveDate> {
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };

    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ForecastError::Data(format!("Date out of range after {}", today)))
}

/// `count` consecutive month starts beginning at the month after `today`
pub fn future_month_starts(today: NaiveDate, count: usize) -> Result<Vec<NaiveDate>> {
    let mut dates = Vec::new();
    let mut current = first_of_next_month(today)?;

    for _ in 0..count {
        dates.push(current);
        current = first_of_next_month(current)?;
    }

    Ok(dates)
}

/// Whole calendar months from `from` to `to` (negative when `to` is earlier)
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32
}

/// Stable 64-bit FNV-1a hash, used to derive per-stream seeds
pub fn fnv1a(text: &str) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    text.bytes().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_of_next_month() {
        assert_eq!(first_of_next_month(date(2024, 1, 31)).unwrap(), date(2024, 2, 1));
        assert_eq!(first_of_next_month(date(2024, 12, 15)).unwrap(), date(2025, 1, 1));
    }

    #[test]
    fn test_future_month_starts_cross_year() {
        let dates = future_month_starts(date(2024, 11, 20), 3).unwrap();
        assert_eq!(dates, vec![date(2024, 12, 1), date(2025, 1, 1), date(2025, 2, 1)]);
    }

    #[test]
    fn test_future_month_starts_huge_count_is_range_error() {
        let near_end = date(NaiveDate::MAX.year(), 10, 1);
        assert!(matches!(
            future_month_starts(near_end, usize::MAX),
            Err(ForecastError::Data(_))
        ));
        assert!(future_month_starts(NaiveDate::MAX, usize::MAX).is_err());
    }

    #[test]
    fn test_months_between() {
        assert_eq!(months_between(date(2024, 1, 1), date(2025, 3, 1)), 14);
        assert_eq!(months_between(date(2024, 3, 1), date(2024, 1, 1)), -2);
    }

    #[test]
    fn test_fnv1a_is_stable() {
        assert_eq!(fnv1a(""), 0xcbf2_9ce4_8422_2325);
        assert_eq!(fnv1a("VAT"), fnv1a("VAT"));
        assert_ne!(fnv1a("VAT"), fnv1a("PAYE"));
    }
}
