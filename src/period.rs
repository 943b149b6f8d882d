//! The calendar month used to group expenses and settlements.

use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::Error;

/// A calendar month, e.g. October 2025.
///
/// All balances and settlements are scoped to a single period. Periods are
/// written as `YYYY-MM`, which also makes them sort correctly as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: i32,
    month: Month,
}

impl Period {
    /// Create a period for `month` of `year`.
    pub fn new(year: i32, month: Month) -> Self {
        Self { year, month }
    }

    /// The period that `date` falls in.
    pub fn from_date(date: Date) -> Self {
        Self::new(date.year(), date.month())
    }

    /// The year of the period.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// The month of the period.
    pub fn month(&self) -> Month {
        self.month
    }

    /// The period after this one.
    pub fn next(&self) -> Self {
        match self.month {
            Month::December => Self::new(self.year + 1, Month::January),
            month => Self::new(self.year, month.next()),
        }
    }

    /// Every period from `start` to `end`, inclusive.
    ///
    /// Returns an empty list if `end` is before `start`.
    pub fn range_inclusive(start: Period, end: Period) -> Vec<Period> {
        let mut periods = Vec::new();
        let mut current = start;

        while current <= end {
            periods.push(current);
            current = current.next();
        }

        periods
    }
}

impl Ord for Period {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.year, self.month as u8).cmp(&(other.year, other.month as u8))
    }
}

impl PartialOrd for Period {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month as u8)
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidPeriod(s.to_owned());

        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;

        let all_digits = |text: &str| text.bytes().all(|byte| byte.is_ascii_digit());

        if year.len() != 4 || month.len() != 2 || !all_digits(year) || !all_digits(month) {
            return Err(invalid());
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u8 = month.parse().map_err(|_| invalid())?;
        let month = Month::try_from(month).map_err(|_| invalid())?;

        Ok(Self::new(year, month))
    }
}

impl TryFrom<String> for Period {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Period::from_str(&value)
    }
}

impl From<Period> for String {
    fn from(value: Period) -> Self {
        value.to_string()
    }
}

impl ToSql for Period {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for Period {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;

        Period::from_str(text).map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

#[cfg(test)]
mod period_tests {
    use std::str::FromStr;

    use time::{Month, macros::date};

    use crate::{Error, Period};

    #[test]
    fn displays_as_year_and_zero_padded_month() {
        let period = Period::new(2025, Month::March);

        assert_eq!(period.to_string(), "2025-03");
    }

    #[test]
    fn parses_own_display_format() {
        let period = Period::from_str("2024-12").expect("Could not parse period");

        assert_eq!(period, Period::new(2024, Month::December));
    }

    #[test]
    fn parse_fails_on_month_out_of_range() {
        assert_eq!(
            Period::from_str("2024-13"),
            Err(Error::InvalidPeriod("2024-13".to_owned()))
        );
    }

    #[test]
    fn parse_fails_without_padding() {
        assert_eq!(
            Period::from_str("2024-1"),
            Err(Error::InvalidPeriod("2024-1".to_owned()))
        );
    }

    #[test]
    fn parse_fails_on_signed_parts() {
        assert_eq!(
            Period::from_str("+999-01"),
            Err(Error::InvalidPeriod("+999-01".to_owned()))
        );
        assert_eq!(
            Period::from_str("2024-+1"),
            Err(Error::InvalidPeriod("2024-+1".to_owned()))
        );
    }

    #[test]
    fn parse_fails_on_full_date() {
        assert!(Period::from_str("2024-01-15").is_err());
    }

    #[test]
    fn from_date_uses_year_and_month() {
        let period = Period::from_date(date!(2025 - 10 - 31));

        assert_eq!(period, Period::new(2025, Month::October));
    }

    #[test]
    fn next_rolls_over_year() {
        let period = Period::new(2024, Month::December);

        assert_eq!(period.next(), Period::new(2025, Month::January));
    }

    #[test]
    fn range_includes_both_ends() {
        let periods = Period::range_inclusive(
            Period::new(2024, Month::November),
            Period::new(2025, Month::February),
        );

        assert_eq!(
            periods,
            vec![
                Period::new(2024, Month::November),
                Period::new(2024, Month::December),
                Period::new(2025, Month::January),
                Period::new(2025, Month::February),
            ]
        );
    }

    #[test]
    fn range_is_empty_when_reversed() {
        let periods = Period::range_inclusive(
            Period::new(2025, Month::February),
            Period::new(2024, Month::November),
        );

        assert!(periods.is_empty());
    }
}
