//! The strictly positive amount of money used by expenses and settlements.

use std::{fmt::Display, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Error;

/// An amount of money greater than zero.
///
/// Amounts are stored as decimals rather than floats so that sums of
/// expenses do not drift. In the database they are stored as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// The number of decimal places in the smallest currency unit: cents.
    pub const MINOR_UNIT_SCALE: u32 = 2;

    /// Create a new amount.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NonPositiveAmount] if `value` is zero or negative,
    /// - or [Error::SubMinorUnitAmount] if `value` has fractions of a cent.
    pub fn new(value: Decimal) -> Result<Self, Error> {
        if value <= Decimal::ZERO {
            return Err(Error::NonPositiveAmount(value));
        }

        if value.normalize().scale() > Self::MINOR_UNIT_SCALE {
            return Err(Error::SubMinorUnitAmount(value));
        }

        Ok(Self(value))
    }

    /// The amount as a decimal.
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }
}

/// Add two decimals, failing with [Error::AmountOverflow] instead of
/// panicking.
pub(crate) fn checked_add(lhs: Decimal, rhs: Decimal) -> Result<Decimal, Error> {
    lhs.checked_add(rhs).ok_or(Error::AmountOverflow)
}

/// Subtract two decimals, failing with [Error::AmountOverflow] instead of
/// panicking.
pub(crate) fn checked_sub(lhs: Decimal, rhs: Decimal) -> Result<Decimal, Error> {
    lhs.checked_sub(rhs).ok_or(Error::AmountOverflow)
}

impl TryFrom<Decimal> for Amount {
    type Error = Error;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value =
            Decimal::from_str(s.trim()).map_err(|_| Error::InvalidAmount(s.to_owned()))?;

        Amount::new(value)
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;

        Amount::from_str(text).map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}
