//! Settings shared by the command line tools.

use std::path::PathBuf;

use time::Date;

use crate::{
    Error, Period, RoundingPolicy,
    timezone::{current_period, get_local_offset, local_today},
};

/// The timezone used when none is given.
pub const DEFAULT_TIMEZONE: &str = "UTC";

/// Where the ledger lives and how it reads the calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// File path to the SQLite database.
    pub db_path: PathBuf,
    /// The canonical timezone used to work out today's date, e.g.
    /// "Pacific/Auckland".
    pub timezone: String,
    /// How balances are rounded when recommending a settlement.
    pub rounding: RoundingPolicy,
}

impl Config {
    /// Create a config with the default rounding policy.
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezone] if `timezone` is not a canonical
    /// timezone name.
    pub fn new(db_path: impl Into<PathBuf>, timezone: &str) -> Result<Self, Error> {
        if get_local_offset(timezone).is_none() {
            return Err(Error::InvalidTimezone(timezone.to_owned()));
        }

        Ok(Self {
            db_path: db_path.into(),
            timezone: timezone.to_owned(),
            rounding: RoundingPolicy::default(),
        })
    }

    /// Today's date in the configured timezone.
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezone] if the timezone stopped resolving.
    pub fn today(&self) -> Result<Date, Error> {
        local_today(&self.timezone)
    }

    /// The period that today falls in.
    ///
    /// # Errors
    /// Returns [Error::InvalidTimezone] if the timezone stopped resolving.
    pub fn current_period(&self) -> Result<Period, Error> {
        current_period(&self.timezone)
    }
}
