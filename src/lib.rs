//! Splitbook is a ledger for tracking expenses shared between two people.
//!
//! Expenses are logged against a calendar month ([Period]) along with who paid
//! for them and how they should be split. The balance engine turns a month's
//! expenses and any recorded settlements into a single signed balance, and
//! recommends the transfer that would square the two parties up.
//!
//! The engine ([calculate_balance] and [recommend_settlement]) is pure. The
//! rest of the crate stores parties, expenses and the append-only settlement
//! ledger in SQLite.

#![warn(missing_docs)]

use rust_decimal::Decimal;

mod balance;
mod config;
mod db;
mod expense;
mod logging;
mod money;
mod party;
mod period;
mod settlement;
mod summary;
mod timezone;

pub use balance::{
    BalanceResult, Direction, RoundingPolicy, SettlementRecommendation, calculate_balance,
    recommend_settlement,
};
pub use config::{Config, DEFAULT_TIMEZONE};
pub use db::{initialize as initialize_db, open as open_db};
pub use expense::{
    Expense, ExpenseBuilder, ExpenseId, ParseSplitPolicyError, SplitPolicy, create_expense,
    delete_expense, get_expense, get_expenses_for_period,
};
pub use logging::{level_for_verbosity, setup_logging};
pub use money::Amount;
pub use party::{Parties, Party, PartyId, create_parties, get_parties};
pub use period::Period;
pub use settlement::{
    NewSettlement, RecordMode, SQLiteSettlementRecorder, Settlement, SettlementId,
    SettlementRecorder, get_settlements, is_period_settled, record_settlement,
    remove_latest_settlement, remove_settlement,
};
pub use summary::{
    PeriodSource, PeriodSummary, ReadThroughCache, SQLitePeriodSource, summarize_period,
    summarize_periods,
};
pub use timezone::{current_period, get_local_offset, local_today};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The ledger was given a set of parties that is not exactly two distinct
    /// people.
    ///
    /// This is a configuration error. Callers must not guess a direction for
    /// the balance and should ask the user to fix the party setup instead.
    #[error("expected exactly two distinct parties, got {0}")]
    InvalidPartyCount(usize),

    /// An expense or settlement references a party that is not one of the two
    /// known parties.
    ///
    /// The whole computation is rejected since silently dropping the record
    /// would break the conservation of money between the two parties.
    #[error("party {0} is not one of the two known parties")]
    UnknownPayer(PartyId),

    /// Another writer recorded a settlement for the period first.
    ///
    /// This is the only recoverable error: the caller should re-fetch the
    /// period and show it as already settled.
    #[error("a settlement has already been recorded for {0}")]
    DuplicateSettlementConflict(Period),

    /// An amount of zero or less was used for an expense or settlement.
    #[error("amounts must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),

    /// An amount was given in fractions of the smallest currency unit, e.g.
    /// 10.001.
    ///
    /// Recommended settlements are whole cents, so a sub-cent expense could
    /// never be settled exactly.
    #[error("amounts must be a whole number of cents, got {0}")]
    SubMinorUnitAmount(Decimal),

    /// Adding up the amounts of a period went past the largest representable
    /// decimal.
    #[error("the amounts are too large to add up")]
    AmountOverflow,

    /// A settlement was made from a party to themselves.
    #[error("a settlement must be between two different parties")]
    SelfSettlement,

    /// The records handed to the balance calculator span more than one period.
    #[error("expected records for {expected}, found a record for {found}")]
    PeriodMismatch {
        /// The period of the first record.
        expected: Period,
        /// The period of the offending record.
        found: Period,
    },

    /// A string could not be parsed as a `YYYY-MM` period.
    #[error("\"{0}\" is not a valid period, expected YYYY-MM")]
    InvalidPeriod(String),

    /// A string could not be parsed as a decimal amount.
    #[error("\"{0}\" is not a valid amount")]
    InvalidAmount(String),

    /// An empty string was used for a party name.
    #[error("party name cannot be empty")]
    EmptyPartyName,

    /// No party exists with the given name.
    #[error("there is no party called \"{0}\"")]
    UnknownPartyName(String),

    /// Tried to set up the parties when the ledger already has them.
    #[error("the ledger already has {0} parties")]
    PartiesAlreadyExist(usize),

    /// Both parties were given the same name.
    #[error("the party name \"{0}\" is used more than once")]
    DuplicatePartyName(String),

    /// Tried to change the expenses of a period that has been settled.
    ///
    /// The settlement for the period must be removed before its expenses can
    /// be changed.
    #[error("{0} has been settled, remove the settlement before changing its expenses")]
    PeriodSettled(Period),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to delete an expense that does not exist
    #[error("tried to delete an expense that is not in the database")]
    DeleteMissingExpense,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl Error {
    /// Whether the operation that produced this error may succeed if retried
    /// after re-reading the current state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::DuplicateSettlementConflict(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

#[cfg(test)]
mod error_tests {
    use rust_decimal_macros::dec;
    use time::Month;

    use crate::{Error, Period};

    #[test]
    fn only_settlement_conflicts_are_retryable() {
        let period = Period::new(2025, Month::October);

        assert!(Error::DuplicateSettlementConflict(period).is_retryable());
        assert!(!Error::InvalidPartyCount(3).is_retryable());
        assert!(!Error::NonPositiveAmount(dec!(0)).is_retryable());
        assert!(!Error::PeriodSettled(period).is_retryable());
        assert!(!Error::AmountOverflow.is_retryable());
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let error: Error = rusqlite::Error::QueryReturnedNoRows.into();

        assert_eq!(error, Error::NotFound);
    }
}
