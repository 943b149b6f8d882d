//! Defines the core data models and database queries for expenses.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, TransactionBehavior,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Amount, Error, PartyId, Period, settlement::is_period_settled};

/// Alias for the integer type used for expense IDs.
pub type ExpenseId = i64;

// ============================================================================
// MODELS
// ============================================================================

/// How the cost of an expense is shared between the two parties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitPolicy {
    /// The cost is shared evenly ("50/50"), no matter who paid.
    Equal,
    /// The party who did not pay owes the payer the full amount ("100%").
    PayerOwedFull,
}

impl SplitPolicy {
    fn as_str(&self) -> &'static str {
        match self {
            SplitPolicy::Equal => "equal",
            SplitPolicy::PayerOwedFull => "full",
        }
    }
}

impl Display for SplitPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SplitPolicy::Equal => f.pad("50/50"),
            SplitPolicy::PayerOwedFull => f.pad("100%"),
        }
    }
}

/// The error for strings that do not name a split policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{0}\" is not a split policy, expected one of: equal, 50/50, full, 100%")]
pub struct ParseSplitPolicyError(String);

impl FromStr for SplitPolicy {
    type Err = ParseSplitPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equal" | "50/50" => Ok(SplitPolicy::Equal),
            "full" | "100%" | "payer_owed_full" => Ok(SplitPolicy::PayerOwedFull),
            _ => Err(ParseSplitPolicyError(s.to_owned())),
        }
    }
}

impl ToSql for SplitPolicy {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SplitPolicy {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        SplitPolicy::from_str(value.as_str()?).map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// Money one of the two parties spent on something.
///
/// To create a new `Expense`, use [Expense::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// The ID of the expense.
    pub id: ExpenseId,
    /// How much was spent.
    pub amount: Amount,
    /// The party who paid.
    pub payer: PartyId,
    /// How the cost is shared.
    pub split_policy: SplitPolicy,
    /// The calendar month the expense counts towards.
    pub period: Period,
    /// When the expense happened.
    pub date: Date,
    /// A text description of what the expense was for.
    pub description: String,
    /// The category of the expense, e.g. "Groceries".
    pub category: Option<String>,
    /// Where the money was spent, e.g. "Corner Shop".
    pub location: Option<String>,
}

impl Expense {
    /// Create a new expense.
    ///
    /// Shortcut for [ExpenseBuilder] for discoverability.
    pub fn build(amount: Amount, payer: PartyId, date: Date) -> ExpenseBuilder {
        ExpenseBuilder {
            amount,
            payer,
            date,
            split_policy: SplitPolicy::Equal,
            description: String::new(),
            category: None,
            location: None,
        }
    }
}

/// A builder for creating [Expense] instances.
///
/// The split policy defaults to [SplitPolicy::Equal] and the period is always
/// the month of `date`.
///
/// # Examples
///
/// ```ignore
/// use rust_decimal_macros::dec;
/// use time::macros::date;
///
/// let builder = Expense::build(Amount::new(dec!(42.50))?, alex.id, date!(2025 - 10 - 05))
///     .split_policy(SplitPolicy::PayerOwedFull)
///     .description("Concert tickets")
///     .category(Some("Entertainment"));
/// ```
#[derive(Debug, PartialEq, Clone)]
pub struct ExpenseBuilder {
    /// How much was spent.
    pub amount: Amount,

    /// The party who paid.
    pub payer: PartyId,

    /// When the expense happened. This also decides the period.
    pub date: Date,

    /// How the cost is shared.
    pub split_policy: SplitPolicy,

    /// A human-readable description of the expense.
    pub description: String,

    /// The category of the expense.
    pub category: Option<String>,

    /// Where the money was spent.
    pub location: Option<String>,
}

impl ExpenseBuilder {
    /// Set the split policy for the expense.
    pub fn split_policy(mut self, split_policy: SplitPolicy) -> Self {
        self.split_policy = split_policy;
        self
    }

    /// Set the description for the expense.
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.trim().to_owned();
        self
    }

    /// Set the category for the expense. Blank categories are treated as none.
    pub fn category(mut self, category: Option<&str>) -> Self {
        self.category = non_blank(category);
        self
    }

    /// Set the location for the expense. Blank locations are treated as none.
    pub fn location(mut self, location: Option<&str>) -> Self {
        self.location = non_blank(location);
        self
    }

    /// The period the expense will be filed under.
    pub fn period(&self) -> Period {
        Period::from_date(self.date)
    }
}

fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create a new expense in the database from a builder.
///
/// # Errors
/// This function will return a:
/// - [Error::PeriodSettled] if the expense's period has already been settled,
/// - [Error::UnknownPayer] if the payer is not a known party,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_expense(builder: ExpenseBuilder, connection: &Connection) -> Result<Expense, Error> {
    let period = builder.period();
    let transaction =
        rusqlite::Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    if is_period_settled(period, &transaction)? {
        tracing::warn!("Rejected new expense for settled period {period}");
        return Err(Error::PeriodSettled(period));
    }

    let expense = transaction
        .prepare(
            "INSERT INTO expense (amount, payer_id, split_policy, period, date, description, category, location)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             RETURNING id, amount, payer_id, split_policy, period, date, description, category, location",
        )?
        .query_row(
            (
                builder.amount,
                builder.payer,
                builder.split_policy,
                period,
                builder.date,
                &builder.description,
                &builder.category,
                &builder.location,
            ),
            map_expense_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::UnknownPayer(builder.payer),
            error => error.into(),
        })?;

    transaction.commit()?;

    tracing::debug!(
        expense_id = expense.id,
        amount = %expense.amount,
        period = %period,
        "Created expense"
    );

    Ok(expense)
}

/// Retrieve an expense from the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid expense,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_expense(id: ExpenseId, connection: &Connection) -> Result<Expense, Error> {
    let expense = connection
        .prepare(
            "SELECT id, amount, payer_id, split_policy, period, date, description, category, location
             FROM expense WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_expense_row)?;

    Ok(expense)
}

/// Retrieve every expense filed under `period`, oldest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_expenses_for_period(
    period: Period,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    connection
        .prepare(
            "SELECT id, amount, payer_id, split_policy, period, date, description, category, location
             FROM expense WHERE period = :period ORDER BY date ASC, id ASC",
        )?
        .query_map(&[(":period", &period)], map_expense_row)?
        .map(|maybe_expense| maybe_expense.map_err(|error| error.into()))
        .collect()
}

/// Delete an expense by ID.
///
/// # Errors
/// This function will return a:
/// - [Error::DeleteMissingExpense] if the expense does not exist,
/// - [Error::PeriodSettled] if the expense's period has already been settled,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_expense(id: ExpenseId, connection: &Connection) -> Result<(), Error> {
    let transaction =
        rusqlite::Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let period: Period = match transaction.query_row(
        "SELECT period FROM expense WHERE id = ?1",
        [id],
        |row| row.get(0),
    ) {
        Ok(period) => period,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Err(Error::DeleteMissingExpense),
        Err(error) => return Err(error.into()),
    };

    if is_period_settled(period, &transaction)? {
        tracing::warn!("Rejected deleting expense {id} from settled period {period}");
        return Err(Error::PeriodSettled(period));
    }

    transaction.execute("DELETE FROM expense WHERE id = ?1", [id])?;
    transaction.commit()?;

    tracing::debug!("Deleted expense {id}");

    Ok(())
}

/// Create the expense table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS expense (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount TEXT NOT NULL,
                payer_id INTEGER NOT NULL,
                split_policy TEXT NOT NULL CHECK (split_policy IN ('equal', 'full')),
                period TEXT NOT NULL,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT,
                location TEXT,
                FOREIGN KEY(payer_id) REFERENCES party(id) ON UPDATE CASCADE ON DELETE RESTRICT
                );

        CREATE INDEX IF NOT EXISTS idx_expense_period ON expense(period);",
    )?;

    Ok(())
}

fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    let id = row.get(0)?;
    let amount = row.get(1)?;
    let payer = row.get(2)?;
    let split_policy = row.get(3)?;
    let period = row.get(4)?;
    let date = row.get(5)?;
    let description = row.get(6)?;
    let category = row.get(7)?;
    let location = row.get(8)?;

    Ok(Expense {
        id,
        amount,
        payer,
        split_policy,
        period,
        date,
        description,
        category,
        location,
    })
}

// ============================================================================
// TESTS
// ============================================================================
