//! Defines the settlement model and the append-only settlement ledger.

use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Amount, Error, PartyId, Period, SettlementRecommendation};

/// Alias for the integer type used for settlement IDs.
pub type SettlementId = i64;

// ============================================================================
// MODELS
// ============================================================================

/// A recorded transfer of money from one party to the other that pays down
/// the balance of a period.
///
/// Settlements are never edited once written. Undoing a settlement deletes
/// the row, which re-opens the period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    /// The ID of the settlement.
    pub id: SettlementId,
    /// The party who paid off their debt.
    pub from: PartyId,
    /// The party who was paid.
    pub to: PartyId,
    /// How much was transferred.
    pub amount: Amount,
    /// The period the settlement closes.
    pub period: Period,
    /// Starts at zero and goes up by one each time the period is re-settled.
    pub sequence: u32,
    /// When the settlement was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub recorded_at: OffsetDateTime,
}

/// A settlement that has not been recorded yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSettlement {
    /// The party who paid off their debt.
    pub from: PartyId,
    /// The party who was paid.
    pub to: PartyId,
    /// How much was transferred.
    pub amount: Amount,
    /// The period the settlement closes.
    pub period: Period,
    /// When the settlement was recorded.
    pub recorded_at: OffsetDateTime,
}

impl NewSettlement {
    /// Create the settlement that carries out `recommendation`.
    ///
    /// Returns `None` if the recommendation says nothing is owed.
    pub fn from_recommendation(
        recommendation: &SettlementRecommendation,
        period: Period,
        recorded_at: OffsetDateTime,
    ) -> Option<Self> {
        let direction = recommendation.direction?;
        let amount = Amount::new(recommendation.amount).ok()?;

        Some(Self {
            from: direction.from,
            to: direction.to,
            amount,
            period,
            recorded_at,
        })
    }
}

/// Whether recording a settlement may add to a period that already has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordMode {
    /// Only record the settlement if the period has not been settled yet.
    FirstOnly,
    /// Append another settlement to a period, e.g. after expenses were added
    /// to it following an "unsettle".
    Resettle,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Whether at least one settlement has been recorded for `period`.
///
/// A period with any settlement is closed, even if expenses were changed
/// after the settlement so that the balance is no longer zero.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn is_period_settled(period: Period, connection: &Connection) -> Result<bool, Error> {
    connection
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM settlement WHERE period = ?1)",
            [period],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Append a settlement to the ledger.
///
/// The sequence number is chosen and written inside one immediate transaction,
/// and `(period, sequence)` is unique, so two writers racing to settle the
/// same period cannot both succeed.
///
/// # Errors
/// This function will return a:
/// - [Error::SelfSettlement] if the settlement is from a party to themselves,
/// - [Error::UnknownPayer] if either party does not exist,
/// - [Error::DuplicateSettlementConflict] if `mode` is [RecordMode::FirstOnly]
///   and the period has already been settled, or another writer won the race,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn record_settlement(
    settlement: NewSettlement,
    mode: RecordMode,
    connection: &Connection,
) -> Result<Settlement, Error> {
    if settlement.from == settlement.to {
        return Err(Error::SelfSettlement);
    }

    let period = settlement.period;
    let transaction =
        rusqlite::Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    for party_id in [settlement.from, settlement.to] {
        let exists: bool = transaction.query_row(
            "SELECT EXISTS(SELECT 1 FROM party WHERE id = ?1)",
            [party_id],
            |row| row.get(0),
        )?;

        if !exists {
            return Err(Error::UnknownPayer(party_id));
        }
    }

    let latest_sequence: Option<u32> = transaction.query_row(
        "SELECT MAX(sequence) FROM settlement WHERE period = ?1",
        [period],
        |row| row.get(0),
    )?;

    let sequence = match (mode, latest_sequence) {
        (RecordMode::FirstOnly, Some(_)) => {
            tracing::warn!("Refusing to settle {period} again without re-settle");
            return Err(Error::DuplicateSettlementConflict(period));
        }
        (_, None) => 0,
        (RecordMode::Resettle, Some(latest)) => latest + 1,
    };

    let recorded = transaction
        .prepare(
            "INSERT INTO settlement (from_party_id, to_party_id, amount, period, sequence, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, from_party_id, to_party_id, amount, period, sequence, recorded_at",
        )?
        .query_row(
            (
                settlement.from,
                settlement.to,
                settlement.amount,
                period,
                sequence,
                settlement.recorded_at,
            ),
            map_settlement_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => {
                tracing::warn!("Lost the race to settle {period}");
                Error::DuplicateSettlementConflict(period)
            }
            error => error.into(),
        })?;

    transaction.commit()?;

    tracing::info!(
        settlement_id = recorded.id,
        from = %recorded.from,
        to = %recorded.to,
        amount = %recorded.amount,
        sequence = recorded.sequence,
        "Recorded settlement for {period}"
    );

    Ok(recorded)
}

/// Retrieve every settlement recorded for `period`, in the order recorded.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_settlements(period: Period, connection: &Connection) -> Result<Vec<Settlement>, Error> {
    connection
        .prepare(
            "SELECT id, from_party_id, to_party_id, amount, period, sequence, recorded_at
             FROM settlement WHERE period = :period ORDER BY sequence ASC",
        )?
        .query_map(&[(":period", &period)], map_settlement_row)?
        .map(|maybe_settlement| maybe_settlement.map_err(|error| error.into()))
        .collect()
}

/// Delete a settlement by ID.
///
/// Deleting a settlement that does not exist, e.g. one that was already
/// deleted, does nothing.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn remove_settlement(id: SettlementId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM settlement WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        tracing::debug!("Settlement {id} was already removed");
    } else {
        tracing::info!("Removed settlement {id}");
    }

    Ok(())
}

/// Delete the most recent settlement of `period`, re-opening it if it was
/// the only one.
///
/// Returns the deleted settlement, or `None` if the period had no settlements.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn remove_latest_settlement(
    period: Period,
    connection: &Connection,
) -> Result<Option<Settlement>, Error> {
    let removed = connection
        .prepare(
            "DELETE FROM settlement
             WHERE id = (SELECT id FROM settlement WHERE period = ?1 ORDER BY sequence DESC LIMIT 1)
             RETURNING id, from_party_id, to_party_id, amount, period, sequence, recorded_at",
        )?
        .query_row([period], map_settlement_row)
        .optional()?;

    match &removed {
        Some(settlement) => tracing::info!("Removed settlement {} for {period}", settlement.id),
        None => tracing::debug!("{period} has no settlement to remove"),
    }

    Ok(removed)
}

/// Create the settlement table in the database.
///
/// Rows can be inserted and deleted but never updated.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_settlement_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS settlement (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                from_party_id INTEGER NOT NULL,
                to_party_id INTEGER NOT NULL,
                amount TEXT NOT NULL,
                period TEXT NOT NULL,
                sequence INTEGER NOT NULL CHECK (sequence >= 0),
                recorded_at TEXT NOT NULL,
                CHECK (from_party_id <> to_party_id),
                UNIQUE (period, sequence),
                FOREIGN KEY(from_party_id) REFERENCES party(id) ON UPDATE CASCADE ON DELETE RESTRICT,
                FOREIGN KEY(to_party_id) REFERENCES party(id) ON UPDATE CASCADE ON DELETE RESTRICT
                );

        CREATE TRIGGER IF NOT EXISTS settlement_append_only
        BEFORE UPDATE ON settlement
        BEGIN
            SELECT RAISE(ABORT, 'settlements cannot be changed once recorded');
        END;",
    )?;

    Ok(())
}

fn map_settlement_row(row: &Row) -> Result<Settlement, rusqlite::Error> {
    let id = row.get(0)?;
    let from = row.get(1)?;
    let to = row.get(2)?;
    let amount = row.get(3)?;
    let period = row.get(4)?;
    let sequence = row.get(5)?;
    let recorded_at = row.get(6)?;

    Ok(Settlement {
        id,
        from,
        to,
        amount,
        period,
        sequence,
        recorded_at,
    })
}

// ============================================================================
// TESTS
// ============================================================================
