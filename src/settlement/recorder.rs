//! Defines the settlement recorder trait and its SQLite implementation.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::{
    Error, Period,
    settlement::core::{
        NewSettlement, RecordMode, Settlement, SettlementId, get_settlements, is_period_settled,
        record_settlement, remove_latest_settlement, remove_settlement,
    },
};

/// Records and removes settlements.
///
/// The recorder is the only thing that writes settlements. It never changes
/// expenses, and it never edits a settlement once it has been recorded.
pub trait SettlementRecorder {
    /// Whether at least one settlement has been recorded for `period`.
    fn is_period_settled(&self, period: Period) -> Result<bool, Error>;

    /// Append a settlement to the ledger.
    ///
    /// Implementers must make sure that at most one of several concurrent
    /// calls for the same period and [RecordMode::FirstOnly] succeeds. The
    /// others must fail with [Error::DuplicateSettlementConflict].
    fn record_settlement(
        &self,
        settlement: NewSettlement,
        mode: RecordMode,
    ) -> Result<Settlement, Error>;

    /// Delete a settlement. Deleting a missing settlement does nothing.
    fn remove_settlement(&self, id: SettlementId) -> Result<(), Error>;

    /// Delete the most recent settlement of `period`, if there is one.
    fn remove_latest_settlement(&self, period: Period) -> Result<Option<Settlement>, Error>;

    /// Retrieve the settlements of `period` in the order they were recorded.
    fn get_settlements(&self, period: Period) -> Result<Vec<Settlement>, Error>;
}

/// Records settlements in a SQLite database.
///
/// Note that settlements reference the parties, so the party table must be
/// set up in the database.
#[derive(Debug, Clone)]
pub struct SQLiteSettlementRecorder {
    connection: Arc<Mutex<Connection>>,
}

impl SQLiteSettlementRecorder {
    /// Create a new recorder for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|_| Error::DatabaseLockError)
    }
}

impl SettlementRecorder for SQLiteSettlementRecorder {
    fn is_period_settled(&self, period: Period) -> Result<bool, Error> {
        let connection = self.lock()?;
        is_period_settled(period, &connection)
    }

    /// Append a settlement to the ledger.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::DuplicateSettlementConflict] if the period was already settled,
    /// - [Error::DatabaseLockError] if the connection mutex is poisoned,
    /// - or any error from [record_settlement].
    fn record_settlement(
        &self,
        settlement: NewSettlement,
        mode: RecordMode,
    ) -> Result<Settlement, Error> {
        let connection = self.lock()?;
        record_settlement(settlement, mode, &connection)
    }

    fn remove_settlement(&self, id: SettlementId) -> Result<(), Error> {
        let connection = self.lock()?;
        remove_settlement(id, &connection)
    }

    fn remove_latest_settlement(&self, period: Period) -> Result<Option<Settlement>, Error> {
        let connection = self.lock()?;
        remove_latest_settlement(period, &connection)
    }

    fn get_settlements(&self, period: Period) -> Result<Vec<Settlement>, Error> {
        let connection = self.lock()?;
        get_settlements(period, &connection)
    }
}
