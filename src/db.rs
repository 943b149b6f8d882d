//! Opening and initializing the application's SQLite database.

use std::{path::Path, time::Duration};

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error, expense::create_expense_table, party::create_party_table,
    settlement::create_settlement_table,
};

/// How long a writer waits for another connection to release the database
/// before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create the tables for the domain models if they do not exist yet.
///
/// This also turns on foreign key enforcement for `connection`.
///
/// # Errors
/// Returns an error if a table could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_party_table(&transaction)?;
    create_expense_table(&transaction)?;
    create_settlement_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Open the database at `path`, creating and initializing it if needed.
///
/// # Errors
/// Returns an error if the file could not be opened or initialized.
pub fn open(path: &Path) -> Result<Connection, Error> {
    let connection = Connection::open(path)?;
    connection.busy_timeout(BUSY_TIMEOUT)?;
    initialize(&connection)?;

    tracing::debug!("Opened database at {}", path.display());

    Ok(connection)
}

#[cfg(test)]
mod initialize_tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn sql_is_valid() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");

        assert_eq!(Ok(()), initialize(&connection));
    }

    #[test]
    fn can_initialize_twice() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        assert_eq!(Ok(()), initialize(&connection));
    }

    #[test]
    fn enables_foreign_keys() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let enabled: bool = connection
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();

        assert!(enabled);
    }
}
