//! The two people sharing expenses and the code for storing them.

use std::fmt::Display;

use rusqlite::{Connection, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::Error;

/// A newtype wrapper for integer party IDs.
///
/// This helps disambiguate party IDs from expense and settlement IDs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct PartyId(i64);

impl PartyId {
    /// Create a new party ID.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the party ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for PartyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl rusqlite::ToSql for PartyId {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl rusqlite::types::FromSql for PartyId {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        i64::column_result(value).map(PartyId)
    }
}

/// One of the two people sharing expenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// The party's ID in the application database.
    pub id: PartyId,
    /// The display name of the party, e.g. "Alex".
    pub name: String,
}

impl Party {
    /// Create a new party.
    ///
    /// # Errors
    /// Returns [Error::EmptyPartyName] if `name` is empty or only whitespace.
    pub fn new(id: PartyId, name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            return Err(Error::EmptyPartyName);
        }

        Ok(Self {
            id,
            name: name.to_owned(),
        })
    }
}

/// The pair of parties a ledger is shared between.
///
/// The ledger only makes sense for exactly two people, so this type can only
/// be created from two parties with different IDs. The first party is
/// "party A": a positive balance means party B owes party A.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parties {
    a: Party,
    b: Party,
}

impl Parties {
    /// Create the pair of parties from a list of parties.
    ///
    /// # Errors
    /// Returns [Error::InvalidPartyCount] if `parties` does not contain exactly
    /// two parties with distinct IDs.
    pub fn new(parties: Vec<Party>) -> Result<Self, Error> {
        let count = parties.len();
        let mut parties = parties.into_iter();

        match (parties.next(), parties.next(), parties.next()) {
            (Some(a), Some(b), None) if a.id != b.id => Ok(Self { a, b }),
            (Some(_), Some(_), None) => Err(Error::InvalidPartyCount(1)),
            _ => Err(Error::InvalidPartyCount(count)),
        }
    }

    /// Party A, the reference point for the sign of the balance.
    pub fn a(&self) -> &Party {
        &self.a
    }

    /// Party B.
    pub fn b(&self) -> &Party {
        &self.b
    }

    /// The same pair with the roles of party A and party B swapped.
    pub fn swapped(&self) -> Self {
        Self {
            a: self.b.clone(),
            b: self.a.clone(),
        }
    }

    /// Whether `id` is one of the two parties.
    pub fn contains(&self, id: PartyId) -> bool {
        self.a.id == id || self.b.id == id
    }

    /// The other party to `id`.
    ///
    /// # Errors
    /// Returns [Error::UnknownPayer] if `id` is not one of the two parties.
    pub fn other(&self, id: PartyId) -> Result<&Party, Error> {
        if id == self.a.id {
            Ok(&self.b)
        } else if id == self.b.id {
            Ok(&self.a)
        } else {
            Err(Error::UnknownPayer(id))
        }
    }

    /// Look up a party by ID.
    ///
    /// # Errors
    /// Returns [Error::UnknownPayer] if `id` is not one of the two parties.
    pub fn get(&self, id: PartyId) -> Result<&Party, Error> {
        if id == self.a.id {
            Ok(&self.a)
        } else if id == self.b.id {
            Ok(&self.b)
        } else {
            Err(Error::UnknownPayer(id))
        }
    }

    /// Look up a party by name, ignoring case and surrounding whitespace.
    ///
    /// # Errors
    /// Returns [Error::UnknownPartyName] if neither party has the name.
    pub fn by_name(&self, name: &str) -> Result<&Party, Error> {
        let name = name.trim();

        [&self.a, &self.b]
            .into_iter()
            .find(|party| party.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::UnknownPartyName(name.to_owned()))
    }
}

/// Create the party table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_party_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS party (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE
                )",
        (),
    )?;

    Ok(())
}

/// Create the two parties of the ledger.
///
/// # Errors
///
/// Returns a:
/// - [Error::EmptyPartyName] if either name is blank,
/// - [Error::DuplicatePartyName] if both names are the same,
/// - [Error::PartiesAlreadyExist] if parties have already been created,
/// - or [Error::SqlError] if an SQL related error occurred.
pub fn create_parties(
    party_a_name: &str,
    party_b_name: &str,
    connection: &Connection,
) -> Result<Parties, Error> {
    let party_a_name = party_a_name.trim();
    let party_b_name = party_b_name.trim();

    if party_a_name.is_empty() || party_b_name.is_empty() {
        return Err(Error::EmptyPartyName);
    }

    if party_a_name.eq_ignore_ascii_case(party_b_name) {
        return Err(Error::DuplicatePartyName(party_b_name.to_owned()));
    }

    let transaction =
        rusqlite::Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let existing: u32 =
        transaction.query_row("SELECT COUNT(id) FROM party", [], |row| row.get(0))?;

    if existing > 0 {
        tracing::warn!("Refusing to create parties, {existing} already exist");
        return Err(Error::PartiesAlreadyExist(existing as usize));
    }

    let mut insert = transaction.prepare("INSERT INTO party (name) VALUES (?1) RETURNING id, name")?;
    let a = insert.query_row((party_a_name,), map_party_row)?;
    let b = insert.query_row((party_b_name,), map_party_row)?;
    drop(insert);

    transaction.commit()?;

    tracing::info!("Created parties {} and {}", a.name, b.name);

    Parties::new(vec![a, b])
}

/// Get the two parties of the ledger, party A first.
///
/// # Errors
///
/// Returns a:
/// - [Error::InvalidPartyCount] if the database does not hold exactly two parties,
/// - or [Error::SqlError] if an SQL related error occurred.
pub fn get_parties(connection: &Connection) -> Result<Parties, Error> {
    let parties = connection
        .prepare("SELECT id, name FROM party ORDER BY id ASC")?
        .query_map([], map_party_row)?
        .collect::<Result<Vec<Party>, rusqlite::Error>>()?;

    Parties::new(parties)
}

fn map_party_row(row: &Row) -> Result<Party, rusqlite::Error> {
    let id = row.get(0)?;
    let name = row.get(1)?;

    Ok(Party { id, name })
}
