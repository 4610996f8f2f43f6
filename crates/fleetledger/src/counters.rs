//! Operation counters.
//!
//! Four named counters live in a single row of the operations database, kept
//! apart from the record store. Increments are single `UPDATE` statements so
//! concurrent writers never lose a count.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::storage::{migrations, open_connection, open_memory_connection};

/// Name of the row holding the counters.
const COUNTER_ROW: &str = "counters";

/// A counted operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// A record was created.
    Insert,
    /// Records were listed or viewed.
    Retrieve,
    /// A record was modified.
    Update,
    /// A record was removed.
    Delete,
}

impl Operation {
    /// All operations, in display order.
    pub const ALL: [Operation; 4] = [Self::Insert, Self::Retrieve, Self::Update, Self::Delete];

    /// Column holding this counter.
    fn column(self) -> &'static str {
        match self {
            Self::Insert => "insert_count",
            Self::Retrieve => "retrieve_count",
            Self::Update => "update_count",
            Self::Delete => "delete_count",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Retrieve => write!(f, "retrieve"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.to_string() == s)
            .ok_or_else(|| Error::validation("operation", format!("unknown operation '{s}'")))
    }
}

/// Point-in-time values of all four counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterSnapshot {
    /// Records created.
    pub insert: u64,
    /// Listings served.
    pub retrieve: u64,
    /// Records modified.
    pub update: u64,
    /// Records removed.
    pub delete: u64,
}

impl CounterSnapshot {
    /// Value of one counter.
    #[must_use]
    pub fn get(&self, op: Operation) -> u64 {
        match op {
            Operation::Insert => self.insert,
            Operation::Retrieve => self.retrieve,
            Operation::Update => self.update,
            Operation::Delete => self.delete,
        }
    }

    /// Sum of all counters.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.insert + self.retrieve + self.update + self.delete
    }
}

/// A sink for operation counts.
pub trait Counters: fmt::Debug {
    /// Add one to the named counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the counter cannot be written.
    fn increment(&self, op: Operation) -> Result<()>;

    /// Read all counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the counters cannot be read.
    fn snapshot(&self) -> Result<CounterSnapshot>;
}

/// `SQLite`-backed counter store.
#[derive(Debug)]
pub struct CounterStore {
    path: PathBuf,
    conn: Connection,
}

impl CounterStore {
    /// Open the operations database at `path` and ensure the counter row exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = open_connection(&path, &migrations::OPERATIONS_SCHEMA)?;
        let store = Self { path, conn };
        store.initialize()?;
        Ok(store)
    }

    /// Create an in-memory counter store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = open_memory_connection(&migrations::OPERATIONS_SCHEMA)?;
        let store = Self {
            path: PathBuf::from(":memory:"),
            conn,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the counter row with every counter at zero, if it is absent.
    ///
    /// Returns `true` if the row was created.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn initialize(&self) -> Result<bool> {
        let created = self.conn.execute(
            "INSERT OR IGNORE INTO counters (name) VALUES (?1)",
            [COUNTER_ROW],
        )? > 0;
        if created {
            info!("Initialized operation counters");
        } else {
            debug!("Operation counters already exist");
        }
        Ok(created)
    }
}

impl Counters for CounterStore {
    fn increment(&self, op: Operation) -> Result<()> {
        let column = op.column();
        let affected = self.conn.execute(
            &format!("UPDATE counters SET {column} = {column} + 1 WHERE name = ?1"),
            [COUNTER_ROW],
        )?;
        if affected == 0 {
            return Err(Error::internal("counter row is missing"));
        }
        debug!("Incremented {} counter", op);
        Ok(())
    }

    fn snapshot(&self) -> Result<CounterSnapshot> {
        let snapshot = self
            .conn
            .query_row(
                r"
                SELECT insert_count, retrieve_count, update_count, delete_count
                FROM counters WHERE name = ?1
                ",
                [COUNTER_ROW],
                |row| {
                    Ok(CounterSnapshot {
                        insert: read_count(row, 0)?,
                        retrieve: read_count(row, 1)?,
                        update: read_count(row, 2)?,
                        delete: read_count(row, 3)?,
                    })
                },
            )
            .optional()?;
        Ok(snapshot.unwrap_or_default())
    }
}

/// Read a stored counter, which `SQLite` holds as a signed integer.
fn read_count(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(idx)?;
    u64::try_from(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Integer, e.into())
    })
}
