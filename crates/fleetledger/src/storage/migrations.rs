//! Schema versioning for `SQLite` databases.
//!
//! Both the record store and the operations database keep a `metadata` table
//! holding their schema version. Each database brings its own statements and
//! migration steps; the bookkeeping here is shared.

use rusqlite::Connection;

use crate::error::{Error, Result};

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// A versioned schema: creation statements plus the version they produce.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    /// Name used in log and error messages.
    pub name: &'static str,
    /// Statements creating all tables and indexes.
    pub statements: &'static [&'static str],
    /// Version the statements correspond to.
    pub version: i32,
}

/// The record store schema.
pub const RECORDS_SCHEMA: Schema = Schema {
    name: "records",
    statements: super::schema::SCHEMA_STATEMENTS,
    version: 1,
};

/// The operations database schema (counters and accounts).
pub const OPERATIONS_SCHEMA: Schema = Schema {
    name: "operations",
    statements: super::schema::OPERATIONS_SCHEMA_STATEMENTS,
    version: 1,
};

/// Initialize a database schema.
///
/// Creates all tables and indexes if they don't exist, then runs any
/// pending migrations to bring the schema up to the current version.
///
/// # Errors
///
/// Returns an error if schema creation or migration fails.
pub fn initialize_schema(conn: &Connection, schema: &Schema) -> Result<()> {
    for statement in schema.statements {
        conn.execute(statement, [])?;
    }

    let version = get_schema_version(conn)?;
    if version > schema.version {
        return Err(Error::DatabaseMigration {
            message: format!(
                "{} database is at version {version}, newer than supported {}",
                schema.name, schema.version
            ),
        });
    }
    if version < schema.version {
        run_migrations(conn, schema, version)?;
    }

    Ok(())
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Run migrations from the given version to the schema's version.
fn run_migrations(conn: &Connection, schema: &Schema, from_version: i32) -> Result<()> {
    let mut current = from_version;

    while current < schema.version {
        current += 1;
        run_migration(conn, schema, current)?;
    }

    set_schema_version(conn, schema.version)?;
    tracing::debug!("{} schema at version {}", schema.name, schema.version);
    Ok(())
}

/// Run a specific migration version.
fn run_migration(conn: &Connection, schema: &Schema, version: i32) -> Result<()> {
    match version {
        // Version 1 is the base schema created by the statements.
        1 => set_schema_version(conn, 1),
        _ => Err(Error::DatabaseMigration {
            message: format!("unknown {} migration version: {version}", schema.name),
        }),
    }
}
