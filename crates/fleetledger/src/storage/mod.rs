//! Record storage for fleetledger.
//!
//! This module provides `SQLite`-based persistence for drivers and packages,
//! including the per-driver reference list and the uniqueness constraint on
//! generated identifiers.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::{is_unique_violation, Error, RecordKind, Result};
use crate::model::{Department, Driver, Package, PackageWithDriver};

use migrations::Schema;

const DRIVER_COLUMNS: &str = "row_id, driver_id, name, department, license, is_active, created_at";

const PACKAGE_COLUMNS: &str = "p.row_id, p.package_id, p.title, p.weight, p.destination, \
     p.description, p.is_allocated, p.assigned_driver, p.created_at";

/// Open a file-backed database, creating parent directories and the schema.
pub(crate) fn open_connection(path: &Path, schema: &Schema) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    debug!("Opening {} database at {}", schema.name, path.display());
    let conn = Connection::open(path).map_err(|source| Error::DatabaseOpen {
        path: path.to_path_buf(),
        source,
    })?;

    // Enable WAL mode for better concurrent read performance
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

    migrations::initialize_schema(&conn, schema)?;
    info!(
        "{} database opened successfully at {}",
        schema.name,
        path.display()
    );
    Ok(conn)
}

/// Open an in-memory database with the given schema.
pub(crate) fn open_memory_connection(schema: &Schema) -> Result<Connection> {
    let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
        path: PathBuf::from(":memory:"),
        source,
    })?;
    migrations::initialize_schema(&conn, schema)?;
    Ok(conn)
}

/// Parse an RFC 3339 timestamp column.
pub(crate) fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

/// One row of a driver's reference list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkRow {
    /// Insertion sequence; defines list order.
    pub seq: i64,
    /// Row id of the owning driver.
    pub driver_row: i64,
    /// Row id of the referenced package.
    pub package_row: i64,
}

/// Storage engine for drivers and packages.
///
/// Every method is a single statement unless noted, so reference list
/// appends and removals are atomic without a read-modify-write cycle.
#[derive(Debug)]
pub struct RecordStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl RecordStore {
    /// Open or create a record database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = open_connection(&path, &migrations::RECORDS_SCHEMA)?;
        Ok(Self { path, conn })
    }

    /// Create an in-memory record store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = open_memory_connection(&migrations::RECORDS_SCHEMA)?;
        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` inside a transaction. Any error rolls back every write made by `f`.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, or a database error if the transaction
    /// cannot be started or committed.
    pub fn transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }

    // === Drivers ===

    /// Insert a new driver. Its reference list is ignored.
    ///
    /// Returns the storage row id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateIdentifier`] if the driver id is taken.
    pub fn insert_driver(&self, driver: &Driver) -> Result<i64> {
        self.conn
            .execute(
                r"
                INSERT INTO drivers (driver_id, name, department, license, is_active, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
                params![
                    driver.id,
                    driver.name,
                    driver.department.as_str(),
                    driver.license,
                    driver.is_active,
                    driver.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::duplicate_identifier(RecordKind::Driver, &driver.id)
                } else {
                    e.into()
                }
            })?;

        let row = self.conn.last_insert_rowid();
        debug!("Inserted driver {} at row {}", driver.id, row);
        Ok(row)
    }

    /// Resolve a driver's business id to its row id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn driver_row(&self, id: &str) -> Result<Option<i64>> {
        let row = self
            .conn
            .query_row("SELECT row_id FROM drivers WHERE driver_id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(row)
    }

    /// Get a driver by business id, with its reference list loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_driver(&self, id: &str) -> Result<Option<Driver>> {
        let found = self
            .conn
            .query_row(
                &format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE driver_id = ?1"),
                [id],
                Self::row_to_driver,
            )
            .optional()?;

        match found {
            Some((row, driver)) => Ok(Some(self.with_assigned(row, driver)?)),
            None => Ok(None),
        }
    }

    /// Get a driver by row id, with its reference list loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_driver_by_row(&self, row: i64) -> Result<Option<Driver>> {
        let found = self
            .conn
            .query_row(
                &format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE row_id = ?1"),
                [row],
                Self::row_to_driver,
            )
            .optional()?;

        match found {
            Some((row, driver)) => Ok(Some(self.with_assigned(row, driver)?)),
            None => Ok(None),
        }
    }

    /// List all drivers in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_drivers(&self) -> Result<Vec<Driver>> {
        self.query_drivers(
            &format!("SELECT {DRIVER_COLUMNS} FROM drivers ORDER BY row_id"),
            [],
        )
    }

    /// List drivers in one department.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn drivers_by_department(&self, department: Department) -> Result<Vec<Driver>> {
        self.query_drivers(
            &format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE department = ?1 ORDER BY row_id"),
            [department.as_str()],
        )
    }

    /// List drivers that are currently active.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn active_drivers(&self) -> Result<Vec<Driver>> {
        self.query_drivers(
            &format!("SELECT {DRIVER_COLUMNS} FROM drivers WHERE is_active = 1 ORDER BY row_id"),
            [],
        )
    }

    /// Change a driver's department and/or license.
    ///
    /// Returns `false` if no driver has the given id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn update_driver(
        &self,
        id: &str,
        department: Option<Department>,
        license: Option<&str>,
    ) -> Result<bool> {
        let affected = self.conn.execute(
            r"
            UPDATE drivers
            SET department = COALESCE(?2, department),
                license = COALESCE(?3, license)
            WHERE driver_id = ?1
            ",
            params![id, department.map(Department::as_str), license],
        )?;
        Ok(affected > 0)
    }

    /// Delete a driver by business id, along with its own reference list.
    ///
    /// Packages that reference the driver are left untouched. Returns `false`
    /// if no driver has the given id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_driver(&self, id: &str) -> Result<bool> {
        self.transaction(|store| {
            let Some(row) = store.driver_row(id)? else {
                return Ok(false);
            };
            store
                .conn
                .execute("DELETE FROM driver_packages WHERE driver_row = ?1", [row])?;
            let affected = store
                .conn
                .execute("DELETE FROM drivers WHERE row_id = ?1", [row])?;
            Ok(affected > 0)
        })
    }

    /// Count stored drivers.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_drivers(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM drivers", [], |row| row.get(0))?;
        Ok(count)
    }

    // === Packages ===

    /// Insert a new package owned by the driver at `driver_row`.
    ///
    /// Returns the storage row id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateIdentifier`] if the package id is taken.
    pub fn insert_package(&self, package: &Package, driver_row: i64) -> Result<i64> {
        self.conn
            .execute(
                r"
                INSERT INTO packages (package_id, title, weight, destination, description,
                                      is_allocated, assigned_driver, driver_row, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ",
                params![
                    package.id,
                    package.title,
                    package.weight,
                    package.destination,
                    package.description,
                    package.is_allocated,
                    package.assigned_driver,
                    driver_row,
                    package.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::duplicate_identifier(RecordKind::Package, &package.id)
                } else {
                    e.into()
                }
            })?;

        let row = self.conn.last_insert_rowid();
        debug!("Inserted package {} at row {}", package.id, row);
        Ok(row)
    }

    /// Resolve a package's business id to `(package_row, driver_row)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn package_rows(&self, id: &str) -> Result<Option<(i64, i64)>> {
        let rows = self
            .conn
            .query_row(
                "SELECT row_id, driver_row FROM packages WHERE package_id = ?1",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(rows)
    }

    /// Get a package by business id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_package(&self, id: &str) -> Result<Option<Package>> {
        let package = self
            .conn
            .query_row(
                &format!("SELECT {PACKAGE_COLUMNS} FROM packages p WHERE p.package_id = ?1"),
                [id],
                |row| Self::row_to_package(row).map(|(_, p)| p),
            )
            .optional()?;
        Ok(package)
    }

    /// List all packages in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_packages(&self) -> Result<Vec<Package>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages p ORDER BY p.row_id"
        ))?;
        let packages = stmt
            .query_map([], |row| Self::row_to_package(row).map(|(_, p)| p))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(packages)
    }

    /// List all packages with their owning driver resolved.
    ///
    /// A package whose driver row no longer exists gets `driver: None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_packages_with_drivers(&self) -> Result<Vec<PackageWithDriver>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PACKAGE_COLUMNS}, p.driver_row FROM packages p ORDER BY p.row_id"
        ))?;
        let rows = stmt
            .query_map([], |row| {
                let (_, package) = Self::row_to_package(row)?;
                let driver_row: i64 = row.get(9)?;
                Ok((package, driver_row))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(package, driver_row)| {
                Ok(PackageWithDriver {
                    driver: self.get_driver_by_row(driver_row)?,
                    package,
                })
            })
            .collect()
    }

    /// Packages on a driver's reference list, in list order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn assigned_packages(&self, driver_row: i64) -> Result<Vec<Package>> {
        let mut stmt = self.conn.prepare(&format!(
            r"
            SELECT {PACKAGE_COLUMNS} FROM driver_packages l
            JOIN packages p ON p.row_id = l.package_row
            WHERE l.driver_row = ?1
            ORDER BY l.seq
            "
        ))?;
        let packages = stmt
            .query_map([driver_row], |row| Self::row_to_package(row).map(|(_, p)| p))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(packages)
    }

    /// Set a package's destination.
    ///
    /// Returns `false` if no package has the given id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn update_package_destination(&self, id: &str, destination: &str) -> Result<bool> {
        let affected = self.conn.execute(
            "UPDATE packages SET destination = ?2 WHERE package_id = ?1",
            [id, destination],
        )?;
        Ok(affected > 0)
    }

    /// Delete a package row by business id.
    ///
    /// Returns `true` only if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_package(&self, id: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM packages WHERE package_id = ?1", [id])?;
        Ok(affected > 0)
    }

    /// Count stored packages.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn count_packages(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM packages", [], |row| row.get(0))?;
        Ok(count)
    }

    // === Reference list ===

    /// Append a package reference to the end of a driver's list.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn push_package_ref(&self, driver_row: i64, package_row: i64) -> Result<()> {
        self.conn.execute(
            "INSERT INTO driver_packages (driver_row, package_row) VALUES (?1, ?2)",
            [driver_row, package_row],
        )?;
        Ok(())
    }

    /// Remove every occurrence of a package reference from a driver's list.
    ///
    /// Returns the number of references removed; zero is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn pull_package_ref(&self, driver_row: i64, package_row: i64) -> Result<usize> {
        let affected = self.conn.execute(
            "DELETE FROM driver_packages WHERE driver_row = ?1 AND package_row = ?2",
            [driver_row, package_row],
        )?;
        Ok(affected)
    }

    /// All reference list rows, ordered by sequence.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn link_rows(&self) -> Result<Vec<LinkRow>> {
        let mut stmt = self
            .conn
            .prepare("SELECT seq, driver_row, package_row FROM driver_packages ORDER BY seq")?;
        let links = stmt
            .query_map([], |row| {
                Ok(LinkRow {
                    seq: row.get(0)?,
                    driver_row: row.get(1)?,
                    package_row: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(links)
    }

    /// `(driver_row, package_row)` for every allocated package whose driver exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn allocated_pairs(&self) -> Result<Vec<(i64, i64)>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT p.driver_row, p.row_id FROM packages p
            JOIN drivers d ON d.row_id = p.driver_row
            WHERE p.is_allocated = 1
            ORDER BY p.row_id
            ",
        )?;
        let pairs = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pairs)
    }

    /// Delete a single reference list row.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_link(&self, seq: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM driver_packages WHERE seq = ?1", [seq])?;
        Ok(affected > 0)
    }

    // === Row mapping ===

    fn query_drivers<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Driver>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, Self::row_to_driver)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(row, driver)| self.with_assigned(row, driver))
            .collect()
    }

    fn with_assigned(&self, driver_row: i64, mut driver: Driver) -> Result<Driver> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT p.package_id FROM driver_packages l
            JOIN packages p ON p.row_id = l.package_row
            WHERE l.driver_row = ?1
            ORDER BY l.seq
            ",
        )?;
        driver.assigned_packages = stmt
            .query_map([driver_row], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(driver)
    }

    /// Convert a database row to `(row_id, Driver)` with an empty reference list.
    fn row_to_driver(row: &rusqlite::Row) -> rusqlite::Result<(i64, Driver)> {
        let row_id: i64 = row.get(0)?;
        let department_str: String = row.get(3)?;
        let created_at_str: String = row.get(6)?;

        let department = department_str.parse::<Department>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                e.to_string().into(),
            )
        })?;

        Ok((
            row_id,
            Driver {
                id: row.get(1)?,
                name: row.get(2)?,
                department,
                license: row.get(4)?,
                is_active: row.get(5)?,
                assigned_packages: Vec::new(),
                created_at: parse_timestamp(&created_at_str),
            },
        ))
    }

    /// Convert a database row to `(row_id, Package)`.
    fn row_to_package(row: &rusqlite::Row) -> rusqlite::Result<(i64, Package)> {
        let row_id: i64 = row.get(0)?;
        let created_at_str: String = row.get(8)?;

        Ok((
            row_id,
            Package {
                id: row.get(1)?,
                title: row.get(2)?,
                weight: row.get(3)?,
                destination: row.get(4)?,
                description: row.get(5)?,
                is_allocated: row.get(6)?,
                assigned_driver: row.get(7)?,
                created_at: parse_timestamp(&created_at_str),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> RecordStore {
        RecordStore::open_in_memory().expect("failed to create test store")
    }

    fn test_driver(id: &str, department: Department) -> Driver {
        Driver {
            id: id.to_string(),
            name: "Alice Smith".to_string(),
            department,
            license: "AB123".to_string(),
            is_active: true,
            assigned_packages: Vec::new(),
            created_at: Utc::now(),
        }
    }

    fn test_package(id: &str, driver: &str, allocated: bool) -> Package {
        Package {
            id: id.to_string(),
            title: "Box1".to_string(),
            weight: 5,
            destination: "Melbourne".to_string(),
            description: String::new(),
            is_allocated: allocated,
            assigned_driver: driver.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_open_in_memory() {
        let store = RecordStore::open_in_memory();
        assert!(store.is_ok());
        assert_eq!(store.unwrap().path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_insert_and_get_driver() {
        let store = create_test_store();
        let driver = test_driver("D1-33-ABC", Department::Food);
        store.insert_driver(&driver).unwrap();

        let loaded = store.get_driver("D1-33-ABC").unwrap().unwrap();
        assert_eq!(loaded.name, "Alice Smith");
        assert_eq!(loaded.department, Department::Food);
        assert!(loaded.assigned_packages.is_empty());
        assert_eq!(
            loaded.created_at.timestamp(),
            driver.created_at.timestamp()
        );
    }

    #[test]
    fn test_duplicate_driver_id_rejected() {
        let store = create_test_store();
        store
            .insert_driver(&test_driver("D1-33-ABC", Department::Food))
            .unwrap();

        let err = store
            .insert_driver(&test_driver("D1-33-ABC", Department::Furniture))
            .unwrap_err();
        assert!(err.is_duplicate_identifier());

        // The original record is untouched.
        let loaded = store.get_driver("D1-33-ABC").unwrap().unwrap();
        assert_eq!(loaded.department, Department::Food);
        assert_eq!(store.count_drivers().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_package_id_rejected() {
        let store = create_test_store();
        let row = store
            .insert_driver(&test_driver("D1-33-ABC", Department::Food))
            .unwrap();
        store
            .insert_package(&test_package("PAB-SB-1", "D1-33-ABC", false), row)
            .unwrap();

        let err = store
            .insert_package(&test_package("PAB-SB-1", "D1-33-ABC", true), row)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateIdentifier {
                kind: RecordKind::Package,
                ..
            }
        ));
    }

    #[test]
    fn test_get_nonexistent() {
        let store = create_test_store();
        assert!(store.get_driver("D0-33-AAA").unwrap().is_none());
        assert!(store.get_package("PAA-SB-0").unwrap().is_none());
        assert!(store.driver_row("D0-33-AAA").unwrap().is_none());
        assert!(store.package_rows("PAA-SB-0").unwrap().is_none());
    }

    #[test]
    fn test_drivers_by_department_and_active() {
        let store = create_test_store();
        store
            .insert_driver(&test_driver("D1-33-AAA", Department::Food))
            .unwrap();
        store
            .insert_driver(&test_driver("D2-33-BBB", Department::Furniture))
            .unwrap();
        let mut idle = test_driver("D3-33-CCC", Department::Food);
        idle.is_active = false;
        store.insert_driver(&idle).unwrap();

        let food = store.drivers_by_department(Department::Food).unwrap();
        assert_eq!(food.len(), 2);
        assert!(store
            .drivers_by_department(Department::Electronic)
            .unwrap()
            .is_empty());

        let active: Vec<String> = store
            .active_drivers()
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(active, vec!["D1-33-AAA", "D2-33-BBB"]);
        assert_eq!(store.list_drivers().unwrap().len(), 3);
    }

    #[test]
    fn test_update_driver_partial() {
        let store = create_test_store();
        store
            .insert_driver(&test_driver("D1-33-ABC", Department::Food))
            .unwrap();

        assert!(store
            .update_driver("D1-33-ABC", None, Some("ZZ999"))
            .unwrap());
        let loaded = store.get_driver("D1-33-ABC").unwrap().unwrap();
        assert_eq!(loaded.license, "ZZ999");
        assert_eq!(loaded.department, Department::Food);

        assert!(store
            .update_driver("D1-33-ABC", Some(Department::Electronic), None)
            .unwrap());
        let loaded = store.get_driver("D1-33-ABC").unwrap().unwrap();
        assert_eq!(loaded.department, Department::Electronic);
        assert_eq!(loaded.license, "ZZ999");

        assert!(!store
            .update_driver("D9-33-XYZ", Some(Department::Food), None)
            .unwrap());
    }

    #[test]
    fn test_push_and_pull_references_keep_order() {
        let store = create_test_store();
        let d = store
            .insert_driver(&test_driver("D1-33-ABC", Department::Food))
            .unwrap();
        let p1 = store
            .insert_package(&test_package("PAA-SB-1", "D1-33-ABC", true), d)
            .unwrap();
        let p2 = store
            .insert_package(&test_package("PBB-SB-2", "D1-33-ABC", true), d)
            .unwrap();
        let p3 = store
            .insert_package(&test_package("PCC-SB-3", "D1-33-ABC", true), d)
            .unwrap();

        store.push_package_ref(d, p2).unwrap();
        store.push_package_ref(d, p1).unwrap();
        store.push_package_ref(d, p3).unwrap();
        let driver = store.get_driver("D1-33-ABC").unwrap().unwrap();
        assert_eq!(
            driver.assigned_packages,
            vec!["PBB-SB-2", "PAA-SB-1", "PCC-SB-3"]
        );

        assert_eq!(store.pull_package_ref(d, p1).unwrap(), 1);
        assert_eq!(store.pull_package_ref(d, p1).unwrap(), 0);
        let titles: Vec<String> = store
            .assigned_packages(d)
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(titles, vec!["PBB-SB-2", "PCC-SB-3"]);
    }

    #[test]
    fn test_update_package_destination() {
        let store = create_test_store();
        let d = store
            .insert_driver(&test_driver("D1-33-ABC", Department::Food))
            .unwrap();
        store
            .insert_package(&test_package("PAA-SB-1", "D1-33-ABC", false), d)
            .unwrap();

        assert!(store
            .update_package_destination("PAA-SB-1", "Sydney")
            .unwrap());
        assert_eq!(
            store.get_package("PAA-SB-1").unwrap().unwrap().destination,
            "Sydney"
        );
        assert!(!store
            .update_package_destination("PZZ-SB-9", "Sydney")
            .unwrap());
    }

    #[test]
    fn test_delete_package() {
        let store = create_test_store();
        let d = store
            .insert_driver(&test_driver("D1-33-ABC", Department::Food))
            .unwrap();
        store
            .insert_package(&test_package("PAA-SB-1", "D1-33-ABC", false), d)
            .unwrap();

        assert!(store.delete_package("PAA-SB-1").unwrap());
        assert!(!store.delete_package("PAA-SB-1").unwrap());
        assert_eq!(store.count_packages().unwrap(), 0);
    }

    #[test]
    fn test_delete_driver_keeps_packages() {
        let store = create_test_store();
        let d = store
            .insert_driver(&test_driver("D1-33-ABC", Department::Food))
            .unwrap();
        let p = store
            .insert_package(&test_package("PAA-SB-1", "D1-33-ABC", true), d)
            .unwrap();
        store.push_package_ref(d, p).unwrap();

        assert!(store.delete_driver("D1-33-ABC").unwrap());
        assert!(!store.delete_driver("D1-33-ABC").unwrap());

        assert_eq!(store.count_packages().unwrap(), 1);
        assert!(store.link_rows().unwrap().is_empty());

        let listed = store.list_packages_with_drivers().unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].driver.is_none());
        assert_eq!(listed[0].package.assigned_driver, "D1-33-ABC");
    }

    #[test]
    fn test_list_packages_with_drivers_resolves() {
        let store = create_test_store();
        let d = store
            .insert_driver(&test_driver("D1-33-ABC", Department::Food))
            .unwrap();
        store
            .insert_package(&test_package("PAA-SB-1", "D1-33-ABC", false), d)
            .unwrap();

        let listed = store.list_packages_with_drivers().unwrap();
        assert_eq!(listed[0].driver.as_ref().unwrap().id, "D1-33-ABC");
        assert_eq!(store.list_packages().unwrap().len(), 1);
    }

    #[test]
    fn test_allocated_pairs_skip_unallocated_and_dangling() {
        let store = create_test_store();
        let d1 = store
            .insert_driver(&test_driver("D1-33-AAA", Department::Food))
            .unwrap();
        let d2 = store
            .insert_driver(&test_driver("D2-33-BBB", Department::Food))
            .unwrap();
        let p1 = store
            .insert_package(&test_package("PAA-SB-1", "D1-33-AAA", true), d1)
            .unwrap();
        store
            .insert_package(&test_package("PBB-SB-2", "D1-33-AAA", false), d1)
            .unwrap();
        store
            .insert_package(&test_package("PCC-SB-3", "D2-33-BBB", true), d2)
            .unwrap();
        store.delete_driver("D2-33-BBB").unwrap();

        assert_eq!(store.allocated_pairs().unwrap(), vec![(d1, p1)]);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let store = create_test_store();
        let result: Result<()> = store.transaction(|s| {
            s.insert_driver(&test_driver("D1-33-ABC", Department::Food))?;
            Err(Error::internal("boom"))
        });
        assert!(result.is_err());
        assert_eq!(store.count_drivers().unwrap(), 0);
    }

    #[test]
    fn test_transaction_commits() {
        let store = create_test_store();
        let row = store
            .transaction(|s| s.insert_driver(&test_driver("D1-33-ABC", Department::Food)))
            .unwrap();
        assert!(row > 0);
        assert_eq!(store.count_drivers().unwrap(), 1);
    }

    #[test]
    fn test_delete_link() {
        let store = create_test_store();
        store.push_package_ref(1, 2).unwrap();
        let links = store.link_rows().unwrap();
        assert_eq!(links.len(), 1);
        assert!(store.delete_link(links[0].seq).unwrap());
        assert!(!store.delete_link(links[0].seq).unwrap());
    }

    #[test]
    fn test_open_file_based() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("records.db");

        let store = RecordStore::open(&db_path).unwrap();
        store
            .insert_driver(&test_driver("D1-33-ABC", Department::Food))
            .unwrap();
        assert_eq!(store.path(), db_path);
        drop(store);

        let reopened = RecordStore::open(&db_path).unwrap();
        assert_eq!(reopened.count_drivers().unwrap(), 1);
    }
}
