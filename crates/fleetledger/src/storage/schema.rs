//! `SQLite` schema definitions for the record store.
//!
//! Drivers and packages each carry an internal `row_id` and a generated
//! business id. Cross references use row ids. A driver's ordered package list
//! lives in `driver_packages` so a single reference can be appended or removed
//! with one statement.
//!
//! The operations database (counters and operator accounts) is a separate
//! file with its own statements.

/// SQL statement to create the drivers table.
pub const CREATE_DRIVERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS drivers (
    row_id INTEGER PRIMARY KEY AUTOINCREMENT,
    driver_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    department TEXT NOT NULL,
    license TEXT NOT NULL,
    is_active INTEGER NOT NULL,
    created_at TEXT NOT NULL
)
";

/// SQL statement to create the packages table.
///
/// `driver_row` is deliberately not a foreign key: deleting a driver leaves
/// its packages in place.
pub const CREATE_PACKAGES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS packages (
    row_id INTEGER PRIMARY KEY AUTOINCREMENT,
    package_id TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    weight INTEGER NOT NULL,
    destination TEXT NOT NULL,
    description TEXT NOT NULL,
    is_allocated INTEGER NOT NULL,
    assigned_driver TEXT NOT NULL,
    driver_row INTEGER NOT NULL,
    created_at TEXT NOT NULL
)
";

/// SQL statement to create the driver reference list table.
pub const CREATE_DRIVER_PACKAGES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS driver_packages (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    driver_row INTEGER NOT NULL,
    package_row INTEGER NOT NULL
)
";

/// SQL statement to index drivers by department.
pub const CREATE_DEPARTMENT_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_drivers_department ON drivers(department)
";

/// SQL statement to index packages by owning driver.
pub const CREATE_PACKAGE_DRIVER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_packages_driver ON packages(driver_row)
";

/// SQL statement to index reference list rows by driver.
pub const CREATE_LINK_DRIVER_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_driver_packages_driver ON driver_packages(driver_row, seq)
";

/// SQL statement to index reference list rows by package.
pub const CREATE_LINK_PACKAGE_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_driver_packages_package ON driver_packages(package_row)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_DRIVERS_TABLE,
    CREATE_PACKAGES_TABLE,
    CREATE_DRIVER_PACKAGES_TABLE,
    CREATE_DEPARTMENT_INDEX,
    CREATE_PACKAGE_DRIVER_INDEX,
    CREATE_LINK_DRIVER_INDEX,
    CREATE_LINK_PACKAGE_INDEX,
    CREATE_METADATA_TABLE,
];

/// SQL statement to create the operation counters table (operations database).
pub const CREATE_COUNTERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS counters (
    name TEXT PRIMARY KEY,
    insert_count INTEGER NOT NULL DEFAULT 0 CHECK (insert_count >= 0),
    retrieve_count INTEGER NOT NULL DEFAULT 0 CHECK (retrieve_count >= 0),
    update_count INTEGER NOT NULL DEFAULT 0 CHECK (update_count >= 0),
    delete_count INTEGER NOT NULL DEFAULT 0 CHECK (delete_count >= 0)
)
";

/// SQL statement to create the operator accounts table (operations database).
pub const CREATE_USERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
)
";

/// SQL statement to index accounts by username for login.
pub const CREATE_USERNAME_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_users_username ON users(username)
";

/// Operations database statements in order.
pub const OPERATIONS_SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_COUNTERS_TABLE,
    CREATE_USERS_TABLE,
    CREATE_USERNAME_INDEX,
    CREATE_METADATA_TABLE,
];
