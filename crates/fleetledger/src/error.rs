//! Error types for fleetledger.
//!
//! This module defines all error types used throughout the fleetledger crate,
//! from field validation failures up to storage and configuration errors.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// A driver record.
    Driver,
    /// A package record.
    Package,
    /// An operator account.
    Account,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Driver => write!(f, "driver"),
            Self::Package => write!(f, "package"),
            Self::Account => write!(f, "account"),
        }
    }
}

/// The main error type for fleetledger operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Domain Errors ===
    /// A field failed its validation rule. Nothing was written.
    #[error("invalid {field}: {reason}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A referenced record does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What kind of record was looked up.
        kind: RecordKind,
        /// The business identifier that failed to resolve.
        id: String,
    },

    /// A generated identifier collided with an existing record.
    #[error("duplicate {kind} identifier: {id}")]
    DuplicateIdentifier {
        /// What kind of record was being created.
        kind: RecordKind,
        /// The colliding identifier.
        id: String,
    },

    /// A package references a driver that cannot be resolved.
    ///
    /// Reserved: dangling references are currently tolerated and logged.
    #[error("package {package} references missing driver")]
    LinkInconsistency {
        /// The package holding the dangling reference.
        package: String,
    },

    // === Access Errors ===
    /// A mutating operation was attempted without an operator session.
    #[error("operation requires a logged-in operator")]
    Unauthenticated,

    /// Username or password did not match.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("an account already exists for {email}")]
    DuplicateAccount {
        /// The email that is already registered.
        email: String,
    },

    /// Hashing or verifying a password failed.
    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for fleetledger operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a validation error for the given field.
    #[must_use]
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Create a not-found error.
    #[must_use]
    pub fn not_found(kind: RecordKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Create a duplicate identifier error.
    #[must_use]
    pub fn duplicate_identifier(kind: RecordKind, id: impl Into<String>) -> Self {
        Self::DuplicateIdentifier {
            kind,
            id: id.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this error means a record could not be resolved.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error is an identifier collision.
    #[must_use]
    pub fn is_duplicate_identifier(&self) -> bool {
        matches!(self, Self::DuplicateIdentifier { .. })
    }

    /// Name of the field that failed validation, if any.
    #[must_use]
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// Check whether a `SQLite` error is a `UNIQUE` constraint violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
