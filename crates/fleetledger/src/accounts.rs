//! Operator accounts and access credentials.
//!
//! Accounts live in the operations database. Logging in yields an [`Access`]
//! value that callers pass explicitly to every mutating operation; there is
//! no process-wide login state.

use std::path::{Path, PathBuf};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{is_unique_violation, Error, Result};
use crate::storage::{migrations, open_connection, open_memory_connection, parse_timestamp};
use crate::validation;

/// Who is making a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Access {
    /// A logged-in operator.
    Operator {
        /// The operator's username.
        username: String,
    },
    /// No credential was presented.
    #[default]
    Anonymous,
}

impl Access {
    /// Create an operator credential.
    #[must_use]
    pub fn operator(username: impl Into<String>) -> Self {
        Self::Operator {
            username: username.into(),
        }
    }

    /// Whether this credential belongs to a logged-in operator.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Operator { .. })
    }

    /// Return the operator's username, or fail for anonymous access.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthenticated`] for [`Access::Anonymous`].
    pub fn require_operator(&self) -> Result<&str> {
        match self {
            Self::Operator { username } => Ok(username.as_str()),
            Self::Anonymous => Err(Error::Unauthenticated),
        }
    }
}

/// A sign-up request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUp {
    /// Desired username.
    pub username: String,
    /// Contact email; must be unique.
    pub email: String,
    /// Password.
    pub password: String,
    /// Password typed a second time.
    pub confirm_password: String,
}

/// A stored operator account, without its password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Username.
    pub username: String,
    /// Email.
    pub email: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// `SQLite`-backed operator account store.
#[derive(Debug)]
pub struct AccountStore {
    path: PathBuf,
    conn: Connection,
}

impl AccountStore {
    /// Open the operations database at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = open_connection(&path, &migrations::OPERATIONS_SCHEMA)?;
        Ok(Self { path, conn })
    }

    /// Create an in-memory account store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = open_memory_connection(&migrations::OPERATIONS_SCHEMA)?;
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

    /// Register a new operator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a bad username, email or password,
    /// and [`Error::DuplicateAccount`] if the email is already registered.
    pub fn sign_up(&self, request: &SignUp) -> Result<Account> {
        validation::validate_username(&request.username)?;
        validation::validate_email(&request.email)?;
        validation::validate_password(&request.password, &request.confirm_password)?;

        let duplicate = || Error::DuplicateAccount {
            email: request.email.clone(),
        };
        if self.email_exists(&request.email)? {
            return Err(duplicate());
        }

        let password_hash = hash_password(&request.password)?;
        let created_at = Utc::now();
        self.conn
            .execute(
                r"
                INSERT INTO users (username, email, password_hash, created_at)
                VALUES (?1, ?2, ?3, ?4)
                ",
                params![
                    request.username,
                    request.email,
                    password_hash,
                    created_at.to_rfc3339()
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    duplicate()
                } else {
                    e.into()
                }
            })?;

        info!("Registered operator {}", request.username);
        Ok(Account {
            username: request.username.clone(),
            email: request.email.clone(),
            created_at,
        })
    }

    /// Check a username and password, returning an operator credential.
    ///
    /// When several accounts share a username, the oldest one is checked.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] if the user is unknown or the
    /// password does not match.
    pub fn log_in(&self, username: &str, password: &str) -> Result<Access> {
        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT password_hash FROM users WHERE username = ?1 ORDER BY id LIMIT 1",
                [username],
                |row| row.get(0),
            )
            .optional()?;

        let Some(stored) = stored else {
            debug!("Login rejected: unknown user {}", username);
            return Err(Error::InvalidCredentials);
        };
        if !verify_password(password, &stored)? {
            debug!("Login rejected: wrong password for {}", username);
            return Err(Error::InvalidCredentials);
        }

        info!("Operator {} logged in", username);
        Ok(Access::operator(username))
    }

    /// List registered accounts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list(&self) -> Result<Vec<Account>> {
        let mut stmt = self
            .conn
            .prepare("SELECT username, email, created_at FROM users ORDER BY id")?;
        let accounts = stmt
            .query_map([], |row| {
                let created_at: String = row.get(2)?;
                Ok(Account {
                    username: row.get(0)?,
                    email: row.get(1)?,
                    created_at: parse_timestamp(&created_at),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    fn email_exists(&self, email: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1",
            [email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

/// Hash a password with Argon2id and a random salt.
fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::PasswordHash(e.to_string()))
}

/// Verify a password against a stored PHC hash string.
fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| Error::PasswordHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
