//! Field-level validation rules.
//!
//! Every rule is a pure predicate over a proposed value and runs before
//! anything is written. A failing rule yields [`Error::Validation`] naming
//! the field.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::model::{Department, DriverUpdate, NewDriver, NewPackage};

/// A compiled rule for a text field: a character pattern plus a length range.
#[derive(Debug)]
pub struct FieldRule {
    /// Field the rule applies to.
    pub field: &'static str,
    /// Human readable description of the allowed characters.
    pub charset: &'static str,
    /// Minimum length in characters (inclusive).
    pub min_len: usize,
    /// Maximum length in characters (inclusive).
    pub max_len: usize,
    regex: Option<Regex>,
}

impl FieldRule {
    /// Create a new field rule.
    ///
    /// # Panics
    ///
    /// Panics if the regex pattern is invalid.
    #[must_use]
    pub fn new(
        field: &'static str,
        charset: &'static str,
        pattern: Option<&str>,
        min_len: usize,
        max_len: usize,
    ) -> Self {
        Self {
            field,
            charset,
            min_len,
            max_len,
            regex: pattern.map(|p| Regex::new(p).expect("Invalid field pattern")),
        }
    }

    /// Check a value against the rule.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the value has disallowed characters
    /// or its length is out of range.
    pub fn check(&self, value: &str) -> Result<()> {
        let len = value.chars().count();
        if len < self.min_len || len > self.max_len {
            let reason = if self.min_len == self.max_len {
                format!("must be exactly {} characters, got {len}", self.min_len)
            } else {
                format!(
                    "must be between {} and {} characters, got {len}",
                    self.min_len, self.max_len
                )
            };
            return Err(Error::validation(self.field, reason));
        }
        if let Some(regex) = &self.regex {
            if !regex.is_match(value) {
                return Err(Error::validation(
                    self.field,
                    format!("may only contain {}", self.charset),
                ));
            }
        }
        Ok(())
    }
}

macro_rules! rule {
    ($fn_name:ident, $field:literal, $charset:literal, $pattern:expr, $min:literal, $max:literal) => {
        fn $fn_name() -> &'static FieldRule {
            static RULE: OnceLock<FieldRule> = OnceLock::new();
            RULE.get_or_init(|| FieldRule::new($field, $charset, $pattern, $min, $max))
        }
    };
}

rule!(name_rule, "name", "letters and spaces", Some(r"^[a-zA-Z\s]+$"), 3, 20);
rule!(license_rule, "license", "letters and digits", Some(r"^[a-zA-Z0-9]+$"), 5, 5);
rule!(title_rule, "title", "letters, digits and spaces", Some(r"^[a-zA-Z0-9 ]+$"), 3, 15);
rule!(destination_rule, "destination", "letters, digits and spaces", Some(r"^[a-zA-Z0-9 ]+$"), 5, 15);
rule!(description_rule, "description", "any characters", None, 0, 30);
rule!(username_rule, "username", "letters and digits", Some(r"^[a-zA-Z0-9]+$"), 7, 64);
rule!(password_rule, "password", "any characters", None, 5, 10);

/// Validate a driver name: letters and whitespace, 3 to 20 characters.
///
/// # Errors
///
/// Returns [`Error::Validation`] for field `name`.
pub fn validate_name(name: &str) -> Result<()> {
    name_rule().check(name)
}

/// Parse and validate a department name.
///
/// # Errors
///
/// Returns [`Error::Validation`] for field `department`.
pub fn parse_department(department: &str) -> Result<Department> {
    department.parse()
}

/// Validate a license code: exactly 5 letters or digits.
///
/// # Errors
///
/// Returns [`Error::Validation`] for field `license`.
pub fn validate_license(license: &str) -> Result<()> {
    license_rule().check(license)
}

/// Validate a package title: letters, digits and spaces, 3 to 15 characters.
///
/// # Errors
///
/// Returns [`Error::Validation`] for field `title`.
pub fn validate_title(title: &str) -> Result<()> {
    title_rule().check(title)
}

/// Validate a package weight.
///
/// # Errors
///
/// Returns [`Error::Validation`] for field `weight` when negative.
pub fn validate_weight(weight: i64) -> Result<()> {
    if weight < 0 {
        return Err(Error::validation(
            "weight",
            format!("must be a non-negative integer, got {weight}"),
        ));
    }
    Ok(())
}

/// Parse a weight typed as text.
///
/// Integral decimals such as `5.0` are accepted; fractions and negatives
/// are not.
///
/// # Errors
///
/// Returns [`Error::Validation`] for field `weight`.
pub fn parse_weight(raw: &str) -> Result<i64> {
    let trimmed = raw.trim();
    let invalid = || {
        Error::validation(
            "weight",
            format!("must be a non-negative integer, got '{trimmed}'"),
        )
    };
    let weight = match trimmed.parse::<i64>() {
        Ok(weight) => weight,
        Err(_) => integral_decimal(trimmed).ok_or_else(invalid)?,
    };
    validate_weight(weight)?;
    Ok(weight)
}

/// Decimal text whose value is a whole number in `i64` range, e.g. `12.00`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn integral_decimal(text: &str) -> Option<i64> {
    let plain = text
        .bytes()
        .all(|b| b.is_ascii_digit() || b == b'.' || b == b'-');
    if !plain || !text.contains('.') {
        return None;
    }
    let value: f64 = text.parse().ok()?;
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (value.fract() == 0.0 && in_range).then(|| value as i64)
}

/// Validate a destination: letters, digits and spaces, 5 to 15 characters.
///
/// # Errors
///
/// Returns [`Error::Validation`] for field `destination`.
pub fn validate_destination(destination: &str) -> Result<()> {
    destination_rule().check(destination)
}

/// Validate a description: at most 30 characters of anything.
///
/// # Errors
///
/// Returns [`Error::Validation`] for field `description`.
pub fn validate_description(description: &str) -> Result<()> {
    description_rule().check(description)
}

/// Validate every field of a new driver, returning the parsed department.
///
/// # Errors
///
/// Returns the first [`Error::Validation`] encountered.
pub fn validate_new_driver(driver: &NewDriver) -> Result<Department> {
    validate_name(&driver.name)?;
    let department = parse_department(&driver.department)?;
    validate_license(&driver.license)?;
    Ok(department)
}

/// Validate a driver update, returning the parsed department if one was given.
///
/// # Errors
///
/// Returns [`Error::Validation`] for an invalid department or license.
pub fn validate_driver_update(update: &DriverUpdate) -> Result<Option<Department>> {
    let department = update
        .department
        .as_deref()
        .map(parse_department)
        .transpose()?;
    if let Some(license) = &update.license {
        validate_license(license)?;
    }
    Ok(department)
}

/// Validate every field of a new package.
///
/// # Errors
///
/// Returns the first [`Error::Validation`] encountered.
pub fn validate_new_package(package: &NewPackage) -> Result<()> {
    validate_title(&package.title)?;
    validate_weight(package.weight)?;
    validate_destination(&package.destination)?;
    validate_description(&package.description)?;
    Ok(())
}

/// Validate an operator username: more than 6 letters or digits.
///
/// # Errors
///
/// Returns [`Error::Validation`] for field `username`.
pub fn validate_username(username: &str) -> Result<()> {
    username_rule().check(username)
}

/// Validate a password and its confirmation.
///
/// # Errors
///
/// Returns [`Error::Validation`] for field `password` when the length is
/// out of range or the confirmation differs.
pub fn validate_password(password: &str, confirmation: &str) -> Result<()> {
    password_rule().check(password)?;
    if password != confirmation {
        return Err(Error::validation("password", "confirmation does not match"));
    }
    Ok(())
}

/// Validate an email address is present.
///
/// # Errors
///
/// Returns [`Error::Validation`] for field `email`.
pub fn validate_email(email: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(Error::validation("email", "is required"));
    }
    Ok(())
}
