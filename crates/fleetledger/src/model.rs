//! Core record types for fleetledger.
//!
//! Drivers and packages as stored, the input shapes used to create them,
//! and the populated views that resolve references between them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The department a driver works in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Department {
    /// Food deliveries.
    Food,
    /// Electronic goods.
    Electronic,
    /// Furniture.
    Furniture,
}

impl Department {
    /// All departments, in display order.
    pub const ALL: [Department; 3] = [Self::Food, Self::Electronic, Self::Furniture];

    /// The stored name of this department.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Electronic => "Electronic",
            Self::Furniture => "Furniture",
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Department {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| {
                Error::validation(
                    "department",
                    format!("'{s}' is not one of Food, Electronic, Furniture"),
                )
            })
    }
}

/// A stored driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    /// Generated business identifier, e.g. `D42-33-QRS`.
    pub id: String,
    /// Driver name.
    pub name: String,
    /// Department the driver belongs to.
    pub department: Department,
    /// Five character license code.
    pub license: String,
    /// Whether the driver is currently active.
    pub is_active: bool,
    /// Business ids of assigned packages, in assignment order.
    pub assigned_packages: Vec<String>,
    /// When the driver was created.
    pub created_at: DateTime<Utc>,
}

/// A stored package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    /// Generated business identifier, e.g. `PQX-SB-512`.
    pub id: String,
    /// Short title.
    pub title: String,
    /// Weight in whole units.
    pub weight: i64,
    /// Delivery destination.
    pub destination: String,
    /// Free-form description, may be empty.
    pub description: String,
    /// Whether the package is allocated to its driver.
    pub is_allocated: bool,
    /// Business id of the owning driver.
    pub assigned_driver: String,
    /// When the package was created.
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating a driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDriver {
    /// Driver name.
    pub name: String,
    /// Department name; parsed and validated on create.
    pub department: String,
    /// License code.
    pub license: String,
    /// Whether the driver starts active.
    pub is_active: bool,
}

/// Fields supplied when creating a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPackage {
    /// Short title.
    pub title: String,
    /// Weight in whole units.
    pub weight: i64,
    /// Delivery destination.
    pub destination: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Whether to allocate the package to its driver on creation.
    pub is_allocated: bool,
    /// Business id of the owning driver.
    pub assigned_driver: String,
}

/// Mutable driver fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverUpdate {
    /// New department name.
    pub department: Option<String>,
    /// New license code.
    pub license: Option<String>,
}

impl DriverUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.department.is_none() && self.license.is_none()
    }
}

/// A driver with its assigned packages resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverWithPackages {
    /// The driver record.
    #[serde(flatten)]
    pub driver: Driver,
    /// Packages referenced by `driver.assigned_packages`, same order.
    pub packages: Vec<Package>,
}

/// A package with its driver resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageWithDriver {
    /// The package record.
    #[serde(flatten)]
    pub package: Package,
    /// The referenced driver, or `None` when the reference dangles.
    pub driver: Option<Driver>,
}
