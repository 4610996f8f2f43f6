//! `fleetledger` - Driver and package records with operation counters
//!
//! This library keeps drivers and the packages allocated to them in a
//! `SQLite` record store, maintains the reference between the two on every
//! create and delete, and counts operations in a separate database.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod accounts;
pub mod cli;
pub mod config;
pub mod counters;
pub mod error;
pub mod fleet;
pub mod ids;
pub mod linker;
pub mod logging;
pub mod model;
pub mod storage;
pub mod validation;

pub use accounts::{Access, Account, AccountStore, SignUp};
pub use config::Config;
pub use counters::{CounterSnapshot, CounterStore, Counters, Operation};
pub use error::{Error, RecordKind, Result};
pub use fleet::{Fleet, RecordCounts};
pub use linker::ReconcileReport;
pub use logging::init_logging;
pub use model::{
    Department, Driver, DriverUpdate, DriverWithPackages, NewDriver, NewPackage, Package,
    PackageWithDriver,
};
pub use storage::RecordStore;
