//! The operations exposed to callers.
//!
//! [`Fleet`] owns the record store, the counter sink and the id generator.
//! Every mutating operation takes an explicit [`Access`] and checks it before
//! validating or writing anything. Counters are bumped only after the
//! operation succeeds, and a counter failure is logged rather than returned.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::accounts::Access;
use crate::config::Config;
use crate::counters::{CounterSnapshot, CounterStore, Counters, Operation};
use crate::error::{Error, RecordKind, Result};
use crate::ids::IdGenerator;
use crate::linker::{Linker, ReconcileReport};
use crate::model::{
    Department, Driver, DriverUpdate, DriverWithPackages, NewDriver, NewPackage, Package,
    PackageWithDriver,
};
use crate::storage::RecordStore;
use crate::validation;

/// Default number of attempts at generating an unused identifier.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Number of stored records of each kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    /// Stored drivers.
    pub drivers: i64,
    /// Stored packages.
    pub packages: i64,
}

/// Driver and package operations over a record store and a counter sink.
#[derive(Debug)]
pub struct Fleet {
    store: RecordStore,
    counters: Box<dyn Counters>,
    ids: IdGenerator,
    max_attempts: u32,
}

impl Fleet {
    /// Open the record and operations databases named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if either database cannot be opened.
    pub fn open(config: &Config) -> Result<Self> {
        let store = RecordStore::open(config.records_path())?;
        let counters = CounterStore::open(config.operations_path())?;
        Ok(Self::with_parts(
            store,
            Box::new(counters),
            IdGenerator::new(),
            config.ids.max_attempts,
        ))
    }

    /// Create a fleet backed by in-memory databases.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory databases cannot be created.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::with_parts(
            RecordStore::open_in_memory()?,
            Box::new(CounterStore::open_in_memory()?),
            IdGenerator::new(),
            DEFAULT_MAX_ATTEMPTS,
        ))
    }

    /// Assemble a fleet from its parts. `max_attempts` is raised to at least 1.
    #[must_use]
    pub fn with_parts(
        store: RecordStore,
        counters: Box<dyn Counters>,
        ids: IdGenerator,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            counters,
            ids,
            max_attempts: max_attempts.max(1),
        }
    }

    /// The underlying record store.
    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// The counter sink.
    #[must_use]
    pub fn counters(&self) -> &dyn Counters {
        self.counters.as_ref()
    }

    // === Drivers ===

    /// Validate and store a new driver under a freshly generated id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthenticated`] for anonymous access,
    /// [`Error::Validation`] for a bad field, and
    /// [`Error::DuplicateIdentifier`] if every generated id was taken.
    pub fn create_driver(&mut self, access: &Access, new: &NewDriver) -> Result<Driver> {
        access.require_operator()?;
        let department = validation::validate_new_driver(new)?;

        let store = &self.store;
        let driver = retry_unique(self.max_attempts, || {
            let driver = Driver {
                id: self.ids.driver_id(),
                name: new.name.clone(),
                department,
                license: new.license.clone(),
                is_active: new.is_active,
                assigned_packages: Vec::new(),
                created_at: chrono::Utc::now(),
            };
            store.insert_driver(&driver)?;
            Ok(driver)
        })?;

        info!("Created driver {} ({})", driver.id, driver.department);
        self.count(Operation::Insert);
        Ok(driver)
    }

    /// Change a driver's department and/or license.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthenticated`], [`Error::Validation`] or
    /// [`Error::NotFound`].
    pub fn update_driver(
        &self,
        access: &Access,
        id: &str,
        update: &DriverUpdate,
    ) -> Result<Driver> {
        access.require_operator()?;
        let driver = self.linker().update_driver(id, update)?;
        info!("Updated driver {}", id);
        self.count(Operation::Update);
        Ok(driver)
    }

    /// Delete a driver. Packages naming it are left in place.
    ///
    /// Returns `false` if no driver has the id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthenticated`] for anonymous access.
    pub fn delete_driver(&self, access: &Access, id: &str) -> Result<bool> {
        access.require_operator()?;
        let deleted = self.linker().delete_driver(id)?;
        if deleted {
            info!("Deleted driver {}", id);
            self.count(Operation::Delete);
        } else {
            debug!("No driver {} to delete", id);
        }
        Ok(deleted)
    }

    /// List every driver with its allocated packages, in list order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_drivers(&self) -> Result<Vec<DriverWithPackages>> {
        let drivers = self.with_packages(self.store.list_drivers()?)?;
        self.count(Operation::Retrieve);
        Ok(drivers)
    }

    /// List drivers in one department.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an unknown department.
    pub fn drivers_by_department(&self, department: &str) -> Result<Vec<Driver>> {
        let department: Department = validation::parse_department(department)?;
        let drivers = self.store.drivers_by_department(department)?;
        self.count(Operation::Retrieve);
        Ok(drivers)
    }

    /// List active drivers.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn active_drivers(&self) -> Result<Vec<Driver>> {
        let drivers = self.store.active_drivers()?;
        self.count(Operation::Retrieve);
        Ok(drivers)
    }

    /// Look up one driver.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_driver(&self, id: &str) -> Result<Option<Driver>> {
        self.store.get_driver(id)
    }

    // === Packages ===

    /// Validate and store a new package, linking it to its driver when allocated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthenticated`] for anonymous access,
    /// [`Error::Validation`] for a bad field, [`Error::NotFound`] if the
    /// driver does not exist, and [`Error::DuplicateIdentifier`] if every
    /// generated id was taken.
    pub fn create_package(&mut self, access: &Access, new: &NewPackage) -> Result<Package> {
        access.require_operator()?;
        validation::validate_new_package(new)?;

        let linker = Linker::new(&self.store);
        let ids = &mut self.ids;
        let package = retry_unique(self.max_attempts, || {
            linker.create_package(ids.package_id(), new)
        })?;

        info!(
            "Created package {} for driver {}",
            package.id, package.assigned_driver
        );
        self.count(Operation::Insert);
        Ok(package)
    }

    /// Change a package's destination.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthenticated`], [`Error::Validation`] or
    /// [`Error::NotFound`].
    pub fn update_package_destination(
        &self,
        access: &Access,
        id: &str,
        destination: &str,
    ) -> Result<Package> {
        access.require_operator()?;
        let package = self.linker().update_package_destination(id, destination)?;
        info!("Package {} now bound for {}", id, package.destination);
        self.count(Operation::Update);
        Ok(package)
    }

    /// Delete a package and unlink it from its driver.
    ///
    /// Returns `false` if no package has the id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthenticated`] for anonymous access.
    pub fn delete_package(&self, access: &Access, id: &str) -> Result<bool> {
        access.require_operator()?;
        let deleted = match self.linker().delete_package(id) {
            Ok(deleted) => deleted,
            Err(e) if e.is_not_found() => {
                debug!("No package {} to delete", id);
                false
            }
            Err(e) => return Err(e),
        };
        if deleted {
            info!("Deleted package {}", id);
            self.count(Operation::Delete);
        }
        Ok(deleted)
    }

    /// List every package with its driver resolved.
    ///
    /// A package whose driver was deleted comes back with `driver: None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_packages(&self) -> Result<Vec<PackageWithDriver>> {
        let packages = self.store.list_packages_with_drivers()?;
        for entry in packages.iter().filter(|p| p.driver.is_none()) {
            warn!(
                "Package {} references missing driver {}",
                entry.package.id, entry.package.assigned_driver
            );
        }
        self.count(Operation::Retrieve);
        Ok(packages)
    }

    /// Look up one package.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_package(&self, id: &str) -> Result<Option<Package>> {
        self.store.get_package(id)
    }

    // === Reporting and maintenance ===

    /// Number of stored drivers and packages.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn record_counts(&self) -> Result<RecordCounts> {
        Ok(RecordCounts {
            drivers: self.store.count_drivers()?,
            packages: self.store.count_packages()?,
        })
    }

    /// Read the counters. Viewing the report counts as a retrieve, recorded
    /// after the snapshot is taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the counters cannot be read.
    pub fn counter_report(&self) -> Result<CounterSnapshot> {
        let snapshot = self.counters.snapshot()?;
        self.count(Operation::Retrieve);
        Ok(snapshot)
    }

    /// Rebuild every driver's package list from the packages themselves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unauthenticated`] for anonymous access.
    pub fn reconcile(&self, access: &Access) -> Result<ReconcileReport> {
        let operator = access.require_operator()?;
        debug!("Reconcile requested by {}", operator);
        self.linker().reconcile()
    }

    fn linker(&self) -> Linker<'_> {
        Linker::new(&self.store)
    }

    fn with_packages(&self, drivers: Vec<Driver>) -> Result<Vec<DriverWithPackages>> {
        drivers
            .into_iter()
            .map(|driver| {
                let row = self
                    .store
                    .driver_row(&driver.id)?
                    .ok_or_else(|| Error::not_found(RecordKind::Driver, &driver.id))?;
                let packages = self.store.assigned_packages(row)?;
                Ok(DriverWithPackages { driver, packages })
            })
            .collect()
    }

    fn count(&self, op: Operation) {
        if let Err(e) = self.counters.increment(op) {
            warn!("Failed to record {} operation: {}", op, e);
        }
    }
}

/// Run `attempt` until it succeeds or fails with something other than a
/// duplicate identifier, at most `max_attempts` times.
fn retry_unique<T>(max_attempts: u32, mut attempt: impl FnMut() -> Result<T>) -> Result<T> {
    let mut tries = 1;
    loop {
        match attempt() {
            Err(e) if e.is_duplicate_identifier() && tries < max_attempts => {
                debug!("Identifier collision ({}), retrying", e);
                tries += 1;
            }
            other => return other,
        }
    }
}
