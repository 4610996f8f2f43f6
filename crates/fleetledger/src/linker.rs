//! Driver and package reference maintenance.
//!
//! A package names its driver in `assigned_driver`; a driver lists its
//! allocated packages in `assigned_packages`. The [`Linker`] keeps the two
//! sides consistent across create, update and delete.
//!
//! Invariant: an allocated package appears exactly once in its driver's list,
//! and a deleted package appears in no list. Deleting a driver does not touch
//! the packages that name it.

use std::collections::HashSet;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Error, RecordKind, Result};
use crate::model::{Driver, DriverUpdate, NewPackage, Package};
use crate::storage::RecordStore;
use crate::validation;

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// References appended for allocated packages missing from their driver's list.
    pub added: usize,
    /// Stale or duplicate references removed.
    pub removed: usize,
}

impl ReconcileReport {
    /// Whether the pass found nothing to fix.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// Maintains the bidirectional driver/package reference.
#[derive(Debug, Clone, Copy)]
pub struct Linker<'a> {
    store: &'a RecordStore,
}

impl<'a> Linker<'a> {
    /// Create a linker over a record store.
    #[must_use]
    pub fn new(store: &'a RecordStore) -> Self {
        Self { store }
    }

    /// Create a package with the given id and link it to its driver.
    ///
    /// The package row and, when allocated, the driver's new reference are
    /// written in one transaction. The input must already be validated.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the driver does not exist and
    /// [`Error::DuplicateIdentifier`] if `id` is taken. Nothing is written
    /// in either case.
    pub fn create_package(&self, id: String, new: &NewPackage) -> Result<Package> {
        self.store.transaction(|store| {
            let driver_row = store
                .driver_row(&new.assigned_driver)?
                .ok_or_else(|| Error::not_found(RecordKind::Driver, &new.assigned_driver))?;

            let package = Package {
                id,
                title: new.title.clone(),
                weight: new.weight,
                destination: new.destination.clone(),
                description: new.description.clone(),
                is_allocated: new.is_allocated,
                assigned_driver: new.assigned_driver.clone(),
                created_at: Utc::now(),
            };
            let package_row = store.insert_package(&package, driver_row)?;

            if package.is_allocated {
                store.push_package_ref(driver_row, package_row)?;
                debug!(
                    "Allocated package {} to driver {}",
                    package.id, package.assigned_driver
                );
            }
            Ok(package)
        })
    }

    /// Change a package's destination. No references are rebound.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a bad destination and
    /// [`Error::NotFound`] if the package does not exist.
    pub fn update_package_destination(&self, id: &str, destination: &str) -> Result<Package> {
        validation::validate_destination(destination)?;
        if !self.store.update_package_destination(id, destination)? {
            return Err(Error::not_found(RecordKind::Package, id));
        }
        self.store
            .get_package(id)?
            .ok_or_else(|| Error::not_found(RecordKind::Package, id))
    }

    /// Delete a package and remove it from its driver's list.
    ///
    /// Removing an absent reference is not an error. Returns `true` only if
    /// the package row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the package does not exist.
    pub fn delete_package(&self, id: &str) -> Result<bool> {
        self.store.transaction(|store| {
            let (package_row, driver_row) = store
                .package_rows(id)?
                .ok_or_else(|| Error::not_found(RecordKind::Package, id))?;

            let pulled = store.pull_package_ref(driver_row, package_row)?;
            debug!("Removed {} reference(s) to package {}", pulled, id);

            store.delete_package(id)
        })
    }

    /// Delete a driver by business id.
    ///
    /// Packages naming the driver keep their reference, which then dangles.
    /// Returns `false` if no driver has the id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn delete_driver(&self, id: &str) -> Result<bool> {
        let deleted = self.store.delete_driver(id)?;
        if deleted {
            let dangling = self
                .store
                .list_packages()?
                .into_iter()
                .filter(|p| p.assigned_driver == id)
                .count();
            if dangling > 0 {
                warn!(
                    "Driver {} deleted with {} package(s) still referencing it",
                    id, dangling
                );
            }
        }
        Ok(deleted)
    }

    /// Change a driver's department and/or license.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a bad value and [`Error::NotFound`]
    /// if the driver does not exist.
    pub fn update_driver(&self, id: &str, update: &DriverUpdate) -> Result<Driver> {
        let department = validation::validate_driver_update(update)?;
        if !self
            .store
            .update_driver(id, department, update.license.as_deref())?
        {
            return Err(Error::not_found(RecordKind::Driver, id));
        }
        self.store
            .get_driver(id)?
            .ok_or_else(|| Error::not_found(RecordKind::Driver, id))
    }

    /// Rebuild every driver's list from the packages' own references.
    ///
    /// Each allocated package whose driver exists ends up exactly once in that
    /// driver's list, keeping existing order. Every other reference is removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; nothing is changed then.
    pub fn reconcile(&self) -> Result<ReconcileReport> {
        let report = self.store.transaction(|store| {
            let expected = store.allocated_pairs()?;
            let wanted: HashSet<(i64, i64)> = expected.iter().copied().collect();
            let mut present = HashSet::new();
            let mut report = ReconcileReport::default();

            for link in store.link_rows()? {
                let pair = (link.driver_row, link.package_row);
                if !wanted.contains(&pair) || !present.insert(pair) {
                    store.delete_link(link.seq)?;
                    report.removed += 1;
                }
            }

            for (driver_row, package_row) in expected {
                if present.insert((driver_row, package_row)) {
                    store.push_package_ref(driver_row, package_row)?;
                    report.added += 1;
                }
            }
            Ok(report)
        })?;

        if report.is_clean() {
            debug!("Reconcile found no inconsistencies");
        } else {
            info!(
                "Reconcile added {} and removed {} reference(s)",
                report.added, report.removed
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Department;

    fn store_with_driver(id: &str) -> RecordStore {
        let store = RecordStore::open_in_memory().unwrap();
        store
            .insert_driver(&Driver {
                id: id.to_string(),
                name: "Alice Smith".to_string(),
                department: Department::Food,
                license: "AB123".to_string(),
                is_active: true,
                assigned_packages: Vec::new(),
                created_at: Utc::now(),
            })
            .unwrap();
        store
    }

    fn new_package(driver: &str, allocated: bool) -> NewPackage {
        NewPackage {
            title: "Box1".to_string(),
            weight: 5,
            destination: "Melbourne".to_string(),
            description: String::new(),
            is_allocated: allocated,
            assigned_driver: driver.to_string(),
        }
    }

    fn assigned(store: &RecordStore, driver: &str) -> Vec<String> {
        store.get_driver(driver).unwrap().unwrap().assigned_packages
    }

    #[test]
    fn test_create_allocated_package_links_once() {
        let store = store_with_driver("D1-33-ABC");
        let linker = Linker::new(&store);

        let package = linker
            .create_package("PAA-SB-1".to_string(), &new_package("D1-33-ABC", true))
            .unwrap();
        assert_eq!(package.assigned_driver, "D1-33-ABC");
        assert_eq!(assigned(&store, "D1-33-ABC"), vec!["PAA-SB-1"]);
    }

    #[test]
    fn test_create_unallocated_package_does_not_link() {
        let store = store_with_driver("D1-33-ABC");
        let linker = Linker::new(&store);

        linker
            .create_package("PAA-SB-1".to_string(), &new_package("D1-33-ABC", false))
            .unwrap();
        assert!(assigned(&store, "D1-33-ABC").is_empty());
        assert_eq!(store.count_packages().unwrap(), 1);
    }

    #[test]
    fn test_create_package_unknown_driver() {
        let store = store_with_driver("D1-33-ABC");
        let linker = Linker::new(&store);

        let err = linker
            .create_package("PAA-SB-1".to_string(), &new_package("D9-33-XYZ", true))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                kind: RecordKind::Driver,
                ..
            }
        ));
        assert_eq!(store.count_packages().unwrap(), 0);
    }

    #[test]
    fn test_create_package_duplicate_id_leaves_links_alone() {
        let store = store_with_driver("D1-33-ABC");
        let linker = Linker::new(&store);
        linker
            .create_package("PAA-SB-1".to_string(), &new_package("D1-33-ABC", true))
            .unwrap();

        let err = linker
            .create_package("PAA-SB-1".to_string(), &new_package("D1-33-ABC", true))
            .unwrap_err();
        assert!(err.is_duplicate_identifier());
        assert_eq!(assigned(&store, "D1-33-ABC"), vec!["PAA-SB-1"]);
    }

    #[test]
    fn test_delete_package_unlinks_then_not_found() {
        let store = store_with_driver("D1-33-ABC");
        let linker = Linker::new(&store);
        linker
            .create_package("PAA-SB-1".to_string(), &new_package("D1-33-ABC", true))
            .unwrap();
        linker
            .create_package("PBB-SB-2".to_string(), &new_package("D1-33-ABC", true))
            .unwrap();

        assert!(linker.delete_package("PAA-SB-1").unwrap());
        assert_eq!(assigned(&store, "D1-33-ABC"), vec!["PBB-SB-2"]);
        assert!(store.get_package("PAA-SB-1").unwrap().is_none());

        let err = linker.delete_package("PAA-SB-1").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_unallocated_package_is_fine() {
        let store = store_with_driver("D1-33-ABC");
        let linker = Linker::new(&store);
        linker
            .create_package("PAA-SB-1".to_string(), &new_package("D1-33-ABC", false))
            .unwrap();

        assert!(linker.delete_package("PAA-SB-1").unwrap());
    }

    #[test]
    fn test_delete_driver_leaves_dangling_package() {
        let store = store_with_driver("D1-33-ABC");
        let linker = Linker::new(&store);
        linker
            .create_package("PAA-SB-1".to_string(), &new_package("D1-33-ABC", true))
            .unwrap();

        assert!(linker.delete_driver("D1-33-ABC").unwrap());
        assert!(!linker.delete_driver("D1-33-ABC").unwrap());

        let package = store.get_package("PAA-SB-1").unwrap().unwrap();
        assert_eq!(package.assigned_driver, "D1-33-ABC");

        // The package can still be deleted once its driver is gone.
        assert!(linker.delete_package("PAA-SB-1").unwrap());
    }

    #[test]
    fn test_update_destination() {
        let store = store_with_driver("D1-33-ABC");
        let linker = Linker::new(&store);
        linker
            .create_package("PAA-SB-1".to_string(), &new_package("D1-33-ABC", true))
            .unwrap();

        let updated = linker
            .update_package_destination("PAA-SB-1", "Adelaide")
            .unwrap();
        assert_eq!(updated.destination, "Adelaide");
        assert_eq!(assigned(&store, "D1-33-ABC"), vec!["PAA-SB-1"]);

        let err = linker
            .update_package_destination("PAA-SB-1", "Nope")
            .unwrap_err();
        assert_eq!(err.field(), Some("destination"));
        assert_eq!(
            store.get_package("PAA-SB-1").unwrap().unwrap().destination,
            "Adelaide"
        );

        assert!(linker
            .update_package_destination("PZZ-SB-9", "Adelaide")
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_update_driver() {
        let store = store_with_driver("D1-33-ABC");
        let linker = Linker::new(&store);

        let driver = linker
            .update_driver(
                "D1-33-ABC",
                &DriverUpdate {
                    department: Some("Furniture".to_string()),
                    license: None,
                },
            )
            .unwrap();
        assert_eq!(driver.department, Department::Furniture);
        assert_eq!(driver.license, "AB123");

        let err = linker
            .update_driver(
                "D1-33-ABC",
                &DriverUpdate {
                    department: None,
                    license: Some("bad".to_string()),
                },
            )
            .unwrap_err();
        assert!(err.is_validation());

        let err = linker
            .update_driver(
                "D9-33-XYZ",
                &DriverUpdate {
                    department: Some("Food".to_string()),
                    license: None,
                },
            )
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_reconcile_clean_store() {
        let store = store_with_driver("D1-33-ABC");
        let linker = Linker::new(&store);
        linker
            .create_package("PAA-SB-1".to_string(), &new_package("D1-33-ABC", true))
            .unwrap();

        assert!(linker.reconcile().unwrap().is_clean());
    }

    #[test]
    fn test_reconcile_repairs_missing_duplicate_and_stale_refs() {
        let store = store_with_driver("D1-33-ABC");
        let linker = Linker::new(&store);
        let d = store.driver_row("D1-33-ABC").unwrap().unwrap();

        let allocated = linker
            .create_package("PAA-SB-1".to_string(), &new_package("D1-33-ABC", true))
            .unwrap();
        linker
            .create_package("PBB-SB-2".to_string(), &new_package("D1-33-ABC", false))
            .unwrap();
        let (p1, _) = store.package_rows(&allocated.id).unwrap().unwrap();
        let (p2, _) = store.package_rows("PBB-SB-2").unwrap().unwrap();

        // Duplicate the allocated reference and link the unallocated package.
        store.push_package_ref(d, p1).unwrap();
        store.push_package_ref(d, p2).unwrap();
        assert_eq!(
            assigned(&store, "D1-33-ABC"),
            vec!["PAA-SB-1", "PAA-SB-1", "PBB-SB-2"]
        );

        let report = linker.reconcile().unwrap();
        assert_eq!(report, ReconcileReport { added: 0, removed: 2 });
        assert_eq!(assigned(&store, "D1-33-ABC"), vec!["PAA-SB-1"]);

        // Drop the only reference, then let reconcile restore it.
        store.pull_package_ref(d, p1).unwrap();
        let report = linker.reconcile().unwrap();
        assert_eq!(report, ReconcileReport { added: 1, removed: 0 });
        assert_eq!(assigned(&store, "D1-33-ABC"), vec!["PAA-SB-1"]);
    }
}
