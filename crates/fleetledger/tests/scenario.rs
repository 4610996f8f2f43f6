//! End-to-end flows through the library against file-backed databases.

use fleetledger::config::{Config, StorageConfig};
use fleetledger::{
    Access, AccountStore, Fleet, NewDriver, NewPackage, Operation, RecordStore, SignUp,
};
use tempfile::TempDir;

struct TestEnv {
    _tmp: TempDir,
    config: Config,
}

impl TestEnv {
    fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let config = Config {
            storage: StorageConfig {
                records_path: Some(tmp.path().join("data").join("records.db")),
                operations_path: Some(tmp.path().join("data").join("operations.db")),
            },
            ..Config::default()
        };
        Self { _tmp: tmp, config }
    }

    fn fleet(&self) -> Fleet {
        Fleet::open(&self.config).expect("open fleet")
    }

    fn operator(&self) -> Access {
        let accounts = AccountStore::open(self.config.operations_path()).expect("open accounts");
        accounts
            .sign_up(&SignUp {
                username: "dispatcher1".to_string(),
                email: "ops@example.com".to_string(),
                password: "secret1".to_string(),
                confirm_password: "secret1".to_string(),
            })
            .expect("sign up");
        accounts.log_in("dispatcher1", "secret1").expect("log in")
    }
}

fn alice() -> NewDriver {
    NewDriver {
        name: "Alice Smith".to_string(),
        department: "Food".to_string(),
        license: "AB123".to_string(),
        is_active: true,
    }
}

fn box1(driver: &str) -> NewPackage {
    NewPackage {
        title: "Box1".to_string(),
        weight: 5,
        destination: "Melbourne".to_string(),
        description: String::new(),
        is_allocated: true,
        assigned_driver: driver.to_string(),
    }
}

#[test]
fn alice_scenario_across_requests() {
    let env = TestEnv::new();
    let access = env.operator();

    // Each block reopens the databases, as separate CLI invocations would.
    let (driver_id, package_id) = {
        let mut fleet = env.fleet();
        let driver = fleet.create_driver(&access, &alice()).unwrap();
        let package = fleet.create_package(&access, &box1(&driver.id)).unwrap();
        (driver.id, package.id)
    };

    {
        let fleet = env.fleet();
        let drivers = fleet.list_drivers().unwrap();
        assert_eq!(drivers.len(), 1);
        assert_eq!(drivers[0].driver.assigned_packages, vec![package_id.clone()]);
    }

    {
        let fleet = env.fleet();
        assert!(fleet.delete_package(&access, &package_id).unwrap());
    }

    let fleet = env.fleet();
    let drivers = fleet.list_drivers().unwrap();
    assert_eq!(drivers[0].driver.id, driver_id);
    assert!(drivers[0].driver.assigned_packages.is_empty());
    assert!(fleet.get_package(&package_id).unwrap().is_none());
    assert!(!fleet.delete_package(&access, &package_id).unwrap());

    let snapshot = fleet.counters().snapshot().unwrap();
    assert_eq!(snapshot.get(Operation::Insert), 2);
    assert_eq!(snapshot.get(Operation::Delete), 1);
    assert_eq!(snapshot.get(Operation::Retrieve), 2);
    assert_eq!(snapshot.get(Operation::Update), 0);
}

#[test]
fn anonymous_requests_change_nothing() {
    let env = TestEnv::new();
    let access = env.operator();
    let driver_id = env.fleet().create_driver(&access, &alice()).unwrap().id;

    let mut fleet = env.fleet();
    let anon = Access::Anonymous;
    assert!(fleet.create_package(&anon, &box1(&driver_id)).is_err());
    assert!(fleet.delete_driver(&anon, &driver_id).is_err());

    let counts = fleet.record_counts().unwrap();
    assert_eq!(counts.drivers, 1);
    assert_eq!(counts.packages, 0);
}

#[test]
fn reconcile_repairs_a_lost_reference() {
    let env = TestEnv::new();
    let access = env.operator();

    let (driver_id, package_id) = {
        let mut fleet = env.fleet();
        let driver = fleet.create_driver(&access, &alice()).unwrap();
        let package = fleet.create_package(&access, &box1(&driver.id)).unwrap();
        (driver.id, package.id)
    };

    // Drop the reference directly, leaving the package still allocated.
    {
        let store = RecordStore::open(env.config.records_path()).unwrap();
        let driver_row = store.driver_row(&driver_id).unwrap().unwrap();
        let (package_row, _) = store.package_rows(&package_id).unwrap().unwrap();
        assert_eq!(store.pull_package_ref(driver_row, package_row).unwrap(), 1);
    }

    let fleet = env.fleet();
    let report = fleet.reconcile(&access).unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(report.removed, 0);

    let driver = fleet.get_driver(&driver_id).unwrap().unwrap();
    assert_eq!(driver.assigned_packages, vec![package_id]);
}

#[test]
fn rejected_input_leaves_no_record() {
    let env = TestEnv::new();
    let access = env.operator();
    let mut fleet = env.fleet();

    let mut bad = alice();
    bad.name = "R2D2".to_string();
    let err = fleet.create_driver(&access, &bad).unwrap_err();
    assert_eq!(err.field(), Some("name"));

    let driver = fleet.create_driver(&access, &alice()).unwrap();
    let mut heavy = box1(&driver.id);
    heavy.weight = -5;
    assert_eq!(
        fleet.create_package(&access, &heavy).unwrap_err().field(),
        Some("weight")
    );

    let counts = fleet.record_counts().unwrap();
    assert_eq!(counts.drivers, 1);
    assert_eq!(counts.packages, 0);
    assert_eq!(fleet.counters().snapshot().unwrap().insert, 1);
}
