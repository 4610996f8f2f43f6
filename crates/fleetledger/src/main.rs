//! `fleet` - CLI for fleetledger
//!
//! Each invocation is one request against the record and operations databases.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;

use fleetledger::cli::{Cli, Command, ConfigCommand, DriverCommand, PackageCommand, SignupCommand};
use fleetledger::model::{Department, DriverUpdate, NewDriver, NewPackage};
use fleetledger::validation::parse_weight;
use fleetledger::{init_logging, Access, AccountStore, Config, Fleet, SignUp};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let login = cli
        .login()
        .map(|(user, password)| (user.to_owned(), password.to_owned()));
    let config_path = cli.config.clone();
    let load = || Config::load_from(config_path.clone()).context("failed to load configuration");

    match cli.command {
        Command::Init => handle_init(&load()?),
        Command::Signup(cmd) => handle_signup(&load()?, cmd),
        Command::Driver(cmd) => {
            let config = load()?;
            let access = authenticate(login, &config)?;
            handle_driver(&mut Fleet::open(&config)?, &access, cmd)
        }
        Command::Package(cmd) => {
            let config = load()?;
            let access = authenticate(login, &config)?;
            handle_package(&mut Fleet::open(&config)?, &access, cmd)
        }
        Command::Stats(cmd) => handle_stats(&Fleet::open(&load()?)?, cmd.json),
        Command::Reconcile => {
            let config = load()?;
            let access = authenticate(login, &config)?;
            let report = Fleet::open(&config)?.reconcile(&access)?;
            println!(
                "Reconciled: {} reference(s) added, {} removed",
                report.added, report.removed
            );
            Ok(())
        }
        Command::Config(cmd) => handle_config(cli.config.clone(), &cmd),
    }
}

/// Turn `--user`/`--password` into an operator credential.
fn authenticate(login: Option<(String, String)>, config: &Config) -> Result<Access> {
    let Some((user, password)) = login else {
        return Ok(Access::Anonymous);
    };
    let accounts = AccountStore::open(config.operations_path())?;
    Ok(accounts.log_in(&user, &password)?)
}

fn handle_init(config: &Config) -> Result<()> {
    let fleet = Fleet::open(config)?;
    let counts = fleet.record_counts()?;

    println!("Records:    {}", fleet.store().path().display());
    println!("Operations: {}", config.operations_path().display());
    println!(
        "{} driver(s), {} package(s) on file",
        counts.drivers, counts.packages
    );
    Ok(())
}

fn handle_signup(config: &Config, cmd: SignupCommand) -> Result<()> {
    let accounts = AccountStore::open(config.operations_path())?;
    let account = accounts.sign_up(&SignUp {
        username: cmd.username,
        email: cmd.email,
        password: cmd.new_password,
        confirm_password: cmd.confirm_password,
    })?;
    println!("Registered operator {}", account.username);
    Ok(())
}

fn handle_driver(fleet: &mut Fleet, access: &Access, cmd: DriverCommand) -> Result<()> {
    match cmd {
        DriverCommand::Add {
            name,
            department,
            license,
            inactive,
        } => {
            let driver = fleet.create_driver(
                access,
                &NewDriver {
                    name,
                    department: Department::from(department).to_string(),
                    license,
                    is_active: !inactive,
                },
            )?;
            println!("{}", driver.id);
        }
        DriverCommand::List {
            department,
            active,
            json,
        } => {
            let drivers = match department {
                Some(department) => {
                    fleet.drivers_by_department(Department::from(department).as_str())?
                }
                None if active => fleet.active_drivers()?,
                None => {
                    let drivers = fleet.list_drivers()?;
                    if json {
                        println!("{}", serde_json::to_string_pretty(&drivers)?);
                    } else {
                        for entry in &drivers {
                            print_driver(&entry.driver);
                            for package in &entry.packages {
                                println!(
                                    "    {}  {} -> {}",
                                    package.id, package.title, package.destination
                                );
                            }
                        }
                    }
                    return Ok(());
                }
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&drivers)?);
            } else {
                drivers.iter().for_each(print_driver);
            }
        }
        DriverCommand::Update {
            id,
            department,
            license,
        } => {
            let update = DriverUpdate {
                department: department.map(|d| Department::from(d).to_string()),
                license,
            };
            if update.is_empty() {
                anyhow::bail!("nothing to update: pass --department and/or --license");
            }
            let driver = fleet.update_driver(access, &id, &update)?;
            print_driver(&driver);
        }
        DriverCommand::Delete { id } => {
            if fleet.delete_driver(access, &id)? {
                println!("Deleted driver {id}");
            } else {
                anyhow::bail!("driver not found: {id}");
            }
        }
    }
    Ok(())
}

fn handle_package(fleet: &mut Fleet, access: &Access, cmd: PackageCommand) -> Result<()> {
    match cmd {
        PackageCommand::Add {
            title,
            weight,
            destination,
            description,
            driver,
            unallocated,
        } => {
            // Check access before the weight so anonymous callers learn nothing else.
            access.require_operator()?;
            let package = fleet.create_package(
                access,
                &NewPackage {
                    title,
                    weight: parse_weight(&weight)?,
                    destination,
                    description,
                    is_allocated: !unallocated,
                    assigned_driver: driver,
                },
            )?;
            println!("{}", package.id);
        }
        PackageCommand::List { json } => {
            let packages = fleet.list_packages()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&packages)?);
            } else {
                for entry in &packages {
                    let p = &entry.package;
                    let driver = entry
                        .driver
                        .as_ref()
                        .map_or("(missing driver)", |d| d.name.as_str());
                    println!(
                        "{}  {:<15} {:>5}  {:<15} {} [{}]{}",
                        p.id,
                        p.title,
                        p.weight,
                        p.destination,
                        p.assigned_driver,
                        driver,
                        if p.is_allocated { "" } else { " unallocated" }
                    );
                }
            }
        }
        PackageCommand::Update { id, destination } => {
            let package = fleet.update_package_destination(access, &id, &destination)?;
            println!("{} -> {}", package.id, package.destination);
        }
        PackageCommand::Delete { id } => {
            if fleet.delete_package(access, &id)? {
                println!("Deleted package {id}");
            } else {
                anyhow::bail!("package not found: {id}");
            }
        }
    }
    Ok(())
}

fn handle_stats(fleet: &Fleet, json: bool) -> Result<()> {
    let counters = fleet.counter_report()?;
    let records = fleet.record_counts()?;

    if json {
        let stats = serde_json::json!({
            "counters": counters,
            "records": records,
        });
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("fleet stats");
        println!("-----------");
        println!("Inserts:    {}", counters.insert);
        println!("Retrieves:  {}", counters.retrieve);
        println!("Updates:    {}", counters.update);
        println!("Deletes:    {}", counters.delete);
        println!();
        println!("Drivers:    {}", records.drivers);
        println!("Packages:   {}", records.packages);
    }
    Ok(())
}

fn handle_config(config_path: Option<std::path::PathBuf>, cmd: &ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::load_from(config_path)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Records path:    {}", config.records_path().display());
                println!("  Operations path: {}", config.operations_path().display());
                println!();
                println!("[Ids]");
                println!("  Max attempts:    {}", config.ids.max_attempts);
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .clone()
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => anyhow::bail!("configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn print_driver(driver: &fleetledger::Driver) {
    println!(
        "{}  {:<20} {:<10} {}{}",
        driver.id,
        driver.name,
        driver.department,
        driver.license,
        if driver.is_active { "" } else { " (inactive)" }
    );
}
