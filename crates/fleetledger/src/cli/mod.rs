//! Command-line interface for fleetledger.
//!
//! This module provides the CLI structure for the `fleet` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DepartmentArg, DriverCommand, PackageCommand, SignupCommand, StatsCommand,
};

use crate::logging::Verbosity;

/// fleet - Keep track of drivers and the packages they carry
///
/// Operators sign up once, then pass `--user` and `--password` to commands
/// that change records. Listing needs no login.
#[derive(Debug, Parser)]
#[command(name = "fleet")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Operator username
    #[arg(short, long, global = true, requires = "password")]
    pub user: Option<String>,

    /// Operator password
    #[arg(short, long, global = true, requires = "user")]
    pub password: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create both databases and the counter record
    Init,

    /// Register an operator account
    Signup(SignupCommand),

    /// Manage drivers
    #[command(subcommand)]
    Driver(DriverCommand),

    /// Manage packages
    #[command(subcommand)]
    Package(PackageCommand),

    /// Show operation counters and record totals
    Stats(StatsCommand),

    /// Rebuild driver package lists from the packages themselves
    Reconcile,

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }

    /// The supplied login, if both username and password were given.
    #[must_use]
    pub fn login(&self) -> Option<(&str, &str)> {
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Some((user.as_str(), password.as_str())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "fleet");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["fleet", "init"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["fleet", "-v", "init"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["fleet", "-vv", "init"]).verbosity(), Verbosity::Trace);
        assert_eq!(parse(&["fleet", "-q", "init"]).verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["fleet", "-c", "/custom/config.toml", "stats"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert!(matches!(cli.command, Command::Stats(StatsCommand { json: false })));
    }

    #[test]
    fn test_parse_driver_add() {
        let cli = parse(&[
            "fleet",
            "--user",
            "dispatcher1",
            "--password",
            "secret1",
            "driver",
            "add",
            "--name",
            "Alice Smith",
            "--department",
            "Food",
            "--license",
            "AB123",
        ]);
        assert_eq!(cli.login(), Some(("dispatcher1", "secret1")));
        match cli.command {
            Command::Driver(DriverCommand::Add {
                name,
                department,
                inactive,
                ..
            }) => {
                assert_eq!(name, "Alice Smith");
                assert_eq!(department, DepartmentArg::Food);
                assert!(!inactive);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_package_add_keeps_raw_weight() {
        let cli = parse(&[
            "fleet",
            "package",
            "add",
            "--title",
            "Box1",
            "--weight",
            "-3",
            "--destination",
            "Melbourne",
            "--driver",
            "D1-33-ABC",
        ]);
        match cli.command {
            Command::Package(PackageCommand::Add {
                weight,
                description,
                unallocated,
                ..
            }) => {
                assert_eq!(weight, "-3");
                assert!(description.is_empty());
                assert!(!unallocated);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_user_requires_password() {
        assert!(Cli::try_parse_from(["fleet", "--user", "dispatcher1", "reconcile"]).is_err());
        assert!(parse(&["fleet", "reconcile"]).login().is_none());
    }

    #[test]
    fn test_parse_driver_list_filters() {
        let cli = parse(&["fleet", "driver", "list", "--department", "Furniture", "--json"]);
        assert!(matches!(
            cli.command,
            Command::Driver(DriverCommand::List {
                department: Some(DepartmentArg::Furniture),
                active: false,
                json: true,
            })
        ));
        assert!(Cli::try_parse_from(["fleet", "driver", "list", "-d", "Food", "--active"]).is_err());
    }

    #[test]
    fn test_parse_signup() {
        let cli = parse(&[
            "fleet",
            "signup",
            "dispatcher1",
            "ops@example.com",
            "--new-password",
            "secret1",
            "--confirm-password",
            "secret1",
        ]);
        assert!(matches!(cli.command, Command::Signup(_)));
    }
}
