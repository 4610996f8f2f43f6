//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::model::Department;

/// Operator sign-up arguments.
#[derive(Debug, Args)]
pub struct SignupCommand {
    /// Username (more than 6 letters or digits)
    pub username: String,

    /// Contact email
    pub email: String,

    /// Password (5 to 10 characters)
    #[arg(long)]
    pub new_password: String,

    /// Password again
    #[arg(long)]
    pub confirm_password: String,
}

/// Driver commands.
#[derive(Debug, Subcommand)]
pub enum DriverCommand {
    /// Register a driver
    Add {
        /// Full name (letters and spaces)
        #[arg(long)]
        name: String,

        /// Department
        #[arg(long, value_enum)]
        department: DepartmentArg,

        /// Five-character licence number
        #[arg(long)]
        license: String,

        /// Register the driver as inactive
        #[arg(long)]
        inactive: bool,
    },

    /// List drivers with their packages
    List {
        /// Only drivers in this department
        #[arg(short, long, value_enum)]
        department: Option<DepartmentArg>,

        /// Only active drivers
        #[arg(short, long, conflicts_with = "department")]
        active: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Change a driver's department or licence
    Update {
        /// Driver id
        id: String,

        /// New department
        #[arg(long, value_enum)]
        department: Option<DepartmentArg>,

        /// New licence number
        #[arg(long)]
        license: Option<String>,
    },

    /// Delete a driver
    Delete {
        /// Driver id
        id: String,
    },
}

/// Package commands.
#[derive(Debug, Subcommand)]
pub enum PackageCommand {
    /// Register a package for a driver
    Add {
        /// Short title
        #[arg(long)]
        title: String,

        /// Whole, non-negative weight
        #[arg(long, allow_hyphen_values = true)]
        weight: String,

        /// Destination
        #[arg(long)]
        destination: String,

        /// Optional description
        #[arg(long, default_value = "")]
        description: String,

        /// Id of the driver carrying the package
        #[arg(long)]
        driver: String,

        /// Record the package without allocating it to the driver
        #[arg(long)]
        unallocated: bool,
    },

    /// List packages with their drivers
    List {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Change a package's destination
    Update {
        /// Package id
        id: String,

        /// New destination
        #[arg(long)]
        destination: String,
    },

    /// Delete a package
    Delete {
        /// Package id
        id: String,
    },
}

/// Stats command arguments.
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Department argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "PascalCase")]
pub enum DepartmentArg {
    /// Food deliveries
    Food,
    /// Electronics deliveries
    Electronic,
    /// Furniture deliveries
    Furniture,
}

impl From<DepartmentArg> for Department {
    fn from(arg: DepartmentArg) -> Self {
        match arg {
            DepartmentArg::Food => Self::Food,
            DepartmentArg::Electronic => Self::Electronic,
            DepartmentArg::Furniture => Self::Furniture,
        }
    }
}
