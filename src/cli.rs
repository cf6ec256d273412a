//! Command-line argument parsing for synapse-reader.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Token-authenticated query client for Azure Synapse warehouses.
#[derive(Parser, Debug)]
#[command(name = "synapse-reader")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Use named warehouse from config
    #[arg(short = 'w', long, value_name = "NAME", global = true, env = "SYNAPSE_WAREHOUSE")]
    pub warehouse: Option<String>,

    /// Write logs to the state directory instead of stderr
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the ODBC connection string for the warehouse
    ConnString {
        /// Print only the percent-encoded form
        #[arg(long)]
        encoded: bool,
    },

    /// Acquire an access token and describe it (the token itself is never printed)
    Token {
        /// Also print decoded JWT claims
        #[arg(long)]
        claims: bool,
    },

    /// Manage the client secret in the OS keyring
    Secret {
        #[command(subcommand)]
        action: SecretAction,
    },

    /// Validate configuration and show the effective settings
    Check,
}

/// Keyring actions for the client secret.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SecretAction {
    /// Store the client secret (read from AZURE_CLIENT_SECRET or stdin)
    Set,
    /// Remove the stored client secret
    Delete,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(synapse_reader::config::Config::default_path)
    }

    /// Returns the named warehouse to use, if specified.
    pub fn warehouse_name(&self) -> Option<&str> {
        self.warehouse.as_deref()
    }
}
