//! Command line and environment configuration of the `po-loader` binary.

use std::{path::PathBuf, time::Duration};

use clap::{Parser, Subcommand};

use crate::{
    persist::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_IN_FLIGHT, PersistSettings},
    store::SqliteStore,
    telemetry::LogFormat,
};

/// Loads purchase order flat files into a SQLite database.
#[derive(Debug, Parser)]
#[command(name = "po-loader", version)]
pub struct Cli {
    /// SQLite database file.
    #[arg(long, env = "PO_DATABASE", value_name = "FILE", default_value = "orders.db", global = true)]
    pub database: PathBuf,

    /// How long a connection waits for the database lock before giving up.
    #[arg(long, env = "PO_BUSY_TIMEOUT_MS", default_value_t = 5000, global = true)]
    pub busy_timeout_ms: u64,

    /// Log output format, written to stderr.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create the Buyer, Product and PurchaseOrderLines tables if missing.
    Init,

    /// Load the buyer and product reference files.
    Seed {
        /// CSV file with a `BuyerId` column.
        #[arg(long, value_name = "FILE")]
        buyers: PathBuf,
        /// CSV file with a `ProductCode` column.
        #[arg(long, value_name = "FILE")]
        products: PathBuf,
    },

    /// Validate a purchase order file, persist the valid rows and print a CSV report to stdout.
    Process {
        /// CSV file with `BuyerId`, `OrderDate`, `ProductCode` and `Quantity` columns.
        #[arg(value_name = "FILE")]
        input: PathBuf,
        /// Maximum rows per insert transaction.
        #[arg(long, env = "PO_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// Maximum insert transactions running at the same time.
        #[arg(long, env = "PO_MAX_IN_FLIGHT", default_value_t = DEFAULT_MAX_IN_FLIGHT)]
        max_in_flight: usize,
        /// Validate and report without writing to the database.
        #[arg(long)]
        dry_run: bool,
    },
}

impl Cli {
    pub fn store(&self) -> SqliteStore {
        SqliteStore::new(&self.database, self.busy_timeout())
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

/// Everything a processing run needs
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub database: PathBuf,
    pub busy_timeout: Duration,
    pub input: PathBuf,
    pub persist: PersistSettings,
    pub dry_run: bool,
}
