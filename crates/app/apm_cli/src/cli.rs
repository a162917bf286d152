use std::path::PathBuf;

use apm_core::api::ScanFormat;
use clap::{Parser, Subcommand, ValueEnum};

/// AccessPointMap command-line client.
#[derive(Parser, Debug)]
#[command(name = "apm", about = "AccessPointMap command-line client")]
pub struct Cli {
    /// Backend server URL (e.g. https://apm.example.com).
    #[arg(long, global = true, env = "APM_SERVER")]
    pub server: Option<String>,

    /// JSON file holding the persisted session.
    #[arg(long, global = true, env = "APM_STORAGE_PATH")]
    pub storage: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and persist the session
    Login {
        #[arg(long)]
        email: String,

        #[arg(long, env = "APM_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log out on the server and clear the stored session
    Logout,

    /// Show the identity of the stored session
    Whoami,

    /// Exchange the stored refresh token for a new token pair
    Refresh,

    /// Create an account
    Register {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "APM_PASSWORD", hide_env_values = true)]
        password: String,

        /// Defaults to --password.
        #[arg(long)]
        password_repeat: Option<String>,
    },

    /// Query access points
    #[command(name = "access-points")]
    AccessPoints {
        #[command(subcommand)]
        action: AccessPointAction,
    },

    /// Show access point statistics
    Stats {
        #[arg(value_enum)]
        kind: StatKind,

        #[arg(long)]
        limit: Option<u32>,

        /// Bypass the local response cache.
        #[arg(long, default_value_t = false)]
        no_cache: bool,
    },

    /// Upload a scan file
    Upload {
        /// wigle-csv, aircrackng-csv, aircrackng-cap or wireshark-pcap
        #[arg(value_parser = parse_scan_format)]
        format: ScanFormat,

        file: PathBuf,
    },

    /// Print version
    Version,
}

#[derive(Subcommand, Debug)]
pub enum AccessPointAction {
    /// List all access points
    List {
        #[arg(long, default_value_t = false)]
        full: bool,
    },

    /// Show one access point
    Get {
        id: String,

        #[arg(long, default_value_t = false)]
        full: bool,
    },

    /// Search by keyword
    Search { keyword: String },

    /// List run identifiers
    Runs {
        #[arg(long, default_value_t = false)]
        full: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatKind {
    Signal,
    Frequency,
    Manufacturer,
    Encryption,
}

fn parse_scan_format(s: &str) -> Result<ScanFormat, String> {
    s.parse().map_err(|e: apm_core::ClientError| e.to_string())
}
