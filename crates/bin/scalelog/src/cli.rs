//! Command-line interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Config;

/// Record weight readings from a Bluetooth LE scale.
#[derive(Parser, Debug)]
#[command(name = "scalelog", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "scalelog.toml", env = "SCALELOG_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect to a scale and record readings for a bounded time
    Read(ReadArgs),
    /// List nearby BLE devices
    Scan(ScanArgs),
    /// List every characteristic of a device and read the readable ones
    Inspect(InspectArgs),
}

/// Which peripheral to talk to.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct Target {
    /// Device address (e.g. 80:F4:AD:DD:37:9A, or the platform id on macOS)
    #[arg(long)]
    pub address: Option<String>,

    /// Address prefix; the first scanned device that matches is used
    #[arg(long)]
    pub prefix: Option<String>,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    #[command(flatten)]
    pub target: Target,

    /// Scan time in seconds when resolving --prefix
    #[arg(long)]
    pub scan_time: Option<u64>,

    /// Session length in seconds
    #[arg(short, long)]
    pub duration: Option<u64>,

    /// Reconnect after connect failures and link loss
    #[arg(long)]
    pub reconnect: bool,

    /// Seconds to wait before each reconnect attempt
    #[arg(long)]
    pub retry_interval: Option<u64>,

    /// CSV output file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also record raw payloads and service UUIDs
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Scan time in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub target: Target,

    /// Scan time in seconds when resolving --prefix
    #[arg(long)]
    pub scan_time: Option<u64>,
}

impl Command {
    /// Apply flag overrides on top of file and environment configuration.
    pub fn apply(&self, config: &mut Config) {
        match self {
            Self::Read(args) => {
                if let Some(secs) = args.scan_time {
                    config.scan.timeout_secs = secs;
                }
                if let Some(secs) = args.duration {
                    config.session.duration_secs = secs;
                }
                if args.reconnect {
                    config.session.auto_reconnect = true;
                }
                if let Some(secs) = args.retry_interval {
                    config.session.retry_interval_secs = secs;
                }
                if let Some(path) = &args.output {
                    config.recorder.path.clone_from(path);
                }
                if args.raw {
                    config.recorder.raw = true;
                }
            }
            Self::Scan(args) => {
                if let Some(secs) = args.timeout {
                    config.scan.timeout_secs = secs;
                }
            }
            Self::Inspect(args) => {
                if let Some(secs) = args.scan_time {
                    config.scan.timeout_secs = secs;
                }
            }
        }
    }
}
