//! DevParts daemon
//!
//! Command line front end for the device settings panel and the TV-out
//! service. At boot `devparts daemon` re-applies persisted settings and then
//! keeps the TV-out driver in step with the HDMI cable and the screen.
//!
//! Commands:
//! - `list`: show every control point and its value
//! - `set <key> <value>`: change and persist one control point
//! - `calibrate-gyro`: recalibrate the gyroscope
//! - `restore`: re-apply persisted settings
//! - `daemon`: restore, then run the TV-out service until SIGINT/SIGTERM
//! - `tvout ...`: query or tune the TV-out driver directly

mod commands;
mod service;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use devparts_config::DevPartsConfig;
use std::path::PathBuf;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, Registry, reload};

/// Set while RUST_LOG is unset, so the configured level can still apply
type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[derive(Parser, Debug)]
#[command(name = "devparts", author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to the layered system and user files)
    #[arg(short, long, env = "DEVPARTS_CONFIG")]
    config: Option<PathBuf>,

    /// Persisted settings file
    #[arg(long, env = "DEVPARTS_SETTINGS")]
    settings: Option<PathBuf>,

    /// Resolve device paths below this directory
    #[arg(long, env = "DEVPARTS_SYSFS_ROOT")]
    sysfs_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show every control point
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Change a control point and persist it
    Set { key: String, value: String },

    /// Recalibrate the gyroscope
    CalibrateGyro,

    /// Re-apply persisted settings
    Restore,

    /// Restore settings, then run the TV-out service
    Daemon,

    /// Talk to the TV-out driver
    Tvout {
        #[command(subcommand)]
        action: TvOutCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum TvOutCommand {
    /// Show what the driver reports
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Select the output resolution
    Resolution { value: i32 },

    /// Select the output mode
    OutputMode { value: i32 },

    /// Turn subtitle rendering on or off
    Subtitles {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = setup_logging();

    let mut config = match &cli.config {
        Some(path) => DevPartsConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => DevPartsConfig::load_default().context("Failed to load configuration")?,
    };

    apply_log_level(filter.as_ref(), &config.daemon.log_level);

    if let Some(root) = cli.sysfs_root {
        config.controls.sysfs_root = Some(root);
    }
    if let Some(settings) = cli.settings {
        config.daemon.settings_path = settings;
    }
    debug!("Using settings at {}", config.daemon.settings_path.display());

    check_privileges();

    match cli.command {
        Command::List { json } => commands::list(&config, json),
        Command::Set { key, value } => commands::set(&config, &key, &value),
        Command::CalibrateGyro => commands::calibrate_gyro(&config),
        Command::Restore => commands::restore(&config).map(|count| {
            println!("Restored {} control points", count);
        }),
        Command::Daemon => service::run_daemon(&config).await,
        Command::Tvout { action } => commands::tvout(&config, action),
    }
}

fn setup_logging() -> Option<FilterHandle> {
    use tracing_subscriber::{fmt, prelude::*};

    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new("info"), false),
    };
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_ansi(false))
        .init();

    (!from_env).then_some(handle)
}

/// Switch to the configured level unless RUST_LOG chose one
fn apply_log_level(handle: Option<&FilterHandle>, level: &str) {
    let Some(handle) = handle else {
        return;
    };

    if let Err(e) = handle.reload(EnvFilter::new(level)) {
        warn!("Failed to apply log level {}: {}", level, e);
    }
}

/// Device attributes are root-owned; warn early instead of failing every write
fn check_privileges() {
    if !nix::unistd::geteuid().is_root() {
        warn!("Not running as root, pseudo-file writes will likely fail");
    }
}
