//! Clap derive structures for the `srtwatch` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use srtwatch_core::StreamingState;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// srtwatch -- monitor and reconcile SRT device fleets
#[derive(Debug, Parser)]
#[command(
    name = "srtwatch",
    version,
    about = "Track SRT streaming devices, broadcast state changes, and alert on them",
    long_about = "Runs the fleet monitor server, observes its snapshots with a local\n\
        watchlist, and delivers change alerts to a webhook.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Monitor server base URL (overrides config)
    #[arg(long, short = 's', env = "SRTWATCH_SERVER", global = true)]
    pub server: Option<String>,

    /// Path to the config file
    #[arg(long, env = "SRTWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SRTWATCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the monitor server and staleness watchdog
    Serve(ServeArgs),

    /// Run an observer: reconcile snapshots and alert on changes
    Watch(WatchArgs),

    /// Pull and render the fleet snapshot
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Submit a one-shot status report
    Report(ReportArgs),

    /// Rename a device identity
    Rename(RenameArgs),

    /// Remove a device record
    Remove(RemoveArgs),

    /// Manage the persisted watchlist
    #[command(alias = "wl")]
    Watchlist(WatchlistArgs),

    /// Inspect or initialize the configuration file
    Config(ConfigArgs),
}

// ── Serve ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Bind address (overrides config)
    #[arg(long, short = 'b')]
    pub bind: Option<String>,

    /// Seconds a device may go silent before it is marked stale
    #[arg(long)]
    pub liveness_timeout: Option<u64>,

    /// Watchdog sweep interval in seconds
    #[arg(long)]
    pub sweep_interval: Option<u64>,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Alert webhook URL (overrides config)
    #[arg(long, short = 'w', env = "SRTWATCH_WEBHOOK")]
    pub webhook: Option<String>,

    /// Prefix tag for alert lines
    #[arg(long, short = 'p')]
    pub prefix: Option<String>,

    /// Watchlist file (overrides config)
    #[arg(long)]
    pub watchlist: Option<PathBuf>,

    /// Send a full status list when observation starts
    #[arg(long)]
    pub full_list: bool,
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    /// Only show records reported from this local address
    #[arg(long, short = 'a')]
    pub address: Option<String>,
}

// ── Report ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Device identity (falls back to the local address)
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Local address of the device
    #[arg(long)]
    pub address: String,

    /// Public (WAN) address
    #[arg(long)]
    pub public_address: Option<String>,

    /// SRT streaming state
    #[arg(long, value_parser = parse_streaming_state, default_value = "UNKNOWN")]
    pub streaming: StreamingState,

    /// SRT listen port
    #[arg(long)]
    pub port: u16,

    /// Report the device as down
    #[arg(long)]
    pub down: bool,
}

fn parse_streaming_state(raw: &str) -> Result<StreamingState, String> {
    raw.parse()
        .map_err(|_| format!("expected ON, OFF, or UNKNOWN, got '{raw}'"))
}

// ── Rename / Remove ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RenameArgs {
    /// Current identity
    pub old_name: String,

    /// New identity
    pub new_name: String,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// Device identity
    pub identity: String,

    /// Local address of the device
    pub address: String,

    /// SRT listen port
    pub port: u16,
}

// ── Watchlist ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchlistArgs {
    #[command(subcommand)]
    pub command: WatchlistCommand,
}

#[derive(Debug, Subcommand)]
pub enum WatchlistCommand {
    /// Show the persisted watchlist
    Show,

    /// Add a device to the watchlist
    Add {
        /// Local address of the device
        address: String,

        /// SRT listen port
        port: u16,

        /// Device identity (optional; port matching applies without it)
        #[arg(long, short = 'n')]
        name: Option<String>,
    },

    /// Remove watchlist entries by identity or port
    Remove {
        /// Identity; a numeric key falls back to port matching
        key: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a default config file to the canonical path
    Init,

    /// Display the resolved configuration
    Show,

    /// Print the config file path
    Path,
}
