//! Clap derive structures for the `smartcb` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// smartcb -- find, connect to, and monitor SmartCB breakers
#[derive(Debug, Parser)]
#[command(
    name = "smartcb",
    version,
    about = "Find, connect to, and monitor SmartCB smart circuit breakers",
    long_about = "Command-line companion for SmartCB WiFi circuit breakers.\n\n\
        Discovers breakers on the local network, syncs protection thresholds,\n\
        schedules and clock on connect, and classifies live readings.",
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
    /// Device profile to use
    #[arg(long, short = 'p', env = "SMARTCB_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device IPv4 address (overrides profile)
    #[arg(long, env = "SMARTCB_HOST", global = true)]
    pub host: Option<String>,

    /// Device HTTP port (overrides profile)
    #[arg(long, env = "SMARTCB_PORT", global = true)]
    pub port: Option<u16>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "SMARTCB_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in milliseconds for connect and sync calls
    #[arg(long, env = "SMARTCB_TIMEOUT_MS", global = true)]
    pub timeout_ms: Option<u64>,
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
    /// YAML
    Yaml,
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
    /// Search the local network for breakers
    #[command(alias = "s")]
    Scan(ScanArgs),

    /// Connect to a breaker and sync thresholds, schedules and clock
    #[command(alias = "c")]
    Connect(ConnectArgs),

    /// Show one reading and its protection classification
    #[command(alias = "st")]
    Status,

    /// Poll readings and report protection breaches as they start and clear
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Switch the breaker relay
    Relay(RelayArgs),

    /// View or change protection thresholds
    #[command(alias = "th")]
    Thresholds(ThresholdsArgs),

    /// View on/off schedules
    #[command(alias = "sched")]
    Schedules(SchedulesArgs),

    /// Device clock operations
    Time(TimeArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Scan ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Only probe the common addresses, not the local subnet
    #[arg(long, conflicts_with = "subnet")]
    pub no_subnet: bool,

    /// Sweep this IPv4 subnet instead of the detected one (e.g. 192.168.1.0/24)
    #[arg(long, value_name = "CIDR")]
    pub subnet: Option<String>,

    /// Probes in flight at once (1-64)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-probe deadline in milliseconds
    #[arg(long)]
    pub probe_timeout_ms: Option<u64>,
}

// ── Connect ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConnectArgs {
    /// Device address as HOST or HOST:PORT (default: profile, else scan)
    pub target: Option<String>,

    /// Save the connected device as the active profile
    #[arg(long)]
    pub save: bool,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Polling interval in milliseconds
    #[arg(long, short = 'i', default_value = "2000")]
    pub interval_ms: u64,

    /// Stop after this many readings (default: until Ctrl-C)
    #[arg(long, short = 'n')]
    pub count: Option<u64>,
}

// ── Relay ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RelayArgs {
    #[arg(value_enum)]
    pub state: RelayState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RelayState {
    On,
    Off,
}

// ── Thresholds ───────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ThresholdsArgs {
    #[command(subcommand)]
    pub command: ThresholdsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ThresholdsCommand {
    /// Show thresholds as synced from the device
    Show,

    /// Change thresholds and push them to the device
    Set(ThresholdsSetArgs),
}

#[derive(Debug, Args)]
pub struct ThresholdsSetArgs {
    /// Under-voltage trip limit (V)
    #[arg(long)]
    pub min_voltage: Option<f64>,

    /// Over-voltage trip limit (V)
    #[arg(long)]
    pub max_voltage: Option<f64>,

    /// Over-current trip limit (A)
    #[arg(long)]
    pub max_current: Option<f64>,

    /// Enable or disable over-current protection
    #[arg(long)]
    pub current_protection: Option<bool>,

    /// Lower frequency limit (Hz)
    #[arg(long)]
    pub min_frequency: Option<f64>,

    /// Upper frequency limit (Hz)
    #[arg(long)]
    pub max_frequency: Option<f64>,

    /// Enable or disable frequency protection
    #[arg(long)]
    pub frequency_protection: Option<bool>,

    /// Minimum power factor (0-1)
    #[arg(long)]
    pub min_power_factor: Option<f64>,

    /// Enable or disable power factor protection
    #[arg(long)]
    pub power_factor_protection: Option<bool>,
}

// ── Schedules ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SchedulesArgs {
    #[command(subcommand)]
    pub command: SchedulesCommand,
}

#[derive(Debug, Subcommand)]
pub enum SchedulesCommand {
    /// List schedules as synced from the device
    #[command(alias = "ls")]
    List,
}

// ── Time ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TimeArgs {
    #[command(subcommand)]
    pub command: TimeCommand,
}

#[derive(Debug, Subcommand)]
pub enum TimeCommand {
    /// Push this machine's local time to the device
    Sync,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,

    /// Store a device address in the active profile (see --profile)
    SetDevice {
        /// Device IPv4 address
        host: String,

        /// Device HTTP port
        #[arg(long = "device-port", default_value = "80")]
        port: u16,
    },

    /// List configured profiles (* marks the default)
    Profiles,

    /// Make a profile the default
    Use {
        /// Profile name
        name: String,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
