//! Clap derive structures for the `autelis` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};

use autelis_core::{HeaterAddress, ThermostatMode};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// autelis -- monitor and control Autelis pool controllers
#[derive(Debug, Parser)]
#[command(
    name = "autelis",
    version,
    about = "Monitor and control Autelis pool controllers",
    long_about = "Reads status from an Autelis pool controller over HTTP, sends\n\
        equipment and heater commands, and follows live push updates\n\
        over the controller's TCP port.",
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
    /// Controller profile to use
    #[arg(long, short = 'p', env = "AUTELIS_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Controller host, optionally with port (overrides profile)
    #[arg(long, short = 'H', env = "AUTELIS_HOST", global = true)]
    pub host: Option<String>,

    /// HTTP basic-auth user
    #[arg(long, short = 'u', env = "AUTELIS_USERNAME", global = true)]
    pub username: Option<String>,

    /// HTTP basic-auth password
    #[arg(long, env = "AUTELIS_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "AUTELIS_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// HTTP request timeout in milliseconds
    #[arg(long, env = "AUTELIS_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON (one document per update in `watch`)
    JsonCompact,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show controller, heater, and equipment status
    #[command(alias = "st")]
    Status,

    /// Turn a circuit or feature on
    On(EquipmentArgs),

    /// Turn a circuit or feature off
    Off(EquipmentArgs),

    /// Change a heater setpoint
    SetTemp(SetTempArgs),

    /// Change a heater mode
    SetMode(SetModeArgs),

    /// Follow live status changes until interrupted
    Watch,

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Control ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct EquipmentArgs {
    /// Equipment element as reported by `status` (e.g. pump, aux1)
    pub element: String,
}

#[derive(Debug, Args)]
pub struct SetTempArgs {
    /// Heater: pool or spa
    pub heater: HeaterAddress,

    /// New setpoint, in the controller's unit
    pub degrees: i32,
}

#[derive(Debug, Args)]
pub struct SetModeArgs {
    /// Heater: pool or spa
    pub heater: HeaterAddress,

    /// Mode: off, heat, auto, aux-heat
    pub mode: ThermostatMode,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Show the current configuration (secrets masked)
    Show,

    /// Create or replace a profile from --host, --username and --password
    Init(ConfigInitArgs),
}

#[derive(Debug, Args)]
pub struct ConfigInitArgs {
    /// Write the password into the config file instead of the system keyring
    #[arg(long)]
    pub plaintext: bool,

    /// TCP push-update port
    #[arg(long)]
    pub tcp_port: Option<u16>,

    /// Status poll interval in seconds (0 disables polling)
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Disable the push-update connection
    #[arg(long)]
    pub no_push: bool,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
