//! Clap derive structures for the `wgctl` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// wgctl -- declarative WireGuard management over SSH
#[derive(Debug, Parser)]
#[command(
    name = "wgctl",
    version,
    about = "Converge WireGuard devices and their clients across hosts",
    long_about = "Reads a manifest describing WireGuard devices per host and the\n\
        clients each device serves, then converges every host to it over SSH:\n\
        keys are generated on the host, client addresses are allocated,\n\
        configuration is written, and the wg-quick unit is brought up.",
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
    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "WGCTL_CONFIG", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Store directory for device and client records
    #[arg(long, env = "WGCTL_DATA_DIR", global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "WGCTL_OUTPUT",
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

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Run deadline in seconds (overrides config)
    #[arg(long, env = "WGCTL_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
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
    /// Converge hosts to the manifest
    Apply(ApplyArgs),

    /// Inspect stored devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Inspect and export stored clients
    #[command(alias = "cl")]
    Clients(ClientsArgs),

    /// Manage the wgctl configuration file
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Apply ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Desired-state manifest (defaults to the configured manifest)
    #[arg(long, short = 'm', value_name = "PATH")]
    pub manifest: Option<PathBuf>,

    /// Only converge these hosts (repeatable)
    #[arg(long = "host", short = 'H', value_name = "NAME")]
    pub hosts: Vec<String>,
}

// ── Devices ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List stored devices
    #[command(alias = "ls")]
    List {
        /// Only devices of this host
        #[arg(long)]
        host: Option<String>,
    },

    /// Show one device
    #[command(alias = "get")]
    Show {
        host: String,
        device: String,

        /// Print the rendered wg-quick configuration instead
        #[arg(long)]
        render: bool,
    },

    /// Rewind the address allocation cursor to the highest assigned client
    ResetCursor { host: String, device: String },
}

// ── Clients ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ClientsArgs {
    #[command(subcommand)]
    pub command: ClientsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ClientsCommand {
    /// List the clients of a device
    #[command(alias = "ls")]
    List { host: String, device: String },

    /// Show one client
    #[command(alias = "get")]
    Show {
        host: String,
        device: String,
        client: String,
    },

    /// Write peer-side configuration files for clients
    Export {
        host: String,
        device: String,

        /// Only these clients (repeatable; default: all)
        #[arg(long = "client", short = 'c', value_name = "NAME")]
        clients: Vec<String>,

        /// Output directory
        #[arg(long, short = 'd', default_value = "configs", value_name = "DIR")]
        dir: PathBuf,

        /// Endpoint clients dial (defaults to the manifest entry or host name)
        #[arg(long, short = 'e')]
        endpoint: Option<String>,

        /// Manifest consulted for the host endpoint
        #[arg(long, short = 'm', value_name = "PATH")]
        manifest: Option<PathBuf>,
    },
}

// ── Config ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display the effective configuration
    Show,

    /// Print the config file path
    Path,
}

// ── Completions ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
