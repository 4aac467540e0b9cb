//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use wgctl_config::ConfigError;
use wgctl_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const EXECUTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(wgctl::not_found),
        help("Run: wgctl {list_command} to see what is stored")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("No free address left for {device} in {network}")]
    #[diagnostic(
        code(wgctl::address_exhausted),
        help(
            "Widen the device netmask, assign addresses explicitly, or run:\n\
             wgctl devices reset-cursor <host> <device>"
        )
    )]
    AddressExhausted { device: String, network: String },

    // ── Remote execution ─────────────────────────────────────────────

    #[error("Command failed on host: {command}")]
    #[diagnostic(
        code(wgctl::execution),
        help("{output}\n\nChecks: SSH access (BatchMode), sudo without password, `wg` installed.")
    )]
    Execution { command: String, output: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(wgctl::validation))]
    Validation { field: String, reason: String },

    // ── Storage / configuration ──────────────────────────────────────

    #[error("Storage error at {path}: {reason}")]
    #[diagnostic(
        code(wgctl::storage),
        help("Check permissions of the data directory (--data-dir).")
    )]
    Storage { path: String, reason: String },

    #[error("Manifest problem: {message}")]
    #[diagnostic(
        code(wgctl::manifest),
        help("Pass one with --manifest or set `manifest` in the config file.")
    )]
    Manifest { message: String },

    #[error("Configuration file already exists at {path}")]
    #[diagnostic(code(wgctl::config_exists), help("Use --force to overwrite it."))]
    ConfigExists { path: String },

    #[error(transparent)]
    #[diagnostic(code(wgctl::config))]
    Config(Box<figment::Error>),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(wgctl::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Run control ──────────────────────────────────────────────────

    #[error("Run timed out after {seconds}s")]
    #[diagnostic(
        code(wgctl::timeout),
        help("Increase the deadline with --timeout or `timeout` in the config file.")
    )]
    Timeout { seconds: u64 },

    #[error("Run cancelled")]
    #[diagnostic(code(wgctl::cancelled))]
    Cancelled,

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize config: {0}")]
    #[diagnostic(code(wgctl::toml))]
    Toml(#[from] toml::ser::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::AddressExhausted { .. } | Self::ConfigExists { .. } => exit_code::CONFLICT,
            Self::Execution { .. } => exit_code::EXECUTION,
            Self::Timeout { .. } | Self::Cancelled => exit_code::TIMEOUT,
            Self::Validation { .. }
            | Self::Manifest { .. }
            | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                list_command: format!("{entity_type}s list"),
                resource_type: entity_type,
                identifier,
            },

            CoreError::Validation { field, reason } => CliError::Validation { field, reason },

            CoreError::AddressExhausted { device, network } => {
                CliError::AddressExhausted { device, network }
            }

            CoreError::Execution { command, output } => CliError::Execution { command, output },

            CoreError::Persistence { path, reason } => CliError::Storage { path, reason },

            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },

            CoreError::Cancelled => CliError::Cancelled,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Figment(e) => CliError::Config(e),
            ConfigError::Serialization(e) => CliError::Toml(e),
            ConfigError::Io(e) => CliError::Io(e),
            e @ (ConfigError::Manifest { .. } | ConfigError::ManifestRead { .. }) => {
                CliError::Manifest {
                    message: e.to_string(),
                }
            }
        }
    }
}
