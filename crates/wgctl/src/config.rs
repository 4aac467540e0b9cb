//! CLI configuration: thin wrapper around `wgctl_config`.
//!
//! Adds resolution that respects `GlobalOpts` overrides (--config,
//! --data-dir, --timeout) and opens the store the commands work on.

use std::fs;
use std::path::{Path, PathBuf};

use wgctl_core::{LocalRepository, LocalStorage};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use wgctl_config::{Config, config_path, load_config_from, load_manifest, save_config_to};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Config file in effect: `--config` / `WGCTL_CONFIG`, else the platform path.
pub fn active_config_path(global: &GlobalOpts) -> PathBuf {
    global.config.clone().unwrap_or_else(config_path)
}

/// Load the layered config and apply flag overrides on top.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = load_config_from(&active_config_path(global))?;
    if let Some(dir) = &global.data_dir {
        cfg.data_dir = Some(dir.clone());
    }
    if let Some(timeout) = global.timeout {
        cfg.timeout = timeout;
    }
    Ok(cfg)
}

pub fn open_repository(cfg: &Config) -> LocalRepository {
    LocalRepository::new(LocalStorage::new(cfg.data_dir()))
}

/// Fresh directory for this run's SSH multiplexing sockets.
pub fn ssh_control_dir() -> Result<PathBuf, CliError> {
    let dir = std::env::temp_dir().join(format!("wgctl-ssh-{}", std::process::id()));
    create_private_dir(&dir)?;
    Ok(dir)
}

#[cfg(unix)]
pub fn create_private_dir(dir: &Path) -> Result<(), CliError> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)?;
    Ok(())
}

#[cfg(not(unix))]
pub fn create_private_dir(dir: &Path) -> Result<(), CliError> {
    fs::create_dir_all(dir)?;
    Ok(())
}
