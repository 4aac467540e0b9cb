//! Configuration for wgctl.
//!
//! The tool configuration lives in a TOML file layered under `WGCTL_`
//! environment variables, and is translated into the values
//! `wgctl_core` works with. The desired state of the managed hosts is a
//! separate YAML manifest, loaded by [`load_manifest`].

use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wgctl_core::{EngineConfig, Manifest, NetworkDefaults, RemoteLayout};
use wgctl_exec::SshOptions;

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("cannot read manifest {path}: {source}")]
    ManifestRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {path}: {source}")]
    Manifest {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Root of the device/client store. Defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Desired-state manifest used when `--manifest` is not given.
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,

    /// Deadline for one run, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Parameters for devices the manifest leaves unspecified.
    #[serde(default)]
    pub network: Network,

    #[serde(default)]
    pub remote: Remote,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            manifest: default_manifest(),
            timeout: default_timeout(),
            network: Network::default(),
            remote: Remote::default(),
        }
    }
}

fn default_manifest() -> PathBuf {
    PathBuf::from("wgctl.yaml")
}
fn default_timeout() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Network {
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_network")]
    pub network: String,

    #[serde(default = "default_netmask")]
    pub netmask: u8,

    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
}

impl Default for Network {
    fn default() -> Self {
        Self {
            address: default_address(),
            network: default_network(),
            netmask: default_netmask(),
            listen_port: default_listen_port(),
        }
    }
}

fn default_address() -> String {
    "10.5.0.1".into()
}
fn default_network() -> String {
    "10.5.0.0".into()
}
fn default_netmask() -> u8 {
    16
}
fn default_listen_port() -> u16 {
    51820
}

/// How managed hosts are reached and laid out.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Remote {
    /// Directory holding `<device>.conf` on each host.
    #[serde(default = "default_config_dir")]
    pub config_dir: String,

    /// Service unit prefix; the device name is appended.
    #[serde(default = "default_unit_prefix")]
    pub unit_prefix: String,

    /// Prefix privileged commands with `sudo`.
    #[serde(default = "default_sudo")]
    pub sudo: bool,

    /// OpenSSH client binary.
    #[serde(default = "default_ssh_binary")]
    pub ssh_binary: String,

    /// Seconds a multiplexed connection lingers after its last command.
    #[serde(default = "default_control_persist")]
    pub control_persist: u64,

    /// Seconds to wait for an SSH connection to establish.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl Default for Remote {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            unit_prefix: default_unit_prefix(),
            sudo: default_sudo(),
            ssh_binary: default_ssh_binary(),
            control_persist: default_control_persist(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

fn default_config_dir() -> String {
    "/etc/wireguard".into()
}
fn default_unit_prefix() -> String {
    "wg-quick@".into()
}
fn default_sudo() -> bool {
    true
}
fn default_ssh_binary() -> String {
    "ssh".into()
}
fn default_control_persist() -> u64 {
    60
}
fn default_connect_timeout() -> u64 {
    10
}

// ── Translation into core values ────────────────────────────────────

impl Config {
    /// Store root: the configured `data_dir`, else the platform data dir.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    pub fn network_defaults(&self) -> Result<NetworkDefaults, ConfigError> {
        let parse = |field: &str, raw: &str| {
            raw.parse::<Ipv4Addr>()
                .map_err(|_| invalid(field, format!("'{raw}' is not an IPv4 address")))
        };
        if !(1..=30).contains(&self.network.netmask) {
            return Err(invalid(
                "network.netmask",
                format!("/{} is outside 1..=30", self.network.netmask),
            ));
        }
        if self.network.listen_port == 0 {
            return Err(invalid("network.listen_port", "must be 1..=65535"));
        }
        Ok(NetworkDefaults {
            address: parse("network.address", &self.network.address)?,
            network: parse("network.network", &self.network.network)?,
            netmask: self.network.netmask,
            listen_port: self.network.listen_port,
        })
    }

    pub fn remote_layout(&self) -> Result<RemoteLayout, ConfigError> {
        if !self.remote.config_dir.starts_with('/') {
            return Err(invalid(
                "remote.config_dir",
                format!("'{}' is not an absolute path", self.remote.config_dir),
            ));
        }
        Ok(RemoteLayout {
            config_dir: self.remote.config_dir.clone(),
            unit_prefix: self.remote.unit_prefix.clone(),
            sudo: self.remote.sudo,
        })
    }

    /// SSH options; `control_dir` enables connection multiplexing.
    pub fn ssh_options(&self, control_dir: Option<PathBuf>) -> SshOptions {
        SshOptions {
            binary: self.remote.ssh_binary.clone(),
            control_dir,
            control_persist: Duration::from_secs(self.remote.control_persist),
            connect_timeout: Duration::from_secs(self.remote.connect_timeout),
        }
    }

    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        if self.timeout == 0 {
            return Err(invalid("timeout", "must be at least 1 second"));
        }
        Ok(EngineConfig {
            defaults: self.network_defaults()?,
            remote: self.remote_layout()?,
            timeout: Duration::from_secs(self.timeout),
        })
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "wgctl", "wgctl")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.extend(parts);
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".config", "wgctl", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Default store root.
pub fn default_data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "wgctl"]),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from `path` layered under `WGCTL_` environment
/// variables (`__` separates nested keys). A missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("WGCTL_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load the config from the canonical path.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    fs::write(path, toml_str)?;
    Ok(())
}

pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(&config_path(), cfg)
}

// ── Manifest ────────────────────────────────────────────────────────

/// Parse a YAML desired-state manifest.
pub fn parse_manifest(path: &Path, text: &str) -> Result<Manifest, ConfigError> {
    serde_yaml::from_str(text).map_err(|source| ConfigError::Manifest {
        path: path.display().to_string(),
        source,
    })
}

/// Read and parse the manifest at `path`.
pub fn load_manifest(path: &Path) -> Result<Manifest, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::ManifestRead {
        path: path.display().to_string(),
        source,
    })?;
    parse_manifest(path, &text)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_core_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.network_defaults().unwrap(), NetworkDefaults::default());
        assert_eq!(cfg.remote_layout().unwrap(), RemoteLayout::default());
        assert_eq!(cfg.engine_config().unwrap().timeout, Duration::from_secs(60));
    }

    #[test]
    fn file_then_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                    timeout = 30

                    [network]
                    netmask = 24
                    listen_port = 4500

                    [remote]
                    sudo = false
                "#,
            )?;
            jail.set_env("WGCTL_TIMEOUT", "90");
            jail.set_env("WGCTL_NETWORK__ADDRESS", "10.7.0.1");

            let cfg = load_config_from(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.timeout, 90);
            assert_eq!(cfg.network.address, "10.7.0.1");
            assert_eq!(cfg.network.network, "10.5.0.0");
            assert_eq!(cfg.network.netmask, 24);
            assert_eq!(cfg.network.listen_port, 4500);
            assert!(!cfg.remote.sudo);
            assert_eq!(cfg.remote.unit_prefix, "wg-quick@");
            Ok(())
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_jail| {
            let cfg = load_config_from(Path::new("absent.toml")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.timeout, 60);
            assert_eq!(cfg.manifest, PathBuf::from("wgctl.yaml"));
            Ok(())
        });
    }

    #[test]
    fn bad_network_values_are_rejected() {
        let mut cfg = Config::default();
        cfg.network.address = "10.5.0".into();
        assert!(matches!(
            cfg.network_defaults(),
            Err(ConfigError::Validation { .. })
        ));

        let mut cfg = Config::default();
        cfg.network.netmask = 31;
        assert!(cfg.engine_config().is_err());

        let mut cfg = Config::default();
        cfg.remote.config_dir = "etc/wireguard".into();
        assert!(cfg.remote_layout().is_err());
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let mut cfg = Config::default();
        cfg.data_dir = Some(dir.path().join("store"));
        cfg.timeout = 15;
        save_config_to(&path, &cfg).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let loaded: Config = toml::from_str(&text).unwrap();
        assert_eq!(loaded.timeout, 15);
        assert_eq!(loaded.data_dir, cfg.data_dir);
    }

    #[test]
    fn manifest_parses_hosts_in_order() {
        let yaml = r"
hosts:
  vpn2.example.com:
    ssh: { user: admin, hostname: 203.0.113.7, port: 2222 }
    endpoint: vpn.example.com
    devices:
      wg0:
        address: 10.5.0.1
        network: 10.5.0.0
        netmask: 16
        users:
          - name: alice
          - name: bob
            address: 10.5.0.50
            allowed_ips: [10.5.0.50/32, 192.168.10.0/24]
  lab:
    local: true
    devices:
      wg1: {}
";
        let manifest = parse_manifest(Path::new("wgctl.yaml"), yaml).unwrap();
        let hosts: Vec<_> = manifest.hosts.keys().cloned().collect();
        assert_eq!(hosts, vec!["vpn2.example.com", "lab"]);

        let vpn = &manifest.hosts["vpn2.example.com"];
        assert_eq!(vpn.ssh.port, Some(2222));
        let wg0 = &vpn.devices["wg0"];
        assert_eq!(wg0.users.len(), 2);
        assert_eq!(wg0.users[1].allowed_ips.len(), 2);
        assert!(manifest.hosts["lab"].local);
    }

    #[test]
    fn manifest_errors_name_the_file() {
        let err = parse_manifest(Path::new("bad.yaml"), "hosts: [1, 2").unwrap_err();
        assert!(err.to_string().contains("bad.yaml"));

        let err = load_manifest(Path::new("/nonexistent/wgctl.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ManifestRead { .. }));
    }
}
