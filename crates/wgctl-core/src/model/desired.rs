// ── Desired state ──
//
// What the operator wants: per host, which devices exist and which
// clients each device has. Empty strings and zero numbers mean
// "unspecified" so manifests can stay terse.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use wgctl_exec::SshTarget;

/// Desired parameters of one device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesiredDevice {
    pub address: String,
    pub network: String,
    /// Prefix length; 0 keeps the current or default value.
    pub netmask: u8,
    /// Empty means the device address.
    pub dns: String,
    /// 0 keeps the current or default port.
    pub listen_port: u16,
    pub post_up: String,
    pub pre_down: String,
    /// Replaces the device private key when set.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub private_key: String,
    pub users: Vec<DesiredClient>,
}

/// Desired parameters of one client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredClient {
    pub name: String,
    /// Empty means "allocate".
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub allowed_ips: Vec<String>,
}

impl DesiredClient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// SSH connection details for a host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshSpec {
    pub user: Option<String>,
    /// Defaults to the host key.
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub identity_file: Option<PathBuf>,
}

/// How a host is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostTarget {
    Local,
    Ssh(SshTarget),
}

/// Desired state of one host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesiredHost {
    /// Run commands on this machine instead of over SSH.
    pub local: bool,
    pub ssh: SshSpec,
    /// Public `host[:port]` clients dial; defaults to the host key.
    pub endpoint: Option<String>,
    pub devices: IndexMap<String, DesiredDevice>,
}

impl DesiredHost {
    pub fn target(&self, host: &str) -> HostTarget {
        if self.local {
            return HostTarget::Local;
        }
        HostTarget::Ssh(SshTarget {
            hostname: self.ssh.hostname.clone().unwrap_or_else(|| host.to_owned()),
            user: self.ssh.user.clone(),
            port: self.ssh.port,
            identity_file: self.ssh.identity_file.clone(),
        })
    }

    pub fn endpoint<'a>(&'a self, host: &'a str) -> &'a str {
        self.endpoint.as_deref().unwrap_or(host)
    }
}

/// The whole desired state, keyed by host name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub hosts: IndexMap<String, DesiredHost>,
}

impl Manifest {
    /// Keep only the named hosts; an empty selection keeps everything.
    pub fn select(&self, hosts: &[String]) -> Self {
        if hosts.is_empty() {
            return self.clone();
        }
        Self {
            hosts: self
                .hosts
                .iter()
                .filter(|(name, _)| hosts.contains(name))
                .map(|(name, host)| (name.clone(), host.clone()))
                .collect(),
        }
    }
}
