// ── Runtime configuration ──
//
// Values the engine needs at construction: network defaults for fresh
// devices, where and how the remote side is driven, and the run deadline.
// Core never reads config files; the CLI builds these and hands them in.

use std::net::Ipv4Addr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Parameters applied to a device when its desired description is silent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDefaults {
    pub address: Ipv4Addr,
    pub network: Ipv4Addr,
    pub netmask: u8,
    pub listen_port: u16,
}

impl Default for NetworkDefaults {
    fn default() -> Self {
        Self {
            address: Ipv4Addr::new(10, 5, 0, 1),
            network: Ipv4Addr::new(10, 5, 0, 0),
            netmask: 16,
            listen_port: 51820,
        }
    }
}

/// How configuration files and service units are laid out on a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLayout {
    /// Directory holding `<device>.conf`.
    pub config_dir: String,
    /// Unit name prefix; the device name is appended.
    pub unit_prefix: String,
    /// Prefix privileged commands with `sudo`.
    pub sudo: bool,
}

impl Default for RemoteLayout {
    fn default() -> Self {
        Self {
            config_dir: "/etc/wireguard".into(),
            unit_prefix: "wg-quick@".into(),
            sudo: true,
        }
    }
}

impl RemoteLayout {
    pub fn config_path(&self, device: &str) -> String {
        format!("{}/{device}.conf", self.config_dir.trim_end_matches('/'))
    }

    pub fn unit_name(&self, device: &str) -> String {
        format!("{}{device}", self.unit_prefix)
    }
}

/// Everything an [`Engine`](crate::Engine) run needs besides its inputs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub defaults: NetworkDefaults,
    pub remote: RemoteLayout,
    /// Deadline for a whole run.
    pub timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            defaults: NetworkDefaults::default(),
            remote: RemoteLayout::default(),
            timeout: Duration::from_secs(60),
        }
    }
}
