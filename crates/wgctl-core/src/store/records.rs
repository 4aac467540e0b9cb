// Persisted shapes of devices and clients.
//
// Addresses are kept as dotted strings so records stay readable and
// tolerate hand edits; conversion to typed values happens on load.

use serde::{Deserialize, Serialize};

/// One device on one host, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub host: String,
    pub name: String,
    pub listen_port: u16,
    pub address: String,
    pub network: String,
    pub netmask: u8,
    pub private_key: String,
    pub public_key: String,
    /// Allocation cursor; empty when nothing was allocated yet.
    #[serde(default)]
    pub last_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_up: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_down: Option<String>,
}

/// One client of a device, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub name: String,
    pub address: String,
    pub private_key: String,
    pub public_key: String,
    pub preshared_key: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_ips: Vec<String>,
}
