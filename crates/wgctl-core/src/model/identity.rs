// ── Shared identity ──
//
// Devices and clients both carry a name, an address and a key pair.
// `Identity` holds that shape and is embedded in each entity; the
// `Entity` trait exposes it uniformly.

use std::fmt;
use std::net::Ipv4Addr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::CoreError;

/// Longest accepted host, client or device record name.
pub const NAME_MAX_LEN: usize = 64;

/// Kernel interface names are limited to 15 bytes.
pub const DEVICE_NAME_MAX_LEN: usize = 15;

// ── KeyPair ─────────────────────────────────────────────────────────

/// A base64 private/public key pair as produced by the key provider.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub private_key: String,
    pub public_key: String,
}

impl KeyPair {
    pub fn new(private_key: impl Into<String>, public_key: impl Into<String>) -> Self {
        Self {
            private_key: private_key.into(),
            public_key: public_key.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.private_key.is_empty()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_key", &"<redacted>")
            .field("public_key", &self.public_key)
            .finish()
    }
}

// ── Identity ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub address: Ipv4Addr,
    pub keys: KeyPair,
}

/// Which role an entity plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Device,
    Client,
}

/// Common read access to the identity embedded in devices and clients.
pub trait Entity {
    fn identity(&self) -> &Identity;

    fn kind(&self) -> EntityKind;

    fn name(&self) -> &str {
        &self.identity().name
    }

    fn address(&self) -> Ipv4Addr {
        self.identity().address
    }

    fn public_key(&self) -> &str {
        &self.identity().keys.public_key
    }

    /// One-line summary for logs and listings.
    fn describe(&self) -> String {
        format!("{} {} ({})", self.kind(), self.name(), self.address())
    }
}

// ── Validation helpers ──────────────────────────────────────────────

/// Check a record name: non-empty, bounded, filesystem- and shell-safe.
pub fn validate_name(field: &str, name: &str, max_len: usize) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::validation(field, "must not be empty"));
    }
    if name.len() > max_len {
        return Err(CoreError::validation(
            field,
            format!("'{name}' is longer than {max_len} characters"),
        ));
    }
    if name.starts_with('.') {
        return Err(CoreError::validation(
            field,
            format!("'{name}' must not start with '.'"),
        ));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || "_.=+-".contains(*c)))
    {
        return Err(CoreError::validation(
            field,
            format!("'{name}' contains invalid character '{bad}'"),
        ));
    }
    Ok(())
}

pub fn validate_device_name(name: &str) -> Result<(), CoreError> {
    validate_name("device name", name, DEVICE_NAME_MAX_LEN)
}

pub fn validate_client_name(name: &str) -> Result<(), CoreError> {
    validate_name("client name", name, NAME_MAX_LEN)
}

/// Host names double as store directory names; same rules, `:` excluded.
pub fn validate_host(host: &str) -> Result<(), CoreError> {
    validate_name("host", host, 253)
}

/// Parse a dotted IPv4 address; empty input means "unspecified".
pub fn parse_address(field: &str, raw: &str) -> Result<Option<Ipv4Addr>, CoreError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| CoreError::validation(field, format!("'{raw}' is not an IPv4 address")))
}

/// Normalize one allowed-IPs entry: a CIDR, or a bare address taken as a host route.
pub fn normalize_allowed_ip(raw: &str) -> Result<String, CoreError> {
    let raw = raw.trim();
    if let Ok(net) = raw.parse::<IpNet>() {
        return Ok(net.to_string());
    }
    raw.parse::<std::net::IpAddr>()
        .map(|ip| IpNet::from(ip).to_string())
        .map_err(|_| CoreError::validation("allowed_ips", format!("'{raw}' is not a CIDR")))
}
