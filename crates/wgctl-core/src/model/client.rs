use std::net::Ipv4Addr;

use crate::error::CoreError;
use crate::model::identity::{
    Entity, EntityKind, Identity, KeyPair, normalize_allowed_ip, parse_address,
    validate_client_name,
};
use crate::store::{ClientRecord, ClientRepository};

/// Names the device a client belongs to, without owning it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceRef {
    pub host: String,
    pub device: String,
}

impl DeviceRef {
    pub fn new(host: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            device: device.into(),
        }
    }
}

/// A peer of a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    identity: Identity,
    device: DeviceRef,
    preshared_key: String,
    allowed_ips: Vec<String>,
}

impl Entity for Client {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Client
    }
}

impl Client {
    pub(crate) fn new(
        device: DeviceRef,
        name: &str,
        address: Ipv4Addr,
        keys: KeyPair,
        preshared_key: String,
        allowed_ips: &[String],
    ) -> Result<Self, CoreError> {
        validate_client_name(name)?;
        let mut client = Self {
            identity: Identity {
                name: name.to_owned(),
                address,
                keys,
            },
            device,
            preshared_key,
            allowed_ips: Vec::new(),
        };
        client.set_allowed_ips(allowed_ips)?;
        Ok(client)
    }

    /// Rebuild a client from its stored record.
    pub fn from_record(device: DeviceRef, record: ClientRecord) -> Result<Self, CoreError> {
        let address = parse_address("client address", &record.address)?.ok_or_else(|| {
            CoreError::validation("client address", format!("client {} has no address", record.name))
        })?;
        Self::new(
            device,
            &record.name,
            address,
            KeyPair::new(record.private_key, record.public_key),
            record.preshared_key,
            &record.allowed_ips,
        )
    }

    /// Stored form. Allowed IPs equal to the default are left out.
    pub fn to_record(&self) -> ClientRecord {
        let allowed_ips = if self.allowed_ips == [self.default_allowed_ip()] {
            Vec::new()
        } else {
            self.allowed_ips.clone()
        };
        ClientRecord {
            name: self.identity.name.clone(),
            address: self.identity.address.to_string(),
            private_key: self.identity.keys.private_key.clone(),
            public_key: self.identity.keys.public_key.clone(),
            preshared_key: self.preshared_key.clone(),
            allowed_ips,
        }
    }

    pub fn load(repo: &dyn ClientRepository, device: DeviceRef, name: &str) -> Result<Self, CoreError> {
        let record = repo.find_client(&device.host, &device.device, name)?;
        Self::from_record(device, record)
    }

    pub fn save(&self, repo: &dyn ClientRepository) -> Result<(), CoreError> {
        repo.save_client(&self.device.host, &self.device.device, &self.to_record())
    }

    pub fn delete(&self, repo: &dyn ClientRepository) -> Result<(), CoreError> {
        repo.delete_client(&self.device.host, &self.device.device, &self.identity.name)
    }

    pub fn device(&self) -> &DeviceRef {
        &self.device
    }

    pub fn keys(&self) -> &KeyPair {
        &self.identity.keys
    }

    pub fn preshared_key(&self) -> &str {
        &self.preshared_key
    }

    /// Networks routed to this peer; never empty.
    pub fn allowed_ips(&self) -> &[String] {
        &self.allowed_ips
    }

    fn default_allowed_ip(&self) -> String {
        format!("{}/32", self.identity.address)
    }

    pub(crate) fn set_address(&mut self, address: Ipv4Addr) {
        let was_default = self.allowed_ips == [self.default_allowed_ip()];
        self.identity.address = address;
        if was_default {
            self.allowed_ips = vec![self.default_allowed_ip()];
        }
    }

    /// Replace the allowed IPs; an empty list means the client's own /32.
    pub(crate) fn set_allowed_ips(&mut self, allowed_ips: &[String]) -> Result<(), CoreError> {
        self.allowed_ips = if allowed_ips.is_empty() {
            vec![self.default_allowed_ip()]
        } else {
            allowed_ips
                .iter()
                .map(|raw| normalize_allowed_ip(raw))
                .collect::<Result<_, _>>()?
        };
        Ok(())
    }
}
