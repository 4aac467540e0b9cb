use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::model::{Device, Entity};
use crate::model::identity::validate_host;
use crate::store::Repository;

/// The devices known on one host, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct HostRegistry {
    host: String,
    devices: BTreeMap<String, Device>,
}

impl HostRegistry {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            devices: BTreeMap::new(),
        }
    }

    /// Load every stored device of `host` with its clients.
    pub fn load(repo: &dyn Repository, host: &str) -> Result<Self, CoreError> {
        validate_host(host)?;
        let mut registry = Self::new(host);
        for name in repo.list_devices(host)? {
            let device = Device::load(repo, host, &name)?;
            registry.devices.insert(name, device);
        }
        Ok(registry)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn contains(&self, name: &str) -> bool {
        self.devices.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Device> {
        self.devices.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Device> {
        self.devices.get_mut(name)
    }

    /// Register a device, replacing one of the same name.
    pub fn insert(&mut self, device: Device) {
        self.devices.insert(device.name().to_owned(), device);
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
