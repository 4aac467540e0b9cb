// ── Repository traits ──
//
// Devices and clients are persisted through two narrow traits so the
// model can be exercised against any backend. `Repository` bundles
// both for callers that need the whole surface.

use crate::error::CoreError;
use crate::store::local::LocalStorage;
use crate::store::records::{ClientRecord, DeviceRecord};

const DEVICES: &str = "devices";
const CLIENTS: &str = "clients";

pub trait DeviceRepository: Send + Sync {
    /// Hosts that have at least one stored device.
    fn hosts(&self) -> Result<Vec<String>, CoreError>;

    /// Device names stored for `host`, sorted.
    fn list_devices(&self, host: &str) -> Result<Vec<String>, CoreError>;

    fn find_device(&self, host: &str, name: &str) -> Result<DeviceRecord, CoreError>;

    fn save_device(&self, record: &DeviceRecord) -> Result<(), CoreError>;
}

pub trait ClientRepository: Send + Sync {
    /// Client names stored for one device, sorted.
    fn list_clients(&self, host: &str, device: &str) -> Result<Vec<String>, CoreError>;

    fn find_client(&self, host: &str, device: &str, name: &str) -> Result<ClientRecord, CoreError>;

    fn save_client(&self, host: &str, device: &str, record: &ClientRecord) -> Result<(), CoreError>;

    /// Fails with `NotFound` when the record does not exist.
    fn delete_client(&self, host: &str, device: &str, name: &str) -> Result<(), CoreError>;
}

/// Full persistence surface used by the engine.
pub trait Repository: DeviceRepository + ClientRepository {}

impl<T: DeviceRepository + ClientRepository + ?Sized> Repository for T {}

// ── LocalRepository ─────────────────────────────────────────────────

/// File-backed repository:
/// `devices/<host>/<device>.json` and `clients/<host>/<device>/<client>.json`.
#[derive(Debug, Clone)]
pub struct LocalRepository {
    storage: LocalStorage,
}

impl LocalRepository {
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &LocalStorage {
        &self.storage
    }
}

impl DeviceRepository for LocalRepository {
    fn hosts(&self) -> Result<Vec<String>, CoreError> {
        self.storage.list_dirs(&[DEVICES])
    }

    fn list_devices(&self, host: &str) -> Result<Vec<String>, CoreError> {
        self.storage.list(&[DEVICES, host])
    }

    fn find_device(&self, host: &str, name: &str) -> Result<DeviceRecord, CoreError> {
        self.storage
            .load(&[DEVICES, host, name])?
            .ok_or_else(|| CoreError::not_found("device", format!("{host}/{name}")))
    }

    fn save_device(&self, record: &DeviceRecord) -> Result<(), CoreError> {
        self.storage
            .save(&[DEVICES, &record.host, &record.name], record)
    }
}

impl ClientRepository for LocalRepository {
    fn list_clients(&self, host: &str, device: &str) -> Result<Vec<String>, CoreError> {
        self.storage.list(&[CLIENTS, host, device])
    }

    fn find_client(&self, host: &str, device: &str, name: &str) -> Result<ClientRecord, CoreError> {
        self.storage
            .load(&[CLIENTS, host, device, name])?
            .ok_or_else(|| CoreError::not_found("client", format!("{host}/{device}/{name}")))
    }

    fn save_client(&self, host: &str, device: &str, record: &ClientRecord) -> Result<(), CoreError> {
        self.storage.save(&[CLIENTS, host, device, &record.name], record)
    }

    fn delete_client(&self, host: &str, device: &str, name: &str) -> Result<(), CoreError> {
        if self.storage.delete(&[CLIENTS, host, device, name])? {
            Ok(())
        } else {
            Err(CoreError::not_found("client", format!("{host}/{device}/{name}")))
        }
    }
}
