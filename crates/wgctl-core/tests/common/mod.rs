#![allow(dead_code, clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;

use tempfile::TempDir;
use wgctl_core::{
    Connector, CoreError, DesiredClient, DesiredDevice, HostController, HostTarget,
    LocalRepository, LocalStorage, RemoteLayout,
};
use wgctl_exec::mock::FakeHost;

pub fn repo() -> (TempDir, LocalRepository) {
    let dir = tempfile::tempdir().unwrap();
    let repo = LocalRepository::new(LocalStorage::new(dir.path().join("store")));
    (dir, repo)
}

pub fn controller(host: &Arc<FakeHost>) -> HostController<Arc<FakeHost>> {
    HostController::new("vpn1", Arc::clone(host), RemoteLayout::default())
}

pub fn wg0(users: &[&str]) -> DesiredDevice {
    DesiredDevice {
        address: "10.5.0.1".into(),
        network: "10.5.0.0".into(),
        netmask: 16,
        users: users.iter().map(|name| DesiredClient::new(*name)).collect(),
        ..DesiredDevice::default()
    }
}

/// Hands out pre-built fake hosts by name.
#[derive(Default)]
pub struct FakeConnector {
    hosts: HashMap<String, Arc<FakeHost>>,
}

impl FakeConnector {
    pub fn with_host(mut self, name: &str, host: &Arc<FakeHost>) -> Self {
        self.hosts.insert(name.to_owned(), Arc::clone(host));
        self
    }
}

impl Connector for FakeConnector {
    type Commander = Arc<FakeHost>;

    fn connect(&self, host: &str, _target: &HostTarget) -> Result<Arc<FakeHost>, CoreError> {
        self.hosts.get(host).cloned().ok_or_else(|| CoreError::Execution {
            command: format!("ssh {host}"),
            output: "no route to host".into(),
        })
    }
}
