// ── Reconciliation pass ──
//
// Converges one device on one host toward its desired description:
// resolve or create the device, add or update desired clients, delete
// the clients no longer listed, persist, push the rendered config and
// bring the unit up. The first failing step ends the pass; work
// already done stays in place and a later run picks up from there.

use std::collections::HashSet;
use std::net::Ipv4Addr;

use serde::Serialize;
use tracing::{debug, info};
use wgctl_exec::Commander;

use crate::config::NetworkDefaults;
use crate::controller::{HostController, LifecycleAction};
use crate::error::CoreError;
use crate::model::{Device, DesiredDevice, Entity};
use crate::registry::HostRegistry;
use crate::store::Repository;

/// Outcome of one device pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceReport {
    pub host: String,
    pub device: String,
    pub address: Ipv4Addr,
    pub public_key: String,
    pub created: bool,
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    pub action: LifecycleAction,
}

pub struct Reconciler<'a, C> {
    controller: &'a HostController<C>,
    repo: &'a dyn Repository,
    defaults: &'a NetworkDefaults,
}

impl<'a, C: Commander> Reconciler<'a, C> {
    pub fn new(
        controller: &'a HostController<C>,
        repo: &'a dyn Repository,
        defaults: &'a NetworkDefaults,
    ) -> Self {
        Self {
            controller,
            repo,
            defaults,
        }
    }

    /// Run the full pass for device `name` of the registry's host.
    pub async fn reconcile(
        &self,
        registry: &mut HostRegistry,
        name: &str,
        desired: &DesiredDevice,
    ) -> Result<DeviceReport, CoreError> {
        let host = registry.host().to_owned();
        check_unique_clients(desired)?;

        // Resolve or create.
        let created = !registry.contains(name);
        if created {
            let device =
                Device::create(&host, name, desired, self.defaults, self.controller).await?;
            registry.insert(device);
        }
        let device = registry
            .get_mut(name)
            .ok_or_else(|| CoreError::not_found("device", format!("{host}/{name}")))?;
        if !created {
            device.apply(desired)?;
            device
                .override_private_key(&desired.private_key, self.controller)
                .await?;
        }

        // Desired clients. Addresses requested explicitly are kept out of
        // allocation so list order cannot hand them to someone else.
        let reserved: HashSet<Ipv4Addr> = desired
            .users
            .iter()
            .filter_map(|c| c.address.trim().parse().ok())
            .collect();
        let mut processed = HashSet::new();
        let mut added = Vec::new();
        let mut updated = Vec::new();
        for client in &desired.users {
            if device.client(&client.name).is_some() {
                if device.update_client(client, self.repo)? {
                    updated.push(client.name.clone());
                }
            } else {
                device
                    .add_client(client, &reserved, self.controller, self.repo)
                    .await?;
                added.push(client.name.clone());
            }
            processed.insert(client.name.as_str());
        }

        // Omission is deletion.
        let mut removed = Vec::new();
        for stale in device.client_names() {
            if !processed.contains(stale.as_str()) {
                device.remove_client(&stale, self.repo)?;
                removed.push(stale);
            }
        }

        device.save(self.repo)?;
        debug!(host = %host, device = name, clients = device.clients().count(), "device persisted");

        self.controller.save_config(name, &device.render_config()).await?;
        let action = self.controller.activate(name).await?;

        info!(
            host = %host,
            device = name,
            added = added.len(),
            updated = updated.len(),
            removed = removed.len(),
            %action,
            "device reconciled"
        );
        Ok(DeviceReport {
            host,
            device: name.to_owned(),
            address: device.address(),
            public_key: device.public_key().to_owned(),
            created,
            added,
            updated,
            removed,
            action,
        })
    }
}

fn check_unique_clients(desired: &DesiredDevice) -> Result<(), CoreError> {
    let mut seen = HashSet::new();
    for client in &desired.users {
        if !seen.insert(client.name.as_str()) {
            return Err(CoreError::validation(
                "users",
                format!("client '{}' is listed more than once", client.name),
            ));
        }
    }
    Ok(())
}
