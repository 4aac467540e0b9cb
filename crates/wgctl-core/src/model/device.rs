// ── Device ──
//
// A WireGuard interface on one host together with the clients it
// serves. The device owns its clients; they are kept sorted by name so
// rendered configuration is deterministic.

use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;
use tracing::{debug, info};

use crate::allocator;
use crate::config::NetworkDefaults;
use crate::error::CoreError;
use crate::keys::KeyProvider;
use crate::model::client::{Client, DeviceRef};
use crate::model::desired::{DesiredClient, DesiredDevice};
use crate::model::identity::{
    Entity, EntityKind, Identity, KeyPair, normalize_allowed_ip, parse_address,
    validate_client_name, validate_device_name, validate_host,
};
use crate::render;
use crate::store::{ClientRepository, DeviceRecord, Repository};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    identity: Identity,
    host: String,
    network: Ipv4Net,
    listen_port: u16,
    dns: String,
    post_up: Option<String>,
    pre_down: Option<String>,
    last_address: Option<Ipv4Addr>,
    clients: BTreeMap<String, Client>,
}

impl Entity for Device {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Device
    }
}

fn subnet(network: Ipv4Addr, netmask: u8) -> Result<Ipv4Net, CoreError> {
    if !(1..=30).contains(&netmask) {
        return Err(CoreError::validation(
            "netmask",
            format!("/{netmask} is outside 1..=30"),
        ));
    }
    Ipv4Net::new(network, netmask)
        .map(|net| net.trunc())
        .map_err(|e| CoreError::validation("netmask", e.to_string()))
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

impl Device {
    // ── Construction ─────────────────────────────────────────────────

    /// A device with default network parameters and the given keys.
    pub fn new(
        host: &str,
        name: &str,
        keys: KeyPair,
        defaults: &NetworkDefaults,
    ) -> Result<Self, CoreError> {
        validate_host(host)?;
        validate_device_name(name)?;
        if defaults.listen_port == 0 {
            return Err(CoreError::validation("listen port", "must be 1..=65535"));
        }
        let network = subnet(defaults.network, defaults.netmask)?;
        if !allocator::is_host_address(network, defaults.address) {
            return Err(CoreError::validation(
                "address",
                format!("{} is not a host address of {network}", defaults.address),
            ));
        }
        Ok(Self {
            identity: Identity {
                name: name.to_owned(),
                address: defaults.address,
                keys,
            },
            host: host.to_owned(),
            network,
            listen_port: defaults.listen_port,
            dns: defaults.address.to_string(),
            post_up: None,
            pre_down: None,
            last_address: None,
            clients: BTreeMap::new(),
        })
    }

    /// Create a fresh device: generate (or derive) keys on the host,
    /// start from `defaults`, then apply `desired`.
    pub async fn create<K: KeyProvider>(
        host: &str,
        name: &str,
        desired: &DesiredDevice,
        defaults: &NetworkDefaults,
        keys: &K,
    ) -> Result<Self, CoreError> {
        validate_host(host)?;
        validate_device_name(name)?;

        let pair = match non_empty(&desired.private_key) {
            Some(private_key) => {
                let public_key = keys.pubkey(&private_key).await?;
                KeyPair::new(private_key, public_key)
            }
            None => keys.keypair().await?,
        };
        let mut device = Self::new(host, name, pair, defaults)?;
        device.apply(desired)?;
        info!(host, device = name, address = %device.identity.address, "device created");
        Ok(device)
    }

    /// Rebuild the device and all its clients from the repository.
    pub fn load(repo: &dyn Repository, host: &str, name: &str) -> Result<Self, CoreError> {
        let record = repo.find_device(host, name)?;
        let mut device = Self::from_record(record)?;
        for client_name in repo.list_clients(host, name)? {
            let client = Client::load(repo, device.device_ref(), &client_name)?;
            device.clients.insert(client_name, client);
        }
        debug!(host, device = name, clients = device.clients.len(), "device loaded");
        Ok(device)
    }

    /// Device fields only; clients are attached by [`Device::load`].
    pub fn from_record(record: DeviceRecord) -> Result<Self, CoreError> {
        validate_host(&record.host)?;
        validate_device_name(&record.name)?;
        let address = parse_address("address", &record.address)?
            .ok_or_else(|| CoreError::validation("address", "stored device has no address"))?;
        let network = parse_address("network", &record.network)?
            .ok_or_else(|| CoreError::validation("network", "stored device has no network"))?;
        let network = subnet(network, record.netmask)?;
        let last_address = parse_address("last address", &record.last_address)?;

        Ok(Self {
            identity: Identity {
                name: record.name,
                address,
                keys: KeyPair::new(record.private_key, record.public_key),
            },
            host: record.host,
            network,
            listen_port: record.listen_port,
            dns: record
                .dns
                .and_then(|dns| non_empty(&dns))
                .unwrap_or_else(|| address.to_string()),
            post_up: record.post_up.and_then(|s| non_empty(&s)),
            pre_down: record.pre_down.and_then(|s| non_empty(&s)),
            last_address,
            clients: BTreeMap::new(),
        })
    }

    pub fn to_record(&self) -> DeviceRecord {
        DeviceRecord {
            host: self.host.clone(),
            name: self.identity.name.clone(),
            listen_port: self.listen_port,
            address: self.identity.address.to_string(),
            network: self.network.network().to_string(),
            netmask: self.network.prefix_len(),
            private_key: self.identity.keys.private_key.clone(),
            public_key: self.identity.keys.public_key.clone(),
            last_address: self
                .last_address
                .map(|addr| addr.to_string())
                .unwrap_or_default(),
            dns: Some(self.dns.clone()),
            post_up: self.post_up.clone(),
            pre_down: self.pre_down.clone(),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn network(&self) -> Ipv4Net {
        self.network
    }

    pub fn listen_port(&self) -> u16 {
        self.listen_port
    }

    pub fn dns(&self) -> &str {
        &self.dns
    }

    pub fn post_up(&self) -> Option<&str> {
        self.post_up.as_deref()
    }

    pub fn pre_down(&self) -> Option<&str> {
        self.pre_down.as_deref()
    }

    pub fn keys(&self) -> &KeyPair {
        &self.identity.keys
    }

    /// Allocation cursor.
    pub fn last_address(&self) -> Option<Ipv4Addr> {
        self.last_address
    }

    pub fn device_ref(&self) -> DeviceRef {
        DeviceRef::new(&self.host, &self.identity.name)
    }

    /// Clients in ascending name order.
    pub fn clients(&self) -> impl Iterator<Item = &Client> {
        self.clients.values()
    }

    pub fn client(&self, name: &str) -> Option<&Client> {
        self.clients.get(name)
    }

    pub fn client_names(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }

    // ── Desired parameters ───────────────────────────────────────────

    /// Merge desired parameters onto this device. Keys are left alone.
    ///
    /// Unspecified address, network, netmask and port keep their current
    /// values; empty DNS means the device address; hooks are replaced.
    /// Nothing changes unless every check passes.
    pub fn apply(&mut self, desired: &DesiredDevice) -> Result<(), CoreError> {
        let address = parse_address("address", &desired.address)?.unwrap_or(self.identity.address);
        let network_addr =
            parse_address("network", &desired.network)?.unwrap_or(self.network.network());
        let netmask = match desired.netmask {
            0 => self.network.prefix_len(),
            bits => bits,
        };
        let network = subnet(network_addr, netmask)?;

        if !allocator::is_host_address(network, address) {
            return Err(CoreError::validation(
                "address",
                format!("{address} is not a host address of {network}"),
            ));
        }
        if let Some(client) = self.clients.values().find(|c| {
            c.address() == address || !allocator::is_host_address(network, c.address())
        }) {
            return Err(CoreError::validation(
                "network",
                format!(
                    "client {} at {} would conflict with device {address} in {network}",
                    client.name(),
                    client.address()
                ),
            ));
        }

        self.identity.address = address;
        self.network = network;
        if desired.listen_port != 0 {
            self.listen_port = desired.listen_port;
        }
        self.dns = non_empty(&desired.dns).unwrap_or_else(|| address.to_string());
        self.post_up = non_empty(&desired.post_up);
        self.pre_down = non_empty(&desired.pre_down);
        Ok(())
    }

    /// Replace the private key and re-derive the public key.
    ///
    /// Returns whether the key changed.
    pub async fn override_private_key<K: KeyProvider>(
        &mut self,
        private_key: &str,
        keys: &K,
    ) -> Result<bool, CoreError> {
        let private_key = private_key.trim();
        if private_key.is_empty() || private_key == self.identity.keys.private_key {
            return Ok(false);
        }
        let public_key = keys.pubkey(private_key).await?;
        self.identity.keys = KeyPair::new(private_key, public_key);
        info!(host = %self.host, device = %self.identity.name, "device key replaced");
        Ok(true)
    }

    // ── Addresses ────────────────────────────────────────────────────

    fn taken_addresses(&self) -> HashSet<Ipv4Addr> {
        self.clients
            .values()
            .map(Entity::address)
            .chain(std::iter::once(self.identity.address))
            .collect()
    }

    /// Next free address from the cursor, also skipping `reserved`.
    fn next_address(&self, reserved: &HashSet<Ipv4Addr>) -> Result<Ipv4Addr, CoreError> {
        let start = self
            .last_address
            .filter(|cursor| self.network.contains(cursor))
            .unwrap_or(self.identity.address);
        let mut taken = self.taken_addresses();
        taken.extend(reserved);
        allocator::allocate(self.network, start, &taken).ok_or_else(|| {
            CoreError::AddressExhausted {
                device: format!("{}/{}", self.host, self.identity.name),
                network: self.network.to_string(),
            }
        })
    }

    /// Hand out the next free address and advance the cursor.
    pub fn allocate(&mut self) -> Result<Ipv4Addr, CoreError> {
        let address = self.next_address(&HashSet::new())?;
        self.last_address = Some(address);
        Ok(address)
    }

    /// Move the cursor back to the highest assigned client address.
    pub fn reset_cursor(&mut self) -> Option<Ipv4Addr> {
        self.last_address = self
            .clients
            .values()
            .map(Entity::address)
            .filter(|addr| self.network.contains(addr))
            .max();
        self.last_address
    }

    /// Check a requested client address. `owner` is the client that may
    /// already hold it.
    fn check_client_address(&self, address: Ipv4Addr, owner: Option<&str>) -> Result<(), CoreError> {
        if !allocator::is_host_address(self.network, address) {
            return Err(CoreError::validation(
                "client address",
                format!("{address} is not a host address of {}", self.network),
            ));
        }
        if address == self.identity.address {
            return Err(CoreError::validation(
                "client address",
                format!("{address} is the device address"),
            ));
        }
        if let Some(other) = self
            .clients
            .values()
            .find(|c| c.address() == address && Some(c.name()) != owner)
        {
            return Err(CoreError::validation(
                "client address",
                format!("{address} is already assigned to {}", other.name()),
            ));
        }
        Ok(())
    }

    // ── Clients ──────────────────────────────────────────────────────

    /// Add a client unless one with the same name exists.
    ///
    /// A new client gets a key pair and preshared key from `keys`, the
    /// requested address or the next free one outside `reserved`, and is
    /// persisted before it is attached.
    pub async fn add_client<K: KeyProvider>(
        &mut self,
        desired: &DesiredClient,
        reserved: &HashSet<Ipv4Addr>,
        keys: &K,
        repo: &dyn ClientRepository,
    ) -> Result<&Client, CoreError> {
        let name = desired.name.as_str();
        validate_client_name(name)?;
        if self.clients.contains_key(name) {
            return Ok(&self.clients[name]);
        }

        let requested = parse_address("client address", &desired.address)?;
        let address = match requested {
            Some(address) => {
                self.check_client_address(address, None)?;
                address
            }
            None => self.next_address(reserved)?,
        };
        for raw in &desired.allowed_ips {
            normalize_allowed_ip(raw)?;
        }

        let pair = keys.keypair().await?;
        let preshared_key = keys.genpsk().await?;
        let client = Client::new(
            self.device_ref(),
            name,
            address,
            pair,
            preshared_key,
            &desired.allowed_ips,
        )?;
        client.save(repo)?;
        if requested.is_none() {
            self.last_address = Some(address);
        }
        info!(host = %self.host, device = %self.identity.name, client = name, %address, "client added");
        Ok(self.clients.entry(name.to_owned()).or_insert(client))
    }

    /// Apply an explicit address or allowed IPs to an existing client.
    ///
    /// Returns whether anything changed; changes are persisted.
    pub fn update_client(
        &mut self,
        desired: &DesiredClient,
        repo: &dyn ClientRepository,
    ) -> Result<bool, CoreError> {
        let name = desired.name.as_str();
        let Some(current) = self.clients.get(name) else {
            return Err(CoreError::not_found("client", name));
        };

        let requested = parse_address("client address", &desired.address)?;
        if let Some(address) = requested.filter(|a| *a != current.address()) {
            self.check_client_address(address, Some(name))?;
        }

        let mut updated = current.clone();
        if let Some(address) = requested {
            updated.set_address(address);
        }
        updated.set_allowed_ips(&desired.allowed_ips)?;

        if &updated == current {
            return Ok(false);
        }
        updated.save(repo)?;
        info!(host = %self.host, device = %self.identity.name, client = name, "client updated");
        self.clients.insert(name.to_owned(), updated);
        Ok(true)
    }

    /// Delete a client's record, then detach it.
    pub fn remove_client(
        &mut self,
        name: &str,
        repo: &dyn ClientRepository,
    ) -> Result<Client, CoreError> {
        let client = self
            .clients
            .get(name)
            .ok_or_else(|| CoreError::not_found("client", name))?;
        match client.delete(repo) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(client = name, "client record already gone");
            }
            Err(e) => return Err(e),
        }
        info!(host = %self.host, device = %self.identity.name, client = name, "client removed");
        self.clients
            .remove(name)
            .ok_or_else(|| CoreError::not_found("client", name))
    }

    // ── Persistence and rendering ────────────────────────────────────

    /// Persist the device record, then every attached client in full.
    pub fn save(&self, repo: &dyn Repository) -> Result<(), CoreError> {
        repo.save_device(&self.to_record())?;
        for client in self.clients.values() {
            client.save(repo)?;
        }
        Ok(())
    }

    /// The `[Interface]` block alone.
    pub fn render_head(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = render::write_head(&mut out, self);
        out
    }

    /// Full wg-quick configuration for this device.
    pub fn render_config(&self) -> String {
        let mut out = String::new();
        let _ = render::write_device_config(&mut out, self);
        out
    }

    /// Peer-side configuration for one client.
    pub fn client_config(&self, name: &str, endpoint: &str) -> Result<String, CoreError> {
        let client = self
            .clients
            .get(name)
            .ok_or_else(|| CoreError::not_found("client", name))?;
        let mut out = String::new();
        let _ = render::write_client_config(&mut out, self, client, endpoint);
        Ok(out)
    }
}
