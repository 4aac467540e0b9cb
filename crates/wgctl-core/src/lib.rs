//! Device model and reconciliation engine for wgctl.
//!
//! This crate turns a desired description of WireGuard devices and their
//! clients into converged hosts:
//!
//! - **[`Device`] / [`Client`]**: the domain model. A device owns its
//!   clients (sorted by name), hands out client addresses from a
//!   monotonic cursor ([`allocator`]) and renders its wg-quick
//!   configuration ([`render`]).
//!
//! - **[`Repository`]**: blocking persistence of device and client
//!   records, with [`LocalRepository`] storing JSON files under a root
//!   directory.
//!
//! - **[`HostController`]**: drives one host through a
//!   [`Commander`](wgctl_exec::Commander): writes config files without
//!   exposing them, moves the service unit through
//!   enable / start / restart, and generates keys as a [`KeyProvider`].
//!
//! - **[`Reconciler`] / [`Engine`]**: the per-device pass and the
//!   manifest-wide run with a deadline and cancellation.

pub mod allocator;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod keys;
pub mod model;
pub mod reconcile;
pub mod registry;
pub mod render;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{EngineConfig, NetworkDefaults, RemoteLayout};
pub use controller::{HostController, LifecycleAction, UnitState};
pub use engine::{Connector, Engine, HostReport, RunReport, SystemConnector};
pub use error::CoreError;
pub use keys::KeyProvider;
pub use reconcile::{DeviceReport, Reconciler};
pub use registry::HostRegistry;
pub use store::{
    ClientRecord, ClientRepository, DeviceRecord, DeviceRepository, LocalRepository,
    LocalStorage, Repository,
};

pub use model::{
    Client, DesiredClient, DesiredDevice, DesiredHost, Device, DeviceRef, Entity, EntityKind,
    HostTarget, Identity, KeyPair, Manifest, SshSpec,
};
