// Domain model: devices, their clients, and the desired state they converge to.

pub mod client;
pub mod desired;
pub mod device;
pub mod identity;

pub use client::{Client, DeviceRef};
pub use desired::{DesiredClient, DesiredDevice, DesiredHost, HostTarget, Manifest, SshSpec};
pub use device::Device;
pub use identity::{Entity, EntityKind, Identity, KeyPair};
