// wgctl-exec: run commands on managed hosts, locally or over SSH.

pub mod command;
pub mod error;
pub mod host;
pub mod local;
pub mod ssh;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use command::{Commander, Invocation, Output};
pub use error::Error;
pub use host::HostCommander;
pub use local::LocalCommander;
pub use ssh::SshCommander;
pub use transport::{SshOptions, SshTarget};
