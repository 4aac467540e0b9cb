// Shared SSH transport configuration.
//
// A `SshTarget` names the host; `SshOptions` carries the per-run knobs
// (binary, multiplexing socket directory, timeouts) shared by every
// host in a run.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;

/// Where and as whom to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub hostname: String,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub identity_file: Option<PathBuf>,
}

impl SshTarget {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            user: None,
            port: None,
            identity_file: None,
        }
    }

    /// `user@hostname`, or just `hostname`.
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{user}@{}", self.hostname),
            None => self.hostname.clone(),
        }
    }

    /// Reject destinations ssh would misparse.
    pub fn validate(&self) -> Result<(), Error> {
        if self.hostname.trim().is_empty() {
            return Err(Error::InvalidTarget("hostname is empty".into()));
        }
        if self.hostname.starts_with('-') {
            return Err(Error::InvalidTarget(format!(
                "hostname '{}' starts with '-'",
                self.hostname
            )));
        }
        if let Some(user) = &self.user {
            if user.is_empty() || user.starts_with('-') || user.contains('@') {
                return Err(Error::InvalidTarget(format!("invalid user '{user}'")));
            }
        }
        Ok(())
    }
}

/// Options common to all SSH connections in one run.
#[derive(Debug, Clone)]
pub struct SshOptions {
    /// The `ssh` executable.
    pub binary: String,
    /// Directory for multiplexing sockets; `None` disables multiplexing.
    pub control_dir: Option<PathBuf>,
    /// How long the master connection lingers after the last command.
    pub control_persist: Duration,
    pub connect_timeout: Duration,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            binary: "ssh".into(),
            control_dir: None,
            control_persist: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
        }
    }
}
