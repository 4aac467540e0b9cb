use crate::command::{Commander, Invocation, Output};
use crate::error::Error;
use crate::local::LocalCommander;
use crate::ssh::SshCommander;

/// Either executor, picked per host at runtime.
#[derive(Debug, Clone)]
pub enum HostCommander {
    Local(LocalCommander),
    Ssh(SshCommander),
}

impl HostCommander {
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Ssh(_))
    }
}

impl Commander for HostCommander {
    async fn run(&self, invocation: &Invocation) -> Result<Output, Error> {
        match self {
            Self::Local(local) => local.run(invocation).await,
            Self::Ssh(ssh) => ssh.run(invocation).await,
        }
    }

    async fn close(&self) {
        match self {
            Self::Local(local) => local.close().await,
            Self::Ssh(ssh) => ssh.close().await,
        }
    }
}

impl From<LocalCommander> for HostCommander {
    fn from(local: LocalCommander) -> Self {
        Self::Local(local)
    }
}

impl From<SshCommander> for HostCommander {
    fn from(ssh: SshCommander) -> Self {
        Self::Ssh(ssh)
    }
}
