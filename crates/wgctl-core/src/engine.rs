// ── Run engine ──
//
// Applies a whole manifest: hosts in manifest order, devices within a
// host in manifest order, one command at a time. The run is bounded by
// the configured deadline and can be cancelled; either way the
// in-flight host pass is dropped, which kills any running command, and
// the host's channel is closed.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use tokio::time::{Instant, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wgctl_exec::{Commander, HostCommander, LocalCommander, SshCommander, SshOptions};

use crate::config::EngineConfig;
use crate::controller::HostController;
use crate::error::CoreError;
use crate::model::identity::validate_host;
use crate::model::{DesiredHost, HostTarget, Manifest};
use crate::reconcile::{DeviceReport, Reconciler};
use crate::registry::HostRegistry;
use crate::store::Repository;

/// Opens the command channel for a host.
pub trait Connector: Send + Sync {
    type Commander: Commander;

    fn connect(&self, host: &str, target: &HostTarget) -> Result<Self::Commander, CoreError>;
}

/// Local processes for local hosts, the system `ssh` client otherwise.
#[derive(Debug, Clone, Default)]
pub struct SystemConnector {
    ssh: SshOptions,
}

impl SystemConnector {
    pub fn new(ssh: SshOptions) -> Self {
        Self { ssh }
    }
}

impl Connector for SystemConnector {
    type Commander = HostCommander;

    fn connect(&self, _host: &str, target: &HostTarget) -> Result<HostCommander, CoreError> {
        Ok(match target {
            HostTarget::Local => LocalCommander::new().into(),
            HostTarget::Ssh(target) => SshCommander::new(target.clone(), self.ssh.clone())?.into(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HostReport {
    pub host: String,
    pub devices: Vec<DeviceReport>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub hosts: Vec<HostReport>,
}

impl RunReport {
    pub fn devices(&self) -> impl Iterator<Item = &DeviceReport> {
        self.hosts.iter().flat_map(|h| h.devices.iter())
    }
}

pub struct Engine<K> {
    config: EngineConfig,
    repo: Arc<dyn Repository>,
    connector: K,
}

impl<K: Connector> Engine<K> {
    pub fn new(config: EngineConfig, repo: Arc<dyn Repository>, connector: K) -> Self {
        Self {
            config,
            repo,
            connector,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn repository(&self) -> &dyn Repository {
        self.repo.as_ref()
    }

    /// Reconcile every device of one host over a single channel.
    pub async fn reconcile_host(
        &self,
        host: &str,
        desired: &DesiredHost,
    ) -> Result<HostReport, CoreError> {
        self.reconcile_host_within(host, desired, None).await
    }

    /// The host pass, raced against `limits` when given. The channel is
    /// closed however the pass ends.
    async fn reconcile_host_within(
        &self,
        host: &str,
        desired: &DesiredHost,
        limits: Option<&RunLimits<'_>>,
    ) -> Result<HostReport, CoreError> {
        validate_host(host)?;
        let commander = self.connector.connect(host, &desired.target(host))?;
        let controller = HostController::new(host, commander, self.config.remote.clone());

        let converge = self.converge_host(&controller, desired);
        let result = match limits {
            None => converge.await,
            Some(limits) => limits.race(converge).await,
        };
        controller.close().await;
        result
    }

    async fn converge_host(
        &self,
        controller: &HostController<K::Commander>,
        desired: &DesiredHost,
    ) -> Result<HostReport, CoreError> {
        let repo = self.repo.as_ref();
        let mut registry = HostRegistry::load(repo, controller.host())?;
        let reconciler = Reconciler::new(controller, repo, &self.config.defaults);

        let mut devices = Vec::with_capacity(desired.devices.len());
        for (name, device) in &desired.devices {
            devices.push(reconciler.reconcile(&mut registry, name, device).await?);
        }
        Ok(HostReport {
            host: controller.host().to_owned(),
            devices,
        })
    }

    /// Apply `manifest` host by host, stopping at the first error.
    pub async fn apply(&self, manifest: &Manifest) -> Result<RunReport, CoreError> {
        self.apply_within(manifest, None).await
    }

    async fn apply_within(
        &self,
        manifest: &Manifest,
        limits: Option<&RunLimits<'_>>,
    ) -> Result<RunReport, CoreError> {
        let mut report = RunReport::default();
        for (host, desired) in &manifest.hosts {
            if let Some(limits) = limits {
                limits.check()?;
            }
            info!(host = %host, devices = desired.devices.len(), "reconciling host");
            report
                .hosts
                .push(self.reconcile_host_within(host, desired, limits).await?);
        }
        Ok(report)
    }

    /// [`Engine::apply`] under the configured deadline, abandoned early
    /// when `cancel` fires. An abandoned host pass still closes its
    /// channel before the error is returned.
    pub async fn run(
        &self,
        manifest: &Manifest,
        cancel: &CancellationToken,
    ) -> Result<RunReport, CoreError> {
        let limits = RunLimits {
            cancel,
            deadline: Instant::now() + self.config.timeout,
            timeout_secs: self.config.timeout.as_secs(),
        };
        self.apply_within(manifest, Some(&limits)).await
    }
}

/// Deadline and cancellation shared by every host pass of one run.
struct RunLimits<'a> {
    cancel: &'a CancellationToken,
    deadline: Instant,
    timeout_secs: u64,
}

impl RunLimits<'_> {
    fn cancelled() -> CoreError {
        warn!("run cancelled");
        CoreError::Cancelled
    }

    fn expired(&self) -> CoreError {
        warn!(timeout_secs = self.timeout_secs, "run deadline exceeded");
        CoreError::Timeout {
            timeout_secs: self.timeout_secs,
        }
    }

    fn check(&self) -> Result<(), CoreError> {
        if self.cancel.is_cancelled() {
            return Err(Self::cancelled());
        }
        if Instant::now() >= self.deadline {
            return Err(self.expired());
        }
        Ok(())
    }

    /// Drive `work` until it finishes, the token fires or the deadline
    /// passes. Dropping `work` kills its in-flight command.
    async fn race<T>(
        &self,
        work: impl Future<Output = Result<T, CoreError>>,
    ) -> Result<T, CoreError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(Self::cancelled()),
            result = timeout_at(self.deadline, work) => {
                result.unwrap_or_else(|_| Err(self.expired()))
            }
        }
    }
}
