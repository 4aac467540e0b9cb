// ── Host controller ──
//
// Drives one managed host through a `Commander`: writes device
// configuration files, queries and changes the state of the per-device
// service unit, and generates keys with the host's `wg` tool.

use serde::Serialize;
use strum::Display;
use tracing::{debug, info};
use wgctl_exec::{Commander, Invocation};

use crate::config::RemoteLayout;
use crate::error::CoreError;
use crate::keys::{KeyProvider, check_key};

/// Observed state of a device's service unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum UnitState {
    /// Not enabled; activation enables and starts in one step.
    Disabled,
    /// Enabled but stopped.
    Inactive,
    /// Enabled and running.
    Active,
}

/// What activation did to the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LifecycleAction {
    Enabled,
    Started,
    Restarted,
}

impl LifecycleAction {
    /// The action that brings a unit in `state` up on the latest config.
    pub fn for_state(state: UnitState) -> Self {
        match state {
            UnitState::Disabled => Self::Enabled,
            UnitState::Inactive => Self::Started,
            UnitState::Active => Self::Restarted,
        }
    }
}

#[derive(Debug)]
pub struct HostController<C> {
    host: String,
    commander: C,
    layout: RemoteLayout,
}

impl<C: Commander> HostController<C> {
    pub fn new(host: impl Into<String>, commander: C, layout: RemoteLayout) -> Self {
        Self {
            host: host.into(),
            commander,
            layout,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn commander(&self) -> &C {
        &self.commander
    }

    pub fn layout(&self) -> &RemoteLayout {
        &self.layout
    }

    /// Release the host's channel.
    pub async fn close(&self) {
        self.commander.close().await;
    }

    fn privileged(&self, invocation: Invocation) -> Invocation {
        if self.layout.sudo { invocation.sudo() } else { invocation }
    }

    fn systemctl(&self, verb: &str, device: &str) -> Invocation {
        self.privileged(
            Invocation::new("systemctl")
                .arg(verb)
                .arg(self.layout.unit_name(device)),
        )
    }

    // ── Configuration files ──────────────────────────────────────────

    /// Write `content` to the device's config file, owner-only.
    ///
    /// The file is created empty with mode 0600 before any content is
    /// written, so keys are never readable by others.
    pub async fn save_config(&self, device: &str, content: &str) -> Result<(), CoreError> {
        let path = self.layout.config_path(device);
        debug!(host = %self.host, %path, "writing device config");

        let create = self.privileged(Invocation::new("install").args([
            "-m",
            "600",
            "/dev/null",
            path.as_str(),
        ]));
        self.commander.exec(&create).await?;

        let write = self.privileged(Invocation::new("tee").arg(&path).stdin(content));
        self.commander.exec(&write).await?;
        Ok(())
    }

    // ── Unit state ───────────────────────────────────────────────────

    pub async fn is_enabled(&self, device: &str) -> Result<bool, CoreError> {
        let state = self.unit_query("is-enabled", device).await?;
        Ok(matches!(state.as_str(), "enabled" | "enabled-runtime"))
    }

    pub async fn is_active(&self, device: &str) -> Result<bool, CoreError> {
        let state = self.unit_query("is-active", device).await?;
        Ok(state == "active")
    }

    /// Run a `systemctl is-*` query.
    ///
    /// These exit non-zero to report a negative state, so stdout decides;
    /// only a failure without any state on stdout is an error.
    async fn unit_query(&self, verb: &str, device: &str) -> Result<String, CoreError> {
        let invocation = self.systemctl(verb, device);
        let output = self.commander.run(&invocation).await?;
        let state = output.stdout_trimmed().to_owned();
        if state.is_empty() {
            output.check(&invocation)?;
        }
        Ok(state)
    }

    pub async fn state(&self, device: &str) -> Result<UnitState, CoreError> {
        if !self.is_enabled(device).await? {
            return Ok(UnitState::Disabled);
        }
        if self.is_active(device).await? {
            Ok(UnitState::Active)
        } else {
            Ok(UnitState::Inactive)
        }
    }

    // ── Unit actions ─────────────────────────────────────────────────

    /// Enable the unit and start it now.
    pub async fn enable(&self, device: &str) -> Result<(), CoreError> {
        let invocation = self.privileged(
            Invocation::new("systemctl")
                .args(["enable", "--now"])
                .arg(self.layout.unit_name(device)),
        );
        self.commander.exec(&invocation).await?;
        Ok(())
    }

    pub async fn start(&self, device: &str) -> Result<(), CoreError> {
        self.commander.exec(&self.systemctl("start", device)).await?;
        Ok(())
    }

    pub async fn restart(&self, device: &str) -> Result<(), CoreError> {
        self.commander.exec(&self.systemctl("restart", device)).await?;
        Ok(())
    }

    /// Bring the unit up on the config last written: enable if disabled,
    /// start if stopped, otherwise restart.
    pub async fn activate(&self, device: &str) -> Result<LifecycleAction, CoreError> {
        let action = LifecycleAction::for_state(self.state(device).await?);
        match action {
            LifecycleAction::Enabled => self.enable(device).await?,
            LifecycleAction::Started => self.start(device).await?,
            LifecycleAction::Restarted => self.restart(device).await?,
        }
        info!(host = %self.host, device, %action, "unit activated");
        Ok(action)
    }
}

impl<C: Commander> KeyProvider for HostController<C> {
    async fn genkey(&self) -> Result<String, CoreError> {
        let raw = self.commander.exec(&Invocation::new("wg").arg("genkey")).await?;
        check_key("genkey", raw)
    }

    async fn pubkey(&self, private_key: &str) -> Result<String, CoreError> {
        let invocation = Invocation::new("wg").arg("pubkey").stdin(format!("{private_key}\n"));
        let raw = self.commander.exec(&invocation).await?;
        check_key("pubkey", raw)
    }

    async fn genpsk(&self) -> Result<String, CoreError> {
        let raw = self.commander.exec(&Invocation::new("wg").arg("genpsk")).await?;
        check_key("genpsk", raw)
    }
}
