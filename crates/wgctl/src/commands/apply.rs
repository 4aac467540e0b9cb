//! Apply handler: converge hosts to the manifest.

use std::fs;
use std::sync::Arc;

use tabled::Tabled;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use wgctl_core::{DeviceReport, Engine, SystemConnector};

use crate::cli::{ApplyArgs, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Added")]
    added: String,
    #[tabled(rename = "Updated")]
    updated: String,
    #[tabled(rename = "Removed")]
    removed: String,
    #[tabled(rename = "Unit")]
    action: String,
}

fn to_row(report: &DeviceReport, color: bool) -> ReportRow {
    let device = if report.created {
        format!("{} (new)", report.device)
    } else {
        report.device.clone()
    };
    ReportRow {
        host: report.host.clone(),
        device,
        address: report.address.to_string(),
        added: output::names(&report.added),
        updated: output::names(&report.updated),
        removed: output::names(&report.removed),
        action: output::paint_action(report.action, color),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ApplyArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let manifest_path = args.manifest.unwrap_or_else(|| cfg.manifest.clone());
    let manifest = config::load_manifest(&manifest_path)?;

    if let Some(missing) = args.hosts.iter().find(|h| !manifest.hosts.contains_key(*h)) {
        return Err(CliError::Manifest {
            message: format!(
                "host '{missing}' is not declared in {}",
                manifest_path.display()
            ),
        });
    }
    let manifest = manifest.select(&args.hosts);
    if manifest.hosts.is_empty() {
        info!(manifest = %manifest_path.display(), "manifest declares no hosts");
        return Ok(());
    }

    let engine_config = cfg.engine_config()?;
    let control_dir = config::ssh_control_dir()?;
    let engine = Engine::new(
        engine_config,
        Arc::new(config::open_repository(cfg)),
        SystemConnector::new(cfg.ssh_options(Some(control_dir.clone()))),
    );

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    let result = engine.run(&manifest, &cancel).await;
    interrupt.abort();
    if let Err(e) = fs::remove_dir_all(&control_dir) {
        debug!(dir = %control_dir.display(), error = %e, "could not remove ssh control dir");
    }
    let report = result?;

    let devices: Vec<DeviceReport> = report.devices().cloned().collect();
    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &devices,
        |r| to_row(r, color),
        |r| format!("{}/{}", r.host, r.device),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use wgctl_core::LifecycleAction;

    use super::*;

    #[test]
    fn new_devices_are_marked_in_the_table() {
        let report = DeviceReport {
            host: "vpn1".into(),
            device: "wg0".into(),
            address: Ipv4Addr::new(10, 5, 0, 1),
            public_key: "pub".into(),
            created: true,
            added: vec!["alice".into(), "bob".into()],
            updated: vec![],
            removed: vec![],
            action: LifecycleAction::Enabled,
        };
        let row = to_row(&report, false);
        assert_eq!(row.device, "wg0 (new)");
        assert_eq!(row.added, "alice, bob");
        assert_eq!(row.updated, "-");
        assert_eq!(row.action, "enabled");
    }
}
