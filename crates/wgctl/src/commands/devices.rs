//! Device command handlers.

use serde::Serialize;
use tabled::Tabled;
use wgctl_core::{Device, DeviceRepository, Entity, LocalRepository};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

use super::util;

// ── View ────────────────────────────────────────────────────────────

/// Public view of a stored device; never carries the private key.
#[derive(Serialize)]
struct DeviceView {
    host: String,
    name: String,
    address: String,
    network: String,
    listen_port: u16,
    dns: String,
    public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    post_up: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pre_down: Option<String>,
    last_address: Option<String>,
    clients: Vec<String>,
}

impl From<&Device> for DeviceView {
    fn from(d: &Device) -> Self {
        Self {
            host: d.host().to_owned(),
            name: d.name().to_owned(),
            address: d.address().to_string(),
            network: d.network().to_string(),
            listen_port: d.listen_port(),
            dns: d.dns().to_owned(),
            public_key: d.public_key().to_owned(),
            post_up: d.post_up().map(str::to_owned),
            pre_down: d.pre_down().map(str::to_owned),
            last_address: d.last_address().map(|a| a.to_string()),
            clients: d.client_names(),
        }
    }
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Device")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Network")]
    network: String,
    #[tabled(rename = "Port")]
    port: u16,
    #[tabled(rename = "Clients")]
    clients: usize,
    #[tabled(rename = "Public Key")]
    public_key: String,
}

impl From<&DeviceView> for DeviceRow {
    fn from(v: &DeviceView) -> Self {
        Self {
            host: v.host.clone(),
            name: v.name.clone(),
            address: v.address.clone(),
            network: v.network.clone(),
            port: v.listen_port,
            clients: v.clients.len(),
            public_key: v.public_key.clone(),
        }
    }
}

fn detail(v: &DeviceView) -> String {
    let mut lines = vec![
        format!("Device:      {}/{}", v.host, v.name),
        format!("Address:     {}", v.address),
        format!("Network:     {}", v.network),
        format!("Listen Port: {}", v.listen_port),
        format!("DNS:         {}", v.dns),
        format!("Public Key:  {}", v.public_key),
        format!("Cursor:      {}", v.last_address.as_deref().unwrap_or("-")),
    ];
    if let Some(ref up) = v.post_up {
        lines.push(format!("PostUp:      {up}"));
    }
    if let Some(ref down) = v.pre_down {
        lines.push(format!("PreDown:     {down}"));
    }
    lines.push(format!("Clients:     {}", output::names(&v.clients)));
    lines.join("\n")
}

fn load_views(repo: &LocalRepository, host: Option<&str>) -> Result<Vec<DeviceView>, CliError> {
    let hosts = match host {
        Some(h) => vec![h.to_owned()],
        None => repo.hosts()?,
    };
    let mut views = Vec::new();
    for host in &hosts {
        for name in repo.list_devices(host)? {
            let device = Device::load(repo, host, &name)?;
            views.push(DeviceView::from(&device));
        }
    }
    Ok(views)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: DevicesArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let repo = config::open_repository(cfg);

    match args.command {
        DevicesCommand::List { host } => {
            let views = load_views(&repo, host.as_deref())?;
            let out = output::render_list(
                &global.output,
                &views,
                |v| DeviceRow::from(v),
                |v| format!("{}/{}", v.host, v.name),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Show {
            host,
            device,
            render,
        } => {
            let device = Device::load(&repo, &host, &device)?;
            if render {
                // wg-quick text regardless of --output
                output::print_output(device.render_config().trim_end(), global.quiet);
                return Ok(());
            }
            let view = DeviceView::from(&device);
            let out = output::render_single(&global.output, &view, detail, |v| {
                format!("{}/{}", v.host, v.name)
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::ResetCursor { host, device } => {
            let mut device = Device::load(&repo, &host, &device)?;
            let prompt = format!(
                "Rewind the address cursor of {host}/{}? Addresses freed by removed clients will be handed out again.",
                device.name()
            );
            if !util::confirm(&prompt, "reset-cursor", global.yes)? {
                return Ok(());
            }

            let cursor = device.reset_cursor();
            repo.save_device(&device.to_record())?;

            let cursor = cursor.map_or_else(|| "unset".into(), |a| a.to_string());
            output::print_output(
                &format!("Cursor of {host}/{} set to {cursor}", device.name()),
                global.quiet,
            );
            Ok(())
        }
    }
}
