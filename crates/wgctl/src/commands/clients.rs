//! Client command handlers.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tabled::Tabled;
use tracing::debug;
use wgctl_core::{Client, Device, Entity};

use crate::cli::{ClientsArgs, ClientsCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

use super::util;

// ── View ────────────────────────────────────────────────────────────

/// Public view of a client; keys other than the public one stay in the store.
#[derive(Serialize)]
struct ClientView {
    host: String,
    device: String,
    name: String,
    address: String,
    public_key: String,
    allowed_ips: Vec<String>,
}

impl From<&Client> for ClientView {
    fn from(c: &Client) -> Self {
        Self {
            host: c.device().host.clone(),
            device: c.device().device.clone(),
            name: c.name().to_owned(),
            address: c.address().to_string(),
            public_key: c.public_key().to_owned(),
            allowed_ips: c.allowed_ips().to_vec(),
        }
    }
}

#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Allowed IPs")]
    allowed_ips: String,
    #[tabled(rename = "Public Key")]
    public_key: String,
}

impl From<&ClientView> for ClientRow {
    fn from(v: &ClientView) -> Self {
        Self {
            name: v.name.clone(),
            address: v.address.clone(),
            allowed_ips: v.allowed_ips.join(", "),
            public_key: v.public_key.clone(),
        }
    }
}

fn detail(v: &ClientView) -> String {
    [
        format!("Client:      {}", v.name),
        format!("Device:      {}/{}", v.host, v.device),
        format!("Address:     {}", v.address),
        format!("Allowed IPs: {}", v.allowed_ips.join(", ")),
        format!("Public Key:  {}", v.public_key),
    ]
    .join("\n")
}

// ── Export ──────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ExportedFile {
    client: String,
    path: PathBuf,
}

#[derive(Tabled)]
struct ExportRow {
    #[tabled(rename = "Client")]
    client: String,
    #[tabled(rename = "File")]
    path: String,
}

/// `--endpoint`, else the host's manifest entry, else the host name itself.
fn resolve_endpoint(
    host: &str,
    endpoint: Option<String>,
    manifest: Option<PathBuf>,
    cfg: &Config,
) -> Result<String, CliError> {
    if let Some(endpoint) = endpoint {
        return Ok(endpoint);
    }
    let manifest = match manifest {
        // An explicit manifest must load
        Some(path) => Some(config::load_manifest(&path)?),
        None => match config::load_manifest(&cfg.manifest) {
            Ok(m) => Some(m),
            Err(e) => {
                debug!(error = %e, "no usable default manifest, endpoint falls back to host name");
                None
            }
        },
    };
    Ok(manifest
        .as_ref()
        .and_then(|m| m.hosts.get(host))
        .map_or_else(|| host.to_owned(), |h| h.endpoint(host).to_owned()))
}

fn export(
    device: &Device,
    selected: &[String],
    dir: &Path,
    endpoint: &str,
) -> Result<Vec<ExportedFile>, CliError> {
    let names = if selected.is_empty() {
        device.client_names()
    } else {
        selected.to_vec()
    };
    // Render everything before touching the filesystem
    let mut rendered = Vec::with_capacity(names.len());
    for name in names {
        let text = device.client_config(&name, endpoint)?;
        rendered.push((name, text));
    }

    config::create_private_dir(dir)?;
    let mut written = Vec::with_capacity(rendered.len());
    for (name, text) in rendered {
        let path = dir.join(format!("{name}.conf"));
        util::write_private_file(&path, &text)?;
        debug!(client = %name, path = %path.display(), "wrote client config");
        written.push(ExportedFile { client: name, path });
    }
    Ok(written)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ClientsArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let repo = config::open_repository(cfg);

    match args.command {
        ClientsCommand::List { host, device } => {
            let device = Device::load(&repo, &host, &device)?;
            let views: Vec<ClientView> = device.clients().map(ClientView::from).collect();
            let out = output::render_list(
                &global.output,
                &views,
                |v| ClientRow::from(v),
                |v| v.name.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ClientsCommand::Show {
            host,
            device,
            client,
        } => {
            let device = Device::load(&repo, &host, &device)?;
            let client = device.client(&client).ok_or_else(|| CliError::NotFound {
                resource_type: "client".into(),
                identifier: format!("{host}/{}/{client}", device.name()),
                list_command: format!("clients list {host} {}", device.name()),
            })?;
            let view = ClientView::from(client);
            let out = output::render_single(&global.output, &view, detail, |v| v.name.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ClientsCommand::Export {
            host,
            device,
            clients,
            dir,
            endpoint,
            manifest,
        } => {
            let device = Device::load(&repo, &host, &device)?;
            if let Some(missing) = clients.iter().find(|c| device.client(c).is_none()) {
                return Err(CliError::NotFound {
                    resource_type: "client".into(),
                    identifier: format!("{host}/{}/{missing}", device.name()),
                    list_command: format!("clients list {host} {}", device.name()),
                });
            }
            let endpoint = resolve_endpoint(&host, endpoint, manifest, cfg)?;
            let written = export(&device, &clients, &dir, &endpoint)?;

            let out = output::render_list(
                &global.output,
                &written,
                |f| ExportRow {
                    client: f.client.clone(),
                    path: f.path.display().to_string(),
                },
                |f| f.path.display().to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
