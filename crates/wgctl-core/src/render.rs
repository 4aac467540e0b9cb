// ── Config rendering ──
//
// wg-quick INI text for a device and for the peer side of each client.
// Output depends only on the entities, so identical state renders
// byte-identical text.

use std::fmt::{self, Write};
use std::net::Ipv6Addr;

use crate::model::{Client, Device, Entity};

/// Write the device `[Interface]` block.
pub fn write_head<W: Write>(out: &mut W, device: &Device) -> fmt::Result {
    writeln!(out, "[Interface]")?;
    writeln!(out, "Address = {}/{}", device.address(), device.network().prefix_len())?;
    writeln!(out, "ListenPort = {}", device.listen_port())?;
    writeln!(out, "PrivateKey = {}", device.keys().private_key)?;
    writeln!(out, "DNS = {}", device.dns())?;
    if let Some(post_up) = device.post_up() {
        writeln!(out, "PostUp = {post_up}")?;
    }
    if let Some(pre_down) = device.pre_down() {
        writeln!(out, "PreDown = {pre_down}")?;
    }
    Ok(())
}

/// Write one `[Peer]` block for `client`, preceded by a blank line.
pub fn write_peer<W: Write>(out: &mut W, client: &Client) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "[Peer]")?;
    writeln!(out, "# {}", client.name())?;
    writeln!(out, "PublicKey = {}", client.public_key())?;
    writeln!(out, "PresharedKey = {}", client.preshared_key())?;
    writeln!(out, "AllowedIPs = {}", client.allowed_ips().join(", "))
}

/// Head block, then one peer block per client in name order.
pub fn write_device_config<W: Write>(out: &mut W, device: &Device) -> fmt::Result {
    write_head(out, device)?;
    for client in device.clients() {
        write_peer(out, client)?;
    }
    Ok(())
}

/// The config a client imports to reach `device` at `endpoint`.
pub fn write_client_config<W: Write>(
    out: &mut W,
    device: &Device,
    client: &Client,
    endpoint: &str,
) -> fmt::Result {
    writeln!(out, "[Interface]")?;
    writeln!(out, "Address = {}/32", client.address())?;
    writeln!(out, "PrivateKey = {}", client.keys().private_key)?;
    writeln!(out, "DNS = {}", device.dns())?;
    writeln!(out)?;
    writeln!(out, "[Peer]")?;
    writeln!(out, "PublicKey = {}", device.public_key())?;
    writeln!(out, "PresharedKey = {}", client.preshared_key())?;
    writeln!(out, "AllowedIPs = {}", device.network())?;
    writeln!(out, "Endpoint = {}", endpoint_with_port(endpoint, device.listen_port()))
}

/// Append the listen port unless `endpoint` already names one.
pub fn endpoint_with_port(endpoint: &str, port: u16) -> String {
    if let Ok(v6) = endpoint.trim_matches(['[', ']']).parse::<Ipv6Addr>() {
        return format!("[{v6}]:{port}");
    }
    match endpoint.rsplit_once(':') {
        Some((_, p)) if p.parse::<u16>().is_ok() => endpoint.to_owned(),
        _ => format!("{endpoint}:{port}"),
    }
}
