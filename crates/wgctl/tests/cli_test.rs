//! Integration tests for the `wgctl` CLI binary.
//!
//! These tests cover argument parsing, help output, shell completions,
//! the config subcommands, and the read-only store commands. None of them
//! reach a remote host.
#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `wgctl` binary with env isolation.
///
/// Clears all `WGCTL_*` env vars and points config and data directories
/// into `root` so tests never touch the user's real configuration.
fn wgctl_cmd(root: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("wgctl");
    cmd.current_dir(root)
        .env("HOME", root)
        .env("XDG_CONFIG_HOME", root.join("config"))
        .env("XDG_DATA_HOME", root.join("data"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("WGCTL_CONFIG")
        .env_remove("WGCTL_DATA_DIR")
        .env_remove("WGCTL_OUTPUT")
        .env_remove("WGCTL_TIMEOUT")
        .env_remove("WGCTL_MANIFEST");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Seed a store with device `vpn1/wg0` serving `alice` and `bob`.
fn seed_store(store: &Path) {
    let devices = store.join("devices").join("vpn1");
    let clients = store.join("clients").join("vpn1").join("wg0");
    fs::create_dir_all(&devices).unwrap();
    fs::create_dir_all(&clients).unwrap();

    fs::write(
        devices.join("wg0.json"),
        r#"{
            "host": "vpn1", "name": "wg0", "listen_port": 51820,
            "address": "10.5.0.1", "network": "10.5.0.0", "netmask": 16,
            "private_key": "dev-private", "public_key": "dev-public",
            "last_address": "10.5.0.3"
        }"#,
    )
    .unwrap();
    for (name, octet) in [("alice", 2), ("bob", 3)] {
        fs::write(
            clients.join(format!("{name}.json")),
            format!(
                r#"{{
                    "name": "{name}", "address": "10.5.0.{octet}",
                    "private_key": "{name}-private", "public_key": "{name}-public",
                    "preshared_key": "{name}-psk"
                }}"#
            ),
        )
        .unwrap();
    }
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let root = tempfile::tempdir().unwrap();
    let output = wgctl_cmd(root.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let root = tempfile::tempdir().unwrap();
    wgctl_cmd(root.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("WireGuard")
            .and(predicate::str::contains("apply"))
            .and(predicate::str::contains("devices"))
            .and(predicate::str::contains("clients")),
    );
}

#[test]
fn test_version_flag() {
    let root = tempfile::tempdir().unwrap();
    wgctl_cmd(root.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("wgctl"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    let root = tempfile::tempdir().unwrap();
    wgctl_cmd(root.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    let root = tempfile::tempdir().unwrap();
    wgctl_cmd(root.path())
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let root = tempfile::tempdir().unwrap();
    let output = wgctl_cmd(root.path()).arg("foobar").output().unwrap();
    assert!(!output.status.success(), "Expected failure for invalid subcommand");
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_invalid_output_format() {
    let root = tempfile::tempdir().unwrap();
    let output = wgctl_cmd(root.path())
        .args(["--output", "invalid", "devices", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_apply_missing_manifest_is_usage_error() {
    let root = tempfile::tempdir().unwrap();
    let output = wgctl_cmd(root.path())
        .args(["apply", "--manifest"])
        .arg(root.path().join("absent.yaml"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("absent.yaml"));
}

#[test]
fn test_apply_unknown_host_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let manifest = root.path().join("wgctl.yaml");
    fs::write(&manifest, "hosts:\n  vpn1:\n    devices: {}\n").unwrap();
    let output = wgctl_cmd(root.path())
        .args(["apply", "--host", "vpn9", "--manifest"])
        .arg(&manifest)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("vpn9"));
}

#[test]
fn test_apply_empty_manifest_does_nothing() {
    let root = tempfile::tempdir().unwrap();
    let manifest = root.path().join("wgctl.yaml");
    fs::write(&manifest, "hosts: {}\n").unwrap();
    wgctl_cmd(root.path())
        .args(["apply", "--manifest"])
        .arg(&manifest)
        .assert()
        .success();
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_respects_flag() {
    let root = tempfile::tempdir().unwrap();
    let path = root.path().join("custom.toml");
    wgctl_cmd(root.path())
        .arg("--config")
        .arg(&path)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("custom.toml"));
}

#[test]
fn test_config_init_then_refuses_overwrite() {
    let root = tempfile::tempdir().unwrap();
    let path = root.path().join("config.toml");

    wgctl_cmd(root.path())
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(fs::read_to_string(&path).unwrap().contains("listen_port = 51820"));

    let output = wgctl_cmd(root.path())
        .arg("--config")
        .arg(&path)
        .args(["config", "init"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(6));

    wgctl_cmd(root.path())
        .arg("--config")
        .arg(&path)
        .args(["config", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn test_config_show_applies_overrides() {
    let root = tempfile::tempdir().unwrap();
    let path = root.path().join("config.toml");
    fs::write(&path, "timeout = 30\n[network]\nlisten_port = 51900\n").unwrap();

    wgctl_cmd(root.path())
        .arg("--config")
        .arg(&path)
        .args(["--timeout", "5", "config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("timeout = 5")
                .and(predicate::str::contains("listen_port = 51900"))
                .and(predicate::str::contains("data_dir")),
        );
}

// ── Store commands ──────────────────────────────────────────────────

#[test]
fn test_devices_list_empty_store() {
    let root = tempfile::tempdir().unwrap();
    wgctl_cmd(root.path())
        .arg("--data-dir")
        .arg(root.path().join("store"))
        .args(["-o", "plain", "devices", "list"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_devices_list_seeded_store() {
    let root = tempfile::tempdir().unwrap();
    let store = root.path().join("store");
    seed_store(&store);
    wgctl_cmd(root.path())
        .arg("--data-dir")
        .arg(&store)
        .args(["-o", "plain", "devices", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vpn1/wg0"));
}

#[test]
fn test_devices_show_missing_is_not_found() {
    let root = tempfile::tempdir().unwrap();
    let output = wgctl_cmd(root.path())
        .arg("--data-dir")
        .arg(root.path().join("store"))
        .args(["devices", "show", "vpn1", "wg9"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("devices list"));
}

#[test]
fn test_devices_show_json_hides_private_key() {
    let root = tempfile::tempdir().unwrap();
    let store = root.path().join("store");
    seed_store(&store);
    let output = wgctl_cmd(root.path())
        .arg("--data-dir")
        .arg(&store)
        .args(["-o", "json", "devices", "show", "vpn1", "wg0"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["public_key"], "dev-public");
    assert_eq!(json["clients"], serde_json::json!(["alice", "bob"]));
    assert!(!String::from_utf8_lossy(&output.stdout).contains("dev-private"));
}

#[test]
fn test_devices_show_render_prints_peers() {
    let root = tempfile::tempdir().unwrap();
    let store = root.path().join("store");
    seed_store(&store);
    wgctl_cmd(root.path())
        .arg("--data-dir")
        .arg(&store)
        .args(["devices", "show", "vpn1", "wg0", "--render"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("[Interface]")
                .and(predicate::str::contains("PrivateKey = dev-private"))
                .and(predicate::str::contains("# alice"))
                .and(predicate::str::contains("AllowedIPs = 10.5.0.3/32")),
        );
}

#[test]
fn test_reset_cursor_requires_yes_without_terminal() {
    let root = tempfile::tempdir().unwrap();
    let store = root.path().join("store");
    seed_store(&store);
    let output = wgctl_cmd(root.path())
        .arg("--data-dir")
        .arg(&store)
        .args(["devices", "reset-cursor", "vpn1", "wg0"])
        .write_stdin("")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("--yes"));
}

#[test]
fn test_clients_list_plain() {
    let root = tempfile::tempdir().unwrap();
    let store = root.path().join("store");
    seed_store(&store);
    wgctl_cmd(root.path())
        .arg("--data-dir")
        .arg(&store)
        .args(["-o", "plain", "clients", "list", "vpn1", "wg0"])
        .assert()
        .success()
        .stdout("alice\nbob\n");
}

#[cfg(unix)]
#[test]
fn test_clients_export_writes_private_files() {
    use std::os::unix::fs::PermissionsExt;

    let root = tempfile::tempdir().unwrap();
    let store = root.path().join("store");
    seed_store(&store);
    let out = root.path().join("out");

    wgctl_cmd(root.path())
        .arg("--data-dir")
        .arg(&store)
        .args(["clients", "export", "vpn1", "wg0", "-c", "alice", "-e", "vpn.example.net"])
        .arg("--dir")
        .arg(&out)
        .assert()
        .success();

    let path = out.join("alice.conf");
    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("PrivateKey = alice-private"));
    assert!(text.contains("PublicKey = dev-public"));
    assert!(text.contains("Endpoint = vpn.example.net:51820"));
    assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o600);
    assert!(!out.join("bob.conf").exists());
}

#[test]
fn test_clients_export_unknown_client_writes_nothing() {
    let root = tempfile::tempdir().unwrap();
    let store = root.path().join("store");
    seed_store(&store);
    let out = root.path().join("out");

    let output = wgctl_cmd(root.path())
        .arg("--data-dir")
        .arg(&store)
        .args(["clients", "export", "vpn1", "wg0", "-c", "carol"])
        .arg("--dir")
        .arg(&out)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(!out.exists());
}
