#![allow(clippy::unwrap_used)]

mod common;

use std::net::Ipv4Addr;
use std::sync::Arc;

use wgctl_core::{
    ClientRepository, CoreError, DesiredClient, DesiredDevice, Device, DeviceRecord,
    DeviceRepository, Entity, HostRegistry, LifecycleAction, LocalRepository, NetworkDefaults,
    Reconciler,
};
use wgctl_exec::mock::FakeHost;

const CONFIG: &str = "/etc/wireguard/wg0.conf";

async fn run(
    repo: &LocalRepository,
    host: &Arc<FakeHost>,
    desired: &DesiredDevice,
) -> Result<wgctl_core::DeviceReport, CoreError> {
    let controller = common::controller(host);
    let defaults = NetworkDefaults::default();
    let mut registry = HostRegistry::load(repo, "vpn1")?;
    Reconciler::new(&controller, repo, &defaults)
        .reconcile(&mut registry, "wg0", desired)
        .await
}

fn systemctl_calls(host: &FakeHost) -> Vec<String> {
    host.history()
        .into_iter()
        .filter(|line| line.contains("systemctl"))
        .collect()
}

fn config_text(host: &FakeHost) -> String {
    String::from_utf8(host.file(CONFIG).unwrap().content).unwrap()
}

// ── End to end ──────────────────────────────────────────────────────

#[tokio::test]
async fn fresh_device_with_one_client() {
    let (_dir, repo) = common::repo();
    let host = Arc::new(FakeHost::new());

    let report = run(&repo, &host, &common::wg0(&["alice"])).await.unwrap();

    assert!(report.created);
    assert_eq!(report.address, Ipv4Addr::new(10, 5, 0, 1));
    assert_eq!(report.added, vec!["alice"]);
    assert!(report.removed.is_empty());
    assert_eq!(report.action, LifecycleAction::Enabled);

    let history = host.history();
    assert_eq!(history.iter().filter(|l| *l == "wg genkey").count(), 2);
    assert_eq!(history.iter().filter(|l| *l == "wg genpsk").count(), 1);

    let alice = repo.find_client("vpn1", "wg0", "alice").unwrap();
    let address: Ipv4Addr = alice.address.parse().unwrap();
    assert!("10.5.0.0/16".parse::<ipnet::Ipv4Net>().unwrap().contains(&address));
    assert_ne!(address, Ipv4Addr::new(10, 5, 0, 1));

    let config = config_text(&host);
    assert_eq!(config.matches("[Peer]").count(), 1);
    assert!(config.contains("# alice"));
    assert_eq!(host.file(CONFIG).unwrap().mode.as_deref(), Some("600"));

    assert_eq!(
        systemctl_calls(&host),
        vec![
            "sudo systemctl is-enabled wg-quick@wg0",
            "sudo systemctl enable --now wg-quick@wg0",
        ]
    );
}

#[tokio::test]
async fn load_restores_client_addresses() {
    let (_dir, repo) = common::repo();
    let host = Arc::new(FakeHost::new());
    run(&repo, &host, &common::wg0(&["alice", "bob"])).await.unwrap();

    let device = Device::load(&repo, "vpn1", "wg0").unwrap();
    assert_eq!(device.client("alice").unwrap().address(), Ipv4Addr::new(10, 5, 0, 2));
    assert_eq!(device.client("bob").unwrap().address(), Ipv4Addr::new(10, 5, 0, 3));
    assert_eq!(device.last_address(), Some(Ipv4Addr::new(10, 5, 0, 3)));
}

#[tokio::test]
async fn loading_unknown_device_is_not_found() {
    let (_dir, repo) = common::repo();
    assert!(Device::load(&repo, "vpn1", "wg9").unwrap_err().is_not_found());
}

// ── Idempotence and key stability ───────────────────────────────────

#[tokio::test]
async fn second_run_changes_nothing_but_restarts() {
    let (_dir, repo) = common::repo();
    let host = Arc::new(FakeHost::new());
    let desired = common::wg0(&["alice", "bob"]);

    run(&repo, &host, &desired).await.unwrap();
    let device_before = repo.find_device("vpn1", "wg0").unwrap();
    let alice_before = repo.find_client("vpn1", "wg0", "alice").unwrap();
    let head_before = Device::load(&repo, "vpn1", "wg0").unwrap().render_head();
    let config_before = config_text(&host);

    host.clear_history();
    let report = run(&repo, &host, &desired).await.unwrap();

    assert!(!report.created);
    assert!(report.added.is_empty() && report.updated.is_empty() && report.removed.is_empty());
    assert_eq!(report.action, LifecycleAction::Restarted);
    assert!(!host.history().iter().any(|line| line.starts_with("wg ")));

    assert_eq!(repo.find_device("vpn1", "wg0").unwrap(), device_before);
    assert_eq!(repo.find_client("vpn1", "wg0", "alice").unwrap(), alice_before);
    assert_eq!(Device::load(&repo, "vpn1", "wg0").unwrap().render_head(), head_before);
    assert_eq!(config_text(&host), config_before);
}

#[tokio::test]
async fn explicit_private_key_replaces_device_keys() {
    let (_dir, repo) = common::repo();
    let host = Arc::new(FakeHost::new());
    run(&repo, &host, &common::wg0(&[])).await.unwrap();

    let desired = DesiredDevice {
        private_key: "operator-key".into(),
        ..common::wg0(&[])
    };
    let report = run(&repo, &host, &desired).await.unwrap();

    assert_eq!(report.public_key, "public-of-operator-key");
    let record = repo.find_device("vpn1", "wg0").unwrap();
    assert_eq!(record.private_key, "operator-key");
}

// ── Membership ──────────────────────────────────────────────────────

#[tokio::test]
async fn omitted_clients_are_deleted() {
    let (_dir, repo) = common::repo();
    let host = Arc::new(FakeHost::new());
    run(&repo, &host, &common::wg0(&["a", "b", "c"])).await.unwrap();
    let a = repo.find_client("vpn1", "wg0", "a").unwrap();
    let c = repo.find_client("vpn1", "wg0", "c").unwrap();

    let report = run(&repo, &host, &common::wg0(&["a", "c"])).await.unwrap();

    assert_eq!(report.removed, vec!["b"]);
    assert_eq!(repo.list_clients("vpn1", "wg0").unwrap(), vec!["a", "c"]);
    assert_eq!(repo.find_client("vpn1", "wg0", "a").unwrap(), a);
    assert_eq!(repo.find_client("vpn1", "wg0", "c").unwrap(), c);
    let config = config_text(&host);
    assert!(!config.contains("# b"));
    assert_eq!(config.matches("[Peer]").count(), 2);
}

#[tokio::test]
async fn peers_render_in_name_order() {
    let (_dir, repo) = common::repo();
    let host = Arc::new(FakeHost::new());
    run(&repo, &host, &common::wg0(&["zoe", "adam", "mia"])).await.unwrap();

    let config = config_text(&host);
    let adam = config.find("# adam").unwrap();
    let mia = config.find("# mia").unwrap();
    let zoe = config.find("# zoe").unwrap();
    assert!(adam < mia && mia < zoe);
}

#[tokio::test]
async fn existing_client_picks_up_new_routes() {
    let (_dir, repo) = common::repo();
    let host = Arc::new(FakeHost::new());
    run(&repo, &host, &common::wg0(&["alice"])).await.unwrap();
    let keys_before = repo.find_client("vpn1", "wg0", "alice").unwrap();

    let mut desired = common::wg0(&[]);
    desired.users.push(DesiredClient {
        name: "alice".into(),
        address: String::new(),
        allowed_ips: vec!["10.5.0.2/32".into(), "192.168.10.0/24".into()],
    });
    let report = run(&repo, &host, &desired).await.unwrap();

    assert_eq!(report.updated, vec!["alice"]);
    let record = repo.find_client("vpn1", "wg0", "alice").unwrap();
    assert_eq!(record.allowed_ips, vec!["10.5.0.2/32", "192.168.10.0/24"]);
    assert_eq!(record.preshared_key, keys_before.preshared_key);
    assert!(config_text(&host).contains("AllowedIPs = 10.5.0.2/32, 192.168.10.0/24"));
}

// ── Addresses ───────────────────────────────────────────────────────

#[tokio::test]
async fn allocated_addresses_are_unique() {
    let (_dir, repo) = common::repo();
    let host = Arc::new(FakeHost::new());
    let names: Vec<String> = (0..20).map(|i| format!("peer{i:02}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();

    run(&repo, &host, &common::wg0(&refs)).await.unwrap();

    let device = Device::load(&repo, "vpn1", "wg0").unwrap();
    let mut seen = std::collections::HashSet::new();
    for client in device.clients() {
        assert!(device.network().contains(&client.address()));
        assert_ne!(client.address(), device.address());
        assert!(seen.insert(client.address()));
    }
    assert_eq!(seen.len(), 20);
}

#[tokio::test]
async fn supplied_address_must_be_free() {
    let (_dir, repo) = common::repo();
    let host = Arc::new(FakeHost::new());
    let mut desired = common::wg0(&["alice"]);
    desired.users.push(DesiredClient {
        name: "bob".into(),
        address: "10.5.0.2".into(),
        allowed_ips: Vec::new(),
    });

    let err = run(&repo, &host, &desired).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
    assert!(repo.find_client("vpn1", "wg0", "bob").unwrap_err().is_not_found());
}

#[tokio::test]
async fn requested_address_is_not_allocated_to_an_earlier_client() {
    let (_dir, repo) = common::repo();
    let host = Arc::new(FakeHost::new());
    let mut desired = common::wg0(&["alice"]);
    desired.users.push(DesiredClient {
        name: "bob".into(),
        address: "10.5.0.2".into(),
        allowed_ips: Vec::new(),
    });

    let report = run(&repo, &host, &desired).await.unwrap();
    assert_eq!(report.added, vec!["alice", "bob"]);
    assert_eq!(repo.find_client("vpn1", "wg0", "alice").unwrap().address, "10.5.0.3");
    assert_eq!(repo.find_client("vpn1", "wg0", "bob").unwrap().address, "10.5.0.2");

    let again = run(&repo, &host, &desired).await.unwrap();
    assert!(again.added.is_empty() && again.updated.is_empty() && again.removed.is_empty());
}

#[tokio::test]
async fn supplied_address_outside_subnet_is_rejected() {
    let (_dir, repo) = common::repo();
    let host = Arc::new(FakeHost::new());
    let mut desired = common::wg0(&[]);
    desired.users.push(DesiredClient {
        name: "carol".into(),
        address: "192.168.1.5".into(),
        allowed_ips: Vec::new(),
    });

    let err = run(&repo, &host, &desired).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn cursor_at_254_carries_into_next_octet() {
    let (_dir, repo) = common::repo();
    repo.save_device(&DeviceRecord {
        host: "vpn1".into(),
        name: "wg0".into(),
        listen_port: 51820,
        address: "10.5.0.1".into(),
        network: "10.5.0.0".into(),
        netmask: 16,
        private_key: "stored-key".into(),
        public_key: "stored-pub".into(),
        last_address: "10.5.0.254".into(),
        dns: None,
        post_up: None,
        pre_down: None,
    })
    .unwrap();
    let host = Arc::new(FakeHost::new().with_unit("wg-quick@wg0", true, true));

    run(&repo, &host, &common::wg0(&["alice"])).await.unwrap();

    let alice = repo.find_client("vpn1", "wg0", "alice").unwrap();
    assert_eq!(alice.address, "10.5.1.1");
    let device = repo.find_device("vpn1", "wg0").unwrap();
    assert_eq!(device.last_address, "10.5.1.1");
    assert_eq!(device.private_key, "stored-key");
}

#[tokio::test]
async fn exhausted_subnet_fails_after_earlier_clients_persist() {
    let (_dir, repo) = common::repo();
    let host = Arc::new(FakeHost::new());
    let desired = DesiredDevice {
        address: "10.9.0.1".into(),
        network: "10.9.0.0".into(),
        netmask: 30,
        users: vec![DesiredClient::new("a"), DesiredClient::new("b")],
        ..DesiredDevice::default()
    };

    let err = run(&repo, &host, &desired).await.unwrap_err();

    assert!(matches!(err, CoreError::AddressExhausted { .. }));
    assert_eq!(repo.find_client("vpn1", "wg0", "a").unwrap().address, "10.9.0.2");
    assert!(host.file(CONFIG).is_none());
    assert!(systemctl_calls(&host).is_empty());
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn enabled_but_stopped_unit_is_only_started() {
    let (_dir, repo) = common::repo();
    let host = Arc::new(FakeHost::new().with_unit("wg-quick@wg0", true, false));

    let report = run(&repo, &host, &common::wg0(&[])).await.unwrap();

    assert_eq!(report.action, LifecycleAction::Started);
    assert_eq!(
        systemctl_calls(&host),
        vec![
            "sudo systemctl is-enabled wg-quick@wg0",
            "sudo systemctl is-active wg-quick@wg0",
            "sudo systemctl start wg-quick@wg0",
        ]
    );
}

#[tokio::test]
async fn running_unit_is_only_restarted() {
    let (_dir, repo) = common::repo();
    let host = Arc::new(FakeHost::new().with_unit("wg-quick@wg0", true, true));

    run(&repo, &host, &common::wg0(&[])).await.unwrap();

    let calls = systemctl_calls(&host);
    assert_eq!(calls.last().unwrap(), "sudo systemctl restart wg-quick@wg0");
    assert!(!calls.iter().any(|c| c.contains("enable --now") || c.contains(" start ")));
}

// ── Failure policy ──────────────────────────────────────────────────

#[tokio::test]
async fn failed_config_push_stops_before_unit_changes() {
    let (_dir, repo) = common::repo();
    let host = Arc::new(FakeHost::new().fail_on("tee", "tee: Permission denied"));

    let err = run(&repo, &host, &common::wg0(&["alice"])).await.unwrap_err();

    match &err {
        CoreError::Execution { command, output } => {
            assert_eq!(command, "sudo tee /etc/wireguard/wg0.conf");
            assert_eq!(output, "tee: Permission denied");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(repo.find_device("vpn1", "wg0").is_ok());
    assert!(systemctl_calls(&host).is_empty());

    host.clear_failures();
    let report = run(&repo, &host, &common::wg0(&["alice"])).await.unwrap();
    assert!(!report.created);
    assert!(report.added.is_empty());
    assert_eq!(report.action, LifecycleAction::Enabled);
}

#[tokio::test]
async fn invalid_device_name_is_rejected_before_any_command() {
    let (_dir, repo) = common::repo();
    let host = Arc::new(FakeHost::new());
    let controller = common::controller(&host);
    let defaults = NetworkDefaults::default();
    let mut registry = HostRegistry::load(&repo, "vpn1").unwrap();

    let err = Reconciler::new(&controller, &repo, &defaults)
        .reconcile(&mut registry, "../../etc", &common::wg0(&[]))
        .await
        .unwrap_err();

    assert!(matches!(err, CoreError::Validation { .. }));
    assert!(host.history().is_empty());
    assert!(registry.get("../../etc").is_none());
    assert!(registry.devices().all(|d| d.name() != "../../etc"));
}
