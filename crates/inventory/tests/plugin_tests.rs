//! End-to-end tests of the inventory source against a mock Hetzner Cloud API.

use std::path::Path;

use hcloud::ClientError;
use hcloud_inventory::{
    Inventory, InventoryCache, InventoryConfig, InventoryData, InventoryError, InventoryPlugin,
    InventoryServer, MemoryCache,
};
use serde_json::{json, Value};
use serial_test::serial;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Mock API
// =============================================================================

fn server_json(id: i64, name: &str, location: &str, ipv4: Option<&str>, networks: &[i64]) -> Value {
    let private_net: Vec<Value> = networks
        .iter()
        .map(|network| json!({"network": network, "ip": format!("10.0.0.{id}"), "alias_ips": []}))
        .collect();
    json!({
        "id": id,
        "name": name,
        "status": "running",
        "labels": {"env": "prod", "role": name.split('-').next().unwrap_or_default()},
        "public_net": {
            "ipv4": ipv4.map(|ip| json!({"ip": ip, "blocked": false, "dns_ptr": format!("{name}.example.com")})),
            "ipv6": {"ip": "2001:db8::/64", "blocked": false, "dns_ptr": []}
        },
        "private_net": private_net,
        "server_type": {"id": 109, "name": "cpx22", "architecture": "x86"},
        "datacenter": {"id": 1, "name": format!("{location}-dc1"), "location": {"id": 1, "name": location}},
        "image": {"id": 114_690_387, "name": "debian-12", "os_flavor": "debian", "os_version": "12"}
    })
}

async fn mock_locations(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/locations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "locations": [{"id": 1, "name": "fsn1"}],
            "meta": {"pagination": {"page": 1, "per_page": 50, "next_page": null}}
        })))
        .mount(server)
        .await;
}

async fn mock_network(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/networks"))
        .and(query_param("name", "backend"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "networks": [{"id": 4711, "name": "backend", "ip_range": "10.0.0.0/16"}]
        })))
        .mount(server)
        .await;
}

async fn mock_servers(server: &MockServer, servers: Vec<Value>, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/servers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "servers": servers,
            "meta": {"pagination": {"page": 1, "per_page": 50, "next_page": null}}
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

fn plugin(server: &MockServer, yaml: &str) -> InventoryPlugin {
    let config = InventoryConfig::from_yaml(&format!(
        "plugin: hetzner.hcloud.hcloud\napi_token: test-token\napi_endpoint: {}\n{yaml}",
        server.uri()
    ))
    .unwrap();
    InventoryPlugin::new(config, "/etc/ansible/test.hcloud.yml")
}

fn cached_server(id: i64, name: &str) -> InventoryServer {
    serde_json::from_value(json!({
        "id": id,
        "name": name,
        "status": "off",
        "type": "cx22",
        "server_type": "cx22",
        "architecture": "x86",
        "datacenter": "fsn1-dc14",
        "location": "fsn1",
        "labels": {},
        "private_networks": []
    }))
    .unwrap()
}

fn hostvar<'a>(inventory: &'a InventoryData, host: &str, key: &str) -> Option<&'a Value> {
    inventory.host_vars(host).and_then(|vars| vars.get(key))
}

// =============================================================================
// Token and network validation
// =============================================================================

#[tokio::test]
async fn test_invalid_token_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/locations"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": "unauthorized", "message": "unable to authenticate"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = plugin(&server, "")
        .parse(&mut InventoryData::new(), &mut MemoryCache::default(), true)
        .await
        .unwrap_err();

    assert!(matches!(err, InventoryError::InvalidToken(_)));
    assert_eq!(err.to_string(), "Invalid Hetzner Cloud API Token.");
}

#[tokio::test]
async fn test_unknown_network_is_fatal() {
    let server = MockServer::start().await;
    mock_locations(&server).await;
    Mock::given(method("GET"))
        .and(path("/networks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"networks": []})))
        .mount(&server)
        .await;
    mock_servers(&server, vec![], 0).await;

    let err = plugin(&server, "network: missing")
        .parse(&mut InventoryData::new(), &mut MemoryCache::default(), true)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        InventoryError::Client(ClientError::ResourceNotFound { resource: "network", .. })
    ));
    assert_eq!(err.to_string(), "resource (network) does not exist: missing");
}

// =============================================================================
// Pipeline
// =============================================================================

#[tokio::test]
async fn test_parse_builds_hosts_and_groups() {
    let server = MockServer::start().await;
    mock_locations(&server).await;
    mock_network(&server).await;

    Mock::given(method("GET"))
        .and(path("/servers"))
        .and(query_param("label_selector", "env=prod"))
        .and(query_param("status", "running"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "servers": [
                server_json(1, "web-1", "fsn1", Some("203.0.113.1"), &[4711]),
                server_json(2, "web-2", "nbg1", Some("203.0.113.2"), &[4711]),
                server_json(3, "db-1", "fsn1", None, &[4711]),
                server_json(4, "other-1", "fsn1", Some("203.0.113.4"), &[]),
            ],
            "meta": {"pagination": {"page": 1, "per_page": 50, "next_page": null}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let plugin = plugin(
        &server,
        r#"
label_selector: env=prod
status: [running]
network: backend
locations: [fsn1]
groups:
  webservers: '(eq hcloud_labels.role "web")'
keyed_groups:
  - key: hcloud_labels.role
    prefix: role
  - key: hcloud_location
    prefix: location
    parent_group: locations
compose:
  public_host: hcloud_ipv4
"#,
    );
    let mut inventory = InventoryData::new();
    plugin
        .parse(&mut inventory, &mut MemoryCache::default(), true)
        .await
        .unwrap();

    assert_eq!(inventory.hosts().collect::<Vec<_>>(), vec!["db-1", "web-1"]);
    assert_eq!(
        inventory.group_hosts("hcloud"),
        Some(&["web-1".to_string(), "db-1".to_string()][..])
    );

    assert_eq!(hostvar(&inventory, "web-1", "ansible_host"), Some(&json!("203.0.113.1")));
    assert_eq!(hostvar(&inventory, "web-1", "hcloud_private_ipv4"), Some(&json!("10.0.0.1")));
    assert_eq!(hostvar(&inventory, "web-1", "hcloud_ipv6"), Some(&json!("2001:db8::1")));
    assert_eq!(
        hostvar(&inventory, "web-1", "hcloud_private_networks"),
        Some(&json!([{"id": 4711, "name": "backend", "ip": "10.0.0.1"}]))
    );
    assert_eq!(hostvar(&inventory, "web-1", "public_host"), Some(&json!("203.0.113.1")));

    // No public address: kept, without ansible_host
    assert_eq!(hostvar(&inventory, "db-1", "ansible_host"), None);
    assert_eq!(hostvar(&inventory, "db-1", "hcloud_name"), Some(&json!("db-1")));
    assert_eq!(hostvar(&inventory, "db-1", "public_host"), None);

    assert_eq!(inventory.group_hosts("webservers").map(<[String]>::len), Some(1));
    assert_eq!(inventory.group_hosts("role_db").map(<[String]>::len), Some(1));
    assert_eq!(inventory.group_hosts("location_fsn1").map(<[String]>::len), Some(2));
    assert_eq!(inventory.group_children("locations"), vec!["location_fsn1"]);

    let list = inventory.to_list_json();
    assert_eq!(list["_meta"]["hostvars"]["web-1"]["hcloud_location"], json!("fsn1"));
    assert_eq!(list["hcloud"]["hosts"], json!(["web-1", "db-1"]));
}

#[tokio::test]
async fn test_connect_with_private_ipv4_and_suffix() {
    let server = MockServer::start().await;
    mock_locations(&server).await;
    mock_network(&server).await;
    mock_servers(
        &server,
        vec![server_json(3, "db-1", "fsn1", None, &[4711])],
        1,
    )
    .await;

    let plugin = plugin(
        &server,
        "network: \"{{ net }}\"\nconnect_with: private_ipv4\nhostvars_prefix: \"\"\nhostvars_suffix: _hc\ngroup: cloud\nhostname: \"{{ name_hc }}.internal\"",
    )
    .with_extra_vars(json!({"net": "backend"}).as_object().cloned().unwrap_or_default());

    let mut inventory = InventoryData::new();
    plugin
        .parse(&mut inventory, &mut MemoryCache::default(), true)
        .await
        .unwrap();

    assert_eq!(inventory.hosts().collect::<Vec<_>>(), vec!["db-1.internal"]);
    assert_eq!(inventory.group_hosts("cloud").map(<[String]>::len), Some(1));
    assert_eq!(
        hostvar(&inventory, "db-1.internal", "ansible_host"),
        Some(&json!("10.0.0.3"))
    );
    assert_eq!(
        hostvar(&inventory, "db-1.internal", "status_hc"),
        Some(&json!("running"))
    );
}

#[tokio::test]
async fn test_hostname_with_undefined_variable_is_fatal() {
    let server = MockServer::start().await;
    mock_locations(&server).await;
    mock_servers(
        &server,
        vec![
            server_json(1, "web-1", "fsn1", Some("203.0.113.1"), &[]),
            server_json(2, "web-2", "fsn1", Some("203.0.113.2"), &[]),
        ],
        1,
    )
    .await;

    let plugin = plugin(&server, "hostname: \"{{ hcloud_nmae }}\"");
    let mut inventory = InventoryData::new();
    let err = plugin
        .parse(&mut inventory, &mut MemoryCache::default(), true)
        .await
        .unwrap_err();

    assert!(matches!(err, InventoryError::Template { .. }));
    assert!(inventory.host_vars("").is_none());
}

// =============================================================================
// Cache
// =============================================================================

#[tokio::test]
async fn test_cache_is_used_on_second_run() {
    let server = MockServer::start().await;
    mock_locations(&server).await;
    mock_servers(
        &server,
        vec![server_json(1, "web-1", "fsn1", Some("203.0.113.1"), &[])],
        1,
    )
    .await;

    let plugin = plugin(&server, "cache: true");
    let mut cache = MemoryCache::default();

    let mut first = InventoryData::new();
    plugin.parse(&mut first, &mut cache, true).await.unwrap();
    assert!(cache.contains(&plugin.cache_key()).unwrap());

    let mut second = InventoryData::new();
    plugin.parse(&mut second, &mut cache, true).await.unwrap();

    assert_eq!(first.to_list_json(), second.to_list_json());
}

#[tokio::test]
async fn test_valid_cache_entry_is_kept_when_api_changes() {
    let server = MockServer::start().await;
    mock_locations(&server).await;
    mock_servers(
        &server,
        vec![server_json(1, "web-1", "fsn1", Some("203.0.113.1"), &[])],
        0,
    )
    .await;

    let plugin = plugin(&server, "cache: true");
    let mut cache = MemoryCache::default();
    cache
        .set(&plugin.cache_key(), &[cached_server(9, "old")])
        .unwrap();

    let mut inventory = InventoryData::new();
    plugin.parse(&mut inventory, &mut cache, true).await.unwrap();

    assert_eq!(inventory.hosts().collect::<Vec<_>>(), vec!["old"]);
    let cached = cache.get(&plugin.cache_key()).unwrap().unwrap();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].name, "old");
}

#[tokio::test]
async fn test_refresh_bypasses_and_replaces_cache() {
    let server = MockServer::start().await;
    mock_locations(&server).await;
    mock_servers(
        &server,
        vec![server_json(1, "web-1", "fsn1", Some("203.0.113.1"), &[])],
        1,
    )
    .await;

    let plugin = plugin(&server, "cache: true");
    let mut cache = MemoryCache::default();
    let stale = cached_server(9, "gone");
    cache.set(&plugin.cache_key(), &[stale]).unwrap();

    let mut inventory = InventoryData::new();
    plugin.parse(&mut inventory, &mut cache, false).await.unwrap();

    assert_eq!(inventory.hosts().collect::<Vec<_>>(), vec!["web-1"]);
    let cached = cache.get(&plugin.cache_key()).unwrap().unwrap();
    assert_eq!(cached[0].name, "web-1");
}

#[tokio::test]
async fn test_json_file_cache_backend() {
    let server = MockServer::start().await;
    mock_locations(&server).await;
    mock_servers(
        &server,
        vec![server_json(1, "web-1", "fsn1", Some("203.0.113.1"), &[])],
        1,
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let plugin = plugin(
        &server,
        &format!("cache: true\ncache_connection: {}", dir.path().display()),
    );

    for _ in 0..2 {
        let mut cache = plugin.config().cache_backend();
        let mut inventory = InventoryData::new();
        plugin.parse(&mut inventory, cache.as_mut(), true).await.unwrap();
        assert_eq!(inventory.hosts().collect::<Vec<_>>(), vec!["web-1"]);
    }

    let file = dir
        .path()
        .join(format!("ansible_inventory_{}", plugin.cache_key()));
    assert!(file.is_file());
}

// =============================================================================
// Configuration file
// =============================================================================

#[tokio::test]
#[serial]
async fn test_from_file_uses_token_from_environment() {
    let server = MockServer::start().await;
    mock_locations(&server).await;
    mock_servers(&server, vec![], 1).await;

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("prod.hcloud.yml");
    std::fs::write(
        &source,
        format!("plugin: hetzner.hcloud.hcloud\napi_endpoint: {}\n", server.uri()),
    )
    .unwrap();

    std::env::set_var("HCLOUD_TOKEN", "env-token");
    let plugin = InventoryPlugin::from_file(&source);
    std::env::remove_var("HCLOUD_TOKEN");
    let plugin = plugin.unwrap();

    assert_eq!(plugin.config().api_token.as_deref(), Some("env-token"));

    let mut inventory = InventoryData::new();
    plugin
        .parse(&mut inventory, &mut MemoryCache::default(), true)
        .await
        .unwrap();
    assert!(inventory.has_group("hcloud"));

    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r
        .headers
        .get("authorization")
        .is_some_and(|v| v.as_bytes() == b"Bearer env-token")));
}

#[test]
#[serial]
fn test_from_file_rejects_other_file_names() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("inventory.yml");
    std::fs::write(&source, "plugin: hcloud").unwrap();

    assert!(matches!(
        InventoryPlugin::from_file(Path::new(&source)),
        Err(InventoryError::Config(_))
    ));
}
