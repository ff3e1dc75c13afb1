//! Backend selection through `create_directory`. No network access: the
//! remote backends are only constructed, the memory backend is exercised.

use lb_directory::create_directory;
use lb_domain::config::{DirectoryBackend, DirectoryConfig, ProviderSecrets};

fn secrets() -> ProviderSecrets {
    ProviderSecrets::from_lookup(|name| {
        let value = match name {
            "AUTH_DOMAIN" => "tenant.auth0.com",
            "DISCORD_WEBHOOK" => return None,
            _ => "value",
        };
        Some(value.to_string())
    })
    .unwrap()
}

#[tokio::test]
async fn memory_backend_shares_state_between_lookup_and_writer() {
    let cfg = DirectoryConfig {
        backend: DirectoryBackend::Memory,
        ..DirectoryConfig::default()
    };
    let dir = create_directory(&cfg, &secrets()).unwrap();
    assert_eq!(dir.writer.backend(), "memory");

    dir.writer.write("auth0|1", "555").await.unwrap();
    let rec = dir.lookup.find_by_external_id("555").await.unwrap().unwrap();
    assert_eq!(rec.id, "auth0|1");

    let by_id = dir.lookup.find_by_internal_id("auth0|1").await.unwrap().unwrap();
    assert_eq!(by_id.linked_external_id(), Some("555"));
}

#[test]
fn graphql_backend_writes_through_account_service() {
    let dir = create_directory(&DirectoryConfig::default(), &secrets()).unwrap();
    assert_eq!(dir.writer.backend(), "graphql");
}

#[test]
fn management_backend_writes_through_management_api() {
    let cfg = DirectoryConfig {
        backend: DirectoryBackend::Management,
        ..DirectoryConfig::default()
    };
    let dir = create_directory(&cfg, &secrets()).unwrap();
    assert_eq!(dir.writer.backend(), "management");
}
