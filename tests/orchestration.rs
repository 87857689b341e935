//! Orchestration tests: startup defaults, reload semantics and failure
//! isolation across the control plane.

use std::sync::Arc;

use tls_gateway::certs::{CertificateCache, CertificateLoader, StaticSecrets};
use tls_gateway::config::schema::{CertificateConfig, GatewayConfig};
use tls_gateway::orchestrator::{Orchestrator, DEFAULT_HOST, DEFAULT_SNI_NAME};
use tls_gateway::routing::RouteTableProvider;

mod common;

use common::{broken_key_vault_host, proxy_rule, self_signed_host, InMemoryConfigStore};

struct Harness {
    store: Arc<InMemoryConfigStore>,
    cache: Arc<CertificateCache>,
    provider: Arc<RouteTableProvider>,
    orchestrator: Orchestrator,
}

fn harness(doc: Option<GatewayConfig>) -> Harness {
    let store = Arc::new(InMemoryConfigStore::new(doc));
    let cache = Arc::new(CertificateCache::new());
    let provider = Arc::new(RouteTableProvider::new());
    let loader = CertificateLoader::new(Arc::new(StaticSecrets::default()));
    let orchestrator = Orchestrator::new(
        store.clone(),
        loader,
        cache.clone(),
        provider.clone(),
    );
    Harness {
        store,
        cache,
        provider,
        orchestrator,
    }
}

#[tokio::test]
async fn startup_guarantees_default_host_and_certificate() {
    let h = harness(None);
    h.orchestrator.start().await.unwrap();

    let doc = h.store.snapshot().await.expect("document created");
    assert!(doc.hosts.iter().any(|host| host.name == DEFAULT_HOST));
    assert!(h.cache.get(DEFAULT_SNI_NAME).is_some());
}

#[tokio::test]
async fn per_host_failure_does_not_abort_remaining_hosts() {
    let doc = GatewayConfig {
        hosts: vec![
            self_signed_host("a", "a.test"),
            broken_key_vault_host("b", "b.test"),
        ],
        proxy_rules: vec![proxy_rule("api", "a.test", "http://127.0.0.1:9000")],
    };
    let h = harness(Some(doc));
    h.orchestrator.start().await.unwrap();

    // Host A resolved, host B failed in isolation.
    assert!(h.cache.get("a.test").is_some());
    assert!(h.cache.get("b.test").is_none());

    // The failure did not block the publish either.
    let table = h.provider.current();
    assert_eq!(table.routes.len(), 1);
    assert!(table.clusters.contains_key("api-cluster"));
}

#[tokio::test]
async fn failed_reload_keeps_prior_state() {
    let doc = GatewayConfig {
        hosts: vec![self_signed_host("a", "a.test")],
        proxy_rules: vec![proxy_rule("api", "a.test", "http://127.0.0.1:9000")],
    };
    let h = harness(Some(doc));
    h.orchestrator.start().await.unwrap();

    let before = h.provider.current();
    assert_eq!(before.routes.len(), 1);

    h.store.set_unreachable(true);
    h.orchestrator.reload().await;

    // The working table and certificates survive the failed reload.
    let after = h.provider.current();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(!before.change_token.is_cancelled());
    assert!(h.cache.get("a.test").is_some());
}

#[tokio::test]
async fn reload_publishes_new_snapshot_and_signals_old_holders() {
    let doc = GatewayConfig {
        hosts: vec![self_signed_host("a", "a.test")],
        proxy_rules: vec![proxy_rule("api", "a.test", "http://127.0.0.1:9000")],
    };
    let h = harness(Some(doc.clone()));
    h.orchestrator.start().await.unwrap();
    let held = h.provider.current();

    let mut updated = doc;
    updated
        .proxy_rules
        .push(proxy_rule("admin", "a.test", "http://127.0.0.1:9001"));
    h.store.replace(updated).await;
    h.orchestrator.reload().await;

    assert!(held.change_token.is_cancelled());
    let table = h.provider.current();
    assert_eq!(table.routes.len(), 2);
    // The holder's old snapshot is still fully formed.
    assert_eq!(held.routes.len(), 1);
}

#[tokio::test]
async fn hostnames_configured_away_are_evicted() {
    let doc = GatewayConfig {
        hosts: vec![
            self_signed_host("a", "a.test"),
            self_signed_host("b", "b.test"),
        ],
        proxy_rules: vec![],
    };
    let h = harness(Some(doc.clone()));
    h.orchestrator.start().await.unwrap();
    assert!(h.cache.get("b.test").is_some());

    let mut updated = doc;
    updated.hosts.retain(|host| host.name != "b");
    h.store.replace(updated).await;
    h.orchestrator.reload().await;

    assert!(h.cache.get("a.test").is_some());
    assert!(h.cache.get("b.test").is_none());
    // The default identity is never evicted.
    assert!(h.cache.get(DEFAULT_SNI_NAME).is_some());
}

#[tokio::test]
async fn self_signed_identity_is_reused_across_reloads() {
    let doc = GatewayConfig {
        hosts: vec![self_signed_host("a", "a.test")],
        proxy_rules: vec![],
    };
    let h = harness(Some(doc));
    h.orchestrator.start().await.unwrap();

    let first = h.cache.get("a.test").expect("certificate cached");
    h.orchestrator.reload().await;
    let second = h.cache.get("a.test").expect("certificate still cached");

    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn edited_self_signed_descriptor_regenerates_certificate() {
    let doc = GatewayConfig {
        hosts: vec![self_signed_host("a", "a.test")],
        proxy_rules: vec![],
    };
    let h = harness(Some(doc.clone()));
    h.orchestrator.start().await.unwrap();
    let first = h.cache.get("a.test").expect("certificate cached");

    // The operator adds a subject alternative name.
    let mut updated = doc;
    updated.hosts[0].certificate = Some(CertificateConfig::SelfSigned {
        subject_alternative_names: vec!["b.test".to_string()],
    });
    h.store.replace(updated).await;
    h.orchestrator.reload().await;

    let second = h.cache.get("a.test").expect("certificate still cached");
    assert!(!Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn catch_up_reload_with_unchanged_document_is_safe() {
    let doc = GatewayConfig {
        hosts: vec![self_signed_host("a", "a.test")],
        proxy_rules: vec![proxy_rule("api", "a.test", "http://127.0.0.1:9000")],
    };
    let h = harness(Some(doc));
    h.orchestrator.start().await.unwrap();
    let cert = h.cache.get("a.test").expect("certificate cached");

    // Mirrors the extra reload run right after the watcher install.
    h.orchestrator.reload().await;

    let table = h.provider.current();
    assert_eq!(table.routes.len(), 1);
    assert!(Arc::ptr_eq(&cert, &h.cache.get("a.test").unwrap()));
}

#[tokio::test]
async fn absent_document_keeps_current_state() {
    let doc = GatewayConfig {
        hosts: vec![self_signed_host("a", "a.test")],
        proxy_rules: vec![proxy_rule("api", "a.test", "http://127.0.0.1:9000")],
    };
    let h = harness(Some(doc));
    h.orchestrator.start().await.unwrap();
    let before = h.provider.current();

    // The document disappears between reloads.
    h.store.clear().await;
    h.orchestrator.reload().await;

    let after = h.provider.current();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(h.cache.get("a.test").is_some());
}
