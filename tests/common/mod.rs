//! Shared fixtures for integration tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use tls_gateway::config::loader::ConfigError;
use tls_gateway::config::schema::{
    CertificateConfig, ClusterConfig, DestinationConfig, GatewayConfig, HostConfig,
    ProxyRuleConfig,
};
use tls_gateway::config::store::ConfigStore;

/// In-memory configuration store with a switchable failure mode.
#[derive(Default)]
pub struct InMemoryConfigStore {
    doc: Mutex<Option<GatewayConfig>>,
    unreachable: AtomicBool,
}

impl InMemoryConfigStore {
    pub fn new(doc: Option<GatewayConfig>) -> Self {
        Self {
            doc: Mutex::new(doc),
            unreachable: AtomicBool::new(false),
        }
    }

    /// Make subsequent loads fail, simulating an unreachable store.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub async fn replace(&self, doc: GatewayConfig) {
        *self.doc.lock().await = Some(doc);
    }

    pub async fn snapshot(&self) -> Option<GatewayConfig> {
        self.doc.lock().await.clone()
    }

    pub async fn clear(&self) {
        *self.doc.lock().await = None;
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn load(&self) -> Result<Option<GatewayConfig>, ConfigError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ConfigError::Io(std::io::Error::other("store unreachable")));
        }
        Ok(self.doc.lock().await.clone())
    }

    async fn save(&self, config: &GatewayConfig) -> Result<(), ConfigError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(ConfigError::Io(std::io::Error::other("store unreachable")));
        }
        *self.doc.lock().await = Some(config.clone());
        Ok(())
    }
}

/// A host with a valid self-signed certificate source.
pub fn self_signed_host(name: &str, host_name: &str) -> HostConfig {
    HostConfig {
        name: name.to_string(),
        host_names: vec![host_name.to_string()],
        certificate: Some(CertificateConfig::SelfSigned {
            subject_alternative_names: vec![],
        }),
    }
}

/// A host whose key vault descriptor is missing its secret names.
pub fn broken_key_vault_host(name: &str, host_name: &str) -> HostConfig {
    HostConfig {
        name: name.to_string(),
        host_names: vec![host_name.to_string()],
        certificate: Some(CertificateConfig::KeyVault {
            vault_uri: Some("https://kv.example".to_string()),
            certificate_secret: None,
            password_secret: None,
        }),
    }
}

/// A minimal proxy rule with one destination.
pub fn proxy_rule(name: &str, host: &str, address: &str) -> ProxyRuleConfig {
    ProxyRuleConfig {
        name: name.to_string(),
        hosts: vec![host.to_string()],
        path_prefix: None,
        strip_prefix: false,
        methods: vec![],
        cluster: ClusterConfig {
            name: format!("{}-cluster", name),
            load_balancing_policy: "round_robin".to_string(),
            health_check: None,
            http_request: None,
            transforms: vec![],
            destinations: vec![DestinationConfig {
                name: String::new(),
                address: address.parse().unwrap(),
                weight: None,
                metadata: None,
            }],
        },
    }
}
