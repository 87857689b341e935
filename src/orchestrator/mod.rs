//! Configuration orchestration.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     ensure default host + self-signed certificate
//!     → initial reload
//!
//! On every change event from the store:
//!     store.load()
//!         absent/unreadable → log, keep prior state (fail-safe-stale)
//!         ok → per-host certificate population (failures isolated)
//!           → translate
//!           → publish snapshot
//! ```
//!
//! # Design Decisions
//! - One consumer task drains the change channel, so reloads are
//!   naturally serialized; direct callers go through the reload mutex
//! - A failed reload never clears a working table or cache entry
//! - One bad certificate source must not blind the gateway for healthy
//!   hosts

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, mpsc};

use crate::certs::cache::CertificateCache;
use crate::certs::source::CertificateLoader;
use crate::config::loader::ConfigError;
use crate::config::schema::{CertificateConfig, GatewayConfig, HostConfig};
use crate::config::store::ConfigStore;
use crate::routing::provider::RouteTableProvider;
use crate::routing::translator::translate;

/// Name of the host entry the orchestrator guarantees at startup.
pub const DEFAULT_HOST: &str = "default";

/// SNI name served by the default self-signed certificate.
pub const DEFAULT_SNI_NAME: &str = "localhost";

/// Drives the configuration store, certificate cache and routing table
/// provider through startup and reloads.
pub struct Orchestrator {
    store: Arc<dyn ConfigStore>,
    loader: CertificateLoader,
    cache: Arc<CertificateCache>,
    provider: Arc<RouteTableProvider>,
    /// Serializes reloads triggered outside the consumer loop.
    reload_lock: tokio::sync::Mutex<()>,
    /// Hostnames populated by the last reload, for eviction of names
    /// that were configured away.
    populated: Mutex<HashSet<String>>,
    /// The descriptor that produced each host's cached bundle; a
    /// reconfigured descriptor forces a fresh load.
    descriptors: Mutex<HashMap<String, CertificateConfig>>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        loader: CertificateLoader,
        cache: Arc<CertificateCache>,
        provider: Arc<RouteTableProvider>,
    ) -> Self {
        Self {
            store,
            loader,
            cache,
            provider,
            reload_lock: tokio::sync::Mutex::new(()),
            populated: Mutex::new(HashSet::new()),
            descriptors: Mutex::new(HashMap::new()),
        }
    }

    /// Startup: guarantee a default TLS identity and host entry, then
    /// run the initial reload.
    pub async fn start(&self) -> Result<(), ConfigError> {
        self.ensure_defaults().await?;
        self.reload().await;
        Ok(())
    }

    /// Consume change events until the channel closes or shutdown fires.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::UnboundedReceiver<()>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(()) => {
                        tracing::info!("Configuration change event received, reloading");
                        self.reload().await;
                    }
                    None => {
                        tracing::info!("Change channel closed, orchestrator exiting");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Orchestrator received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Load the document and republish routing and certificates.
    ///
    /// Never propagates an error: a failed load keeps the prior state,
    /// and per-host certificate failures skip only that host.
    pub async fn reload(&self) {
        let _guard = self.reload_lock.lock().await;

        let config = match self.store.load().await {
            Ok(Some(config)) => config,
            Ok(None) => {
                tracing::warn!("No configuration document; keeping current state");
                return;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration, keeping current state");
                return;
            }
        };

        self.populate_certificates(&config).await;

        let table = translate(&config);
        self.provider.publish(table);
    }

    /// Make sure a default host entry exists in the store and a default
    /// self-signed certificate is cached, before any user host is
    /// processed.
    async fn ensure_defaults(&self) -> Result<(), ConfigError> {
        match self.store.load().await {
            Ok(Some(config)) => {
                if !config.hosts.iter().any(|h| h.name == DEFAULT_HOST) {
                    let mut updated = config;
                    updated.hosts.insert(0, default_host());
                    self.store.save(&updated).await?;
                    tracing::info!("Default host added to configuration document");
                }
            }
            Ok(None) => {
                let config = GatewayConfig {
                    hosts: vec![default_host()],
                    proxy_rules: vec![],
                };
                self.store.save(&config).await?;
                tracing::info!("Configuration document created with default host");
            }
            Err(e) => {
                // Unreadable document: leave it alone, but still
                // guarantee a TLS identity below.
                tracing::error!(error = %e, "Configuration document unreadable at startup");
            }
        }

        if self.cache.get(DEFAULT_SNI_NAME).is_none() {
            let config = CertificateConfig::SelfSigned {
                subject_alternative_names: vec![],
            };
            match self.loader.load(&config, DEFAULT_SNI_NAME).await {
                Ok(bundle) => {
                    self.cache.set(DEFAULT_SNI_NAME, Arc::new(bundle));
                    self.record_descriptor(DEFAULT_HOST, &config);
                    tracing::info!(hostname = DEFAULT_SNI_NAME, "Default certificate provisioned");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to provision default certificate");
                }
            }
        }

        Ok(())
    }

    /// Resolve and cache the certificate for every configured host.
    ///
    /// Per-host failures are logged and skipped; a host that loaded
    /// successfully before keeps serving its previous bundle.
    async fn populate_certificates(&self, config: &GatewayConfig) {
        let mut current: HashSet<String> = HashSet::new();
        current.insert(DEFAULT_SNI_NAME.to_string());

        for host in &config.hosts {
            let Some(cert_config) = &host.certificate else {
                tracing::debug!(host = %host.name, "Host has no certificate source");
                continue;
            };
            let Some(hint) = host.host_names.first() else {
                tracing::warn!(host = %host.name, "Host has no host names, skipping");
                continue;
            };

            for name in &host.host_names {
                current.insert(name.to_ascii_lowercase());
            }

            // Reuse a live self-signed identity instead of regenerating
            // on every reload; regeneration would churn TLS sessions.
            // An edited descriptor wins over reuse.
            if matches!(cert_config, CertificateConfig::SelfSigned { .. })
                && host.host_names.iter().all(|n| self.cache.get(n).is_some())
                && self.descriptor_unchanged(&host.name, cert_config)
            {
                tracing::debug!(host = %host.name, "Self-signed identity still fresh, reusing");
                continue;
            }

            match self.loader.load(cert_config, hint).await {
                Ok(bundle) => {
                    let bundle = Arc::new(bundle);
                    for name in &host.host_names {
                        self.cache.set(name, bundle.clone());
                    }
                    self.record_descriptor(&host.name, cert_config);
                    tracing::info!(
                        host = %host.name,
                        host_names = ?host.host_names,
                        "Certificate provisioned"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        host = %host.name,
                        error = %e,
                        "Certificate load failed, skipping host"
                    );
                }
            }
        }

        let previous = {
            let mut populated = self
                .populated
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *populated, current.clone())
        };
        for name in previous.difference(&current) {
            self.cache.remove(name);
        }

        let host_names: HashSet<&str> = config.hosts.iter().map(|h| h.name.as_str()).collect();
        self.descriptors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|name, _| host_names.contains(name.as_str()) || name == DEFAULT_HOST);
    }

    fn descriptor_unchanged(&self, host: &str, config: &CertificateConfig) -> bool {
        let descriptors = self
            .descriptors
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        descriptors.get(host) == Some(config)
    }

    fn record_descriptor(&self, host: &str, config: &CertificateConfig) {
        self.descriptors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(host.to_string(), config.clone());
    }
}

fn default_host() -> HostConfig {
    HostConfig {
        name: DEFAULT_HOST.to_string(),
        host_names: vec![DEFAULT_SNI_NAME.to_string()],
        certificate: Some(CertificateConfig::SelfSigned {
            subject_alternative_names: vec![],
        }),
    }
}
