//! SNI certificate resolution for the TLS termination layer.
//!
//! # Responsibilities
//! - Answer rustls certificate queries during the handshake
//! - Bound how long a handshake may wait for a certificate load
//!
//! # Design Decisions
//! - Fail-closed: an unknown SNI name fails that handshake rather than
//!   serving a default (and therefore wrong) certificate; the
//!   orchestrator guarantees a default hostname entry instead
//! - The resolver holds no certificates itself; the cache is the single
//!   owner of TLS identities

use std::sync::Arc;
use std::time::Duration;

use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;

use crate::certs::cache::{CertificateCache, DEFAULT_SYNC_TIMEOUT};

/// rustls certificate resolver backed by the certificate cache.
pub struct SniCertResolver {
    cache: Arc<CertificateCache>,
    timeout: Duration,
}

impl SniCertResolver {
    pub fn new(cache: Arc<CertificateCache>) -> Self {
        Self {
            cache,
            timeout: DEFAULT_SYNC_TIMEOUT,
        }
    }

    pub fn with_timeout(cache: Arc<CertificateCache>, timeout: Duration) -> Self {
        Self { cache, timeout }
    }

    /// Resolution policy behind the rustls callback, split out so it is
    /// testable without a real `ClientHello`.
    fn resolve_name(&self, server_name: Option<&str>) -> Option<Arc<CertifiedKey>> {
        let Some(name) = server_name else {
            tracing::debug!("Handshake without SNI; no certificate served");
            return None;
        };

        match self.cache.get_sync(name, self.timeout) {
            Some(bundle) => Some(bundle.certified_key.clone()),
            None => {
                tracing::warn!(
                    hostname = %name,
                    timeout = ?self.timeout,
                    "No certificate for SNI name; failing handshake"
                );
                None
            }
        }
    }
}

impl std::fmt::Debug for SniCertResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SniCertResolver")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ResolvesServerCert for SniCertResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        self.resolve_name(client_hello.server_name())
    }
}

/// Build a TLS server config that resolves certificates through the cache.
pub fn server_config(cache: Arc<CertificateCache>) -> rustls::ServerConfig {
    let mut config = rustls::ServerConfig::builder()
        .with_no_client_auth()
        .with_cert_resolver(Arc::new(SniCertResolver::new(cache)));
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];
    config
}
