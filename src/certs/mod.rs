//! Certificate management subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestrator reload (async):
//!     CertificateConfig per host
//!     → source.rs (self-signed / key vault / secrets manager / file)
//!     → bundle.rs (chain + key + expiry, signing material pre-built)
//!     → cache.rs set() (ownership transfers to the cache)
//!
//! TLS handshake (sync, latency critical):
//!     ClientHello SNI name
//!     → sni.rs resolve()
//!     → cache.rs get_sync() (bounded wait, default 5s)
//!     → CertifiedKey or failed handshake (fail-closed)
//! ```
//!
//! # Design Decisions
//! - The cache is the seam turning slow, fallible, async loading into a
//!   fast, bounded, synchronous lookup
//! - A failed load for one host never blocks loads for other hosts
//! - Bundles are owned by the cache once inserted; loaders keep nothing

pub mod bundle;
pub mod cache;
pub mod sni;
pub mod source;

pub use bundle::{BundleError, CertBundle};
pub use cache::{CertificateCache, DEFAULT_SYNC_TIMEOUT};
pub use sni::SniCertResolver;
pub use source::{
    CertError, CertificateLoadError, CertificateLoader, SecretProvider, SecretProviderFactory,
    SourceKind, StaticSecrets, UnconfiguredSecrets,
};
