//! Certificate bundle construction.
//!
//! # Responsibilities
//! - Pair a certificate chain with its private key as one opaque unit
//! - Extract the leaf expiry used for cache TTL
//! - Pre-build the rustls signing material once, off the handshake path
//!
//! # Design Decisions
//! - Bundles are immutable; a renewed certificate is a new bundle
//! - The signing key is loaded at construction so the SNI resolver only
//!   clones an Arc during the handshake

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::sign::CertifiedKey;
use thiserror::Error;

/// Error type for bundle construction.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("no certificates found")]
    EmptyChain,

    #[error("unparsable certificate: {0}")]
    BadCertificate(String),

    #[error("invalid PEM: {0}")]
    Pem(String),

    #[error("no private key found")]
    NoPrivateKey,

    #[error("failed to decrypt private key: {0}")]
    Decrypt(String),

    #[error("private key rejected: {0}")]
    KeyRejected(String),
}

/// A certificate chain plus its private key, treated as one opaque unit.
///
/// Ownership transfers into the cache on insert; bundles are never
/// mutated in place, only replaced wholesale.
#[derive(Debug)]
pub struct CertBundle {
    /// DER certificate chain, leaf first.
    pub chain: Vec<CertificateDer<'static>>,
    /// Pre-built signing material served to the TLS stack.
    pub certified_key: Arc<CertifiedKey>,
    /// Leaf certificate expiry.
    pub not_after: SystemTime,
}

impl CertBundle {
    /// Build a bundle from a DER chain and private key.
    pub fn new(
        chain: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
    ) -> Result<Self, BundleError> {
        let leaf = chain.first().ok_or(BundleError::EmptyChain)?;
        let not_after = leaf_not_after(leaf.as_ref())?;

        let provider = rustls::crypto::CryptoProvider::get_default()
            .cloned()
            .unwrap_or_else(|| Arc::new(rustls::crypto::aws_lc_rs::default_provider()));
        let signing_key = provider
            .key_provider
            .load_private_key(key)
            .map_err(|e| BundleError::KeyRejected(format!("{:?}", e)))?;

        let certified_key = Arc::new(CertifiedKey::new(chain.clone(), signing_key));

        Ok(Self {
            chain,
            certified_key,
            not_after,
        })
    }

    /// Build a bundle from PEM text holding a certificate chain and a
    /// private key. An encrypted PKCS#8 key is decrypted with `password`.
    pub fn from_pem(pem: &str, password: Option<&str>) -> Result<Self, BundleError> {
        let mut reader = std::io::Cursor::new(pem.as_bytes());
        let chain: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| BundleError::Pem(e.to_string()))?;

        let mut reader = std::io::Cursor::new(pem.as_bytes());
        let key = match rustls_pemfile::private_key(&mut reader)
            .map_err(|e| BundleError::Pem(e.to_string()))?
        {
            Some(key) => key,
            None => decrypt_pkcs8_key(pem, password)?,
        };

        Self::new(chain, key)
    }

    /// Remaining lifetime relative to `now`, zero if already expired.
    pub fn remaining_lifetime(&self, now: SystemTime) -> Duration {
        self.not_after
            .duration_since(now)
            .unwrap_or(Duration::ZERO)
    }
}

/// Extract `notAfter` from a DER-encoded leaf certificate.
fn leaf_not_after(der: &[u8]) -> Result<SystemTime, BundleError> {
    let (_, cert) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| BundleError::BadCertificate(e.to_string()))?;
    let secs = cert.validity().not_after.timestamp();
    if secs < 0 {
        return Err(BundleError::BadCertificate(
            "notAfter precedes the unix epoch".to_string(),
        ));
    }
    Ok(UNIX_EPOCH + Duration::from_secs(secs as u64))
}

/// Recover an encrypted PKCS#8 key that `rustls_pemfile` skips over.
fn decrypt_pkcs8_key(
    pem: &str,
    password: Option<&str>,
) -> Result<PrivateKeyDer<'static>, BundleError> {
    let der = extract_pem_block(pem, "ENCRYPTED PRIVATE KEY").ok_or(BundleError::NoPrivateKey)?;
    let password = password.ok_or_else(|| {
        BundleError::Decrypt("private key is encrypted but no password was supplied".to_string())
    })?;

    let encrypted = pkcs8::EncryptedPrivateKeyInfo::try_from(der.as_slice())
        .map_err(|e| BundleError::Decrypt(e.to_string()))?;
    let document = encrypted
        .decrypt(password)
        .map_err(|e| BundleError::Decrypt(e.to_string()))?;

    Ok(PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
        document.as_bytes().to_vec(),
    )))
}

/// Decode the base64 body of the first PEM block with the given label.
fn extract_pem_block(pem: &str, label: &str) -> Option<Vec<u8>> {
    let begin = format!("-----BEGIN {}-----", label);
    let end = format!("-----END {}-----", label);
    let start = pem.find(&begin)? + begin.len();
    let stop = pem[start..].find(&end)? + start;
    let body: String = pem[start..stop].chars().filter(|c| !c.is_whitespace()).collect();
    BASE64.decode(body).ok()
}
