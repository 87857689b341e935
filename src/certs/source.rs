//! Certificate sources.
//!
//! # Responsibilities
//! - Resolve a certificate descriptor into a ready-to-serve bundle
//! - Generate self-signed identities for hosts without managed certs
//! - Fetch managed certificates through the abstract secret contract
//!
//! # Design Decisions
//! - One enum variant per source; adding a source adds a variant, not a
//!   central switch edit
//! - Descriptor fields are checked before any provider call, so an
//!   incomplete descriptor never costs a network round trip
//! - The loader is source-agnostic for callers; all variants yield the
//!   same `CertBundle`

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use thiserror::Error;

use crate::certs::bundle::{BundleError, CertBundle};
use crate::config::schema::CertificateConfig;

/// Abstract secret retrieval, the only contract the gateway has with a
/// vault or secrets-manager backend.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn get_secret(&self, name: &str) -> Result<String, SecretError>;
}

/// Error raised by a secret provider.
#[derive(Debug, Error)]
#[error("secret '{name}' unavailable: {reason}")]
pub struct SecretError {
    pub name: String,
    pub reason: String,
}

/// Builds scoped secret providers from descriptor fields.
pub trait SecretProviderFactory: Send + Sync {
    fn key_vault(&self, vault_uri: &str) -> Result<Arc<dyn SecretProvider>, SecretError>;
    fn secrets_manager(&self, region: &str) -> Result<Arc<dyn SecretProvider>, SecretError>;
}

/// In-memory secret provider, used in tests and local development.
#[derive(Debug, Default, Clone)]
pub struct StaticSecrets {
    secrets: HashMap<String, String>,
}

impl StaticSecrets {
    pub fn new(secrets: HashMap<String, String>) -> Self {
        Self { secrets }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.secrets.insert(name.into(), value.into());
    }
}

#[async_trait]
impl SecretProvider for StaticSecrets {
    async fn get_secret(&self, name: &str) -> Result<String, SecretError> {
        self.secrets.get(name).cloned().ok_or_else(|| SecretError {
            name: name.to_string(),
            reason: "not present".to_string(),
        })
    }
}

impl SecretProviderFactory for StaticSecrets {
    fn key_vault(&self, _vault_uri: &str) -> Result<Arc<dyn SecretProvider>, SecretError> {
        Ok(Arc::new(self.clone()))
    }

    fn secrets_manager(&self, _region: &str) -> Result<Arc<dyn SecretProvider>, SecretError> {
        Ok(Arc::new(self.clone()))
    }
}

/// Factory for deployments with no secret backend wired in. Hosts that
/// reference a vault or secrets manager fail their certificate load
/// individually; the rest of the gateway is unaffected.
#[derive(Debug, Default)]
pub struct UnconfiguredSecrets;

impl SecretProviderFactory for UnconfiguredSecrets {
    fn key_vault(&self, vault_uri: &str) -> Result<Arc<dyn SecretProvider>, SecretError> {
        Err(SecretError {
            name: vault_uri.to_string(),
            reason: "no key vault provider configured".to_string(),
        })
    }

    fn secrets_manager(&self, region: &str) -> Result<Arc<dyn SecretProvider>, SecretError> {
        Err(SecretError {
            name: region.to_string(),
            reason: "no secrets manager provider configured".to_string(),
        })
    }
}

/// The source family a certificate descriptor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    SelfSigned,
    KeyVault,
    SecretsManager,
    File,
}

impl SourceKind {
    fn of(config: &CertificateConfig) -> Self {
        match config {
            CertificateConfig::SelfSigned { .. } => Self::SelfSigned,
            CertificateConfig::KeyVault { .. } => Self::KeyVault,
            CertificateConfig::SecretsManager { .. } => Self::SecretsManager,
            CertificateConfig::File { .. } => Self::File,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::SelfSigned => "self-signed",
            Self::KeyVault => "key-vault",
            Self::SecretsManager => "secrets-manager",
            Self::File => "file",
        };
        f.write_str(name)
    }
}

/// Per-host certificate load failure, carrying the source family and
/// the inner cause.
#[derive(Debug, Error)]
#[error("failed to load {source_kind} certificate for '{hostname}': {cause}")]
pub struct CertificateLoadError {
    pub source_kind: SourceKind,
    pub hostname: String,
    #[source]
    pub cause: CertError,
}

/// Inner cause of a certificate load failure.
#[derive(Debug, Error)]
pub enum CertError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("payload is not valid UTF-8")]
    NotUtf8,

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error("certificate generation failed: {0}")]
    Generate(#[from] rcgen::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source-agnostic certificate loader.
pub struct CertificateLoader {
    secrets: Arc<dyn SecretProviderFactory>,
}

impl CertificateLoader {
    pub fn new(secrets: Arc<dyn SecretProviderFactory>) -> Self {
        Self { secrets }
    }

    /// Resolve a certificate descriptor into a bundle.
    ///
    /// `hostname_hint` names the identity being provisioned; for
    /// self-signed certificates it becomes the subject CN and first SAN.
    pub async fn load(
        &self,
        config: &CertificateConfig,
        hostname_hint: &str,
    ) -> Result<CertBundle, CertificateLoadError> {
        let source_kind = SourceKind::of(config);
        self.dispatch(config, hostname_hint)
            .await
            .map_err(|cause| CertificateLoadError {
                source_kind,
                hostname: hostname_hint.to_string(),
                cause,
            })
    }

    async fn dispatch(
        &self,
        config: &CertificateConfig,
        hostname_hint: &str,
    ) -> Result<CertBundle, CertError> {
        match config {
            CertificateConfig::SelfSigned {
                subject_alternative_names,
            } => generate_self_signed(hostname_hint, subject_alternative_names),

            CertificateConfig::KeyVault {
                vault_uri,
                certificate_secret,
                password_secret,
            } => {
                // All three fields are mandatory; check before any call.
                let vault_uri = require_field(vault_uri, "vault_uri")?;
                let cert_secret = require_field(certificate_secret, "certificate_secret")?;
                let password_secret = require_field(password_secret, "password_secret")?;

                let provider = self.secrets.key_vault(vault_uri)?;
                load_from_secrets(provider.as_ref(), cert_secret, password_secret).await
            }

            CertificateConfig::SecretsManager {
                region,
                certificate_secret,
                password_secret,
            } => {
                let region = require_field(region, "region")?;
                let cert_secret = require_field(certificate_secret, "certificate_secret")?;
                let password_secret = require_field(password_secret, "password_secret")?;

                let provider = self.secrets.secrets_manager(region)?;
                load_from_secrets(provider.as_ref(), cert_secret, password_secret).await
            }

            CertificateConfig::File {
                cert_path,
                key_path,
            } => {
                let cert_pem = tokio::fs::read_to_string(cert_path).await?;
                let key_pem = tokio::fs::read_to_string(key_path).await?;
                Ok(CertBundle::from_pem(
                    &format!("{}\n{}", cert_pem, key_pem),
                    None,
                )?)
            }
        }
    }
}

fn require_field<'a>(
    field: &'a Option<String>,
    name: &'static str,
) -> Result<&'a str, CertError> {
    field
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(CertError::MissingField(name))
}

/// Two-secret fetch shared by the vault and secrets-manager sources:
/// the certificate payload (base64 PEM) and the key password.
async fn load_from_secrets(
    provider: &dyn SecretProvider,
    cert_secret: &str,
    password_secret: &str,
) -> Result<CertBundle, CertError> {
    let payload = provider.get_secret(cert_secret).await?;
    let password = provider.get_secret(password_secret).await?;

    let decoded = BASE64.decode(payload.trim())?;
    let pem = String::from_utf8(decoded).map_err(|_| CertError::NotUtf8)?;
    Ok(CertBundle::from_pem(&pem, Some(&password))?)
}

/// Generate a fresh self-signed server certificate.
///
/// Non-deterministic: each call produces new key material and a new
/// validity window. Callers wanting a stable identity must cache the
/// result, not call again.
fn generate_self_signed(hostname: &str, extra_sans: &[String]) -> Result<CertBundle, CertError> {
    let mut sans: Vec<String> = vec![hostname.to_string()];
    for san in extra_sans {
        if !sans.iter().any(|s| s.eq_ignore_ascii_case(san)) {
            sans.push(san.clone());
        }
    }

    // SAN strings are classified as DNS names or IP literals by rcgen.
    let mut params = rcgen::CertificateParams::new(sans)?;
    params.distinguished_name = rcgen::DistinguishedName::new();
    params
        .distinguished_name
        .push(rcgen::DnType::CommonName, hostname);

    let now = time::OffsetDateTime::now_utc();
    params.not_before = now;
    params.not_after = now + time::Duration::days(365);
    params.key_usages = vec![
        rcgen::KeyUsagePurpose::DigitalSignature,
        rcgen::KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![rcgen::ExtendedKeyUsagePurpose::ServerAuth];
    params.is_ca = rcgen::IsCa::ExplicitNoCa;

    // RSA generation needs the aws-lc-rs backend; ring refuses it.
    let key = rcgen::KeyPair::generate_for(&rcgen::PKCS_RSA_SHA256)?;
    let cert = params.self_signed(&key)?;

    let chain = vec![cert.der().clone()];
    let key_der = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.serialize_der()));
    Ok(CertBundle::new(chain, key_der)?)
}
