//! Configuration schema definitions.
//!
//! This module defines the complete gateway configuration document.
//! All types derive Serde traits for deserialization from the JSON
//! document kept in the configuration store.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration document for the gateway.
///
/// The document is versionless and replaced wholesale on each save.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    /// Hosts served by the gateway, each with its own TLS identity.
    pub hosts: Vec<HostConfig>,

    /// Proxy rules mapping matched requests to clusters.
    pub proxy_rules: Vec<ProxyRuleConfig>,
}

/// A host served by the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HostConfig {
    /// Unique host identifier.
    pub name: String,

    /// SNI names served by this host's certificate.
    pub host_names: Vec<String>,

    /// Certificate source for this host. Hosts without a certificate
    /// cannot terminate TLS for their names.
    #[serde(default)]
    pub certificate: Option<CertificateConfig>,
}

/// A proxy rule mapping matched requests to a cluster of destinations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ProxyRuleConfig {
    /// Rule identifier, used to derive the route id.
    pub name: String,

    /// Host names this rule matches. Empty means any host.
    #[serde(default)]
    pub hosts: Vec<String>,

    /// Path prefix to match.
    #[serde(default)]
    pub path_prefix: Option<String>,

    /// Remove the matched prefix before forwarding.
    #[serde(default)]
    pub strip_prefix: bool,

    /// HTTP methods this rule matches. Empty means any method.
    #[serde(default)]
    pub methods: Vec<String>,

    /// The cluster requests are forwarded to.
    pub cluster: ClusterConfig,
}

/// A named group of destinations sharing load balancing and health policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ClusterConfig {
    /// Cluster identifier.
    pub name: String,

    /// Load balancing policy name, passed through to the proxy engine.
    #[serde(default = "default_lb_policy")]
    pub load_balancing_policy: String,

    /// Active health check settings.
    #[serde(default)]
    pub health_check: Option<HealthCheckConfig>,

    /// Request forwarding settings.
    #[serde(default)]
    pub http_request: Option<HttpRequestConfig>,

    /// Request transforms applied in declaration order.
    #[serde(default)]
    pub transforms: Vec<HashMap<String, String>>,

    /// Destinations within this cluster.
    pub destinations: Vec<DestinationConfig>,
}

fn default_lb_policy() -> String {
    "round_robin".to_string()
}

/// A single backend destination.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DestinationConfig {
    /// Destination key within the cluster. Defaults to "default" when empty.
    #[serde(default)]
    pub name: String,

    /// Backend address.
    pub address: Url,

    /// Weight for weighted load balancing.
    #[serde(default)]
    pub weight: Option<u32>,

    /// Opaque metadata passed through to the proxy engine.
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

/// Active health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable active health checks for the cluster.
    pub enabled: bool,

    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Probe timeout in seconds.
    pub timeout_secs: u64,

    /// Consecutive failures before a destination is marked unhealthy.
    pub threshold: u32,

    /// Path to probe.
    pub path: Option<String>,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 10,
            timeout_secs: 5,
            threshold: 3,
            path: None,
        }
    }
}

/// Request forwarding settings for a cluster.
///
/// String fields are parsed leniently during translation; a malformed
/// value falls back to a per-field default rather than failing the
/// whole document.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct HttpRequestConfig {
    /// Outgoing HTTP version ("1.0", "1.1" or "2").
    pub version: Option<String>,

    /// Version negotiation policy ("exact", "prefer-lower-or-equal",
    /// "prefer-higher-or-equal").
    pub version_policy: Option<String>,

    /// Buffer the response before relaying it to the client.
    pub buffer_response: Option<bool>,

    /// Activity timeout in seconds, as a string.
    pub activity_timeout_secs: Option<String>,
}

/// Certificate source descriptor for a host.
///
/// One variant per source; adding a source means adding a variant, not
/// editing a central dispatch. Source-specific fields are optional at
/// the schema level so an incomplete descriptor fails that host's
/// certificate load, not the whole document parse.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CertificateConfig {
    /// Generate a fresh self-signed certificate.
    SelfSigned {
        /// Additional subject-alternative-names beyond the host names.
        #[serde(default)]
        subject_alternative_names: Vec<String>,
    },

    /// Fetch certificate and password secrets from a key vault.
    KeyVault {
        #[serde(default)]
        vault_uri: Option<String>,
        #[serde(default)]
        certificate_secret: Option<String>,
        #[serde(default)]
        password_secret: Option<String>,
    },

    /// Fetch certificate and password secrets from a region-scoped
    /// secrets manager.
    SecretsManager {
        #[serde(default)]
        region: Option<String>,
        #[serde(default)]
        certificate_secret: Option<String>,
        #[serde(default)]
        password_secret: Option<String>,
    },

    /// Load a PEM certificate chain and private key from disk.
    File { cert_path: PathBuf, key_path: PathBuf },
}
