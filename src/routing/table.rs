//! Routing table snapshot types.
//!
//! # Responsibilities
//! - Represent one immutable, fully-formed routing table
//! - Carry the change token consumers watch for supersession
//!
//! # Design Decisions
//! - Snapshots are value objects: built completely, then published,
//!   never patched in place
//! - A reader holding an old snapshot keeps a valid table; its change
//!   token tells it when to re-fetch

use std::collections::HashMap;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;

/// One immutable routing table: routes, clusters and a change token
/// that is cancelled when the table is superseded.
#[derive(Debug)]
pub struct RouteTable {
    pub routes: Vec<Route>,
    pub clusters: HashMap<String, Cluster>,
    pub change_token: CancellationToken,
}

impl RouteTable {
    /// The explicit empty table served before the first publish.
    pub fn empty() -> Self {
        Self {
            routes: Vec::new(),
            clusters: HashMap::new(),
            change_token: CancellationToken::new(),
        }
    }
}

/// A match rule mapped to a cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    /// Stable identifier derived from the rule name.
    pub route_id: String,
    /// Host names to match; empty matches any host.
    pub hosts: Vec<String>,
    /// Path pattern including the trailing catch-all segment.
    pub path_pattern: String,
    /// Methods to match; empty matches any method.
    pub methods: Vec<String>,
    /// Cluster receiving matched requests.
    pub cluster_id: String,
    /// Request transforms in application order.
    pub transforms: Vec<HashMap<String, String>>,
}

/// A named group of destinations with shared forwarding policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub name: String,
    pub load_balancing_policy: String,
    /// Destinations keyed by destination name.
    pub destinations: HashMap<String, Destination>,
    /// Present only when active health checking is enabled; the proxy
    /// engine treats presence as authoritative.
    pub health_check: Option<HealthCheckPolicy>,
    pub http_request: ForwarderSettings,
    /// Engine-facing metadata, e.g. the health check threshold.
    pub metadata: HashMap<String, String>,
}

/// One backend address within a cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub address: Url,
    pub weight: Option<u32>,
    pub metadata: HashMap<String, String>,
}

/// Active health check policy passed through to the proxy engine,
/// which owns its enforcement.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthCheckPolicy {
    pub interval: Duration,
    pub timeout: Duration,
    pub path: String,
}

/// Request forwarding settings with per-field defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwarderSettings {
    pub version: HttpVersion,
    pub version_policy: VersionPolicy,
    pub buffer_response: bool,
    pub activity_timeout: Duration,
}

impl Default for ForwarderSettings {
    fn default() -> Self {
        Self {
            version: HttpVersion::Http11,
            version_policy: VersionPolicy::PreferLowerOrEqual,
            buffer_response: false,
            activity_timeout: Duration::from_secs(100),
        }
    }
}

/// Outgoing HTTP version for backend requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Http10,
    Http11,
    Http2,
}

impl HttpVersion {
    /// Lenient parse; unknown strings yield `None` so the caller can
    /// apply its default.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "1.0" | "HTTP/1.0" => Some(Self::Http10),
            "1.1" | "HTTP/1.1" => Some(Self::Http11),
            "2" | "2.0" | "HTTP/2" => Some(Self::Http2),
            _ => None,
        }
    }
}

/// Version negotiation policy for backend requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionPolicy {
    Exact,
    PreferLowerOrEqual,
    PreferHigherOrEqual,
}

impl VersionPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "exact" => Some(Self::Exact),
            "prefer-lower-or-equal" => Some(Self::PreferLowerOrEqual),
            "prefer-higher-or-equal" => Some(Self::PreferHigherOrEqual),
            _ => None,
        }
    }
}
