//! Configuration-to-routing-table translation.
//!
//! # Responsibilities
//! - Map the configuration document into the proxy engine's table shape
//! - Apply per-field defaults for malformed values
//!
//! # Design Decisions
//! - Pure function: no I/O, input never mutated
//! - One malformed field degrades to its default; a bad value never
//!   blocks the whole publish
//! - A disabled health check is omitted entirely, never emitted as a
//!   disabled-but-present policy

use std::collections::HashMap;
use std::time::Duration;

use crate::config::schema::{ClusterConfig, GatewayConfig, ProxyRuleConfig};
use crate::routing::table::{
    Cluster, Destination, ForwarderSettings, HealthCheckPolicy, HttpVersion, Route, RouteTable,
    VersionPolicy,
};

/// Transform key removing the matched path prefix before forwarding.
pub const PATH_REMOVE_PREFIX: &str = "path_remove_prefix";

/// Metadata key carrying the health check threshold to the engine.
pub const HEALTH_THRESHOLD_METADATA: &str = "health_check_threshold";

const DEFAULT_ACTIVITY_TIMEOUT: Duration = Duration::from_secs(100);

/// Translate a configuration document into a routing table snapshot.
pub fn translate(config: &GatewayConfig) -> RouteTable {
    let mut table = RouteTable::empty();

    for rule in &config.proxy_rules {
        // A route is only emitted together with its cluster, so a
        // snapshot never references a cluster absent from itself.
        let cluster = translate_cluster(&rule.cluster);
        let route = translate_rule(rule, &cluster.name);
        table.clusters.insert(cluster.name.clone(), cluster);
        table.routes.push(route);
    }

    table
}

fn translate_rule(rule: &ProxyRuleConfig, cluster_id: &str) -> Route {
    let path_pattern = match rule.path_prefix.as_deref() {
        Some(prefix) => format!("{}/{{**catch-all}}", prefix.trim_end_matches('/')),
        None => "/{**catch-all}".to_string(),
    };

    let mut transforms = Vec::with_capacity(rule.cluster.transforms.len() + 1);
    if rule.strip_prefix {
        if let Some(prefix) = &rule.path_prefix {
            // Prefix removal runs before any user-declared transform.
            transforms.push(HashMap::from([(
                PATH_REMOVE_PREFIX.to_string(),
                prefix.clone(),
            )]));
        }
    }
    transforms.extend(rule.cluster.transforms.iter().cloned());

    Route {
        route_id: rule.name.clone(),
        hosts: rule.hosts.clone(),
        path_pattern,
        methods: rule.methods.clone(),
        cluster_id: cluster_id.to_string(),
        transforms,
    }
}

fn translate_cluster(config: &ClusterConfig) -> Cluster {
    let mut destinations = HashMap::with_capacity(config.destinations.len());
    for dest in &config.destinations {
        let key = if dest.name.is_empty() {
            "default".to_string()
        } else {
            dest.name.clone()
        };
        destinations.insert(
            key,
            Destination {
                address: dest.address.clone(),
                weight: dest.weight,
                metadata: dest.metadata.clone().unwrap_or_default(),
            },
        );
    }

    let mut metadata = HashMap::new();
    let health_check = match &config.health_check {
        Some(hc) if hc.enabled => {
            // Threshold travels as metadata; some engines key their
            // threshold policy off it rather than a first-class field.
            metadata.insert(
                HEALTH_THRESHOLD_METADATA.to_string(),
                hc.threshold.to_string(),
            );
            Some(HealthCheckPolicy {
                interval: Duration::from_secs(hc.interval_secs),
                timeout: Duration::from_secs(hc.timeout_secs),
                path: hc.path.clone().unwrap_or_else(|| "/".to_string()),
            })
        }
        _ => None,
    };

    Cluster {
        name: config.name.clone(),
        load_balancing_policy: config.load_balancing_policy.clone(),
        destinations,
        health_check,
        http_request: translate_forwarder(config),
        metadata,
    }
}

fn translate_forwarder(config: &ClusterConfig) -> ForwarderSettings {
    let defaults = ForwarderSettings::default();
    let Some(http) = &config.http_request else {
        return defaults;
    };

    let version = http
        .version
        .as_deref()
        .and_then(HttpVersion::parse)
        .unwrap_or(defaults.version);
    let version_policy = http
        .version_policy
        .as_deref()
        .and_then(VersionPolicy::parse)
        .unwrap_or(defaults.version_policy);
    let activity_timeout = http
        .activity_timeout_secs
        .as_deref()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_ACTIVITY_TIMEOUT);

    ForwarderSettings {
        version,
        version_policy,
        buffer_response: http.buffer_response.unwrap_or(defaults.buffer_response),
        activity_timeout,
    }
}
