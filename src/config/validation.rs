//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every rule's cluster resolves to usable destinations
//! - Detect conflicting host and rule names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use crate::config::schema::GatewayConfig;

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A proxy rule's cluster has no destinations.
    NoDestinations { rule: String },
    /// Two proxy rules share the same name.
    DuplicateRuleName { name: String },
    /// A host name is served by more than one host entry, which would
    /// make its certificate binding ambiguous.
    DuplicateHostName { host_name: String },
    /// A host entry lists no host names.
    HostWithoutNames { host: String },
    /// A health check is enabled with a zero interval.
    ZeroHealthCheckInterval { cluster: String },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::NoDestinations { rule } => {
                write!(f, "rule '{}' has a cluster with no destinations", rule)
            }
            ValidationError::DuplicateRuleName { name } => {
                write!(f, "duplicate rule name '{}'", name)
            }
            ValidationError::DuplicateHostName { host_name } => {
                write!(f, "host name '{}' appears in more than one host", host_name)
            }
            ValidationError::HostWithoutNames { host } => {
                write!(f, "host '{}' lists no host names", host)
            }
            ValidationError::ZeroHealthCheckInterval { cluster } => {
                write!(f, "cluster '{}' enables health checks with interval 0", cluster)
            }
        }
    }
}

/// Validate semantic constraints on a parsed configuration document.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let mut rule_names = HashSet::new();
    for rule in &config.proxy_rules {
        if !rule_names.insert(rule.name.as_str()) {
            errors.push(ValidationError::DuplicateRuleName {
                name: rule.name.clone(),
            });
        }

        if rule.cluster.destinations.is_empty() {
            errors.push(ValidationError::NoDestinations {
                rule: rule.name.clone(),
            });
        }

        if let Some(hc) = &rule.cluster.health_check {
            if hc.enabled && hc.interval_secs == 0 {
                errors.push(ValidationError::ZeroHealthCheckInterval {
                    cluster: rule.cluster.name.clone(),
                });
            }
        }
    }

    let mut host_names = HashSet::new();
    for host in &config.hosts {
        if host.host_names.is_empty() {
            errors.push(ValidationError::HostWithoutNames {
                host: host.name.clone(),
            });
        }
        for name in &host.host_names {
            let normalized = name.to_ascii_lowercase();
            if !host_names.insert(normalized) {
                errors.push(ValidationError::DuplicateHostName {
                    host_name: name.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
