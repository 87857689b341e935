//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config document (JSON)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → consumed by the orchestrator
//!
//! On external change:
//!     store.rs watcher detects change
//!     → change event on the channel
//!     → orchestrator re-loads through the store
//!     → translate + atomic publish downstream
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All collection fields default to empty to allow minimal documents
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod store;
pub mod validation;

pub use loader::ConfigError;
pub use schema::{
    CertificateConfig, ClusterConfig, DestinationConfig, GatewayConfig, HealthCheckConfig,
    HostConfig, HttpRequestConfig, ProxyRuleConfig,
};
pub use store::{ConfigStore, FileConfigStore};
