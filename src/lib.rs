//! TLS Gateway Control Plane
//!
//! Dynamic configuration control plane for a TLS-terminating reverse
//! proxy. Turns a versioned configuration document into an immutable,
//! atomically-swappable routing table and manages per-hostname TLS
//! certificates for SNI dispatch.
//!
//! # Architecture Overview
//!
//! ```text
//!  config store ──change event──▶ orchestrator
//!       │                            │
//!       │ load()                     ├─▶ certs::source ─▶ certs::cache ◀── TLS SNI
//!       └────────────────────────────┤                                     (get_sync,
//!                                    └─▶ routing::translate                 bounded)
//!                                          │
//!                                          ▼
//!                                    routing::provider ◀── proxy engine
//!                                    (atomic snapshot)      (current())
//! ```
//!
//! The proxy engine and TLS listener are external consumers: they pull
//! the routing snapshot and certificates on their own schedule and are
//! never pushed partial state.

// Core subsystems
pub mod certs;
pub mod config;
pub mod orchestrator;
pub mod routing;

pub use certs::{CertBundle, CertificateCache, CertificateLoader, SniCertResolver};
pub use config::{ConfigStore, FileConfigStore, GatewayConfig};
pub use orchestrator::Orchestrator;
pub use routing::{RouteTable, RouteTableProvider};
