//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Table Compilation (on each reload):
//!     GatewayConfig
//!     → translator.rs (pure mapping, per-field defaults)
//!     → RouteTable snapshot (routes + clusters + change token)
//!     → provider.rs publish (atomic swap, old token cancelled)
//!
//! Proxy engine (consumer):
//!     provider.current() → forward traffic
//!     snapshot.change_token cancelled → re-fetch
//! ```
//!
//! # Design Decisions
//! - Snapshots compiled off to the side, immutable once published
//! - Readers never observe a half-built table (build-then-swap)
//! - First match wins downstream; rule order is preserved

pub mod provider;
pub mod table;
pub mod translator;

pub use provider::RouteTableProvider;
pub use table::{
    Cluster, Destination, ForwarderSettings, HealthCheckPolicy, HttpVersion, Route, RouteTable,
    VersionPolicy,
};
pub use translator::translate;
