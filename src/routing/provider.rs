//! Routing table publication.
//!
//! # Responsibilities
//! - Own the currently-published routing table snapshot
//! - Swap in new snapshots atomically
//! - Signal holders of the superseded snapshot to re-fetch
//!
//! # Design Decisions
//! - Readers never lock: `current()` is one atomic pointer load
//! - Publish order is build fully, swap, then cancel the old token, so
//!   no signal fires before the replacement is visible
//! - The provider never returns to the empty table once published

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::routing::table::RouteTable;

/// Owner of the published routing table snapshot.
pub struct RouteTableProvider {
    current: ArcSwap<RouteTable>,
}

impl RouteTableProvider {
    /// Starts with the explicit empty table.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(RouteTable::empty()),
        }
    }

    /// The last published snapshot. Non-blocking, safe for concurrent
    /// callers; a returned snapshot stays valid while held.
    pub fn current(&self) -> Arc<RouteTable> {
        self.current.load_full()
    }

    /// Atomically replace the published snapshot and cancel the
    /// previous snapshot's change token.
    pub fn publish(&self, table: RouteTable) -> Arc<RouteTable> {
        let table = Arc::new(table);
        let old = self.current.swap(table.clone());

        tracing::info!(
            routes = table.routes.len(),
            clusters = table.clusters.len(),
            "Routing table published"
        );

        // Swap is visible before holders of the old snapshot are told
        // to re-fetch.
        old.change_token.cancel();
        table
    }
}

impl Default for RouteTableProvider {
    fn default() -> Self {
        Self::new()
    }
}
