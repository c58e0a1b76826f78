//! Forwarding-plane backends.
//!
//! The reconciler only ever talks to a [`RouteTable`]; whether that is the kernel
//! (via iproute2) or an in-memory table is decided by config.

mod kernel;
mod memory;

pub use kernel::KernelTable;
pub use memory::{MemoryTable, TableOp};

use async_trait::async_trait;

use crate::error::RouteTableError;
use crate::rib::{RouteEntry, RouteSet};

#[async_trait]
pub trait RouteTable: Send + Sync {
    /// Routes currently installed (and owned by us), keyed by prefix
    async fn list(&self) -> Result<RouteSet, RouteTableError>;

    /// Install a route, replacing any existing route for the same prefix
    async fn add_or_replace(&self, route: &RouteEntry) -> Result<(), RouteTableError>;

    async fn delete(&self, route: &RouteEntry) -> Result<(), RouteTableError>;
}
