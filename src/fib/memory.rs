use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use log::debug;
use tokio::sync::Mutex;

use super::RouteTable;
use crate::error::RouteTableError;
use crate::rib::{RouteEntry, RouteSet};

/// An operation the table was asked to perform
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TableOp {
    AddOrReplace(String),
    Delete(String),
}

impl fmt::Display for TableOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TableOp::AddOrReplace(key) => write!(f, "replace {}", key),
            TableOp::Delete(key) => write!(f, "delete {}", key),
        }
    }
}

/// Route table held in memory. Records every operation (including rejected ones)
/// and can be told to reject specific prefixes
#[derive(Debug, Default)]
pub struct MemoryTable {
    routes: Mutex<RouteSet>,
    ops: Mutex<Vec<TableOp>>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_routes(routes: RouteSet) -> Self {
        Self {
            routes: Mutex::new(routes),
            ..Self::default()
        }
    }

    /// Reject any future operation on this prefix key
    pub async fn fail_on(&self, key: &str) {
        self.failing.lock().await.insert(key.to_string());
    }

    pub async fn routes(&self) -> RouteSet {
        self.routes.lock().await.clone()
    }

    pub async fn ops(&self) -> Vec<TableOp> {
        self.ops.lock().await.clone()
    }

    pub async fn clear_ops(&self) {
        self.ops.lock().await.clear();
    }

    async fn check(&self, key: &str) -> Result<(), RouteTableError> {
        if self.failing.lock().await.contains(key) {
            return Err(RouteTableError::Rejected(format!(
                "{} is configured to fail",
                key
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RouteTable for MemoryTable {
    async fn list(&self) -> Result<RouteSet, RouteTableError> {
        Ok(self.routes.lock().await.clone())
    }

    async fn add_or_replace(&self, route: &RouteEntry) -> Result<(), RouteTableError> {
        let key = route.key();
        self.ops.lock().await.push(TableOp::AddOrReplace(key.clone()));
        self.check(&key).await?;
        debug!("[memory] replace {}", route);
        self.routes.lock().await.insert(route.clone());
        Ok(())
    }

    async fn delete(&self, route: &RouteEntry) -> Result<(), RouteTableError> {
        let key = route.key();
        self.ops.lock().await.push(TableOp::Delete(key.clone()));
        self.check(&key).await?;
        debug!("[memory] delete {}", route);
        match self.routes.lock().await.remove(&key) {
            Some(_) => Ok(()),
            None => Err(RouteTableError::Rejected(format!("No such route: {}", key))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(prefix: &str) -> RouteEntry {
        RouteEntry::new(prefix.parse().unwrap(), "192.0.2.1".parse().unwrap())
    }

    #[tokio::test]
    async fn test_memory_table_ops() {
        let table = MemoryTable::new();
        table.add_or_replace(&route("10.0.0.0/24")).await.unwrap();
        table.add_or_replace(&route("10.0.0.0/24")).await.unwrap();
        assert_eq!(table.list().await.unwrap().len(), 1);
        table.delete(&route("10.0.0.0/24")).await.unwrap();
        assert!(table.delete(&route("10.0.0.0/24")).await.is_err());
        assert_eq!(
            table.ops().await,
            vec![
                TableOp::AddOrReplace("10.0.0.0/24".into()),
                TableOp::AddOrReplace("10.0.0.0/24".into()),
                TableOp::Delete("10.0.0.0/24".into()),
                TableOp::Delete("10.0.0.0/24".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_memory_table_injected_failure() {
        let table = MemoryTable::new();
        table.fail_on("10.0.1.0/24").await;
        assert!(table.add_or_replace(&route("10.0.1.0/24")).await.is_err());
        assert!(table.list().await.unwrap().is_empty());
    }
}
