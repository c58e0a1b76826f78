//! Converging the forwarding plane onto the BGP best paths.
//!
//! Two modes are available, and a process runs exactly one of them:
//!
//! - [`SyncMode::Full`]: each best-path table snapshot is turned into a desired route set
//!   and diffed against the routes already installed. Every desired route is added or
//!   replaced first, then every installed route missing from the snapshot is deleted.
//! - [`SyncMode::Incremental`]: each path is applied on its own, upserting announced
//!   routes and deleting withdrawn ones. No snapshot of installed routes is needed, but a
//!   lost update is never repaired.
//!
//! In both modes a failing path or route is recorded in the pass's [`SyncReport`] and the
//! rest of the batch carries on.

mod report;
mod worker;

pub use report::{SyncFailure, SyncReport};
pub use worker::{FeedEvent, SyncHandle, SyncStatus, SyncWorker};

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, trace, warn};
use serde::{self, Deserialize, Deserializer, Serialize, Serializer};
use tokio::time::timeout;

use crate::dispatch::{FamilyDispatcher, PathAction};
use crate::error::RouteTableError;
use crate::fib::RouteTable;
use crate::rib::{Path, RouteEntry, RouteSet};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncMode {
    Full,
    Incremental,
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SyncMode::Full => write!(f, "full"),
            SyncMode::Incremental => write!(f, "incremental"),
        }
    }
}

impl Serialize for SyncMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for SyncMode {
    fn deserialize<D>(deserializer: D) -> Result<SyncMode, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.to_lowercase().as_str() {
            "full" => Ok(SyncMode::Full),
            "incremental" => Ok(SyncMode::Incremental),
            _ => Err(serde::de::Error::custom(format!(
                "Unsupported sync mode: '{}'",
                s
            ))),
        }
    }
}

/// Where a pass currently is
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PassState {
    Idle,
    ComputingDesired,
    ApplyingAdds,
    ApplyingDeletes,
}

impl fmt::Display for PassState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let word = match self {
            PassState::Idle => "Idle",
            PassState::ComputingDesired => "ComputingDesired",
            PassState::ApplyingAdds => "ApplyingAdds",
            PassState::ApplyingDeletes => "ApplyingDeletes",
        };
        write!(f, "{}", word)
    }
}

/// Applies path decisions to a [`RouteTable`].
///
/// Methods take `&mut self`, so the owner (normally the [`SyncWorker`]) can't start a
/// pass while another one is still mutating the table.
pub struct Reconciler {
    table: Arc<dyn RouteTable>,
    dispatcher: FamilyDispatcher,
    mutation_timeout: Duration,
    state: PassState,
}

impl Reconciler {
    pub fn new(table: Arc<dyn RouteTable>, mutation_timeout: Duration) -> Self {
        Self {
            table,
            dispatcher: FamilyDispatcher::new(),
            mutation_timeout,
            state: PassState::Idle,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: FamilyDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn state(&self) -> PassState {
        self.state
    }

    fn update_state(&mut self, new_state: PassState) {
        trace!("Reconciler went from {} to {}", self.state, new_state);
        self.state = new_state;
    }

    /// Desired routes for a best-path table. Withdrawn paths are skipped,
    /// paths that fail to decode are recorded in `report` and dropped
    pub fn build_desired(&self, paths: &[Path], report: &mut SyncReport) -> RouteSet {
        let mut desired = RouteSet::new();
        for path in paths.iter().filter(|p| !p.withdrawn) {
            match self.dispatcher.handle(path) {
                Ok(PathAction::Install(routes)) => desired.extend(routes),
                Ok(PathAction::Ignore) => report.ignored += 1,
                Ok(PathAction::Withdraw(_)) => (),
                Err(err) => {
                    warn!("Failed to handle path {}: {}", path, err);
                    report.fail(path, err.kind(), err);
                }
            }
        }
        desired
    }

    /// Full pass: read what's installed, compute what should be, converge
    pub async fn sync_table(&mut self, paths: &[Path]) -> SyncReport {
        let mut report = SyncReport::new(SyncMode::Full, paths.len());
        self.update_state(PassState::ComputingDesired);
        let existing = match self.bounded(self.table.list()).await {
            Ok(existing) => existing,
            Err(err) => {
                warn!("Failed to list existing routes: {}", err);
                report.fail("route table", err.kind(), err);
                report.finish();
                self.update_state(PassState::Idle);
                return report;
            }
        };
        let desired = self.build_desired(paths, &mut report);
        self.apply_diff(&existing, &desired, &mut report).await;
        report
    }

    /// Converge `existing` onto `desired`: add-or-replace every desired route,
    /// then delete every existing route whose prefix isn't desired
    pub async fn reconcile(&mut self, existing: &RouteSet, desired: &RouteSet) -> SyncReport {
        let mut report = SyncReport::new(SyncMode::Full, 0);
        self.apply_diff(existing, desired, &mut report).await;
        report
    }

    async fn apply_diff(&mut self, existing: &RouteSet, desired: &RouteSet, report: &mut SyncReport) {
        self.update_state(PassState::ApplyingAdds);
        for route in desired.routes() {
            self.replace_route(route, report).await;
        }

        self.update_state(PassState::ApplyingDeletes);
        for (key, route) in existing.iter() {
            if !desired.contains_key(key) {
                self.delete_route(route, report).await;
            }
        }

        report.finish();
        self.update_state(PassState::Idle);
        info!(
            "Route sync pass done: {} replaced, {} deleted, {} failed",
            report.replaced.len(),
            report.deleted.len(),
            report.failures.len()
        );
    }

    /// Fold one path straight into the table
    pub async fn apply(&mut self, path: &Path, report: &mut SyncReport) {
        self.update_state(PassState::ComputingDesired);
        let action = match self.dispatcher.handle(path) {
            Ok(action) => action,
            Err(err) => {
                warn!("Failed to handle path {}: {}", path, err);
                report.fail(path, err.kind(), err);
                self.update_state(PassState::Idle);
                return;
            }
        };
        trace!("{}: {}", path, action);
        match action {
            PathAction::Install(routes) => {
                self.update_state(PassState::ApplyingAdds);
                for route in &routes {
                    self.replace_route(route, report).await;
                }
            }
            PathAction::Withdraw(prefixes) => {
                self.update_state(PassState::ApplyingDeletes);
                for prefix in prefixes {
                    let route = RouteEntry {
                        prefix,
                        next_hop: None,
                        device: None,
                    };
                    self.delete_route(&route, report).await;
                }
            }
            PathAction::Ignore => report.ignored += 1,
        }
        self.update_state(PassState::Idle);
    }

    /// Incremental pass over a batch of paths
    pub async fn apply_paths(&mut self, paths: &[Path]) -> SyncReport {
        let mut report = SyncReport::new(SyncMode::Incremental, paths.len());
        for path in paths {
            self.apply(path, &mut report).await;
        }
        report.finish();
        info!(
            "Applied {} paths: {} replaced, {} deleted, {} failed",
            paths.len(),
            report.replaced.len(),
            report.deleted.len(),
            report.failures.len()
        );
        report
    }

    async fn replace_route(&self, route: &RouteEntry, report: &mut SyncReport) {
        match self.bounded(self.table.add_or_replace(route)).await {
            Ok(()) => {
                debug!("Updated route: {}", route);
                report.replaced.push(route.key());
            }
            Err(err) => {
                warn!("Failed to manage route {}: {}", route.key(), err);
                report.fail(route.key(), err.kind(), err);
            }
        }
    }

    async fn delete_route(&self, route: &RouteEntry, report: &mut SyncReport) {
        match self.bounded(self.table.delete(route)).await {
            Ok(()) => {
                debug!("Removed route: {}", route);
                report.deleted.push(route.key());
            }
            Err(err) => {
                warn!("Failed to remove route {}: {}", route.key(), err);
                report.fail(route.key(), err.kind(), err);
            }
        }
    }

    /// Bound a forwarding-plane call; running out of time counts as that call failing
    async fn bounded<F, T>(&self, fut: F) -> Result<T, RouteTableError>
    where
        F: Future<Output = Result<T, RouteTableError>>,
    {
        match timeout(self.mutation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(RouteTableError::Timeout(self.mutation_timeout)),
        }
    }
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<Reconciler state={} timeout={}ms>",
            self.state,
            self.mutation_timeout.as_millis()
        )
    }
}
