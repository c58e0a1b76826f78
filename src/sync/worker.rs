use std::fmt;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

use super::{Reconciler, SyncMode, SyncReport};
use crate::rib::Path;

/// Something the BGP engine pushed at us
#[derive(Clone, Debug)]
pub enum FeedEvent {
    /// Full best-path table snapshot
    Table(Vec<Path>),
    /// Individual path updates (announcements and withdrawals)
    Paths(Vec<Path>),
}

impl FeedEvent {
    pub fn paths(&self) -> &[Path] {
        match self {
            FeedEvent::Table(paths) => paths,
            FeedEvent::Paths(paths) => paths,
        }
    }
}

impl fmt::Display for FeedEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FeedEvent::Table(paths) => write!(f, "table snapshot ({} paths)", paths.len()),
            FeedEvent::Paths(paths) => write!(f, "path update ({} paths)", paths.len()),
        }
    }
}

/// Read side of the worker: mode, pass count and the latest report
#[derive(Clone)]
pub struct SyncStatus {
    mode: SyncMode,
    last_report: Arc<RwLock<Option<SyncReport>>>,
    passes: Arc<RwLock<usize>>,
}

impl SyncStatus {
    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    pub async fn last_report(&self) -> Option<SyncReport> {
        self.last_report.read().await.clone()
    }

    /// Number of passes completed since startup
    pub async fn passes(&self) -> usize {
        *self.passes.read().await
    }
}

/// Feed adapters submit events here. The worker stops once every handle is dropped
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::Sender<FeedEvent>,
    queue_depth: usize,
    status: SyncStatus,
}

impl SyncHandle {
    /// Queue an event, waiting for room if the queue is full.
    /// Fails only if the worker has stopped
    pub async fn submit(&self, event: FeedEvent) -> Result<(), String> {
        self.tx
            .send(event)
            .await
            .map_err(|_| "Route sync worker is not running".to_string())
    }

    pub fn status(&self) -> SyncStatus {
        self.status.clone()
    }

    /// Events waiting to be processed
    pub fn queued(&self) -> usize {
        self.queue_depth - self.tx.capacity()
    }
}

/// Owns the [`Reconciler`] and runs one pass at a time, in arrival order
pub struct SyncWorker {
    reconciler: Reconciler,
    mode: SyncMode,
    rx: mpsc::Receiver<FeedEvent>,
    last_report: Arc<RwLock<Option<SyncReport>>>,
    passes: Arc<RwLock<usize>>,
}

impl SyncWorker {
    pub fn new(reconciler: Reconciler, mode: SyncMode, queue_depth: usize) -> (Self, SyncHandle) {
        let queue_depth = queue_depth.max(1);
        let (tx, rx) = mpsc::channel(queue_depth);
        let last_report = Arc::new(RwLock::new(None));
        let passes = Arc::new(RwLock::new(0));
        let handle = SyncHandle {
            tx,
            queue_depth,
            status: SyncStatus {
                mode,
                last_report: last_report.clone(),
                passes: passes.clone(),
            },
        };
        let worker = Self {
            reconciler,
            mode,
            rx,
            last_report,
            passes,
        };
        (worker, handle)
    }

    /// Run on the current runtime until every [`SyncHandle`] is dropped
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        info!("Route sync worker started in {} mode", self.mode);
        while let Some(event) = self.rx.recv().await {
            let event = self.coalesce(event);
            if let Some(report) = self.process(event).await {
                if !report.is_clean() {
                    for failure in &report.failures {
                        error!("{}", failure);
                    }
                }
                *self.passes.write().await += 1;
                *self.last_report.write().await = Some(report);
            }
        }
        info!("Route sync worker stopped");
    }

    /// In full mode only the newest non-empty queued snapshot matters
    fn coalesce(&mut self, mut event: FeedEvent) -> FeedEvent {
        if self.mode != SyncMode::Full {
            return event;
        }
        while let Ok(next) = self.rx.try_recv() {
            match next {
                FeedEvent::Table(ref paths) if paths.is_empty() => {
                    debug!("Skipping empty {}", next);
                }
                FeedEvent::Table(_) => {
                    debug!("Superseding {} with a newer snapshot", event);
                    event = next;
                }
                FeedEvent::Paths(_) => {
                    warn!("Ignoring {} in full sync mode", next);
                }
            }
        }
        event
    }

    async fn process(&mut self, event: FeedEvent) -> Option<SyncReport> {
        if event.paths().is_empty() {
            debug!("Skipping empty {}", event);
            return None;
        }
        debug!("Processing {}", event);
        match (self.mode, event) {
            (SyncMode::Full, FeedEvent::Table(paths)) => {
                Some(self.reconciler.sync_table(&paths).await)
            }
            (SyncMode::Full, event @ FeedEvent::Paths(_)) => {
                warn!("Ignoring {} in full sync mode", event);
                None
            }
            (SyncMode::Incremental, FeedEvent::Table(paths))
            | (SyncMode::Incremental, FeedEvent::Paths(paths)) => {
                Some(self.reconciler.apply_paths(&paths).await)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fib::{MemoryTable, RouteTable};
    use crate::rib::{Family, Nlri};
    use bgp_rs::{NLRIEncoding, PathAttribute, Prefix, AFI};
    use std::time::Duration;

    fn path(octets: [u8; 4], length: u8) -> Path {
        Path::new(
            Family::ipv4_unicast(),
            Nlri::Encoded(NLRIEncoding::IP(Prefix {
                protocol: AFI::IPV4,
                length,
                prefix: octets.to_vec(),
            })),
            vec![PathAttribute::NEXT_HOP("192.0.2.1".parse().unwrap())],
        )
    }

    fn worker(table: &Arc<MemoryTable>, mode: SyncMode) -> (SyncWorker, SyncHandle) {
        let reconciler = Reconciler::new(table.clone(), Duration::from_secs(1));
        SyncWorker::new(reconciler, mode, 8)
    }

    #[tokio::test]
    async fn test_full_sync_end_to_end() {
        let table = Arc::new(MemoryTable::new());
        let (worker, handle) = worker(&table, SyncMode::Full);
        let task = worker.spawn();

        handle
            .submit(FeedEvent::Table(vec![path([10, 1, 0, 0], 16), path([10, 2, 0, 0], 16)]))
            .await
            .unwrap();
        handle
            .submit(FeedEvent::Table(vec![path([10, 2, 0, 0], 16)]))
            .await
            .unwrap();
        let reader = handle.status();
        drop(handle);
        task.await.unwrap();

        let keys: Vec<String> = table.list().await.unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["10.2.0.0/16"]);
        let report = reader.last_report().await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.mode, SyncMode::Full);
    }

    #[tokio::test]
    async fn test_snapshots_coalesce() {
        let table = Arc::new(MemoryTable::new());
        let (worker, handle) = worker(&table, SyncMode::Full);
        // Queue everything before the worker runs
        for octet in 1..=3 {
            handle
                .submit(FeedEvent::Table(vec![path([10, octet, 0, 0], 16)]))
                .await
                .unwrap();
        }
        let reader = handle.status();
        drop(handle);
        worker.run().await;

        assert_eq!(reader.passes().await, 1);
        let keys: Vec<String> = table.routes().await.keys().cloned().collect();
        assert_eq!(keys, vec!["10.3.0.0/16"]);
    }

    #[tokio::test]
    async fn test_empty_snapshot_skipped() {
        let table = Arc::new(MemoryTable::new());
        let (worker, handle) = worker(&table, SyncMode::Full);
        handle.submit(FeedEvent::Table(vec![])).await.unwrap();
        let reader = handle.status();
        drop(handle);
        worker.run().await;
        assert!(reader.last_report().await.is_none());
        assert!(table.ops().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_snapshot_doesnt_supersede() {
        let table = Arc::new(MemoryTable::new());
        let (worker, handle) = worker(&table, SyncMode::Full);
        handle
            .submit(FeedEvent::Table(vec![path([10, 1, 0, 0], 16)]))
            .await
            .unwrap();
        handle.submit(FeedEvent::Table(vec![])).await.unwrap();
        let reader = handle.status();
        drop(handle);
        worker.run().await;

        assert_eq!(reader.passes().await, 1);
        let keys: Vec<String> = table.routes().await.keys().cloned().collect();
        assert_eq!(keys, vec!["10.1.0.0/16"]);
    }

    #[tokio::test]
    async fn test_paths_ignored_in_full_mode() {
        let table = Arc::new(MemoryTable::new());
        let (worker, handle) = worker(&table, SyncMode::Full);
        handle
            .submit(FeedEvent::Paths(vec![path([10, 1, 0, 0], 16)]))
            .await
            .unwrap();
        drop(handle);
        worker.run().await;
        assert!(table.ops().await.is_empty());
    }

    #[tokio::test]
    async fn test_incremental_worker() {
        let table = Arc::new(MemoryTable::new());
        let (worker, handle) = worker(&table, SyncMode::Incremental);
        handle
            .submit(FeedEvent::Paths(vec![path([10, 1, 0, 0], 16)]))
            .await
            .unwrap();
        handle
            .submit(FeedEvent::Paths(vec![path([10, 2, 0, 0], 16)]))
            .await
            .unwrap();
        handle
            .submit(FeedEvent::Paths(vec![path([10, 1, 0, 0], 16).withdraw()]))
            .await
            .unwrap();
        assert_eq!(handle.queued(), 3);
        let reader = handle.status();
        drop(handle);
        worker.run().await;

        assert_eq!(reader.passes().await, 3);
        let keys: Vec<String> = table.routes().await.keys().cloned().collect();
        assert_eq!(keys, vec!["10.2.0.0/16"]);
    }
}
