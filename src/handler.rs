use std::error::Error;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::api::ApiHandler;
use crate::config::{Backend, ServerConfig};
use crate::feed::read_feed;
use crate::fib::{KernelTable, MemoryTable, RouteTable};
use crate::sync::{Reconciler, SyncWorker};

// How long an in-flight pass gets to finish once we're asked to stop
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn route_table(config: &ServerConfig) -> Arc<dyn RouteTable> {
    match config.forwarding.backend {
        Backend::Kernel => Arc::new(KernelTable::new(&config.forwarding.protocol)),
        Backend::Memory => {
            warn!("Using in-memory route table, nothing will be installed");
            Arc::new(MemoryTable::new())
        }
    }
}

/// Run the route sync daemon until `shutdown` completes.
///
/// Feed events come in over the JSON-RPC API, and also from stdin when `stdin_feed` is set
pub async fn serve<F>(
    config: ServerConfig,
    stdin_feed: bool,
    shutdown: F,
) -> Result<(), Box<dyn Error + Send + Sync>>
where
    F: Future<Output = ()>,
{
    let config = Arc::new(config);
    info!(
        "Starting route sync [router-id {}, AS {}, mode {}]",
        config.router_id, config.local_as, config.mode
    );
    debug!("Found {} peers in config", config.peers.len());

    let table = route_table(&config);
    let reconciler = Reconciler::new(table.clone(), config.mutation_timeout);
    let (worker, handle) = SyncWorker::new(reconciler, config.mode, config.queue_depth);
    let worker_task = worker.spawn();

    let api = ApiHandler::new(handle.clone(), table, config.clone());
    let server = api.serve(config.api_addr).await?;

    if stdin_feed {
        let handle = handle.clone();
        tokio::spawn(async move {
            info!("Reading feed from stdin");
            if let Err(err) = read_feed(tokio::io::stdin(), handle).await {
                error!("Error reading stdin feed: {}", err);
            }
        });
    }
    drop(handle);

    shutdown.await;
    info!("Stopping route sync...");
    match server.stop() {
        Ok(server_task) => {
            if let Err(err) = server_task.await {
                warn!("JSON-RPC server did not stop cleanly: {}", err);
            }
        }
        Err(err) => warn!("Error stopping JSON-RPC server: {}", err),
    }
    // Stdin reader (if any) still holds a handle, so don't wait forever on the worker
    if tokio::time::timeout(SHUTDOWN_GRACE, worker_task)
        .await
        .is_err()
    {
        warn!("Route sync worker still busy, exiting anyway");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ForwardingConfig, PeerConfig};
    use crate::sync::SyncMode;

    fn config() -> ServerConfig {
        ServerConfig {
            router_id: "255.255.255.255".parse().unwrap(),
            local_as: 64513,
            mode: SyncMode::Incremental,
            mutation_timeout: Duration::from_millis(500),
            queue_depth: 4,
            api_addr: "127.0.0.1:0".parse().unwrap(),
            forwarding: ForwardingConfig {
                backend: Backend::Memory,
                protocol: "bgp".to_string(),
            },
            peers: vec![PeerConfig {
                remote_ip: "192.0.2.2".parse().unwrap(),
                remote_as: 65001,
                local_as: 64513,
                description: String::new(),
            }],
        }
    }

    #[tokio::test]
    async fn test_serve_until_shutdown() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let daemon = tokio::spawn(async move {
            serve(config(), false, async {
                rx.await.ok();
            })
            .await
            .map_err(|err| err.to_string())
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(()).unwrap();
        assert!(daemon.await.unwrap().is_ok());
    }
}
