use std::net::SocketAddr;
use std::sync::Arc;

use ipnetwork::IpNetwork;
use jsonrpsee::core::{Error as RpcError, RpcResult};
use jsonrpsee::http_server::{HttpServerBuilder, HttpServerHandle};
use log::{debug, info};

use super::routes::{entry_to_route, route_in_filter};
use super::rpc::{ApiServer, InstalledRoute, PathSpec, PeerSummary, StatusSummary};
use crate::config::ServerConfig;
use crate::fib::RouteTable;
use crate::sync::{FeedEvent, SyncHandle};
use crate::utils::parse_path_specs;

/// JSON-RPC ingress for the BGP engine, and read-only views for operators
#[derive(Clone)]
pub struct ApiHandler {
    sync: SyncHandle,
    table: Arc<dyn RouteTable>,
    config: Arc<ServerConfig>,
}

impl ApiHandler {
    pub fn new(sync: SyncHandle, table: Arc<dyn RouteTable>, config: Arc<ServerConfig>) -> Self {
        Self {
            sync,
            table,
            config,
        }
    }

    async fn submit(&self, paths: &[PathSpec], snapshot: bool) -> RpcResult<usize> {
        let paths = parse_path_specs(paths);
        let count = paths.len();
        let event = if snapshot {
            FeedEvent::Table(paths)
        } else {
            FeedEvent::Paths(paths)
        };
        debug!("API received {}", event);
        self.sync.submit(event).await.map_err(RpcError::Custom)?;
        Ok(count)
    }

    pub async fn serve(self, socket: SocketAddr) -> Result<HttpServerHandle, RpcError> {
        info!("Starting JSON-RPC server on {}...", socket);
        let server = HttpServerBuilder::default().build(socket).await?;
        server.start(self.into_rpc())
    }
}

#[async_trait::async_trait]
impl ApiServer for ApiHandler {
    async fn push_table(&self, paths: Vec<PathSpec>) -> RpcResult<usize> {
        self.submit(&paths, true).await
    }

    async fn push_paths(&self, paths: Vec<PathSpec>) -> RpcResult<usize> {
        self.submit(&paths, false).await
    }

    async fn show_routes(&self, filter: Option<IpNetwork>) -> RpcResult<Vec<InstalledRoute>> {
        let routes = self
            .table
            .list()
            .await
            .map_err(|err| RpcError::Custom(err.to_string()))?;
        Ok(routes
            .routes()
            .filter(|route| match &filter {
                Some(filter) => route_in_filter(route, filter),
                None => true,
            })
            .map(entry_to_route)
            .collect())
    }

    async fn show_status(&self) -> RpcResult<StatusSummary> {
        let status = self.sync.status();
        Ok(StatusSummary {
            mode: status.mode().to_string(),
            backend: format!("{:?}", self.config.forwarding.backend).to_lowercase(),
            passes: status.passes().await,
            queued: self.sync.queued(),
            last_report: status.last_report().await,
        })
    }

    async fn show_peers(&self) -> RpcResult<Vec<PeerSummary>> {
        Ok(self.config.peers.iter().map(PeerSummary::from).collect())
    }
}
