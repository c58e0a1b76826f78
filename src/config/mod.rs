mod file;

pub use file::Backend;

use std::io::Result;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::sync::SyncMode;

/// Parse a TOML config file and return a ServerConfig
pub fn from_file(path: &str) -> Result<ServerConfig> {
    let spec = file::ServerConfigSpec::from_file(path)?;
    Ok(ServerConfig::from_spec(spec))
}

#[derive(Debug)]
pub struct ServerConfig {
    pub router_id: IpAddr,
    pub local_as: u32,
    pub mode: SyncMode,
    pub mutation_timeout: Duration,
    pub queue_depth: usize,
    pub api_addr: SocketAddr,
    pub forwarding: ForwardingConfig,
    pub peers: Vec<PeerConfig>,
}

#[derive(Debug)]
pub struct ForwardingConfig {
    pub backend: Backend,
    pub protocol: String,
}

/// In-Memory representation of a Peer config
///   Has missing PeerConfigSpec items defaulted to Server values
#[derive(Debug)]
pub struct PeerConfig {
    pub remote_ip: IpAddr,
    pub remote_as: u32,
    pub local_as: u32,
    pub description: String,
}

impl PeerConfig {
    // Is this an eBGP session
    pub fn is_ebgp(&self) -> bool {
        self.remote_as != self.local_as
    }
}

impl ServerConfig {
    fn from_spec(spec: file::ServerConfigSpec) -> Self {
        let peers: Vec<_> = spec
            .peers
            .iter()
            .map(|p| PeerConfig {
                remote_ip: p.remote_ip,
                remote_as: p.remote_as,
                local_as: p.local_as.unwrap_or(spec.local_as),
                description: p.description.clone(),
            })
            .collect();

        Self {
            router_id: spec.router_id,
            local_as: spec.local_as,
            mode: spec.mode,
            mutation_timeout: Duration::from_millis(spec.mutation_timeout_ms),
            queue_depth: spec.queue_depth,
            api_addr: spec.api_addr,
            forwarding: ForwardingConfig {
                backend: spec.forwarding.backend,
                protocol: spec.forwarding.protocol,
            },
            peers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config() {
        let config = from_file("./demos/config.toml").unwrap();
        assert_eq!(config.mutation_timeout, Duration::from_millis(1500));
        assert_eq!(config.queue_depth, 4);
        let v4_peer = config
            .peers
            .iter()
            .find(|p| p.remote_ip == "192.0.2.2".parse::<IpAddr>().unwrap())
            .unwrap();
        // Falls back to the server ASN
        assert_eq!(v4_peer.local_as, 65000);
        assert!(v4_peer.is_ebgp());
    }
}
