use std::fs::File;
use std::io::{self, Read};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde::Deserialize;
use toml;

use crate::sync::SyncMode;

struct Defaults {}

impl Defaults {
    fn router_id() -> IpAddr {
        IpAddr::from(Ipv4Addr::new(255, 255, 255, 255))
    }

    fn local_as() -> u32 {
        64513
    }

    fn mode() -> SyncMode {
        SyncMode::Full
    }

    fn mutation_timeout_ms() -> u64 {
        2000
    }

    fn queue_depth() -> usize {
        16
    }

    fn api_addr() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 8080))
    }

    fn backend() -> Backend {
        Backend::Kernel
    }

    fn protocol() -> String {
        "bgp".to_string()
    }
}

/// Which forwarding plane routes end up in
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Kernel routing table, through iproute2
    Kernel,
    /// Held in memory only (dry run)
    Memory,
}

#[derive(Clone, Debug, Deserialize)]
pub(super) struct ForwardingConfigSpec {
    #[serde(default = "Defaults::backend")]
    pub(super) backend: Backend,
    // Routes we own are tagged with this iproute2 protocol (name or number)
    #[serde(default = "Defaults::protocol")]
    pub(super) protocol: String,
}

impl Default for ForwardingConfigSpec {
    fn default() -> Self {
        Self {
            backend: Defaults::backend(),
            protocol: Defaults::protocol(),
        }
    }
}

/// Config (toml) representation of a Peer.
/// Only used to bootstrap the BGP engine, routes never depend on it
#[derive(Clone, Debug, Deserialize)]
pub(super) struct PeerConfigSpec {
    pub(super) remote_ip: IpAddr,
    pub(super) remote_as: u32,
    // Will defer to server config if not provided
    pub(super) local_as: Option<u32>,
    #[serde(default = "String::new")]
    pub(super) description: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct ServerConfigSpec {
    #[serde(default = "Defaults::router_id")]
    pub(super) router_id: IpAddr,
    #[serde(default = "Defaults::local_as")]
    pub(super) local_as: u32,
    // Full table reconciliation or path-by-path updates
    #[serde(default = "Defaults::mode")]
    pub(super) mode: SyncMode,
    // Deadline for each forwarding-plane operation
    #[serde(default = "Defaults::mutation_timeout_ms")]
    pub(super) mutation_timeout_ms: u64,
    // Feed events allowed to wait for the sync worker
    #[serde(default = "Defaults::queue_depth")]
    pub(super) queue_depth: usize,
    #[serde(default = "Defaults::api_addr")]
    pub(super) api_addr: SocketAddr,
    #[serde(default)]
    pub(super) forwarding: ForwardingConfigSpec,
    #[serde(default = "Vec::new")]
    pub(super) peers: Vec<PeerConfigSpec>,
}

impl ServerConfigSpec {
    pub(super) fn from_file(path: &str) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        Self::from_str(&contents)
    }

    pub(super) fn from_str(contents: &str) -> io::Result<Self> {
        toml::from_str(contents).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
    }
}
