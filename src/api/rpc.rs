use std::net::IpAddr;

use ipnetwork::IpNetwork;
use jsonrpsee::{core::RpcResult, proc_macros::rpc};
use serde::{self, Deserialize, Serialize};

use crate::sync::SyncReport;

#[rpc(client, server)]
pub trait Api {
    /// Queue a full best-path table. Returns the number of paths accepted
    #[method(name = "push_table")]
    async fn push_table(&self, paths: Vec<PathSpec>) -> RpcResult<usize>;
    /// Queue individual path updates. Returns the number of paths accepted
    #[method(name = "push_paths")]
    async fn push_paths(&self, paths: Vec<PathSpec>) -> RpcResult<usize>;
    #[method(name = "show_routes")]
    async fn show_routes(&self, filter: Option<IpNetwork>) -> RpcResult<Vec<InstalledRoute>>;
    #[method(name = "show_status")]
    async fn show_status(&self) -> RpcResult<StatusSummary>;
    #[method(name = "show_peers")]
    async fn show_peers(&self) -> RpcResult<Vec<PeerSummary>>;
}

/// A route currently held by the forwarding plane
#[derive(Debug, Deserialize, Serialize)]
pub struct InstalledRoute {
    pub family: String,
    pub prefix: String,
    pub next_hop: Option<IpAddr>,
    pub device: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StatusSummary {
    pub mode: String,
    pub backend: String,
    /// Passes completed since startup
    pub passes: usize,
    /// Feed events waiting for the worker
    pub queued: usize,
    pub last_report: Option<SyncReport>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PeerSummary {
    pub peer: IpAddr,
    pub remote_asn: u32,
    pub local_asn: u32,
    pub ebgp: bool,
    pub description: String,
}

/// API input for one best path (or withdrawal), as reported by the BGP engine
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PathSpec {
    /// Address Family Identifier (ipv4=1, ipv6=2, l2vpn=25)
    pub afi: u16,
    /// Subsequent AFI (unicast=1, evpn=70, flowspec=133)
    pub safi: u8,
    pub nlri: Option<NlriSpec>,
    #[serde(default = "Vec::new")]
    pub attributes: Vec<AttributeSpec>,
    #[serde(default)]
    pub withdrawn: bool,
    /// Peer the path was learned from
    pub source: Option<IpAddr>,
}

/// Reachability information of a path
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NlriSpec {
    /// IP prefix (E.g. "100.1.0.0/16" or "2620:100:ab::/64")
    Prefix { prefix: String },
    /// Labeled IP prefix
    Labeled { prefix: String, label: u32 },
    /// Anything that isn't an IP prefix (E.g. "evpn"), carried by name only
    Other { encoding: String },
}

/// A prefix inside an MP_REACH_NLRI attribute
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PrefixSpec {
    pub prefix: String,
    pub label: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttributeSpec {
    NextHop {
        next_hop: IpAddr,
    },
    MpReach {
        afi: u16,
        safi: u8,
        /// Omitted next hop is sent as an empty field
        next_hop: Option<IpAddr>,
        /// IPv6 link-local next hop, sent after the global one
        link_local: Option<IpAddr>,
        #[serde(default = "Vec::new")]
        nlri: Vec<PrefixSpec>,
    },
    Origin {
        origin: String,
    },
    AsPath {
        as_path: Vec<String>,
    },
    LocalPref {
        local_pref: u32,
    },
    MultiExitDisc {
        med: u32,
    },
}

impl PathSpec {
    /// Plain prefix path with a NEXT_HOP attribute
    pub fn prefix(afi: u16, safi: u8, prefix: &str, next_hop: IpAddr) -> Self {
        Self {
            afi,
            safi,
            nlri: Some(NlriSpec::Prefix {
                prefix: prefix.to_string(),
            }),
            attributes: vec![AttributeSpec::NextHop { next_hop }],
            withdrawn: false,
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_spec_json() {
        let spec: PathSpec = serde_json::from_str(
            r#"{
                "afi": 2, "safi": 1,
                "nlri": {"type": "prefix", "prefix": "2001:db8:1::/48"},
                "attributes": [
                    {"type": "mp_reach", "afi": 2, "safi": 1,
                     "next_hop": "2001:db8::1", "link_local": "fe80::1",
                     "nlri": [{"prefix": "2001:db8:2::/48"}]},
                    {"type": "as_path", "as_path": ["65001", "65000.100"]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(spec.afi, 2);
        assert!(!spec.withdrawn);
        assert_eq!(spec.attributes.len(), 2);
        match &spec.attributes[0] {
            AttributeSpec::MpReach { nlri, link_local, .. } => {
                assert_eq!(nlri[0].prefix, "2001:db8:2::/48");
                assert!(link_local.is_some());
            }
            other => panic!("Unexpected attribute: {:?}", other),
        }

        let spec: PathSpec =
            serde_json::from_str(r#"{"afi": 25, "safi": 70, "nlri": {"type": "other", "encoding": "evpn"}}"#)
                .unwrap();
        assert!(spec.attributes.is_empty());
        assert!(spec.source.is_none());
    }
}
