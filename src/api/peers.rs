use crate::api::rpc::PeerSummary;
use crate::config::PeerConfig;

impl From<&PeerConfig> for PeerSummary {
    fn from(config: &PeerConfig) -> PeerSummary {
        PeerSummary {
            peer: config.remote_ip,
            remote_asn: config.remote_as,
            local_asn: config.local_as,
            ebgp: config.is_ebgp(),
            description: config.description.clone(),
        }
    }
}
