use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bgp_rs::{MPReachNLRI, NLRIEncoding, PathAttribute};
use log::trace;

use super::{encoding_name, DestinationPrefix, Nlri, Path};
use crate::error::PathError;

/// Next-hop and destinations recovered from a path's attributes
#[derive(Clone, Debug, PartialEq)]
pub struct Decoded {
    pub next_hop: IpAddr,
    /// Destinations from MP_REACH_NLRI, in the order they were carried.
    /// Empty when the next-hop came from a NEXT_HOP attribute
    pub prefixes: Vec<DestinationPrefix>,
}

/// The attribute variants that can yield a next-hop
enum NextHopSource<'a> {
    NextHop(IpAddr),
    MpReach(&'a MPReachNLRI),
}

impl<'a> NextHopSource<'a> {
    fn classify(attr: &'a PathAttribute) -> Option<Self> {
        match attr {
            PathAttribute::NEXT_HOP(next_hop) => Some(NextHopSource::NextHop(*next_hop)),
            PathAttribute::MP_REACH_NLRI(reach) => Some(NextHopSource::MpReach(reach)),
            _ => None,
        }
    }

    fn decode(self) -> Result<Decoded, PathError> {
        match self {
            NextHopSource::NextHop(next_hop) => Ok(Decoded {
                next_hop,
                prefixes: vec![],
            }),
            NextHopSource::MpReach(reach) => {
                let prefixes = reach
                    .announced_routes
                    .iter()
                    .map(record_prefix)
                    .collect::<Result<Vec<_>, _>>()?;
                let next_hop = next_hop_from_bytes(&reach.next_hop)?;
                Ok(Decoded { next_hop, prefixes })
            }
        }
    }
}

/// Recover the next-hop (and any MP_REACH_NLRI destinations) for an IP Unicast path.
///
/// Attributes are scanned in order: the first NEXT_HOP or MP_REACH_NLRI that carries a
/// next-hop wins. An MP_REACH_NLRI with an empty next-hop field doesn't end the search.
pub fn decode(path: &Path) -> Result<Decoded, PathError> {
    path.family()?;
    nlri_prefix(path)?;

    for attr in &path.attributes {
        let source = match NextHopSource::classify(attr) {
            Some(source) => source,
            None => continue,
        };
        match source.decode() {
            Ok(decoded) => return Ok(decoded),
            Err(PathError::NoNextHopInAttribute) => {
                trace!("{}: MP_REACH_NLRI without next hop, continuing", path);
                continue;
            }
            Err(err) => return Err(err),
        }
    }
    Err(PathError::NoNextHopFound)
}

/// Destinations named by a path without requiring a next-hop (used for withdrawals):
/// the path's own NLRI prefix followed by any MP_REACH_NLRI records
pub fn decode_prefixes(path: &Path) -> Result<Vec<DestinationPrefix>, PathError> {
    path.family()?;
    let mut prefixes = vec![nlri_prefix(path)?];
    for attr in &path.attributes {
        if let PathAttribute::MP_REACH_NLRI(reach) = attr {
            for record in &reach.announced_routes {
                let prefix = record_prefix(record)?;
                if !prefixes.contains(&prefix) {
                    prefixes.push(prefix);
                }
            }
        }
    }
    Ok(prefixes)
}

/// The path's own NLRI, which must be a plain IP prefix
pub fn nlri_prefix(path: &Path) -> Result<DestinationPrefix, PathError> {
    match &path.nlri {
        None => Err(PathError::MissingNlri),
        Some(Nlri::Encoded(NLRIEncoding::IP(prefix))) => DestinationPrefix::from_bgp(prefix),
        Some(Nlri::Invalid(reason)) => Err(PathError::Unparseable(reason.clone())),
        Some(nlri) => Err(PathError::InvalidNlriType(nlri.encoding())),
    }
}

/// Plain and labeled records both reduce to address + length
fn record_prefix(record: &NLRIEncoding) -> Result<DestinationPrefix, PathError> {
    match record {
        NLRIEncoding::IP(prefix) => DestinationPrefix::from_bgp(prefix),
        NLRIEncoding::IP_MPLS((prefix, _label)) => DestinationPrefix::from_bgp(prefix),
        other => Err(PathError::UnsupportedNlri(encoding_name(other).to_string())),
    }
}

/// MP_REACH_NLRI next-hop field: 4 bytes (IPv4), 16 bytes (IPv6),
/// or 32 bytes (IPv6 global + link-local, the global address is used)
fn next_hop_from_bytes(bytes: &[u8]) -> Result<IpAddr, PathError> {
    match bytes.len() {
        0 => Err(PathError::NoNextHopInAttribute),
        4 => Ok(IpAddr::from(Ipv4Addr::new(
            bytes[0], bytes[1], bytes[2], bytes[3],
        ))),
        16 | 32 => {
            let mut buffer = [0u8; 16];
            buffer.copy_from_slice(&bytes[..16]);
            Ok(IpAddr::from(Ipv6Addr::from(buffer)))
        }
        len => Err(PathError::InvalidNextHop(len)),
    }
}
