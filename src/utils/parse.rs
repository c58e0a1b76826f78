use std::convert::TryFrom;
use std::error::Error;
use std::fmt;
use std::io;
use std::net::{AddrParseError, IpAddr};
use std::num::ParseIntError;

use bgp_rs::{
    ASPath, MPReachNLRI, NLRIEncoding, Origin, PathAttribute, Prefix, Segment, AFI, SAFI,
};

use crate::api::{AttributeSpec, NlriSpec, PathSpec, PrefixSpec};
use crate::rib::{Nlri, Path};

#[derive(Debug)]
pub struct ParseError {
    pub reason: String,
}

impl ParseError {
    pub fn new(reason: String) -> Self {
        ParseError { reason }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParseError: {}", self.reason)
    }
}

impl Error for ParseError {}

impl From<io::Error> for ParseError {
    fn from(error: io::Error) -> Self {
        ParseError::new(error.to_string())
    }
}

/// Convert an ASN string to a u32
/// E.g. "65000.100" -> 4259840100
pub fn asn_from_dotted(value: &str) -> Result<u32, ParseError> {
    let (high, low) = match value.split_once('.') {
        Some((high, low)) => {
            let high: u32 = high
                .parse()
                .map_err(|err| ParseError::new(format!("{} '{}'", err, value)))?;
            let low: u32 = low
                .parse()
                .map_err(|err| ParseError::new(format!("{} '{}'", err, value)))?;
            if high > u16::MAX as u32 || low > u16::MAX as u32 {
                return Err(ParseError::new(format!("Unsupported ASN '{}'", value)));
            }
            (high, low)
        }
        // Plain 4 byte ASN (E.g. "4259840100")
        None => (
            0,
            value
                .parse()
                .map_err(|err| ParseError::new(format!("{} '{}'", err, value)))?,
        ),
    };
    Ok((high << 16) + low)
}

/// Convert a CIDR prefix (E.g. "192.168.0.0/24") to a bgp_rs::Prefix.
/// The length isn't checked against the address width here, that's
/// left to path decoding
/// ```
/// use routesync::utils::prefix_from_str;
/// let prefix = prefix_from_str("192.168.10.0/24").unwrap();
/// assert_eq!(prefix.length, 24);
/// ```
pub fn prefix_from_str(prefix: &str) -> Result<Prefix, ParseError> {
    let (addr, mask) = prefix
        .split_once('/')
        .ok_or_else(|| ParseError::new(format!("Not a valid prefix: '{}'", prefix)))?;
    let addr: IpAddr = addr
        .parse()
        .map_err(|err: AddrParseError| ParseError::new(format!("{} '{}'", err, prefix)))?;
    let length: u8 = mask
        .parse()
        .map_err(|err: ParseIntError| ParseError::new(format!("{} '{}'", err, prefix)))?;
    let (protocol, octets) = match addr {
        IpAddr::V4(v4) => (AFI::IPV4, v4.octets().to_vec()),
        IpAddr::V6(v6) => (AFI::IPV6, v6.octets().to_vec()),
    };
    Ok(Prefix {
        protocol,
        length,
        prefix: octets,
    })
}

/// Convert an API path into a [`Path`]. Only the JSON shape is checked here:
/// unknown families and unusable NLRI still convert, so they can be
/// reported per path when the path is decoded
pub fn try_parse_path_spec(spec: &PathSpec) -> Result<Path, ParseError> {
    let nlri = spec.nlri.as_ref().map(parse_nlri).transpose()?;
    let attributes = spec
        .attributes
        .iter()
        .map(parse_attribute)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Path {
        afi: spec.afi,
        safi: spec.safi,
        nlri,
        attributes,
        withdrawn: spec.withdrawn,
        source: spec.source,
    })
}

/// Like [`try_parse_path_spec`], but an unparseable path becomes an invalid
/// [`Path`] that fails decoding, so one bad path can't sink a whole batch
pub fn parse_path_spec(spec: &PathSpec) -> Path {
    match try_parse_path_spec(spec) {
        Ok(path) => path,
        Err(err) => {
            let mut path = Path::invalid(spec.afi, spec.safi, err.reason);
            path.withdrawn = spec.withdrawn;
            path.source = spec.source;
            path
        }
    }
}

pub fn parse_path_specs(specs: &[PathSpec]) -> Vec<Path> {
    specs.iter().map(parse_path_spec).collect()
}

fn parse_nlri(spec: &NlriSpec) -> Result<Nlri, ParseError> {
    let nlri = match spec {
        NlriSpec::Prefix { prefix } => Nlri::Encoded(NLRIEncoding::IP(prefix_from_str(prefix)?)),
        NlriSpec::Labeled { prefix, label } => {
            Nlri::Encoded(NLRIEncoding::IP_MPLS((prefix_from_str(prefix)?, *label)))
        }
        NlriSpec::Other { encoding } => Nlri::Other(encoding.to_uppercase()),
    };
    Ok(nlri)
}

fn parse_prefix_spec(spec: &PrefixSpec) -> Result<NLRIEncoding, ParseError> {
    let prefix = prefix_from_str(&spec.prefix)?;
    Ok(match spec.label {
        Some(label) => NLRIEncoding::IP_MPLS((prefix, label)),
        None => NLRIEncoding::IP(prefix),
    })
}

fn parse_attribute(spec: &AttributeSpec) -> Result<PathAttribute, ParseError> {
    let attribute = match spec {
        AttributeSpec::NextHop { next_hop } => PathAttribute::NEXT_HOP(*next_hop),
        AttributeSpec::MpReach {
            afi,
            safi,
            next_hop,
            link_local,
            nlri,
        } => {
            let mut next_hop_bytes = next_hop.map(ip_octets).unwrap_or_default();
            if let Some(link_local) = link_local {
                next_hop_bytes.extend(ip_octets(*link_local));
            }
            PathAttribute::MP_REACH_NLRI(MPReachNLRI {
                afi: AFI::try_from(*afi)?,
                safi: SAFI::try_from(*safi)?,
                next_hop: next_hop_bytes,
                announced_routes: nlri
                    .iter()
                    .map(parse_prefix_spec)
                    .collect::<Result<Vec<_>, _>>()?,
            })
        }
        AttributeSpec::Origin { origin } => PathAttribute::ORIGIN(match origin.to_lowercase().as_str() {
            "igp" => Origin::IGP,
            "egp" => Origin::EGP,
            _ => Origin::INCOMPLETE,
        }),
        AttributeSpec::AsPath { as_path } => {
            let asns = as_path
                .iter()
                .map(|asn| asn_from_dotted(asn))
                .collect::<Result<Vec<_>, _>>()?;
            PathAttribute::AS_PATH(ASPath {
                segments: vec![Segment::AS_SEQUENCE(asns)],
            })
        }
        AttributeSpec::LocalPref { local_pref } => PathAttribute::LOCAL_PREF(*local_pref),
        AttributeSpec::MultiExitDisc { med } => PathAttribute::MULTI_EXIT_DISC(*med),
    };
    Ok(attribute)
}

fn ip_octets(addr: IpAddr) -> Vec<u8> {
    match addr {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{FamilyDispatcher, PathAction};
    use crate::error::ErrorKind;

    #[test]
    fn test_asn_from_dotted() {
        assert_eq!(asn_from_dotted("100").unwrap(), 100);
        assert_eq!(asn_from_dotted("65000.100").unwrap(), 4259840100);
        assert_eq!(asn_from_dotted("4259840100").unwrap(), 4259840100);
        assert!(asn_from_dotted("4259840100.200").is_err());
        assert!(asn_from_dotted("200.4259840100").is_err());
        assert!(asn_from_dotted("100.200300").is_err());
        assert!(asn_from_dotted("test").is_err());
    }

    #[test]
    fn test_prefix_from_string() {
        let prefix = prefix_from_str("1.1.1.0/24").unwrap();
        assert_eq!(prefix.length, 24);
        assert_eq!(prefix.prefix, [1, 1, 1, 0]);

        let prefix = prefix_from_str("2001:10::2/64").unwrap();
        assert_eq!(prefix.length, 64);
        assert_eq!(
            prefix.prefix,
            [32, 1, 0, 16, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2]
        );
        // Out of range lengths are caught when the path is decoded
        assert_eq!(prefix_from_str("10.0.0.0/40").unwrap().length, 40);
        assert!(prefix_from_str("10.0.0.0").is_err());
        assert!(prefix_from_str("ten/8").is_err());
    }

    #[test]
    fn test_parse_unicast_spec() {
        let spec = PathSpec::prefix(1, 1, "10.1.0.0/16", "192.0.2.1".parse().unwrap());
        let path = try_parse_path_spec(&spec).unwrap();
        assert_eq!((path.afi, path.safi), (1, 1));
        let action = FamilyDispatcher::new().handle(&path).unwrap();
        match action {
            PathAction::Install(routes) => {
                assert_eq!(routes.len(), 1);
                assert_eq!(routes[0].to_string(), "10.1.0.0/16 via 192.0.2.1");
            }
            other => panic!("Unexpected action: {}", other),
        }
    }

    #[test]
    fn test_parse_mp_reach_spec() {
        let spec = PathSpec {
            afi: 2,
            safi: 1,
            nlri: Some(NlriSpec::Prefix {
                prefix: "2001:db8:1::/48".to_string(),
            }),
            attributes: vec![AttributeSpec::MpReach {
                afi: 2,
                safi: 1,
                next_hop: Some("2001:db8::1".parse().unwrap()),
                link_local: Some("fe80::1".parse().unwrap()),
                nlri: vec![PrefixSpec {
                    prefix: "2001:db8:2::/48".to_string(),
                    label: Some(100),
                }],
            }],
            withdrawn: false,
            source: None,
        };
        let path = try_parse_path_spec(&spec).unwrap();
        match &path.attributes[0] {
            PathAttribute::MP_REACH_NLRI(mp) => {
                assert_eq!(mp.next_hop.len(), 32);
                assert_eq!(mp.announced_routes.len(), 1);
            }
            _ => panic!("Expected MP_REACH_NLRI"),
        }
        let keys: Vec<String> = match FamilyDispatcher::new().handle(&path).unwrap() {
            PathAction::Install(routes) => routes.iter().map(|r| r.key()).collect(),
            other => panic!("Unexpected action: {}", other),
        };
        assert_eq!(keys, vec!["2001:db8:2::/48", "2001:db8:1::/48"]);
    }

    #[test]
    fn test_unknown_family_still_parses() {
        let spec = PathSpec::prefix(99, 99, "10.1.0.0/16", "192.0.2.1".parse().unwrap());
        let path = try_parse_path_spec(&spec).unwrap();
        let err = FamilyDispatcher::new().handle(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedAddressFamily);
        assert_eq!(err.to_string(), "Unsupported AFI/SAFI: 99/99");
    }

    #[test]
    fn test_parse_batch_keeps_good_paths() {
        let next_hop = "192.0.2.1".parse().unwrap();
        let mut bad_nlri = PathSpec::prefix(1, 1, "10.2.0.0/16", next_hop);
        bad_nlri.nlri = Some(NlriSpec::Prefix {
            prefix: "10.2.0.0".to_string(),
        });
        let mut bad_attr = PathSpec::prefix(1, 1, "10.4.0.0/16", next_hop);
        bad_attr.attributes.push(AttributeSpec::MpReach {
            afi: 77,
            safi: 1,
            next_hop: Some(next_hop),
            link_local: None,
            nlri: vec![],
        });
        let specs = vec![
            PathSpec::prefix(1, 1, "10.1.0.0/16", next_hop),
            bad_nlri,
            PathSpec::prefix(1, 1, "10.3.0.0/16", next_hop),
            bad_attr,
        ];
        let paths = parse_path_specs(&specs);
        assert_eq!(paths.len(), 4);

        let dispatcher = FamilyDispatcher::new();
        assert!(dispatcher.handle(&paths[0]).is_ok());
        assert!(dispatcher.handle(&paths[2]).is_ok());
        for bad in &[&paths[1], &paths[3]] {
            let err = dispatcher.handle(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MalformedPath);
        }
        assert!(dispatcher
            .handle(&paths[1])
            .unwrap_err()
            .to_string()
            .contains("'10.2.0.0'"));
    }
}
