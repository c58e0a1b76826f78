use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use bgp_rs::{Prefix, AFI};
use ipnetwork::IpNetwork;

use crate::error::PathError;

/// Address family marker for a destination
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Flag handed to iproute2 for this family
    pub fn ip_flag(self) -> &'static str {
        match self {
            AddressFamily::V4 => "-4",
            AddressFamily::V6 => "-6",
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AddressFamily::V4 => write!(f, "IPv4"),
            AddressFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// A destination network with its host bits cleared.
/// Identity is the canonical CIDR text (E.g. "10.1.0.0/16")
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct DestinationPrefix(IpNetwork);

impl DestinationPrefix {
    /// Build from an address and a prefix length measured in the address's own bit width
    pub fn new(addr: IpAddr, length: u8) -> Result<Self, PathError> {
        let octets = match addr {
            IpAddr::V4(v4) => v4.octets().to_vec(),
            IpAddr::V6(v6) => v6.octets().to_vec(),
        };
        let mask = network_mask(length, octets.len())?;
        let network: Vec<u8> = octets.iter().zip(mask.iter()).map(|(o, m)| o & m).collect();
        let network = IpNetwork::new(ip_from_octets(&network)?, length)
            .map_err(|err| PathError::InvalidPrefix(err.to_string()))?;
        Ok(Self(network))
    }

    /// Widen the (possibly truncated) prefix bytes BGP carries to a full address
    pub fn from_bgp(prefix: &Prefix) -> Result<Self, PathError> {
        let width = match prefix.protocol {
            AFI::IPV4 => 4,
            AFI::IPV6 => 16,
            afi => {
                return Err(PathError::InvalidPrefix(format!(
                    "no address width for {}",
                    afi
                )))
            }
        };
        if prefix.prefix.len() > width {
            return Err(PathError::InvalidPrefix(format!(
                "{} bytes for a {} byte address",
                prefix.prefix.len(),
                width
            )));
        }
        let mut octets = vec![0u8; width];
        octets[..prefix.prefix.len()].copy_from_slice(&prefix.prefix);
        Self::new(ip_from_octets(&octets)?, prefix.length)
    }

    pub fn network(&self) -> IpNetwork {
        self.0
    }

    pub fn addr(&self) -> IpAddr {
        self.0.ip()
    }

    pub fn length(&self) -> u8 {
        self.0.prefix()
    }

    pub fn mask(&self) -> IpAddr {
        self.0.mask()
    }

    pub fn family(&self) -> AddressFamily {
        match self.0 {
            IpNetwork::V4(_) => AddressFamily::V4,
            IpNetwork::V6(_) => AddressFamily::V6,
        }
    }

    /// Reconciliation key
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl From<IpNetwork> for DestinationPrefix {
    fn from(network: IpNetwork) -> Self {
        // Length already validated by IpNetwork, so clearing host bits can't fail
        match Self::new(network.ip(), network.prefix()) {
            Ok(prefix) => prefix,
            Err(_) => Self(network),
        }
    }
}

impl FromStr for DestinationPrefix {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let network: IpNetwork = s
            .parse()
            .map_err(|err| PathError::InvalidPrefix(format!("{} '{}'", err, s)))?;
        Self::new(network.ip(), network.prefix())
    }
}

impl fmt::Display for DestinationPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.0.ip(), self.0.prefix())
    }
}

/// Byte-aligned network mask of `length` one-bits over an address of `width` bytes
/// ```
/// use routesync::rib::network_mask;
/// assert_eq!(network_mask(24, 4).unwrap(), vec![255, 255, 255, 0]);
/// ```
pub fn network_mask(length: u8, width: usize) -> Result<Vec<u8>, PathError> {
    let bits = width * 8;
    if length as usize > bits {
        return Err(PathError::InvalidPrefix(format!(
            "/{} exceeds {} bit address",
            length, bits
        )));
    }
    let mut remaining = length as usize;
    let mask = (0..width)
        .map(|_| {
            let take = remaining.min(8);
            remaining -= take;
            // take == 0 would shift by 8, which overflows a u8
            if take == 0 {
                0
            } else {
                0xffu8 << (8 - take)
            }
        })
        .collect();
    Ok(mask)
}

fn ip_from_octets(octets: &[u8]) -> Result<IpAddr, PathError> {
    match octets.len() {
        4 => Ok(IpAddr::from(Ipv4Addr::new(
            octets[0], octets[1], octets[2], octets[3],
        ))),
        16 => {
            let mut buffer = [0u8; 16];
            buffer.copy_from_slice(octets);
            Ok(IpAddr::from(Ipv6Addr::from(buffer)))
        }
        len => Err(PathError::InvalidPrefix(format!(
            "{} byte address is neither IPv4 nor IPv6",
            len
        ))),
    }
}
