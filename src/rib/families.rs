use std::convert::{From, TryFrom};
use std::fmt;

use bgp_rs::{AFI, SAFI};
use serde::{self, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::PathError;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Family {
    pub afi: AFI,
    pub safi: SAFI,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.afi, self.safi)
    }
}

impl Family {
    pub fn new(afi: AFI, safi: SAFI) -> Self {
        Self { afi, safi }
    }

    pub fn ipv4_unicast() -> Self {
        Self::new(AFI::IPV4, SAFI::Unicast)
    }

    pub fn ipv6_unicast() -> Self {
        Self::new(AFI::IPV6, SAFI::Unicast)
    }

    pub fn l2vpn_evpn() -> Self {
        Self::new(AFI::L2VPN, SAFI::Evpn)
    }

    /// Raw (AFI, SAFI) code points, as carried on the wire
    pub fn codes(self) -> (u16, u8) {
        (self.afi as u16, self.safi as u8)
    }
}

impl From<&Family> for (AFI, SAFI) {
    fn from(family: &Family) -> (AFI, SAFI) {
        (family.afi, family.safi)
    }
}

/// Resolve raw code points, keeping them around for diagnostics when either is unknown
impl TryFrom<(u16, u8)> for Family {
    type Error = PathError;

    fn try_from(v: (u16, u8)) -> Result<Self, Self::Error> {
        let (afi, safi) = v;
        if afi == 0 || safi == 0 {
            return Err(PathError::MissingFamily);
        }
        match (AFI::try_from(afi), SAFI::try_from(safi)) {
            (Ok(afi), Ok(safi)) => Ok(Self::new(afi, safi)),
            _ => Err(PathError::UnsupportedAddressFamily { afi, safi }),
        }
    }
}

impl Serialize for Family {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Family {
    fn deserialize<D>(deserializer: D) -> Result<Family, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let parts: Vec<&str> = s.trim().split_whitespace().collect();
        if parts.len() != 2 {
            return Err(serde::de::Error::custom(format!(
                "Incorrect family format: '{}'",
                s
            )));
        }
        let afi = match parts[0].to_lowercase().as_str() {
            "ipv4" => AFI::IPV4,
            "ipv6" => AFI::IPV6,
            "l2vpn" => AFI::L2VPN,
            family => {
                return Err(serde::de::Error::custom(format!(
                    "Unsupported AFI: '{}'",
                    family
                )))
            }
        };
        let safi = match parts[1].to_lowercase().as_str() {
            "unicast" => SAFI::Unicast,
            "flow" | "flowspec" => SAFI::Flowspec,
            "evpn" => SAFI::Evpn,
            sfamily => {
                return Err(serde::de::Error::custom(format!(
                    "Unsupported SAFI: '{}'",
                    sfamily
                )))
            }
        };
        Ok(Family::new(afi, safi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::value::{Error, StrDeserializer};
    use serde::de::IntoDeserializer;

    #[test]
    fn test_serialize_family() {
        assert_eq!(&Family::ipv4_unicast().to_string(), "IPv4 Unicast");
        assert_eq!(
            &Family::new(AFI::IPV6, SAFI::Flowspec).to_string(),
            "IPv6 Flowspec"
        );
    }

    #[test]
    fn test_deserialize_family() {
        let deserializer: StrDeserializer<Error> = "ipv6 unicast".into_deserializer();
        let family = Family::deserialize(deserializer).unwrap();
        assert_eq!(family, Family::ipv6_unicast());

        let deserializer: StrDeserializer<Error> = "ipv4 flow".into_deserializer();
        let family = Family::deserialize(deserializer).unwrap();
        assert_eq!(family, Family::new(AFI::IPV4, SAFI::Flowspec));

        let deserializer: StrDeserializer<Error> = "l2vpn evpn".into_deserializer();
        let family = Family::deserialize(deserializer).unwrap();
        assert_eq!(family, Family::l2vpn_evpn());
    }

    #[test]
    fn test_family_from_codes() {
        assert_eq!(Family::try_from((1, 1)), Ok(Family::ipv4_unicast()));
        assert_eq!(Family::try_from((25, 70)), Ok(Family::l2vpn_evpn()));
        assert_eq!(Family::try_from((0, 1)), Err(PathError::MissingFamily));
        assert_eq!(Family::try_from((1, 0)), Err(PathError::MissingFamily));
        assert_eq!(
            Family::try_from((99, 99)),
            Err(PathError::UnsupportedAddressFamily { afi: 99, safi: 99 })
        );
        assert_eq!(Family::ipv6_unicast().codes(), (2, 1));
    }
}
