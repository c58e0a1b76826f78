use std::convert::TryFrom;
use std::fmt;
use std::net::IpAddr;

use bgp_rs::{NLRIEncoding, PathAttribute};

use super::Family;
use crate::error::PathError;

/// Reachability information carried by a path, as reported by the BGP engine
#[derive(Clone, Debug)]
pub enum Nlri {
    /// Encodings bgp-rs knows how to represent (plain, labeled, flowspec, ...)
    Encoded(NLRIEncoding),
    /// Anything else the engine reported (E.g. EVPN routes), by encoding name
    Other(String),
    /// Input that couldn't be converted at ingress. [reason]
    Invalid(String),
}

impl Nlri {
    /// Short name of the encoding, for diagnostics
    pub fn encoding(&self) -> String {
        match self {
            Nlri::Encoded(nlri) => encoding_name(nlri).to_string(),
            Nlri::Other(name) => name.clone(),
            Nlri::Invalid(_) => "INVALID".to_string(),
        }
    }
}

pub(crate) fn encoding_name(nlri: &NLRIEncoding) -> &'static str {
    use NLRIEncoding::*;
    match nlri {
        IP(_) => "IP",
        IP_WITH_PATH_ID(_) => "IP_WITH_PATH_ID",
        IP_MPLS(_) => "IP_MPLS",
        IP_MPLS_WITH_PATH_ID(_) => "IP_MPLS_WITH_PATH_ID",
        IP_VPN_MPLS(_) => "IP_VPN_MPLS",
        L2VPN(_) => "L2VPN",
        FLOWSPEC(_) => "FLOWSPEC",
        #[allow(unreachable_patterns)]
        _ => "UNKNOWN",
    }
}

/// One best-path (or withdrawal) event from the BGP engine.
/// Owned by the feed for the duration of one decode
#[derive(Clone, Debug)]
pub struct Path {
    pub afi: u16,
    pub safi: u8,
    pub nlri: Option<Nlri>,
    pub attributes: Vec<PathAttribute>,
    pub withdrawn: bool,
    /// Peer the engine learned this path from, if known
    pub source: Option<IpAddr>,
}

impl Path {
    pub fn new(family: Family, nlri: Nlri, attributes: Vec<PathAttribute>) -> Self {
        let (afi, safi) = family.codes();
        Self {
            afi,
            safi,
            nlri: Some(nlri),
            attributes,
            withdrawn: false,
            source: None,
        }
    }

    /// Placeholder for input that couldn't be converted. Fails decoding with `reason`
    pub fn invalid(afi: u16, safi: u8, reason: String) -> Self {
        Self {
            afi,
            safi,
            nlri: Some(Nlri::Invalid(reason)),
            attributes: vec![],
            withdrawn: false,
            source: None,
        }
    }

    /// Same destination, flagged as a withdrawal
    pub fn withdraw(mut self) -> Self {
        self.withdrawn = true;
        self
    }

    pub fn family(&self) -> Result<Family, PathError> {
        Family::try_from((self.afi, self.safi))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let nlri = match &self.nlri {
            Some(Nlri::Encoded(NLRIEncoding::IP(prefix))) => prefix.to_string(),
            Some(nlri) => nlri.encoding(),
            None => "---".to_string(),
        };
        write!(
            f,
            "<Path afi={} safi={} nlri={}{}>",
            self.afi,
            self.safi,
            nlri,
            if self.withdrawn { " withdrawn" } else { "" }
        )
    }
}
