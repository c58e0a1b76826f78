use std::collections::HashMap;
use std::fmt;

use bgp_rs::{AFI, SAFI};
use log::{debug, info};

use crate::error::PathError;
use crate::rib::{self, DestinationPrefix, Family, Nlri, Path, RouteEntry};

/// What a path means for the forwarding plane
#[derive(Clone, Debug, PartialEq)]
pub enum PathAction {
    /// Routes to add (or replace, if the prefix is already installed)
    Install(Vec<RouteEntry>),
    /// Destinations to remove
    Withdraw(Vec<DestinationPrefix>),
    /// Accepted, but not translated into forwarding state
    Ignore,
}

impl fmt::Display for PathAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PathAction::Install(routes) => write!(f, "install {} route(s)", routes.len()),
            PathAction::Withdraw(prefixes) => write!(f, "withdraw {} prefix(es)", prefixes.len()),
            PathAction::Ignore => write!(f, "ignore"),
        }
    }
}

pub type Handler = fn(&Path) -> Result<PathAction, PathError>;

/// Routes each path to the handler registered for its (AFI, SAFI)
#[derive(Clone)]
pub struct FamilyDispatcher {
    handlers: HashMap<Family, Handler>,
}

impl FamilyDispatcher {
    pub fn new() -> Self {
        let mut dispatcher = Self {
            handlers: HashMap::with_capacity(8),
        };
        dispatcher.register(Family::ipv4_unicast(), handle_unicast);
        dispatcher.register(Family::ipv6_unicast(), handle_unicast);
        dispatcher.register(Family::l2vpn_evpn(), handle_evpn);
        dispatcher.register(Family::new(AFI::IPV4, SAFI::Flowspec), handle_flowspec);
        dispatcher.register(Family::new(AFI::IPV6, SAFI::Flowspec), handle_flowspec);
        dispatcher
    }

    pub fn register(&mut self, family: Family, handler: Handler) {
        if self.handlers.insert(family, handler).is_some() {
            debug!("Replaced handler for {}", family);
        }
    }

    pub fn supports(&self, family: Family) -> bool {
        self.handlers.contains_key(&family)
    }

    pub fn families(&self) -> Vec<Family> {
        self.handlers.keys().cloned().collect()
    }

    /// Decide what a path means for the forwarding plane. Pure: nothing is applied here
    pub fn handle(&self, path: &Path) -> Result<PathAction, PathError> {
        if let Some(Nlri::Invalid(reason)) = &path.nlri {
            return Err(PathError::Unparseable(reason.clone()));
        }
        let family = path.family()?;
        match self.handlers.get(&family) {
            Some(handler) => handler(path),
            None => Err(PathError::UnsupportedAddressFamily {
                afi: path.afi,
                safi: path.safi,
            }),
        }
    }
}

impl Default for FamilyDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FamilyDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<FamilyDispatcher families={}>", self.handlers.len())
    }
}

/// IPv4/IPv6 Unicast: next-hop plus every destination the path names
fn handle_unicast(path: &Path) -> Result<PathAction, PathError> {
    if path.withdrawn {
        return Ok(PathAction::Withdraw(rib::decode_prefixes(path)?));
    }
    let decoded = rib::decode(path)?;
    let next_hop = decoded.next_hop;
    let mut prefixes = decoded.prefixes;
    let own = rib::nlri_prefix(path)?;
    if !prefixes.contains(&own) {
        prefixes.push(own);
    }
    Ok(PathAction::Install(
        prefixes
            .into_iter()
            .map(|prefix| RouteEntry::new(prefix, next_hop))
            .collect(),
    ))
}

fn handle_evpn(path: &Path) -> Result<PathAction, PathError> {
    info!("EVPN path received, not installed: {}", path);
    Ok(PathAction::Ignore)
}

fn handle_flowspec(path: &Path) -> Result<PathAction, PathError> {
    info!("Flowspec path received, not installed: {}", path);
    Ok(PathAction::Ignore)
}
