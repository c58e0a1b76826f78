use std::collections::btree_map::{self, BTreeMap};
use std::fmt;
use std::iter::FromIterator;
use std::net::IpAddr;

use super::DestinationPrefix;

/// Forwarding-plane projection of a destination: where to send it.
/// Outgoing interface is left to the forwarding plane unless it told us
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RouteEntry {
    pub prefix: DestinationPrefix,
    pub next_hop: Option<IpAddr>,
    pub device: Option<String>,
}

impl RouteEntry {
    pub fn new(prefix: DestinationPrefix, next_hop: IpAddr) -> Self {
        Self {
            prefix,
            next_hop: Some(next_hop),
            device: None,
        }
    }

    pub fn key(&self) -> String {
        self.prefix.key()
    }

    /// Same destination, regardless of how it is reached
    pub fn same_route(&self, other: &RouteEntry) -> bool {
        self.key() == other.key()
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.prefix)?;
        if let Some(next_hop) = self.next_hop {
            write!(f, " via {}", next_hop)?;
        }
        if let Some(device) = &self.device {
            write!(f, " dev {}", device)?;
        }
        Ok(())
    }
}

/// Routes keyed by canonical prefix text. Inserting a duplicate key replaces
/// the earlier entry (last write wins)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RouteSet(BTreeMap<String, RouteEntry>);

impl RouteSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn insert(&mut self, route: RouteEntry) -> Option<RouteEntry> {
        self.0.insert(route.key(), route)
    }

    pub fn remove(&mut self, key: &str) -> Option<RouteEntry> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&RouteEntry> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> btree_map::Keys<String, RouteEntry> {
        self.0.keys()
    }

    pub fn routes(&self) -> btree_map::Values<String, RouteEntry> {
        self.0.values()
    }

    pub fn iter(&self) -> btree_map::Iter<String, RouteEntry> {
        self.0.iter()
    }
}

impl FromIterator<RouteEntry> for RouteSet {
    fn from_iter<I: IntoIterator<Item = RouteEntry>>(iter: I) -> Self {
        let mut set = RouteSet::new();
        for route in iter {
            set.insert(route);
        }
        set
    }
}

impl Extend<RouteEntry> for RouteSet {
    fn extend<I: IntoIterator<Item = RouteEntry>>(&mut self, iter: I) {
        for route in iter {
            self.insert(route);
        }
    }
}

impl IntoIterator for RouteSet {
    type Item = (String, RouteEntry);
    type IntoIter = btree_map::IntoIter<String, RouteEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(prefix: &str, next_hop: &str) -> RouteEntry {
        RouteEntry::new(prefix.parse().unwrap(), next_hop.parse().unwrap())
    }

    #[test]
    fn test_duplicate_key_last_write_wins() {
        let set: RouteSet = vec![
            route("10.0.0.0/24", "192.0.2.1"),
            route("10.0.0.1/24", "192.0.2.2"),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.get("10.0.0.0/24").unwrap().next_hop,
            Some("192.0.2.2".parse().unwrap())
        );
    }

    #[test]
    fn test_same_route_ignores_forwarding_detail() {
        let a = route("10.0.0.0/24", "192.0.2.1");
        let b = route("10.0.0.0/24", "192.0.2.9");
        assert!(a.same_route(&b));
        assert_ne!(a, b);
        assert!(!a.same_route(&route("10.0.1.0/24", "192.0.2.1")));
    }

    #[test]
    fn test_display_route() {
        let mut r = route("2001:db8::/32", "2001:db8::1");
        assert_eq!(r.to_string(), "2001:db8::/32 via 2001:db8::1");
        r.device = Some("eth0".into());
        assert_eq!(r.to_string(), "2001:db8::/32 via 2001:db8::1 dev eth0");
    }
}
