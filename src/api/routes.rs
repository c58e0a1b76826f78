use ipnetwork::IpNetwork;

use crate::api::rpc::InstalledRoute;
use crate::rib::{AddressFamily, RouteEntry};

pub fn entry_to_route(entry: &RouteEntry) -> InstalledRoute {
    InstalledRoute {
        family: match entry.prefix.family() {
            AddressFamily::V4 => "IPv4".to_string(),
            AddressFamily::V6 => "IPv6".to_string(),
        },
        prefix: entry.key(),
        next_hop: entry.next_hop,
        device: entry.device.clone(),
    }
}

/// Is this route's prefix equal to or more specific than `filter`
pub fn route_in_filter(entry: &RouteEntry, filter: &IpNetwork) -> bool {
    let network = entry.prefix.network();
    network.is_ipv4() == filter.is_ipv4()
        && network.prefix() >= filter.prefix()
        && filter.contains(network.ip())
}
