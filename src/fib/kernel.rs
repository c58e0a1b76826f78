use std::net::IpAddr;

use async_trait::async_trait;
use log::{debug, trace};
use serde::Deserialize;
use tokio::process::Command;

use super::RouteTable;
use crate::error::RouteTableError;
use crate::rib::{AddressFamily, DestinationPrefix, RouteEntry, RouteSet};

/// Kernel routing table, driven through iproute2.
///
/// Every route we install is tagged with `proto <protocol>`, and only routes carrying
/// that tag are listed back, so connected and static routes are never touched.
#[derive(Clone, Debug)]
pub struct KernelTable {
    binary: String,
    protocol: String,
}

/// One element of `ip -j route show` output (fields we don't use are ignored)
#[derive(Debug, Deserialize)]
struct IpRouteJson {
    dst: String,
    gateway: Option<IpAddr>,
    dev: Option<String>,
}

impl KernelTable {
    pub fn new(protocol: &str) -> Self {
        Self {
            binary: "ip".to_string(),
            protocol: protocol.to_string(),
        }
    }

    /// Use a different iproute2 binary (E.g. an absolute path)
    pub fn with_binary(mut self, binary: &str) -> Self {
        self.binary = binary.to_string();
        self
    }

    fn list_args(&self, family: AddressFamily) -> Vec<String> {
        vec![
            "-j".to_string(),
            family.ip_flag().to_string(),
            "route".to_string(),
            "show".to_string(),
            "proto".to_string(),
            self.protocol.clone(),
        ]
    }

    fn replace_args(&self, route: &RouteEntry) -> Vec<String> {
        let mut args = vec![
            route.prefix.family().ip_flag().to_string(),
            "route".to_string(),
            "replace".to_string(),
            route.key(),
        ];
        if let Some(next_hop) = route.next_hop {
            args.push("via".to_string());
            args.push(next_hop.to_string());
        }
        if let Some(device) = &route.device {
            args.push("dev".to_string());
            args.push(device.clone());
        }
        args.push("proto".to_string());
        args.push(self.protocol.clone());
        args
    }

    fn delete_args(&self, route: &RouteEntry) -> Vec<String> {
        vec![
            route.prefix.family().ip_flag().to_string(),
            "route".to_string(),
            "del".to_string(),
            route.key(),
            "proto".to_string(),
            self.protocol.clone(),
        ]
    }

    async fn run(&self, args: &[String]) -> Result<String, RouteTableError> {
        trace!("Running: {} {}", self.binary, args.join(" "));
        // A caller's deadline drops this future, the child must not outlive it
        let output = Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await?;
        if !output.status.success() {
            return Err(RouteTableError::Rejected(format!(
                "'{} {}' failed: {}",
                self.binary,
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Turn `ip -j route show` output into routes
fn parse_routes(output: &str, family: AddressFamily) -> Result<Vec<RouteEntry>, RouteTableError> {
    if output.trim().is_empty() {
        return Ok(vec![]);
    }
    let routes: Vec<IpRouteJson> =
        serde_json::from_str(output).map_err(|err| RouteTableError::Parse(err.to_string()))?;
    routes
        .into_iter()
        .map(|route| {
            let prefix = match (route.dst.as_str(), family) {
                ("default", AddressFamily::V4) => "0.0.0.0/0".parse::<DestinationPrefix>(),
                ("default", AddressFamily::V6) => "::/0".parse::<DestinationPrefix>(),
                (dst, _) => dst.parse::<DestinationPrefix>(),
            }
            .map_err(|err| RouteTableError::Parse(err.to_string()))?;
            Ok(RouteEntry {
                prefix,
                next_hop: route.gateway,
                device: route.dev,
            })
        })
        .collect()
}

#[async_trait]
impl RouteTable for KernelTable {
    async fn list(&self) -> Result<RouteSet, RouteTableError> {
        let mut routes = RouteSet::new();
        for family in &[AddressFamily::V4, AddressFamily::V6] {
            let output = self.run(&self.list_args(*family)).await?;
            routes.extend(parse_routes(&output, *family)?);
        }
        debug!(
            "Found {} kernel routes with proto {}",
            routes.len(),
            self.protocol
        );
        Ok(routes)
    }

    async fn add_or_replace(&self, route: &RouteEntry) -> Result<(), RouteTableError> {
        self.run(&self.replace_args(route)).await?;
        Ok(())
    }

    async fn delete(&self, route: &RouteEntry) -> Result<(), RouteTableError> {
        self.run(&self.delete_args(route)).await?;
        Ok(())
    }
}
