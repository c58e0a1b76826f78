//! # routesync CLI
//!
//! The same binary runs the sync daemon and talks to a running instance of it over the
//! JSON-RPC API (localhost:8080 by default, see `--host` and `--port`).
//!
//! ## Running
//! ```sh
//! $ routesync run demos/config.toml
//! ```
//! Best paths are pushed in over the API, or as newline-delimited JSON on stdin with `--stdin`:
//! ```sh
//! $ bgp-engine --dump-json | routesync -v run --stdin demos/config.toml
//! ```
//!
//! ## Show Commands
//!
//! Installed routes (optionally filtered by a covering prefix):
//! ```sh
//! $ routesync show routes 10.0.0.0/8
//!  Prefix       Next Hop   Device
//! --------------+-----------+--------
//!  10.1.0.0/16  192.0.2.1  eth0
//!  10.2.0.0/16  192.0.2.1  eth0
//! ```
//!
//! Sync status and the outcome of the last pass:
//! ```sh
//! $ routesync show status
//! Mode full, backend kernel, 12 passes, 0 queued
//! Last pass (full) started 00:00:04 ago
//!   4 paths, 3 replaced, 1 deleted, 0 ignored, 1 failed
//!  Subject      Kind                  Reason
//! --------------+---------------------+--------------------------------
//!  10.9.0.0/24  Malformed path        Invalid prefix: ...
//! ```
//!
//! ## Pushing paths
//! A JSON file holding a list of paths can be pushed as a full table, or as updates with `--delta`:
//! ```sh
//! $ routesync push table.json
//! Queued 2 paths (table)
//! ```

use std::error::Error;
use std::fs;
use std::net::SocketAddr;

use clap::Parser;
use colored::*;
use ipnetwork::IpNetwork;
use itertools::Itertools;
use jsonrpsee::http_client::HttpClientBuilder;

use crate::api::{ApiClient, PathSpec};
use crate::utils::format_time_as_elapsed;

mod display;
mod table;

use display::{FailureRow, InstalledRouteRow, PeerSummaryRow};
use table::print_rows;

#[derive(Parser, Debug)]
#[clap(name = "routesync", rename_all = "kebab-case")]
/// Sync BGP best paths into the kernel routing table
pub struct Args {
    #[clap(subcommand)]
    pub cmd: Command,
    #[clap(long, default_value = "127.0.0.1")]
    pub host: String,
    #[clap(short, long, default_value_t = 8080)]
    pub port: u16,
    /// Show debug logs (additive for trace logs)
    #[clap(short, parse(from_occurrences), global = true)]
    pub verbose: u8,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum Command {
    /// Run the route sync daemon
    Run(RunOptions),
    /// View details about a running daemon
    #[clap(alias = "s", subcommand)]
    Show(Show),
    /// Send a JSON file of paths to a running daemon
    Push(PushOptions),
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub struct RunOptions {
    /// Path to config.toml
    pub config_path: String,
    /// Also read newline-delimited JSON feed events from stdin
    #[clap(long)]
    pub stdin: bool,
    /// API listening address/port (E.g. 127.0.0.1:8080), overrides the config file value
    #[clap(long)]
    pub api: Option<SocketAddr>,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub enum Show {
    /// Routes installed in the forwarding plane
    #[clap(alias = "r")]
    Routes(RouteOptions),
    /// Sync mode and the outcome of the last pass
    Status,
    /// Configured BGP peers
    #[clap(alias = "n", visible_alias = "neighbors")]
    Peers,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub struct RouteOptions {
    /// Only show routes equal to or more specific than this prefix
    #[clap()]
    filter: Option<IpNetwork>,
}

#[derive(Parser, Debug)]
#[clap(rename_all = "kebab-case")]
pub struct PushOptions {
    /// JSON file holding a list of paths
    #[clap()]
    file: String,
    /// Send as path updates instead of a full table
    #[clap(long)]
    delta: bool,
}

async fn run_cmd(args: &Args) -> Result<(), Box<dyn Error>> {
    let client = {
        let base = format!("http://{}:{}", args.host, args.port);
        HttpClientBuilder::default().build(base)?
    };
    match &args.cmd {
        Command::Show(show) => match show {
            Show::Routes(options) => {
                let mut routes = client.show_routes(options.filter).await?;
                routes.sort_by(|a, b| a.family.cmp(&b.family));
                for (family, routes) in &routes.into_iter().group_by(|r| r.family.clone()) {
                    println!("{}", family);
                    print_rows(routes.map(InstalledRouteRow), "No routes");
                    println!();
                }
            }
            Show::Status => {
                let status = client.show_status().await?;
                println!(
                    "Mode {}, backend {}, {} passes, {} queued",
                    status.mode, status.backend, status.passes, status.queued
                );
                match status.last_report {
                    Some(report) => {
                        println!(
                            "Last pass ({}) started {} ago",
                            report.mode,
                            format_time_as_elapsed(report.started)
                        );
                        let summary = format!(
                            "  {} paths, {} replaced, {} deleted, {} ignored, {} failed",
                            report.paths,
                            report.replaced.len(),
                            report.deleted.len(),
                            report.ignored,
                            report.failures.len()
                        );
                        if report.is_clean() {
                            println!("{}", summary.green());
                        } else {
                            println!("{}", summary.yellow());
                            print_rows(report.failures.into_iter().map(FailureRow), "");
                        }
                    }
                    None => println!("No passes yet"),
                }
            }
            Show::Peers => {
                let peers = client.show_peers().await?;
                print_rows(peers.into_iter().map(PeerSummaryRow), "No peers configured");
            }
        },
        Command::Push(options) => {
            let contents = fs::read_to_string(&options.file)?;
            let paths: Vec<PathSpec> = serde_json::from_str(&contents)?;
            let (count, kind) = if options.delta {
                (client.push_paths(paths).await?, "updates")
            } else {
                (client.push_table(paths).await?, "table")
            };
            println!("Queued {} paths ({})", count, kind);
        }
        Command::Run(_) => {
            return Err("The daemon is started from main, not through the API".into());
        }
    }
    Ok(())
}

/// Interactive commands (other than running the daemon)
pub async fn query_daemon(args: &Args) {
    if let Err(err) = run_cmd(args).await {
        eprintln!("{}", err.to_string().red());
    }
}
