//! Keep the kernel routing table in line with the best paths chosen by a BGP engine.
//!
//! Paths arrive as [`rib::Path`] values (over JSON-RPC or stdin). Each one is routed by its
//! address family to a handler ([`dispatch::FamilyDispatcher`]), decoded into next-hop and
//! destination prefixes ([`rib::decode`]), and the resulting routes are applied to a
//! [`fib::RouteTable`] by the [`sync::Reconciler`].

pub mod api;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod feed;
pub mod fib;
mod handler;
pub mod rib;
pub mod sync;
pub mod utils;

pub use config::ServerConfig;
pub use handler::serve;
