mod handler;
mod peers;
mod routes;
mod rpc;

pub use handler::ApiHandler;
pub use rpc::{
    ApiClient, ApiServer, AttributeSpec, InstalledRoute, NlriSpec, PathSpec, PeerSummary,
    PrefixSpec, StatusSummary,
};
