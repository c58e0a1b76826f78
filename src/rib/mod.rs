pub mod attributes;
pub mod families;
mod path;
mod prefix;
mod route;

pub use attributes::{decode, decode_prefixes, nlri_prefix, Decoded};
pub use families::Family;
pub use path::{Nlri, Path};
pub use prefix::{network_mask, AddressFamily, DestinationPrefix};
pub use route::{RouteEntry, RouteSet};

pub(crate) use path::encoding_name;
