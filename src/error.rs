use std::error;
use std::fmt;
use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Broad classes of failure, used when reporting per-path and per-route errors
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum ErrorKind {
    MalformedPath,
    UnsupportedAddressFamily,
    NextHopResolutionFailure,
    ForwardingPlaneFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorKind::*;
        let word = match self {
            MalformedPath => "Malformed path",
            UnsupportedAddressFamily => "Unsupported address family",
            NextHopResolutionFailure => "Next-hop resolution failure",
            ForwardingPlaneFailure => "Forwarding plane failure",
        };
        write!(f, "{}", word)
    }
}

/// Reasons a single path could not be turned into routes
#[derive(Debug, Clone, PartialEq)]
pub enum PathError {
    /// AFI or SAFI is zero
    MissingFamily,
    /// Path carries no NLRI
    MissingNlri,
    /// NLRI is not an IP address prefix. [encoding]
    InvalidNlriType(String),
    /// No handler for this family. [afi, safi]
    UnsupportedAddressFamily { afi: u16, safi: u8 },
    /// MP_REACH_NLRI present but its next-hop field is empty
    NoNextHopInAttribute,
    /// Next-hop bytes of an unexpected length. [length]
    InvalidNextHop(usize),
    /// No attribute yielded a next-hop
    NoNextHopFound,
    /// Reachability record of an encoding we don't translate. [encoding]
    UnsupportedNlri(String),
    /// Prefix length or bytes don't fit the address. [reason]
    InvalidPrefix(String),
    /// Path couldn't be converted from its wire/JSON form. [reason]
    Unparseable(String),
}

impl PathError {
    pub fn kind(&self) -> ErrorKind {
        use PathError::*;
        match self {
            UnsupportedAddressFamily { .. } => ErrorKind::UnsupportedAddressFamily,
            NoNextHopInAttribute | NoNextHopFound => ErrorKind::NextHopResolutionFailure,
            _ => ErrorKind::MalformedPath,
        }
    }
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use PathError::*;
        match self {
            MissingFamily => write!(f, "AFI or SAFI is not set"),
            MissingNlri => write!(f, "Path has no NLRI"),
            InvalidNlriType(encoding) => write!(f, "Invalid NLRI type: {}", encoding),
            UnsupportedAddressFamily { afi, safi } => {
                write!(f, "Unsupported AFI/SAFI: {}/{}", afi, safi)
            }
            NoNextHopInAttribute => {
                write!(f, "MP_REACH_NLRI attribute found but no next hop available")
            }
            InvalidNextHop(len) => write!(f, "Invalid next hop length: {} bytes", len),
            NoNextHopFound => write!(f, "No next hop attribute found"),
            UnsupportedNlri(encoding) => write!(f, "Unsupported NLRI encoding: {}", encoding),
            InvalidPrefix(reason) => write!(f, "Invalid prefix: {}", reason),
            Unparseable(reason) => write!(f, "Unparseable path: {}", reason),
        }
    }
}

impl error::Error for PathError {}

/// The forwarding plane rejected (or never answered) an operation
#[derive(Debug)]
pub enum RouteTableError {
    /// Backend refused the change. [reason]
    Rejected(String),
    /// Operation did not complete in time. [deadline]
    Timeout(Duration),
    /// Backend output could not be understood. [reason]
    Parse(String),
    /// Couldn't reach the backend at all
    Io(io::Error),
}

impl RouteTableError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::ForwardingPlaneFailure
    }
}

impl fmt::Display for RouteTableError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use RouteTableError::*;
        match self {
            Rejected(reason) => write!(f, "Route rejected: {}", reason),
            Timeout(deadline) => write!(f, "Timed out after {}ms", deadline.as_millis()),
            Parse(reason) => write!(f, "Unreadable route table: {}", reason),
            Io(err) => write!(f, "Route table I/O error: {}", err),
        }
    }
}

impl From<io::Error> for RouteTableError {
    fn from(error: io::Error) -> Self {
        RouteTableError::Io(error)
    }
}

impl error::Error for RouteTableError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            RouteTableError::Io(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(PathError::MissingFamily.kind(), ErrorKind::MalformedPath);
        assert_eq!(
            PathError::InvalidNlriType("FLOWSPEC".into()).kind(),
            ErrorKind::MalformedPath
        );
        assert_eq!(
            PathError::NoNextHopFound.kind(),
            ErrorKind::NextHopResolutionFailure
        );
        assert_eq!(
            PathError::UnsupportedAddressFamily { afi: 99, safi: 99 }.kind(),
            ErrorKind::UnsupportedAddressFamily
        );
        assert_eq!(
            RouteTableError::Rejected("nope".into()).kind(),
            ErrorKind::ForwardingPlaneFailure
        );
    }

    #[test]
    fn test_unsupported_family_display() {
        let err = PathError::UnsupportedAddressFamily { afi: 99, safi: 99 };
        assert_eq!(err.to_string(), "Unsupported AFI/SAFI: 99/99");
    }
}
