//! Address abstraction recognizing IPv4, IPv6, and Unix-domain peers.

use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

/// A service address: either a socket address (v4 or v6) or a Unix-domain path.
///
/// A default-constructed `NetAddr` (see [`NetAddr::invalid`]) is used as a placeholder
/// for a not-yet-known peer address, e.g. before a connection's address has been
/// captured; [`NetAddr::is_valid`] distinguishes it from a real address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NetAddr {
    /// An IPv4 or IPv6 socket address.
    Ip(SocketAddr),
    /// A Unix-domain socket path.
    Unix(PathBuf),
    /// Not yet known; only produced by [`NetAddr::invalid`].
    Unset,
}

impl NetAddr {
    /// A placeholder used before a peer's real address is known.
    pub fn invalid() -> Self {
        NetAddr::Unset
    }

    /// Whether this address is a real, usable address.
    pub fn is_valid(&self) -> bool {
        !matches!(self, NetAddr::Unset)
    }

    /// Parses `"ip:port"` (v4 or bracketed v6) into an [`NetAddr::Ip`], or treats the
    /// input as a filesystem path for [`NetAddr::Unix`] if it cannot be parsed as a
    /// socket address.
    pub fn parse(s: &str) -> Option<Self> {
        if let Ok(mut addrs) = s.to_socket_addrs() {
            if let Some(addr) = addrs.next() {
                return Some(NetAddr::Ip(addr));
            }
        }
        if let Ok(addr) = s.parse::<SocketAddr>() {
            return Some(NetAddr::Ip(addr));
        }
        if s.starts_with('/') || s.starts_with("./") {
            return Some(NetAddr::Unix(PathBuf::from(s)));
        }
        None
    }

    /// Builds an IPv4/IPv6 address from host and port.
    pub fn from_host_port(host: &str, port: u16) -> Option<Self> {
        format!("{host}:{port}").parse::<SocketAddr>().ok().map(NetAddr::Ip)
    }

    /// The socket address, if this is an [`NetAddr::Ip`].
    pub fn as_socket_addr(&self) -> Option<SocketAddr> {
        match self {
            NetAddr::Ip(addr) => Some(*addr),
            _ => None,
        }
    }

    /// The filesystem path, if this is a [`NetAddr::Unix`].
    pub fn as_unix_path(&self) -> Option<&std::path::Path> {
        match self {
            NetAddr::Unix(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for NetAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetAddr::Ip(addr) => write!(f, "{addr}"),
            NetAddr::Unix(path) => write!(f, "unix:{}", path.display()),
            NetAddr::Unset => write!(f, "<unset>"),
        }
    }
}

impl From<SocketAddr> for NetAddr {
    fn from(addr: SocketAddr) -> Self {
        NetAddr::Ip(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_v4() {
        let addr = NetAddr::parse("127.0.0.1:9000").unwrap();
        assert!(addr.is_valid());
        assert_eq!(addr.to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn parses_v6() {
        let addr = NetAddr::parse("[::1]:9000").unwrap();
        assert!(matches!(addr, NetAddr::Ip(SocketAddr::V6(_))));
    }

    #[test]
    fn parses_unix_path() {
        let addr = NetAddr::parse("/tmp/rpc.sock").unwrap();
        assert_eq!(addr.as_unix_path().unwrap().to_str(), Some("/tmp/rpc.sock"));
    }

    #[test]
    fn invalid_is_not_valid() {
        assert!(!NetAddr::invalid().is_valid());
    }
}
