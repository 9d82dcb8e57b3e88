//! Non-blocking TCP client connect.
//!
//! Unlike the server side, a client connection isn't owned by a shared worker pool: a
//! caller (the `rpc` crate's channel) drives its own [`crate::event_loop::EventLoop`]
//! and registers the connection returned here against it directly.

use std::io::{self, ErrorKind};

use crate::connection::Connection;
use crate::net_addr::NetAddr;

/// Begins a non-blocking connect to `addr`, returning a [`Connection`] in
/// `NotConnected` state. The caller must register it for write readiness and call
/// [`Connection::check_connected`] once writable.
pub fn connect(addr: &NetAddr) -> io::Result<Connection> {
    let socket_addr = addr
        .as_socket_addr()
        .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "client address must be IPv4 or IPv6"))?;
    let stream = mio::net::TcpStream::connect(socket_addr)?;
    Ok(Connection::from_connecting(stream))
}
