//! The reactor: a single-threaded event loop with timers, plus the framed TCP
//! connection state machine, acceptor, and client connect used by the RPC call plane.

#![deny(missing_debug_implementations, rust_2018_idioms, unused_imports)]

pub mod client;
pub mod connection;
pub mod event_loop;
pub mod net_addr;
pub mod registry;
pub mod server;
pub mod timer;
pub mod worker;

pub use connection::{ConnState, Connection};
pub use event_loop::{now_ms, EventLoop, EventLoopHandle, Readiness};
pub use net_addr::NetAddr;
pub use registry::{ConnectionId, ConnectionRegistry};
pub use server::TcpServer;
pub use timer::{TimerHandle, TimerWheel};
pub use worker::{RequestHandler, Worker};
