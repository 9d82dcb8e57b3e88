//! The RPC call plane: msg-id generation, the error taxonomy, the per-call controller,
//! the thread-local runtime context used by logging, the server-side dispatcher, and the
//! client-side channel.

#![deny(missing_debug_implementations, rust_2018_idioms, unused_imports)]

pub mod channel;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod msgid;
pub mod runtime;

pub use channel::Channel;
pub use controller::Controller;
pub use dispatcher::{Dispatcher, Service};
pub use error::ErrorKind;
