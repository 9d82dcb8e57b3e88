//! Growable buffer and length-prefixed wire framing shared by the RPC runtime's
//! networking and dispatch layers.

#![deny(missing_debug_implementations, rust_2018_idioms, unused_imports)]

pub mod buffer;
pub mod frame;
pub mod message;

pub use buffer::Buffer;
pub use frame::Frame;
pub use message::{CodecError, Message};
