//! Shared demo service definitions for the `rapidrpc-server`/`rapidrpc-client` binaries.

pub mod order_service;
