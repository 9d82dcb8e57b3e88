//! RPC error taxonomy surfaced through the [`crate::controller::Controller`].
//!
//! Codes follow the source system's `SYS_ERROR_PREFIX` convention: each kind's integer
//! code is `1000` followed by a two-digit index, keeping this taxonomy's codes disjoint
//! from any application-defined error codes a service might also return.

use thiserror::Error;

/// A closed enumeration of error kinds an RPC call can fail with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// The call succeeded.
    #[error("ok")]
    Ok,
    /// The peer closed the connection before the call completed.
    #[error("peer closed connection")]
    PeerClosed,
    /// The transport-level connect attempt failed.
    #[error("failed to connect")]
    FailedConnect,
    /// The read for a reply stalled or returned incomplete data.
    #[error("failed to get reply")]
    FailedGetReply,
    /// The payload bytes did not match the expected schema.
    #[error("failed to deserialize payload")]
    FailedDeserialize,
    /// The outbound value could not be serialized.
    #[error("failed to serialize payload")]
    FailedSerialize,
    /// The wire frame could not be encoded.
    #[error("failed to encode frame")]
    FailedEncode,
    /// The wire frame could not be decoded.
    #[error("failed to decode frame")]
    FailedDecode,
    /// The call's deadline elapsed before a reply arrived.
    #[error("rpc call timed out")]
    RpcCallTimeout,
    /// No service is registered under the requested name.
    #[error("service not found")]
    ServiceNotFound,
    /// The requested service has no such method.
    #[error("method not found")]
    MethodNotFound,
    /// The method name did not contain a `.` separating service and method.
    #[error("failed to parse service name")]
    ParseServiceName,
    /// `call_method` was invoked on a channel that was never `init`-ed.
    #[error("rpc channel not initialized")]
    ChannelNotInit,
}

impl ErrorKind {
    /// The integer code carried on the wire for this kind.
    pub fn code(self) -> i32 {
        const PREFIX: i32 = 1000_0000;
        match self {
            ErrorKind::Ok => 0,
            ErrorKind::PeerClosed => PREFIX,
            ErrorKind::FailedConnect => PREFIX + 1,
            ErrorKind::FailedGetReply => PREFIX + 2,
            ErrorKind::FailedDeserialize => PREFIX + 3,
            ErrorKind::FailedSerialize => PREFIX + 4,
            ErrorKind::FailedEncode => PREFIX + 5,
            ErrorKind::FailedDecode => PREFIX + 6,
            ErrorKind::RpcCallTimeout => PREFIX + 7,
            ErrorKind::ServiceNotFound => PREFIX + 8,
            ErrorKind::MethodNotFound => PREFIX + 9,
            ErrorKind::ParseServiceName => PREFIX + 10,
            ErrorKind::ChannelNotInit => PREFIX + 11,
        }
    }

    /// Maps a wire error code back to its kind, if recognized. An unrecognized
    /// non-zero code is folded into [`ErrorKind::FailedDecode`] rather than panicking,
    /// since a peer running a newer error taxonomy should not be able to crash us.
    pub fn from_code(code: i32) -> Self {
        const PREFIX: i32 = 1000_0000;
        match code {
            0 => ErrorKind::Ok,
            c if c == PREFIX => ErrorKind::PeerClosed,
            c if c == PREFIX + 1 => ErrorKind::FailedConnect,
            c if c == PREFIX + 2 => ErrorKind::FailedGetReply,
            c if c == PREFIX + 3 => ErrorKind::FailedDeserialize,
            c if c == PREFIX + 4 => ErrorKind::FailedSerialize,
            c if c == PREFIX + 5 => ErrorKind::FailedEncode,
            c if c == PREFIX + 6 => ErrorKind::FailedDecode,
            c if c == PREFIX + 7 => ErrorKind::RpcCallTimeout,
            c if c == PREFIX + 8 => ErrorKind::ServiceNotFound,
            c if c == PREFIX + 9 => ErrorKind::MethodNotFound,
            c if c == PREFIX + 10 => ErrorKind::ParseServiceName,
            c if c == PREFIX + 11 => ErrorKind::ChannelNotInit,
            _ => ErrorKind::FailedDecode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_round_trips() {
        for kind in [
            ErrorKind::Ok,
            ErrorKind::PeerClosed,
            ErrorKind::FailedConnect,
            ErrorKind::RpcCallTimeout,
            ErrorKind::ChannelNotInit,
        ] {
            assert_eq!(ErrorKind::from_code(kind.code()), kind);
        }
    }

    #[test]
    fn unknown_code_falls_back_to_decode_error() {
        assert_eq!(ErrorKind::from_code(42), ErrorKind::FailedDecode);
    }
}
