//! Per-call context: error state, deadline, and addressing, threaded through both the
//! client channel and the dispatcher's handler invocation.

use net::NetAddr;

use crate::error::ErrorKind;

const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Mutable per-call state shared between a caller and the RPC machinery driving the
/// call on its behalf.
#[derive(Debug, Clone)]
pub struct Controller {
    error_code: i32,
    error_info: String,
    msg_id: String,
    local_addr: NetAddr,
    peer_addr: NetAddr,
    timeout_ms: u64,
    failed: bool,
    canceled: bool,
}

impl Default for Controller {
    fn default() -> Self {
        Self {
            error_code: 0,
            error_info: String::new(),
            msg_id: String::new(),
            local_addr: NetAddr::invalid(),
            peer_addr: NetAddr::invalid(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            failed: false,
            canceled: false,
        }
    }
}

impl Controller {
    /// A freshly initialized controller with the default 1000ms timeout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restores a controller to its default state, as if freshly constructed.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Sets the error kind and detail, and marks this call failed.
    pub fn set_error(&mut self, kind: ErrorKind, info: impl Into<String>) {
        self.error_code = kind.code();
        self.error_info = info.into();
        self.failed = true;
    }

    /// The error kind of the last [`Controller::set_error`] call, or `Ok` if none.
    pub fn error_kind(&self) -> ErrorKind {
        ErrorKind::from_code(self.error_code)
    }

    /// The raw wire error code.
    pub fn error_code(&self) -> i32 {
        self.error_code
    }

    /// Human-readable detail for the current error, if any.
    pub fn error_text(&self) -> &str {
        &self.error_info
    }

    /// Whether this call has failed.
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Marks this call as canceled. Cancellation is observational: whoever next checks
    /// [`Controller::is_canceled`] is responsible for treating the call as abandoned.
    pub fn start_cancel(&mut self) {
        self.canceled = true;
    }

    /// Whether [`Controller::start_cancel`] has been called.
    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    /// This call's msg-id, set once a value has been obtained or minted.
    pub fn msg_id(&self) -> &str {
        &self.msg_id
    }

    /// Sets the msg-id, e.g. after minting one for a new call.
    pub fn set_msg_id(&mut self, msg_id: impl Into<String>) {
        self.msg_id = msg_id.into();
    }

    /// The local address captured once a connection exists.
    pub fn local_addr(&self) -> &NetAddr {
        &self.local_addr
    }

    /// Sets the local address.
    pub fn set_local_addr(&mut self, addr: NetAddr) {
        self.local_addr = addr;
    }

    /// The peer address, populated by the dispatcher for inbound calls and by the
    /// channel for outbound ones.
    pub fn peer_addr(&self) -> &NetAddr {
        &self.peer_addr
    }

    /// Sets the peer address.
    pub fn set_peer_addr(&mut self, addr: NetAddr) {
        self.peer_addr = addr;
    }

    /// The deadline, in milliseconds, for this call. Defaults to 1000ms.
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Overrides the deadline for this call.
    pub fn set_timeout_ms(&mut self, timeout_ms: u64) {
        self.timeout_ms = timeout_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_expected_timeout_and_no_error() {
        let controller = Controller::new();
        assert_eq!(controller.timeout_ms(), DEFAULT_TIMEOUT_MS);
        assert!(!controller.failed());
        assert!(!controller.is_canceled());
    }

    #[test]
    fn set_error_marks_failed() {
        let mut controller = Controller::new();
        controller.set_error(ErrorKind::MethodNotFound, "no such method");
        assert!(controller.failed());
        assert_eq!(controller.error_kind(), ErrorKind::MethodNotFound);
        assert_eq!(controller.error_text(), "no such method");
    }

    #[test]
    fn reset_restores_default_state() {
        let mut controller = Controller::new();
        controller.set_error(ErrorKind::RpcCallTimeout, "timed out");
        controller.set_msg_id("00000000000000000001");
        controller.start_cancel();
        controller.set_timeout_ms(5000);

        controller.reset();

        let fresh = Controller::new();
        assert_eq!(controller.failed(), fresh.failed());
        assert_eq!(controller.is_canceled(), fresh.is_canceled());
        assert_eq!(controller.timeout_ms(), fresh.timeout_ms());
        assert_eq!(controller.msg_id(), fresh.msg_id());
    }
}
