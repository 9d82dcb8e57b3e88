//! Client-side call orchestration.
//!
//! One channel serves one call: it owns a private [`EventLoop`] and a single
//! [`Connection`], driving connect, write, and read to completion before returning. A
//! real deployment that needs many concurrent outbound calls runs one channel per call
//! (optionally on a small pool of threads); this runtime does not pool or multiplex
//! client connections (see the spec's Non-goals).

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use codec::Frame;
use net::{client, ConnState, EventLoop, NetAddr};

use crate::controller::Controller;
use crate::error::ErrorKind;
use crate::msgid;

/// Orchestrates exactly one outbound RPC call against `addr`.
pub struct Channel {
    addr: NetAddr,
    initialized: bool,
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("addr", &self.addr)
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl Channel {
    /// A channel targeting `addr`, not yet initialized.
    pub fn new(addr: NetAddr) -> Self {
        Self { addr, initialized: false }
    }

    /// Latches this channel for its one call. Repeated calls are ignored and return
    /// `false`; only the first `init` takes effect.
    pub fn init(&mut self) -> bool {
        if self.initialized {
            return false;
        }
        self.initialized = true;
        true
    }

    /// Encodes `request`, then executes `method_name` with it, blocking the calling
    /// thread until the call completes, times out, or fails. On success returns the raw
    /// response payload; on failure the reason is both returned and recorded on
    /// `controller`. A `request` that fails to serialize never reaches the wire: it is
    /// reported as [`ErrorKind::FailedSerialize`], the same way a handler's own failed
    /// decode is reported as [`ErrorKind::FailedDeserialize`] on the server side.
    pub fn call_method(
        &mut self,
        controller: &mut Controller,
        method_name: &str,
        request: &impl codec::Message,
    ) -> Result<Vec<u8>, ErrorKind> {
        let msg_id = if controller.msg_id().is_empty() {
            let minted = msgid::generate();
            controller.set_msg_id(&minted);
            minted
        } else {
            controller.msg_id().to_string()
        };

        if !self.initialized {
            controller.set_error(ErrorKind::ChannelNotInit, "channel not initialized");
            return Err(ErrorKind::ChannelNotInit);
        }

        let request_payload = request.encode().map_err(|err| {
            controller.set_error(ErrorKind::FailedSerialize, err.to_string());
            ErrorKind::FailedSerialize
        })?;

        let request = Frame::response(msg_id, method_name.to_string(), request_payload);

        let mut event_loop = EventLoop::new().map_err(|err| {
            controller.set_error(ErrorKind::FailedConnect, err.to_string());
            ErrorKind::FailedConnect
        })?;

        let mut connection = client::connect(&self.addr).map_err(|err| {
            controller.set_error(ErrorKind::FailedConnect, err.to_string());
            ErrorKind::FailedConnect
        })?;
        connection.register(event_loop.registry()).map_err(|err| {
            controller.set_error(ErrorKind::FailedConnect, err.to_string());
            ErrorKind::FailedConnect
        })?;
        let conn_token = connection.token();

        let timed_out = Arc::new(AtomicBool::new(false));
        let timed_out_for_timer = timed_out.clone();
        let deadline = event_loop.schedule_timer(controller.timeout_ms(), 0, false, move || {
            timed_out_for_timer.store(true, Ordering::SeqCst);
        });

        let outcome = self.drive(&mut event_loop, &mut connection, conn_token, &request, &timed_out);
        deadline.cancel();

        match outcome {
            Ok(response) => {
                controller.set_peer_addr(connection.peer_addr().map(NetAddr::Ip).unwrap_or(NetAddr::invalid()));
                if response.error_code != 0 {
                    let kind = ErrorKind::from_code(response.error_code);
                    controller.set_error(kind, response.error_info);
                    Err(kind)
                } else {
                    Ok(response.payload)
                }
            }
            Err(DriveError::TimedOut) => {
                controller.start_cancel();
                controller.set_error(ErrorKind::RpcCallTimeout, "rpc call timed out");
                Err(ErrorKind::RpcCallTimeout)
            }
            Err(DriveError::Connect(err)) => {
                let kind = if err.kind() == io::ErrorKind::ConnectionRefused {
                    ErrorKind::PeerClosed
                } else {
                    ErrorKind::FailedConnect
                };
                controller.set_error(kind, err.to_string());
                Err(kind)
            }
            Err(DriveError::PeerClosed) => {
                controller.set_error(ErrorKind::PeerClosed, "peer closed connection");
                Err(ErrorKind::PeerClosed)
            }
            Err(DriveError::Io(err)) => {
                controller.set_error(ErrorKind::FailedGetReply, err.to_string());
                Err(ErrorKind::FailedGetReply)
            }
        }
    }

    /// Runs the private event loop until a full response frame is decoded, the
    /// connection is torn down, or the deadline timer fires.
    fn drive(
        &self,
        event_loop: &mut EventLoop,
        connection: &mut net::Connection,
        conn_token: mio::Token,
        request: &Frame,
        timed_out: &Arc<AtomicBool>,
    ) -> Result<Frame, DriveError> {
        loop {
            let mut result: Option<Frame> = None;
            let mut connect_err: Option<io::Error> = None;
            let mut need_reregister = false;

            event_loop
                .tick(|event| {
                    if event.token() != conn_token {
                        return;
                    }
                    match connection.state() {
                        ConnState::NotConnected => {
                            if event.is_writable() {
                                match connection.check_connected() {
                                    Ok(()) => {
                                        connection.queue_frame(request);
                                        need_reregister = true;
                                    }
                                    Err(err) => connect_err = Some(err),
                                }
                            }
                        }
                        ConnState::Connected => {
                            if event.is_writable() && connection.flush().is_err() {
                                connection.mark_closed();
                            }
                            if event.is_readable() {
                                if connection.fill().is_err() {
                                    connection.mark_closed();
                                }
                                if let Some(frame) = connection.decode_next() {
                                    result = Some(frame);
                                }
                            }
                        }
                        ConnState::HalfClosed | ConnState::Closed => {}
                    }
                })
                .map_err(DriveError::Io)?;

            if let Some(frame) = result {
                return Ok(frame);
            }
            if let Some(err) = connect_err {
                return Err(DriveError::Connect(err));
            }
            if need_reregister && connection.reregister(event_loop.registry()).is_err() {
                return Err(DriveError::PeerClosed);
            }
            if connection.is_closed() {
                return Err(DriveError::PeerClosed);
            }
            if timed_out.load(Ordering::SeqCst) {
                return Err(DriveError::TimedOut);
            }
        }
    }
}

enum DriveError {
    TimedOut,
    Connect(io::Error),
    PeerClosed,
    Io(io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_method_before_init_fails_with_not_init() {
        let mut channel = Channel::new(NetAddr::invalid());
        let mut controller = Controller::new();
        let result = channel.call_method(&mut controller, "Order.makeOrder", &Vec::<u8>::new());
        assert_eq!(result.unwrap_err(), ErrorKind::ChannelNotInit);
        assert!(controller.failed());
    }

    #[test]
    fn init_is_idempotent() {
        let mut channel = Channel::new(NetAddr::invalid());
        assert!(channel.init());
        assert!(!channel.init());
    }

    #[test]
    fn invalid_address_fails_to_connect() {
        let mut channel = Channel::new(NetAddr::invalid());
        channel.init();
        let mut controller = Controller::new();
        let result = channel.call_method(&mut controller, "Order.makeOrder", &Vec::<u8>::new());
        assert_eq!(result.unwrap_err(), ErrorKind::FailedConnect);
    }

    struct UnserializableMessage;

    impl codec::Message for UnserializableMessage {
        fn encode(&self) -> Result<Vec<u8>, codec::CodecError> {
            Err(codec::CodecError::Serialize("refuses to encode".to_string()))
        }

        fn decode(_bytes: &[u8]) -> Result<Self, codec::CodecError> {
            Ok(UnserializableMessage)
        }
    }

    #[test]
    fn call_method_reports_failed_serialize_before_touching_the_network() {
        let mut channel = Channel::new(NetAddr::invalid());
        channel.init();
        let mut controller = Controller::new();
        let result = channel.call_method(&mut controller, "Order.makeOrder", &UnserializableMessage);
        assert_eq!(result.unwrap_err(), ErrorKind::FailedSerialize);
        assert!(controller.failed());
    }
}
