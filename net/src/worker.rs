//! Worker reactors: each owns one [`EventLoop`] and every connection assigned to it by
//! the Main Reactor, driving the read -> dispatch -> write pipeline.

use std::io;
use std::sync::Arc;

use codec::Frame;
use crossbeam_channel::Receiver;
use mio::Token;
use slab::Slab;

use crate::connection::Connection;
use crate::event_loop::EventLoop;
use crate::net_addr::NetAddr;
use crate::registry::ConnectionRegistry;

/// Processes one decoded request frame, addressed from `peer_addr`, into a response
/// frame. Supplied by the `rpc` crate's dispatcher so that `net` never depends on
/// dispatch semantics.
pub type RequestHandler = Arc<dyn Fn(Frame, NetAddr) -> Frame + Send + Sync>;

/// A Worker Reactor: receives newly accepted connections on a channel and owns them for
/// their entire lifetime.
pub struct Worker {
    event_loop: EventLoop,
    connections: Slab<Connection>,
    assigned: Receiver<Connection>,
    handler: RequestHandler,
    registry: Arc<ConnectionRegistry>,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("connections", &self.connections.len())
            .finish()
    }
}

impl Worker {
    /// Builds a worker that will receive its connections from `assigned`, removing each
    /// from `registry` as it closes.
    pub fn new(assigned: Receiver<Connection>, handler: RequestHandler, registry: Arc<ConnectionRegistry>) -> io::Result<Self> {
        Ok(Self {
            event_loop: EventLoop::new()?,
            connections: Slab::new(),
            assigned,
            handler,
            registry,
        })
    }

    fn admit_assigned(&mut self) {
        while let Ok(mut conn) = self.assigned.try_recv() {
            let entry = self.connections.vacant_entry();
            let token = Token(entry.key());
            conn.set_token(token);
            match conn.register(self.event_loop.registry()) {
                Ok(()) => {
                    entry.insert(conn);
                }
                Err(err) => {
                    tracing::warn!(?err, "failed to register assigned connection");
                }
            }
        }
    }

    /// Runs this worker's loop until its assignment channel disconnects.
    pub fn run(mut self) -> io::Result<()> {
        loop {
            self.admit_assigned();

            if self.connections.is_empty() && self.assigned.is_empty() && is_disconnected(&self.assigned) {
                return Ok(());
            }

            let mut touched = Vec::new();
            {
                let connections = &mut self.connections;
                let handler = &self.handler;
                self.event_loop.tick(|event| {
                    handle_event(connections, handler, event);
                    touched.push(event.token());
                })?;
            }

            for token in touched {
                let Some(conn) = self.connections.get_mut(token.0) else {
                    continue;
                };
                if conn.is_closed() {
                    let _ = conn.deregister(self.event_loop.registry());
                    self.registry.remove(conn.id());
                    self.connections.remove(token.0);
                } else if let Err(err) = conn.reregister(self.event_loop.registry()) {
                    tracing::warn!(?err, token = token.0, "failed to reregister connection");
                }
            }
        }
    }
}

fn is_disconnected(rx: &Receiver<Connection>) -> bool {
    matches!(rx.try_recv(), Err(crossbeam_channel::TryRecvError::Disconnected))
}

fn handle_event(connections: &mut Slab<Connection>, handler: &RequestHandler, event: &crate::event_loop::Readiness) {
    let token = event.token();
    let Some(conn) = connections.get_mut(token.0) else {
        return;
    };

    if event.is_readable() {
        if conn.fill().is_err() {
            conn.mark_closed();
        }
        let peer_addr = conn.peer_addr().map(NetAddr::Ip).unwrap_or_else(NetAddr::invalid);
        while let Some(request) = conn.decode_next() {
            let response = handler(request, peer_addr.clone());
            conn.queue_frame(&response);
        }
    }

    if event.is_writable() && conn.flush().is_err() {
        conn.mark_closed();
    }
}
