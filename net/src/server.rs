//! Main Reactor: binds the listening socket, accepts connections, and round-robins
//! them to a fixed pool of Worker Reactor threads.

use std::io::{self, ErrorKind};
use std::sync::Arc;
use std::thread;

use mio::{Events, Interest, Poll, Token, Waker};

use crate::connection::Connection;
use crate::net_addr::NetAddr;
use crate::registry::ConnectionRegistry;
use crate::worker::{RequestHandler, Worker};

const LISTEN_TOKEN: Token = Token(usize::MAX);
const WAKE_TOKEN: Token = Token(usize::MAX - 1);

/// Accepts TCP connections and hands each to one of a fixed set of Worker Reactors.
pub struct TcpServer {
    listener: mio::net::TcpListener,
    poll: Poll,
    waker: Arc<Waker>,
    worker_txs: Vec<crossbeam_channel::Sender<Connection>>,
    next_worker: usize,
    local_addr: NetAddr,
    connections: Arc<ConnectionRegistry>,
}

impl std::fmt::Debug for TcpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpServer")
            .field("local_addr", &self.local_addr)
            .field("workers", &self.worker_txs.len())
            .finish()
    }
}

impl TcpServer {
    /// Binds `addr`, spawns `num_workers` Worker Reactor threads (each running
    /// `handler` over the connections it owns), and returns a server ready to
    /// [`TcpServer::run`].
    pub fn bind(addr: NetAddr, handler: RequestHandler, num_workers: usize) -> io::Result<Self> {
        assert!(num_workers > 0, "a server needs at least one worker reactor");

        let socket_addr = addr
            .as_socket_addr()
            .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "server address must be IPv4 or IPv6"))?;

        let mut listener = mio::net::TcpListener::bind(socket_addr)?;
        let bound_addr = NetAddr::Ip(listener.local_addr()?);
        let poll = Poll::new()?;
        poll.registry().register(&mut listener, LISTEN_TOKEN, Interest::READABLE)?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKE_TOKEN)?);
        let connections = Arc::new(ConnectionRegistry::new());

        let mut worker_txs = Vec::with_capacity(num_workers);
        for id in 0..num_workers {
            let (tx, rx) = crossbeam_channel::unbounded();
            let handler = handler.clone();
            let connections = connections.clone();
            thread::Builder::new()
                .name(format!("rpc-worker-{id}"))
                .spawn(move || match Worker::new(rx, handler, connections) {
                    Ok(worker) => {
                        if let Err(err) = worker.run() {
                            tracing::error!(?err, worker = id, "worker reactor exited with an error");
                        }
                    }
                    Err(err) => tracing::error!(?err, worker = id, "failed to start worker reactor"),
                })?;
            worker_txs.push(tx);
        }

        Ok(Self {
            listener,
            poll,
            waker,
            worker_txs,
            next_worker: 0,
            local_addr: bound_addr,
            connections,
        })
    }

    /// A waker that, when called, causes [`TcpServer::run`] to return.
    pub fn waker(&self) -> Arc<Waker> {
        self.waker.clone()
    }

    /// The address this server is bound to.
    pub fn local_addr(&self) -> &NetAddr {
        &self.local_addr
    }

    /// How many connections are currently open, across every worker.
    pub fn active_connections(&self) -> usize {
        self.connections.active_count()
    }

    fn accept(&mut self) -> io::Result<()> {
        loop {
            match self.listener.accept() {
                Ok((stream, peer_addr)) => {
                    let id = self.connections.next_id();
                    let conn = Connection::from_accepted(stream, id, peer_addr);
                    let idx = self.next_worker;
                    self.next_worker = (self.next_worker + 1) % self.worker_txs.len();
                    if self.worker_txs[idx].send(conn).is_err() {
                        tracing::warn!(worker = idx, "worker channel closed, dropping connection");
                        continue;
                    }
                    self.connections.insert(id);
                }
                Err(ref err) if err.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(err) => return Err(err),
            }
        }
    }

    /// Runs the Main Reactor's accept loop until woken via [`TcpServer::waker`].
    pub fn run(&mut self) -> io::Result<()> {
        let mut events = Events::with_capacity(1024);
        loop {
            self.poll.poll(&mut events, None)?;
            for event in events.iter() {
                match event.token() {
                    LISTEN_TOKEN => self.accept()?,
                    WAKE_TOKEN => return Ok(()),
                    _ => {}
                }
            }
        }
    }
}
