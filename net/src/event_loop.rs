//! Single-threaded reactor: readiness multiplexing, a cross-thread task queue drained
//! once per iteration, and the timer wheel, all woken through one `mio::Waker`.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use mio::{Events, Poll, Registry, Token, Waker};

use crate::timer::{TimerHandle, TimerWheel};

/// Reserved for the loop's wakeup descriptor; never assigned to a connection.
pub const WAKE_TOKEN: Token = Token(usize::MAX - 1);

const EVENTS_CAPACITY: usize = 1024;

type Task = Box<dyn FnOnce() + Send>;

/// An owned snapshot of one descriptor's readiness, decoupled from mio's own event type
/// so it can be queued and handled once the whole readiness set is known, rather than
/// acted on while `self.events` is still being scanned.
#[derive(Debug, Clone, Copy)]
pub struct Readiness {
    token: Token,
    readable: bool,
    writable: bool,
}

impl Readiness {
    /// The descriptor's registered token.
    pub fn token(&self) -> Token {
        self.token
    }

    /// Whether this descriptor became readable.
    pub fn is_readable(&self) -> bool {
        self.readable
    }

    /// Whether this descriptor became writable.
    pub fn is_writable(&self) -> bool {
        self.writable
    }
}

/// A cloneable, thread-safe reference to a running [`EventLoop`]'s task queue, used to
/// submit closures from other threads.
#[derive(Clone)]
pub struct EventLoopHandle {
    tasks: Arc<Mutex<VecDeque<Task>>>,
    waker: Arc<Waker>,
}

impl std::fmt::Debug for EventLoopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoopHandle").finish()
    }
}

impl EventLoopHandle {
    /// Enqueues `task` to run on the owning loop's thread, then wakes the loop so it
    /// doesn't wait out its full readiness timeout before draining it.
    pub fn submit(&self, task: impl FnOnce() + Send + 'static) {
        self.tasks.lock().unwrap().push_back(Box::new(task));
        let _ = self.waker.wake();
    }
}

/// A single-threaded event loop multiplexing socket readiness, cross-thread tasks, and
/// timers through one `mio::Poll`.
pub struct EventLoop {
    poll: Poll,
    events: Events,
    tasks: Arc<Mutex<VecDeque<Task>>>,
    waker: Arc<Waker>,
    timers: TimerWheel,
    stopped: bool,
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("pending_timers", &self.timers.len())
            .field("stopped", &self.stopped)
            .finish()
    }
}

impl EventLoop {
    /// Creates a new loop bound to a fresh `mio::Poll`. The wakeup token is reserved at
    /// construction; callers must not register a connection under [`WAKE_TOKEN`].
    pub fn new() -> io::Result<Self> {
        let poll = Poll::new()?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKE_TOKEN)?);
        Ok(Self {
            poll,
            events: Events::with_capacity(EVENTS_CAPACITY),
            tasks: Arc::new(Mutex::new(VecDeque::new())),
            waker,
            timers: TimerWheel::new(),
            stopped: false,
        })
    }

    /// The `mio::Registry` this loop polls; connections register/reregister/deregister
    /// against it directly.
    pub fn registry(&self) -> &Registry {
        self.poll.registry()
    }

    /// A cloneable handle other threads can use to submit tasks to this loop.
    pub fn handle(&self) -> EventLoopHandle {
        EventLoopHandle {
            tasks: self.tasks.clone(),
            waker: self.waker.clone(),
        }
    }

    /// Schedules a timer relative to now. See [`TimerWheel::schedule`].
    pub fn schedule_timer(&mut self, delay_ms: u64, interval_ms: u64, repeat: bool, callback: impl FnMut() + Send + 'static) -> TimerHandle {
        self.timers.schedule(now_ms(), delay_ms, interval_ms, repeat, Box::new(callback))
    }

    /// Requests the loop stop after the current iteration.
    pub fn stop(&mut self) {
        self.stopped = true;
        let _ = self.waker.wake();
    }

    /// Whether [`EventLoop::stop`] has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    fn drain_tasks(&mut self) {
        let mut pending = self.tasks.lock().unwrap();
        let drained: Vec<Task> = pending.drain(..).collect();
        drop(pending);
        for task in drained {
            task();
        }
    }

    /// Runs exactly one iteration: drains submitted tasks, waits for readiness bounded
    /// by the nearest timer (or [`crate::timer::MAX_WAIT_MS`] if none is scheduled),
    /// enqueues every readable/writable descriptor other than the wakeup token, then
    /// invokes `on_event` once per enqueued descriptor, then fires due timers.
    ///
    /// Readiness is never acted on mid-scan: the scan over `self.events` only records
    /// what became ready, and `on_event` only runs afterward, once the full readiness
    /// set for this iteration is known. This keeps a descriptor's callback from running
    /// interleaved with the scan that discovered it.
    pub fn tick(&mut self, mut on_event: impl FnMut(&Readiness)) -> io::Result<()> {
        self.drain_tasks();

        let wait_ms = self.timers.next_wait_ms(now_ms());
        self.poll.poll(&mut self.events, Some(Duration::from_millis(wait_ms)))?;

        let mut ready = Vec::new();
        for event in self.events.iter() {
            if event.token() == WAKE_TOKEN {
                continue;
            }
            ready.push(Readiness {
                token: event.token(),
                readable: event.is_readable(),
                writable: event.is_writable(),
            });
        }

        for readiness in &ready {
            on_event(readiness);
        }

        self.timers.fire_due(now_ms());
        Ok(())
    }

    /// Runs iterations until [`EventLoop::stop`] is called.
    pub fn run(&mut self, mut on_event: impl FnMut(&Readiness)) -> io::Result<()> {
        while !self.stopped {
            self.tick(&mut on_event)?;
        }
        Ok(())
    }
}

/// Current time in milliseconds since the epoch, used as the timer wheel's clock.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
