//! Monotonic timer wheel: a multimap keyed by absolute arrival time, supporting repeat
//! and cancel with a strict "reinsert before invoke" ordering for repeating timers.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Floor applied when the next arrival has already passed, to avoid a tight poll loop.
const MIN_REARM_MS: u64 = 100;
/// Upper bound on how long a tick may wait when no timer is scheduled.
pub const MAX_WAIT_MS: u64 = 10_000;

type Callback = Box<dyn FnMut() + Send>;

struct TimerInner {
    interval_ms: u64,
    repeat: bool,
    canceled: AtomicBool,
    callback: Mutex<Callback>,
}

/// A handle to a scheduled timer. Cancellation is cooperative: it only sets a flag the
/// wheel checks when the entry would otherwise fire.
#[derive(Clone)]
pub struct TimerHandle {
    inner: Arc<TimerInner>,
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("repeat", &self.inner.repeat)
            .field("interval_ms", &self.inner.interval_ms)
            .field("canceled", &self.is_canceled())
            .finish()
    }
}

impl TimerHandle {
    /// Marks this timer canceled. A canceled repeating timer is dropped the next time
    /// its arrival is reached rather than being removed immediately.
    pub fn cancel(&self) {
        self.inner.canceled.store(true, Ordering::SeqCst);
    }

    /// Whether this timer has been canceled.
    pub fn is_canceled(&self) -> bool {
        self.inner.canceled.load(Ordering::SeqCst)
    }
}

/// Multimap of scheduled callbacks keyed by `(arrival_ms, sequence)`, the sequence
/// breaking ties between timers that land on the same millisecond.
#[derive(Default)]
pub struct TimerWheel {
    next_seq: u64,
    entries: BTreeMap<(u64, u64), Arc<TimerInner>>,
}

impl std::fmt::Debug for TimerWheel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerWheel")
            .field("pending", &self.entries.len())
            .finish()
    }
}

impl TimerWheel {
    /// Creates an empty wheel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `callback` to run `delay_ms` from `now_ms`, repeating every
    /// `interval_ms` thereafter if `repeat` is set.
    pub fn schedule(
        &mut self,
        now_ms: u64,
        delay_ms: u64,
        interval_ms: u64,
        repeat: bool,
        callback: Callback,
    ) -> TimerHandle {
        let seq = self.next_seq;
        self.next_seq += 1;

        let inner = Arc::new(TimerInner {
            interval_ms,
            repeat,
            canceled: AtomicBool::new(false),
            callback: Mutex::new(callback),
        });

        let arrival = now_ms + delay_ms;
        self.entries.insert((arrival, seq), inner.clone());
        TimerHandle { inner }
    }

    /// The number of milliseconds from `now_ms` the caller should wait before the next
    /// `fire_due`, bounded by [`MAX_WAIT_MS`].
    pub fn next_wait_ms(&self, now_ms: u64) -> u64 {
        match self.entries.keys().next() {
            None => MAX_WAIT_MS,
            Some((arrival, _)) if *arrival <= now_ms => MIN_REARM_MS,
            Some((arrival, _)) => (*arrival - now_ms).min(MAX_WAIT_MS),
        }
    }

    /// Fires every non-canceled entry whose arrival is at or before `now_ms`. Repeating
    /// entries are reinserted with their next arrival *before* any callback in this
    /// batch runs, so a repeating timer's own callback can rely on its next occurrence
    /// already being scheduled.
    pub fn fire_due(&mut self, now_ms: u64) {
        let due_keys: Vec<(u64, u64)> = self
            .entries
            .range(..=(now_ms, u64::MAX))
            .map(|(key, _)| *key)
            .collect();

        let mut due = Vec::with_capacity(due_keys.len());
        for key in due_keys {
            if let Some(inner) = self.entries.remove(&key) {
                due.push((key, inner));
            }
        }

        let mut to_invoke = Vec::with_capacity(due.len());
        for (key, inner) in due {
            if inner.canceled.load(Ordering::SeqCst) {
                continue;
            }
            if inner.repeat {
                let seq = key.1;
                let next_arrival = now_ms + inner.interval_ms.max(1);
                self.entries.insert((next_arrival, seq), inner.clone());
            }
            to_invoke.push(inner);
        }

        for inner in to_invoke {
            if inner.canceled.load(Ordering::SeqCst) {
                continue;
            }
            let mut callback = inner.callback.lock().unwrap();
            (callback)();
        }
    }

    /// Number of timers still pending, canceled or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the wheel holds no timers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn fires_once_at_arrival() {
        let mut wheel = TimerWheel::new();
        let fired = Arc::new(StdMutex::new(0));
        let fired_clone = fired.clone();
        wheel.schedule(0, 100, 0, false, Box::new(move || *fired_clone.lock().unwrap() += 1));

        wheel.fire_due(50);
        assert_eq!(*fired.lock().unwrap(), 0);
        wheel.fire_due(100);
        assert_eq!(*fired.lock().unwrap(), 1);
        wheel.fire_due(200);
        assert_eq!(*fired.lock().unwrap(), 1);
    }

    #[test]
    fn repeat_reinserts_before_invoking() {
        let mut wheel = TimerWheel::new();
        let calls = Arc::new(StdMutex::new(Vec::new()));
        let calls_clone = calls.clone();
        wheel.schedule(
            0,
            10,
            10,
            true,
            Box::new(move || calls_clone.lock().unwrap().push(())),
        );

        for tick in [10u64, 20, 30] {
            wheel.fire_due(tick);
        }
        assert_eq!(calls.lock().unwrap().len(), 3);
        assert_eq!(wheel.len(), 1, "repeating timer stays scheduled");
    }

    #[test]
    fn canceled_timer_is_skipped() {
        let mut wheel = TimerWheel::new();
        let fired = Arc::new(StdMutex::new(false));
        let fired_clone = fired.clone();
        let handle = wheel.schedule(0, 50, 0, false, Box::new(move || *fired_clone.lock().unwrap() = true));

        handle.cancel();
        wheel.fire_due(100);
        assert!(!*fired.lock().unwrap());
    }

    #[test]
    fn next_wait_reflects_earliest_arrival() {
        let mut wheel = TimerWheel::new();
        assert_eq!(wheel.next_wait_ms(0), MAX_WAIT_MS);
        wheel.schedule(0, 500, 0, false, Box::new(|| {}));
        assert_eq!(wheel.next_wait_ms(0), 500);
        assert_eq!(wheel.next_wait_ms(600), MIN_REARM_MS);
    }
}
