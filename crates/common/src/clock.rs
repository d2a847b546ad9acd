//! Clock capability for recording sessions.
//!
//! The session manager never touches timers or system time directly. It
//! asks a [`ClockSource`] for the current monotonic time and for repeating
//! callbacks, which keeps it testable with [`ManualClock`] and lets the
//! application run it on [`SystemClock`].

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

/// Identifier of a scheduled repeating callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Callback invoked on each timer period.
pub type TickCallback = Box<dyn Fn() + Send + Sync>;

/// Time source and scheduler injected into the session manager.
pub trait ClockSource: Send + Sync {
    /// Milliseconds on a monotonic timeline with an arbitrary origin.
    fn now_ms(&self) -> u64;

    /// Invoke `callback` every `interval` until cancelled.
    fn schedule_repeating(&self, interval: Duration, callback: TickCallback) -> TimerId;

    /// Cancel a timer. Returns `false` if it was unknown or already cancelled.
    fn cancel(&self, id: TimerId) -> bool;
}

/// Whole seconds between two monotonic millisecond readings.
///
/// Computed from the timestamps rather than by counting ticks, so late or
/// skipped ticks never accumulate error.
pub fn elapsed_whole_secs(start_ms: u64, now_ms: u64) -> u64 {
    now_ms.saturating_sub(start_ms) / 1000
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Real clock backed by tokio's [`Instant`] and interval tasks, so paused
/// test runtimes see consistent time.
pub struct SystemClock {
    epoch: Instant,
    next_id: AtomicU64,
    timers: Mutex<HashMap<u64, tokio::task::JoinHandle<()>>>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            next_id: AtomicU64::new(1),
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Number of timers that have not been cancelled.
    pub fn active_timers(&self) -> usize {
        lock(&self.timers).len()
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for SystemClock {
    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn schedule_repeating(&self, interval: Duration, callback: TickCallback) -> TimerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(timer = id, "No tokio runtime available; timer will never fire");
            return TimerId(id);
        };

        let interval = interval.max(Duration::from_millis(1));
        let task = handle.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                callback();
            }
        });
        lock(&self.timers).insert(id, task);
        TimerId(id)
    }

    fn cancel(&self, id: TimerId) -> bool {
        match lock(&self.timers).remove(&id.0) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for SystemClock {
    fn drop(&mut self) {
        for (_, task) in lock(&self.timers).drain() {
            task.abort();
        }
    }
}

struct ManualTimer {
    interval_ms: u64,
    next_fire_ms: u64,
    callback: Arc<dyn Fn() + Send + Sync>,
}

/// Deterministic clock for tests and simulations. Time only moves when
/// [`ManualClock::advance`] is called; due callbacks fire in time order.
#[derive(Default)]
pub struct ManualClock {
    now_ms: Mutex<u64>,
    next_id: AtomicU64,
    timers: Mutex<BTreeMap<u64, ManualTimer>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward, firing every callback that falls due on the way.
    pub fn advance(&self, by: Duration) {
        let target = *lock(&self.now_ms) + by.as_millis() as u64;

        loop {
            let due = {
                let mut timers = lock(&self.timers);
                let next = timers
                    .iter()
                    .filter(|(_, t)| t.next_fire_ms <= target)
                    .min_by_key(|(id, t)| (t.next_fire_ms, **id))
                    .map(|(id, _)| *id);
                next.and_then(|id| timers.get_mut(&id)).map(|timer| {
                    let fire_at = timer.next_fire_ms;
                    timer.next_fire_ms += timer.interval_ms;
                    (fire_at, Arc::clone(&timer.callback))
                })
            };

            let Some((fire_at, callback)) = due else {
                break;
            };
            *lock(&self.now_ms) = fire_at;
            callback();
        }

        *lock(&self.now_ms) = target;
    }

    /// Number of timers that have not been cancelled.
    pub fn active_timers(&self) -> usize {
        lock(&self.timers).len()
    }
}

impl ClockSource for ManualClock {
    fn now_ms(&self) -> u64 {
        *lock(&self.now_ms)
    }

    fn schedule_repeating(&self, interval: Duration, callback: TickCallback) -> TimerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let interval_ms = (interval.as_millis() as u64).max(1);
        let timer = ManualTimer {
            interval_ms,
            next_fire_ms: self.now_ms() + interval_ms,
            callback: Arc::from(callback),
        };
        lock(&self.timers).insert(id, timer);
        TimerId(id)
    }

    fn cancel(&self, id: TimerId) -> bool {
        lock(&self.timers).remove(&id.0).is_some()
    }
}
