// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cancellable one-shot timers
//!
//! Debounced effects are expressed as `schedule(key, delay, action)`;
//! scheduling a key again replaces the pending timer, `cancel(key)` drops it.
//! `TokioTimers` runs on the tokio clock, `ManualClock` only moves when a
//! test calls [`ManualClock::advance`].

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

/// Work run when a timer fires
pub type TimerAction = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Timer slots; each component owns its own scheduler, so keys only need to
/// be unique within one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimerKey {
    HistoryCapture,
    Autosave,
    StatusClear,
}

pub trait Scheduler: Send + Sync {
    fn schedule(&self, key: TimerKey, delay: Duration, action: TimerAction);
    fn cancel(&self, key: TimerKey);
    fn is_pending(&self, key: TimerKey) -> bool;

    fn cancel_all(&self) {
        for key in [TimerKey::HistoryCapture, TimerKey::Autosave, TimerKey::StatusClear] {
            self.cancel(key);
        }
    }
}

/// Hands out one scheduler per component
pub trait TimerSource: Send + Sync {
    fn scheduler(&self) -> Arc<dyn Scheduler>;
}

/// Wraps an async closure as a [`TimerAction`].
pub fn action<F, Fut>(f: F) -> TimerAction
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    Box::new(move || Box::pin(f()))
}

/// Timers backed by `tokio::time`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTimers;

impl TimerSource for TokioTimers {
    fn scheduler(&self) -> Arc<dyn Scheduler> {
        Arc::new(TokioScheduler::default())
    }
}

#[derive(Default)]
pub struct TokioScheduler {
    timers: Mutex<HashMap<TimerKey, JoinHandle<()>>>,
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, key: TimerKey, delay: Duration, action: TimerAction) {
        // Only the sleep is abortable; once the action starts it runs to
        // completion on its own task.
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(action());
        });
        if let Some(previous) = self.timers.lock().insert(key, handle) {
            previous.abort();
        }
    }

    fn cancel(&self, key: TimerKey) {
        if let Some(handle) = self.timers.lock().remove(&key) {
            handle.abort();
        }
    }

    fn is_pending(&self, key: TimerKey) -> bool {
        self.timers
            .lock()
            .get(&key)
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.timers.get_mut().drain() {
            handle.abort();
        }
    }
}

struct PendingTimer {
    owner: u64,
    key: TimerKey,
    due: Duration,
    seq: u64,
    action: TimerAction,
}

#[derive(Default)]
struct ClockState {
    now: Duration,
    next_seq: u64,
    timers: Vec<PendingTimer>,
}

/// Virtual clock shared by any number of [`ManualScheduler`]s.
#[derive(Clone, Default)]
pub struct ManualClock {
    state: Arc<Mutex<ClockState>>,
    next_owner: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed since the clock was created
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of timers waiting to fire
    pub fn pending(&self) -> usize {
        self.state.lock().timers.len()
    }

    /// Removes matching timers; callers drop them after the lock is released,
    /// since an action may own the last handle to a component.
    fn take_timers(&self, matches: impl Fn(&PendingTimer) -> bool) -> Vec<PendingTimer> {
        let mut state = self.state.lock();
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.timers)
            .into_iter()
            .partition(|t| matches(t));
        state.timers = kept;
        taken
    }

    pub fn manual_scheduler(&self) -> ManualScheduler {
        ManualScheduler {
            clock: self.clone(),
            owner: self.next_owner.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Moves time forward by `by`, firing due timers in deadline order.
    ///
    /// Each action is awaited before the next one fires. Timers scheduled by
    /// an action also fire if they fall due within the window.
    pub async fn advance(&self, by: Duration) {
        let target = self.now() + by;
        loop {
            let next = {
                let mut state = self.state.lock();
                let idx = state
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by_key(|(_, t)| (t.due, t.seq))
                    .map(|(idx, _)| idx);
                match idx {
                    Some(idx) => {
                        let timer = state.timers.swap_remove(idx);
                        state.now = timer.due;
                        Some(timer)
                    }
                    None => {
                        state.now = target;
                        None
                    }
                }
            };

            match next {
                Some(timer) => {
                    trace!(key = ?timer.key, at = ?timer.due, "Manual timer fired");
                    (timer.action)().await;
                }
                None => break,
            }
        }
    }

    /// Advances until no timers remain.
    pub async fn run_until_idle(&self) {
        loop {
            let last_due = self.state.lock().timers.iter().map(|t| t.due).max();
            match last_due {
                Some(due) => {
                    let now = self.now();
                    self.advance(due.saturating_sub(now)).await;
                }
                None => break,
            }
        }
    }
}

impl TimerSource for ManualClock {
    fn scheduler(&self) -> Arc<dyn Scheduler> {
        Arc::new(self.manual_scheduler())
    }
}

/// A component's view of a [`ManualClock`]
pub struct ManualScheduler {
    clock: ManualClock,
    owner: u64,
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, key: TimerKey, delay: Duration, action: TimerAction) {
        let owner = self.owner;
        let replaced = self.clock.take_timers(|t| t.owner == owner && t.key == key);
        {
            let mut state = self.clock.state.lock();
            let due = state.now + delay;
            let seq = state.next_seq;
            state.next_seq += 1;
            state.timers.push(PendingTimer { owner, key, due, seq, action });
        }
        drop(replaced);
    }

    fn cancel(&self, key: TimerKey) {
        let owner = self.owner;
        drop(self.clock.take_timers(|t| t.owner == owner && t.key == key));
    }

    fn is_pending(&self, key: TimerKey) -> bool {
        self.clock
            .state
            .lock()
            .timers
            .iter()
            .any(|t| t.owner == self.owner && t.key == key)
    }
}

impl Drop for ManualScheduler {
    fn drop(&mut self) {
        let owner = self.owner;
        drop(self.clock.take_timers(|t| t.owner == owner));
    }
}
