//! Hand-driven clock and timers
//!
//! Time only moves when [`ManualTimers::advance_to`] (or `advance`) is
//! called; due callbacks run in deadline order with the clock set to each
//! callback's deadline. Callbacks may arm or cancel further timers.

use super::{Clock, TimerCallback, TimerHandle, Timers};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Jump the clock without firing timers (e.g. a suspended device waking up)
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Default)]
struct Pending {
    next_id: u64,
    callbacks: BTreeMap<(DateTime<Utc>, u64), TimerCallback>,
}

/// Timers fired explicitly by advancing a [`ManualClock`]
pub struct ManualTimers {
    clock: Arc<ManualClock>,
    pending: Arc<Mutex<Pending>>,
}

impl ManualTimers {
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    /// Convenience constructor for a clock and its timers starting at `start`
    pub fn starting_at(start: DateTime<Utc>) -> (Arc<ManualClock>, Arc<ManualTimers>) {
        let clock = Arc::new(ManualClock::new(start));
        let timers = Arc::new(ManualTimers::new(clock.clone()));
        (clock, timers)
    }

    /// Number of armed, not yet fired, timers
    pub fn pending(&self) -> usize {
        self.lock().callbacks.len()
    }

    /// Deadlines of armed timers, ascending
    pub fn deadlines(&self) -> Vec<DateTime<Utc>> {
        self.lock().callbacks.keys().map(|(d, _)| *d).collect()
    }

    /// Move time forward to `target`, firing every timer due on the way
    ///
    /// Returns the number of callbacks run.
    pub fn advance_to(&self, target: DateTime<Utc>) -> usize {
        let mut fired = 0;
        loop {
            let due = {
                let mut pending = self.lock();
                let ready = pending
                    .callbacks
                    .first_key_value()
                    .is_some_and(|((deadline, _), _)| *deadline <= target);
                if ready {
                    pending.callbacks.pop_first()
                } else {
                    None
                }
            };
            let Some(((deadline, _), callback)) = due else {
                break;
            };
            if deadline > self.clock.now() {
                self.clock.set(deadline);
            }
            callback();
            fired += 1;
        }
        if target > self.clock.now() {
            self.clock.set(target);
        }
        fired
    }

    /// Move time forward by `delta`
    pub fn advance(&self, delta: TimeDelta) -> usize {
        self.advance_to(self.clock.now() + delta)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Timers for ManualTimers {
    fn arm(&self, deadline: DateTime<Utc>, callback: TimerCallback) -> TimerHandle {
        let key = {
            let mut pending = self.lock();
            let id = pending.next_id;
            pending.next_id += 1;
            pending.callbacks.insert((deadline, id), callback);
            (deadline, id)
        };
        let weak = Arc::downgrade(&self.pending);
        TimerHandle::new(deadline, move || {
            if let Some(pending) = weak.upgrade() {
                pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .callbacks
                    .remove(&key);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap()
    }

    #[test]
    fn fires_in_deadline_order_with_clock_at_deadline() {
        let (clock, timers) = ManualTimers::starting_at(start());
        let seen = Arc::new(Mutex::new(Vec::new()));
        for minutes in [20, 5, 10] {
            let seen = seen.clone();
            let clock = clock.clone();
            let _ = timers.arm(
                start() + TimeDelta::minutes(minutes),
                Box::new(move || seen.lock().unwrap().push(clock.now())),
            );
        }

        assert_eq!(timers.advance(TimeDelta::minutes(15)), 2);
        assert_eq!(clock.now(), start() + TimeDelta::minutes(15));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![start() + TimeDelta::minutes(5), start() + TimeDelta::minutes(10)]
        );
        assert_eq!(timers.pending(), 1);
    }

    #[test]
    fn cancel_removes_pending_timer() {
        let (_clock, timers) = ManualTimers::starting_at(start());
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let handle = timers.arm(
            start() + TimeDelta::minutes(1),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert_eq!(timers.pending(), 1);
        handle.cancel();
        assert_eq!(timers.pending(), 0);
        assert_eq!(timers.advance(TimeDelta::hours(1)), 0);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn callbacks_can_rearm() {
        let (clock, timers) = ManualTimers::starting_at(start());
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let inner_timers = timers.clone();
        let inner_counter = fired.clone();
        let _ = timers.arm(
            start() + TimeDelta::minutes(1),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = inner_timers.arm(
                    clock.now() + TimeDelta::minutes(1),
                    Box::new(move || {
                        inner_counter.fetch_add(1, Ordering::SeqCst);
                    }),
                );
            }),
        );
        assert_eq!(timers.advance(TimeDelta::minutes(5)), 2);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }
}
