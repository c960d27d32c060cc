//! Current slot resolution and liveness
//!
//! [`find_current_slot`] answers "which interval contains now". The
//! [`CurrentSlotTracker`] keeps that answer live without polling: it
//! re-resolves whenever rates are replaced, whenever the view becomes
//! visible again, and once just after the current slot ends.

use crate::logging::get_logger;
use crate::rates::RateInterval;
use crate::timer::{Clock, TimerHandle, Timers};
use chrono::{DateTime, TimeDelta, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;

/// First interval with `valid_from <= now < valid_to`
pub fn find_current_slot(rates: &[RateInterval], now: DateTime<Utc>) -> Option<&RateInterval> {
    rates.iter().find(|rate| rate.contains(now))
}

/// Whether the published current slot is known to reflect the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Needs recomputation; only observable between a trigger and its recompute
    Stale,
    /// Recomputed since the last trigger
    Current,
}

struct TrackerInner {
    rates: Arc<[RateInterval]>,
    liveness: Liveness,
    boundary: Option<TimerHandle>,
    shut_down: bool,
}

struct TrackerShared {
    clock: Arc<dyn Clock>,
    timers: Arc<dyn Timers>,
    guard: TimeDelta,
    inner: Mutex<TrackerInner>,
    tx: watch::Sender<Option<RateInterval>>,
    logger: crate::logging::StructuredLogger,
}

impl TrackerShared {
    fn lock(&self) -> MutexGuard<'_, TrackerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stale -> recompute -> publish -> rearm
    fn invalidate(self: &Arc<Self>, reason: &str) {
        let resolved = {
            let mut inner = self.lock();
            if inner.shut_down {
                return;
            }
            inner.liveness = Liveness::Stale;
            if let Some(handle) = inner.boundary.take() {
                handle.cancel();
            }

            let now = self.clock.now();
            let resolved = find_current_slot(&inner.rates, now).cloned();
            if let Some(rate) = &resolved {
                let weak: Weak<Self> = Arc::downgrade(self);
                let deadline = rate.valid_to + self.guard;
                inner.boundary = Some(self.timers.arm(
                    deadline,
                    Box::new(move || {
                        if let Some(shared) = weak.upgrade() {
                            shared.invalidate("slot boundary");
                        }
                    }),
                ));
            }
            inner.liveness = Liveness::Current;
            resolved
        };

        self.logger.trace(&format!(
            "Re-resolved current slot ({}): {}",
            reason,
            resolved
                .as_ref()
                .map_or_else(|| "none".to_string(), RateInterval::slot_key)
        ));
        self.tx.send_if_modified(|published| {
            if *published == resolved {
                false
            } else {
                *published = resolved;
                true
            }
        });
    }
}

/// Keeps the current slot live across slot boundaries and visibility changes
pub struct CurrentSlotTracker {
    shared: Arc<TrackerShared>,
}

impl CurrentSlotTracker {
    /// Create a tracker with no rates; `guard` is the delay past a slot's end
    /// before re-resolving
    pub fn new(clock: Arc<dyn Clock>, timers: Arc<dyn Timers>, guard: TimeDelta) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            shared: Arc::new(TrackerShared {
                clock,
                timers,
                guard,
                inner: Mutex::new(TrackerInner {
                    rates: Arc::from(Vec::new()),
                    liveness: Liveness::Stale,
                    boundary: None,
                    shut_down: false,
                }),
                tx,
                logger: get_logger("current"),
            }),
        }
    }

    /// Replace the rate sequence and re-resolve
    pub fn set_rates(&self, rates: Arc<[RateInterval]>) {
        self.shared.lock().rates = rates;
        self.shared.invalidate("rates replaced");
    }

    /// The view became visible again; the clock may have jumped while hidden
    pub fn on_visible(&self) {
        self.shared.invalidate("visible");
    }

    /// Last resolved current slot
    pub fn current(&self) -> Option<RateInterval> {
        self.shared.tx.borrow().clone()
    }

    pub fn liveness(&self) -> Liveness {
        self.shared.lock().liveness
    }

    /// Deadline of the armed boundary timer, if any
    pub fn boundary_deadline(&self) -> Option<DateTime<Utc>> {
        self.shared.lock().boundary.as_ref().map(TimerHandle::deadline)
    }

    /// Receive every change of the resolved slot
    pub fn subscribe(&self) -> watch::Receiver<Option<RateInterval>> {
        self.shared.tx.subscribe()
    }

    /// Cancel the boundary timer and stop reacting to triggers
    pub fn shutdown(&self) {
        let mut inner = self.shared.lock();
        inner.shut_down = true;
        if let Some(handle) = inner.boundary.take() {
            handle.cancel();
        }
    }
}

impl Drop for CurrentSlotTracker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
