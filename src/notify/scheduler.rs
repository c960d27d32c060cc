//! One-shot alerts for today's upcoming negative slots

use super::{Notification, Permission, negative_price_notification};
use crate::logging::{LogContext, get_logger_with_context};
use crate::rates::RateInterval;
use crate::slots::local_date;
use crate::timer::{Clock, TimerHandle, Timers};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;

#[derive(Clone, PartialEq)]
struct Inputs {
    rates: Arc<[RateInterval]>,
    enabled: bool,
    permission: Permission,
    // Yesterday's "tomorrow" rates qualify once the date rolls over
    today: NaiveDate,
}

#[derive(Default)]
struct SchedulerInner {
    last: Option<Inputs>,
    armed: BTreeMap<DateTime<Utc>, TimerHandle>,
    // Session-scoped; survives re-scheduling and teardown
    notified: BTreeSet<DateTime<Utc>>,
}

struct SchedulerShared {
    clock: Arc<dyn Clock>,
    timers: Arc<dyn Timers>,
    tz: Tz,
    outbox: mpsc::UnboundedSender<Notification>,
    inner: Mutex<SchedulerInner>,
    logger: crate::logging::StructuredLogger,
}

impl SchedulerShared {
    fn lock(&self) -> MutexGuard<'_, SchedulerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fire(&self, rate: &RateInterval) {
        {
            let mut inner = self.lock();
            inner.armed.remove(&rate.valid_from);
            if !inner.notified.insert(rate.valid_from) {
                return;
            }
        }
        let notification = negative_price_notification(rate, self.tz);
        self.logger
            .info(&format!("Negative slot started: {}", notification.body));
        if self.outbox.send(notification).is_err() {
            self.logger.warn("Notification outbox closed, alert dropped");
        }
    }
}

/// Arms a one-shot alert per qualifying negative slot
///
/// A slot qualifies when its price is negative, it starts on today's local
/// date, it starts strictly after now, and it has not been notified in this
/// session.
pub struct NotificationScheduler {
    shared: Arc<SchedulerShared>,
}

impl NotificationScheduler {
    pub fn new(
        clock: Arc<dyn Clock>,
        timers: Arc<dyn Timers>,
        tz: Tz,
        outbox: mpsc::UnboundedSender<Notification>,
    ) -> Self {
        Self {
            shared: Arc::new(SchedulerShared {
                clock,
                timers,
                tz,
                outbox,
                inner: Mutex::new(SchedulerInner::default()),
                logger: get_logger_with_context(
                    LogContext::new("scheduler").with_field("tz", tz.name().to_string()),
                ),
            }),
        }
    }

    /// Rebuild the armed timers for new inputs
    ///
    /// Identical inputs on the same local date leave the armed timers
    /// untouched. Otherwise every armed timer is canceled first, then timers
    /// are armed only when notifications are enabled and permitted.
    pub fn schedule(&self, rates: Arc<[RateInterval]>, enabled: bool, permission: Permission) {
        let now = self.shared.clock.now();
        let today = local_date(now, self.shared.tz);
        let inputs = Inputs {
            rates,
            enabled,
            permission,
            today,
        };
        let mut inner = self.shared.lock();
        if inner.last.as_ref() == Some(&inputs) {
            return;
        }
        for (_, handle) in std::mem::take(&mut inner.armed) {
            handle.cancel();
        }

        if enabled && permission == Permission::Granted {
            for rate in inputs.rates.iter() {
                if !rate.is_negative()
                    || local_date(rate.valid_from, self.shared.tz) != today
                    || rate.valid_from <= now
                    || inner.notified.contains(&rate.valid_from)
                    || inner.armed.contains_key(&rate.valid_from)
                {
                    continue;
                }
                let weak: Weak<SchedulerShared> = Arc::downgrade(&self.shared);
                let slot = rate.clone();
                let handle = self.shared.timers.arm(
                    rate.valid_from,
                    Box::new(move || {
                        if let Some(shared) = weak.upgrade() {
                            shared.fire(&slot);
                        }
                    }),
                );
                inner.armed.insert(rate.valid_from, handle);
            }
            self.shared
                .logger
                .info(&format!("Armed {} negative-price alerts", inner.armed.len()));
        } else {
            self.shared.logger.debug(&format!(
                "Alerts not armed (enabled={}, permission={:?})",
                enabled, permission
            ));
        }
        inner.last = Some(inputs);
    }

    /// Cancel every armed timer; the next `schedule` call re-arms
    pub fn teardown(&self) {
        let mut inner = self.shared.lock();
        for (_, handle) in std::mem::take(&mut inner.armed) {
            handle.cancel();
        }
        inner.last = None;
    }

    pub fn armed_count(&self) -> usize {
        self.shared.lock().armed.len()
    }

    /// Start instants of the armed slots, ascending
    pub fn armed_slots(&self) -> Vec<DateTime<Utc>> {
        self.shared.lock().armed.keys().copied().collect()
    }

    /// Whether the slot starting at `valid_from` was already notified
    pub fn is_notified(&self, valid_from: DateTime<Utc>) -> bool {
        self.shared.lock().notified.contains(&valid_from)
    }
}

impl Drop for NotificationScheduler {
    fn drop(&mut self) {
        self.teardown();
    }
}
