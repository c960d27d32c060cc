//! Clock and one-shot timer seam
//!
//! The current-slot tracker and the notification scheduler never sleep on
//! their own: they arm deadlines through [`Timers`] and read the time through
//! [`Clock`]. Production uses [`SystemClock`] with [`TokioTimers`]; tests
//! drive [`manual::ManualTimers`] by hand.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

pub mod manual;

pub use manual::{ManualClock, ManualTimers};

/// Callback invoked once when a timer fires
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Arms one-shot callbacks at absolute deadlines
pub trait Timers: Send + Sync {
    /// Run `callback` at `deadline`, or as soon as possible if it already passed
    fn arm(&self, deadline: DateTime<Utc>, callback: TimerCallback) -> TimerHandle;
}

/// Cancel handle of an armed timer
///
/// Dropping the handle does not cancel the timer; owners cancel explicitly
/// on teardown.
pub struct TimerHandle {
    deadline: DateTime<Utc>,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerHandle {
    pub fn new<F>(deadline: DateTime<Utc>, cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            deadline,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Deadline the timer was armed for
    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    /// Cancel the timer; a no-op if it already fired
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("deadline", &self.deadline)
            .finish()
    }
}

/// Timers backed by `tokio::time`
///
/// Each timer is a spawned task that sleeps until the deadline; cancel aborts
/// the task. Must be used from within a tokio runtime.
pub struct TokioTimers {
    clock: Arc<dyn Clock>,
}

impl TokioTimers {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

impl Timers for TokioTimers {
    fn arm(&self, deadline: DateTime<Utc>, callback: TimerCallback) -> TimerHandle {
        let delay = (deadline - self.clock.now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        TimerHandle::new(deadline, move || task.abort())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_fires_after_delay() {
        let timers = TokioTimers::new(Arc::new(SystemClock));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let _handle = timers.arm(
            Utc::now() + chrono::TimeDelta::seconds(5),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        tokio::time::sleep(std::time::Duration::from_secs(4)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_cancel_prevents_firing() {
        let timers = TokioTimers::new(Arc::new(SystemClock));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let handle = timers.arm(
            Utc::now() + chrono::TimeDelta::seconds(1),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        handle.cancel();

        tokio::time::sleep(std::time::Duration::from_secs(3)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_past_deadline_fires_immediately() {
        let timers = TokioTimers::new(Arc::new(SystemClock));
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let _handle = timers.arm(
            Utc::now() - chrono::TimeDelta::seconds(10),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
