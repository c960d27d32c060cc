//! Negative-price notifications
//!
//! The [`scheduler`] arms one timer per upcoming negative slot of today and
//! pushes a [`Notification`] into an outbox when it fires. The [`dispatcher`]
//! drains the outbox and hands each notification to a [`channel`], trying
//! the persistent channel first and falling back to the in-session one.

use crate::rates::RateInterval;
use crate::slots::time_key;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

pub mod channel;
pub mod dispatcher;
pub mod scheduler;

pub use channel::{ConsoleChannel, NotificationChannel, WebhookChannel};
pub use dispatcher::{DeliveryOutcome, NotificationDispatcher};
pub use scheduler::NotificationScheduler;

/// Title of every negative-price notification
pub const NEGATIVE_PRICE_TITLE: &str = "Negative Price Alert";

/// Shown when no channel can display notifications
pub const UNSUPPORTED_MESSAGE: &str = "Notifications are not supported in this environment.";

/// Shown when the user's channel refuses notifications
pub const DENIED_MESSAGE: &str =
    "Notification permission denied. Please allow notifications in your notification settings.";

/// A notification ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,

    /// Replaces an earlier notification with the same tag on channels that support it
    pub tag: String,
}

/// Whether a channel may show notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    Unsupported,
}

/// Notification announcing that a negative slot has started
pub fn negative_price_notification(rate: &RateInterval, tz: Tz) -> Notification {
    Notification {
        title: NEGATIVE_PRICE_TITLE.to_string(),
        body: format!(
            "{:.2}p/kWh from {} to {}",
            rate.value_inc_vat,
            time_key(rate.valid_from, tz),
            time_key(rate.valid_to, tz)
        ),
        tag: format!("negative-{}", rate.slot_key()),
    }
}
