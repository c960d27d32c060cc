//! Whether a user-triggered refresh should hit the pricing API
//!
//! Next-day prices are published once a day in the afternoon, so a refresh
//! before then, or after then with both days already loaded, has nothing
//! new to fetch.

use crate::rates::RateInterval;
use crate::slots::{today_key, tomorrow_key};
use crate::summary::has_rates_for_day;
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

/// Outcome of a refresh request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshDecision {
    /// A fetch is already in flight
    Busy,
    /// Nothing new to fetch; the message is shown to the user
    UpToDate(String),
    /// Fetch now
    Fetch,
}

pub fn refresh_decision(
    rates: &[RateInterval],
    now: DateTime<Utc>,
    tz: Tz,
    loading: bool,
    publish_hour: u32,
) -> RefreshDecision {
    if loading {
        return RefreshDecision::Busy;
    }

    let has_today = has_rates_for_day(rates, &today_key(now, tz), tz);
    let before_publish = now.with_timezone(&tz).hour() < publish_hour;
    if has_today && before_publish {
        return RefreshDecision::UpToDate(format!(
            "Rates are up to date. New rates available after {:02}:00.",
            publish_hour
        ));
    }
    if has_today && has_rates_for_day(rates, &tomorrow_key(now, tz), tz) {
        return RefreshDecision::UpToDate("Rates are up to date.".to_string());
    }
    RefreshDecision::Fetch
}
