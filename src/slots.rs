//! Day and slot keys
//!
//! Pure conversions between instants and the viewer's calendar days and
//! half-hour slots. Every function takes the viewer's timezone explicitly so
//! results never depend on the host's local zone.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

/// Number of half-hour slots in a regular day
pub const SLOTS_PER_DAY: usize = 48;

/// Length of one slot in minutes
pub const SLOT_MINUTES: u32 = 30;

const DATE_FORMAT: &str = "%Y/%m/%d";
const TIME_FORMAT: &str = "%H:%M";

/// Local calendar date of an instant
pub fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// Key of a calendar date, `YYYY/MM/DD`
pub fn day_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Local calendar-day key of an instant, `YYYY/MM/DD`
pub fn date_key(instant: DateTime<Utc>, tz: Tz) -> String {
    day_key(local_date(instant, tz))
}

/// Local time of day of an instant, `HH:MM` (24-hour)
pub fn time_key(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format(TIME_FORMAT).to_string()
}

/// Key of the day containing `now`
pub fn today_key(now: DateTime<Utc>, tz: Tz) -> String {
    date_key(now, tz)
}

/// Key of the calendar day after the one containing `now`
///
/// Calendar arithmetic, not `now + 24h`, so DST transitions never skip or
/// repeat a day.
pub fn tomorrow_key(now: DateTime<Utc>, tz: Tz) -> String {
    day_key(next_day(local_date(now, tz)))
}

/// Every half-hour boundary of a day, `00:00 ..= 23:30`
pub fn all_slot_keys() -> Vec<String> {
    (0..SLOTS_PER_DAY as u32)
        .map(|i| {
            let minutes = i * SLOT_MINUTES;
            format!("{:02}:{:02}", minutes / 60, minutes % 60)
        })
        .collect()
}

/// First existing local instant of `date`
///
/// Usually local midnight; in zones whose DST gap swallows midnight it is
/// the first half-hour boundary after the gap.
pub fn start_of_day(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    for slot in 0..SLOTS_PER_DAY as i64 {
        let naive = midnight + TimeDelta::minutes(slot * SLOT_MINUTES as i64);
        if let Some(local) = tz.from_local_datetime(&naive).earliest() {
            return local.with_timezone(&Utc);
        }
    }
    Utc.from_utc_datetime(&midnight)
}

/// Window `[start of today, start of today + 2 calendar days)`
pub fn fetch_window(now: DateTime<Utc>, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = local_date(now, tz);
    let after_tomorrow = next_day(next_day(today));
    (start_of_day(today, tz), start_of_day(after_tomorrow, tz))
}

/// `HH:MM - HH:MM` for a slot or range
pub fn format_slot(from: DateTime<Utc>, to: DateTime<Utc>, tz: Tz) -> String {
    format!("{} - {}", time_key(from, tz), time_key(to, tz))
}

/// `HH:MM` start of a slot
pub fn format_slot_short(from: DateTime<Utc>, tz: Tz) -> String {
    time_key(from, tz)
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}
