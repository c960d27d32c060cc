//! Negative-price range aggregation
//!
//! Adjacent negative intervals are merged into one range when the end of one
//! equals the start of the next exactly. Contiguity is strict: any gap, even
//! one caused by a missing record, starts a new range.

use crate::rates::RateInterval;
use crate::slots::{date_key, format_slot, today_key, tomorrow_key};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Contiguous stretch of negative prices, half-open `[from, to)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NegativeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl NegativeRange {
    /// Whether a rate lies entirely within this range
    pub fn covers(&self, rate: &RateInterval) -> bool {
        self.from <= rate.valid_from && rate.valid_to <= self.to
    }
}

/// Group negative-valued intervals into contiguous ranges, ascending by `from`
pub fn negative_ranges(rates: &[RateInterval]) -> Vec<NegativeRange> {
    let mut negative: Vec<&RateInterval> = rates.iter().filter(|r| r.is_negative()).collect();
    negative.sort_by_key(|r| r.valid_from);

    let mut ranges = Vec::new();
    let mut iter = negative.into_iter();
    let Some(first) = iter.next() else {
        return ranges;
    };

    let mut open = NegativeRange {
        from: first.valid_from,
        to: first.valid_to,
    };
    for rate in iter {
        if rate.valid_from == open.to {
            open.to = rate.valid_to;
        } else {
            ranges.push(open);
            open = NegativeRange {
                from: rate.valid_from,
                to: rate.valid_to,
            };
        }
    }
    ranges.push(open);
    ranges
}

/// Banner lines for today's and tomorrow's negative ranges
///
/// Days are aggregated separately, so a range running across midnight is
/// reported once per day: `Today 23:00 - 00:00`, `Tomorrow 00:00 - 01:00`.
pub fn banner_lines(rates: &[RateInterval], now: DateTime<Utc>, tz: Tz) -> Vec<String> {
    let mut lines = Vec::new();
    for (label, key) in [("Today", today_key(now, tz)), ("Tomorrow", tomorrow_key(now, tz))] {
        let day: Vec<RateInterval> = rates
            .iter()
            .filter(|r| date_key(r.valid_from, tz) == key)
            .cloned()
            .collect();
        for range in negative_ranges(&day) {
            lines.push(format!("{} {}", label, format_slot(range.from, range.to, tz)));
        }
    }
    lines
}
