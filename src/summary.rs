//! Per-day summaries and the textual rate overview

use crate::rates::RateInterval;
use crate::slots::{all_slot_keys, date_key, format_slot, format_slot_short, time_key};
use chrono_tz::Tz;
use std::fmt::Write;

/// Rates whose start falls on the local day `key` (`YYYY/MM/DD`)
pub fn rates_for_day<'a>(rates: &'a [RateInterval], key: &str, tz: Tz) -> Vec<&'a RateInterval> {
    rates
        .iter()
        .filter(|r| date_key(r.valid_from, tz) == key)
        .collect()
}

pub fn has_rates_for_day(rates: &[RateInterval], key: &str, tz: Tz) -> bool {
    rates.iter().any(|r| date_key(r.valid_from, tz) == key)
}

/// Lowest, highest and average price of one day
#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    pub lowest: RateInterval,
    pub highest: RateInterval,

    /// Mean VAT-inclusive price rounded to 2 decimal places
    pub average: f64,

    pub count: usize,
}

impl DaySummary {
    /// Summary of the day `key`; `None` when it has no rates
    ///
    /// On ties the earliest slot wins.
    pub fn for_day(rates: &[RateInterval], key: &str, tz: Tz) -> Option<Self> {
        let day = rates_for_day(rates, key, tz);
        let first = *day.first()?;
        let mut lowest = first;
        let mut highest = first;
        let mut sum = 0.0;
        for &rate in &day {
            if rate.value_inc_vat < lowest.value_inc_vat {
                lowest = rate;
            }
            if rate.value_inc_vat > highest.value_inc_vat {
                highest = rate;
            }
            sum += rate.value_inc_vat;
        }
        let average = (sum / day.len() as f64 * 100.0).round() / 100.0;
        Some(Self {
            lowest: lowest.clone(),
            highest: highest.clone(),
            average,
            count: day.len(),
        })
    }
}

/// The day's rates laid onto the 48 half-hour slot keys
///
/// Slots without a rate are `None`. On a day with a repeated local hour the
/// first occurrence fills the slot.
pub fn day_grid(rates: &[RateInterval], key: &str, tz: Tz) -> Vec<(String, Option<RateInterval>)> {
    let day = rates_for_day(rates, key, tz);
    all_slot_keys()
        .into_iter()
        .map(|slot| {
            let rate = day
                .iter()
                .find(|r| time_key(r.valid_from, tz) == slot)
                .map(|r| (*r).clone());
            (slot, rate)
        })
        .collect()
}

/// Plain-text overview of one day
///
/// A header with the average and the price cap, lowest and highest slots,
/// then one line per rate marking the current slot (`NOW`) and negative
/// slots (`NEG`).
pub fn overview_text(
    rates: &[RateInterval],
    label: &str,
    key: &str,
    current: Option<&RateInterval>,
    cap: f64,
    tz: Tz,
) -> String {
    let mut out = String::new();
    let Some(summary) = DaySummary::for_day(rates, key, tz) else {
        let _ = writeln!(out, "{} ({}): no rates available", label, key);
        return out;
    };

    let _ = writeln!(
        out,
        "{} ({})  avg {:.2} p/kWh  cap {:.2} p/kWh",
        label, key, summary.average, cap
    );
    let _ = writeln!(
        out,
        "Lowest {:.2} p/kWh at {}  Highest {:.2} p/kWh at {}",
        summary.lowest.value_inc_vat,
        format_slot_short(summary.lowest.valid_from, tz),
        summary.highest.value_inc_vat,
        format_slot_short(summary.highest.valid_from, tz)
    );
    for rate in rates_for_day(rates, key, tz) {
        let marker = if current.is_some_and(|c| c.valid_from == rate.valid_from) {
            " NOW"
        } else if rate.is_negative() {
            " NEG"
        } else {
            ""
        };
        let _ = writeln!(
            out,
            "{}  {:>6.2} p/kWh{}",
            format_slot(rate.valid_from, rate.valid_to, tz),
            rate.value_inc_vat,
            marker
        );
    }
    out
}
