use crate::error::{PlungeError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One pricing period, half-open `[valid_from, valid_to)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateInterval {
    /// Price per kWh excluding VAT (pence)
    pub value_exc_vat: f64,

    /// Price per kWh including VAT (pence); may be negative
    pub value_inc_vat: f64,

    /// Start of the period (inclusive)
    pub valid_from: DateTime<Utc>,

    /// End of the period (exclusive)
    pub valid_to: DateTime<Utc>,
}

impl RateInterval {
    /// Build an interval, rejecting empty or inverted periods
    pub fn new(
        value_exc_vat: f64,
        value_inc_vat: f64,
        valid_from: DateTime<Utc>,
        valid_to: DateTime<Utc>,
    ) -> Result<Self> {
        if valid_from >= valid_to {
            return Err(PlungeError::validation(
                "valid_to",
                &format!("{} is not after {}", valid_to, valid_from),
            ));
        }
        Ok(Self {
            value_exc_vat,
            value_inc_vat,
            valid_from,
            valid_to,
        })
    }

    /// Whether the VAT-inclusive price is below zero
    pub fn is_negative(&self) -> bool {
        self.value_inc_vat < 0.0
    }

    /// Half-open containment check
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.valid_from <= instant && instant < self.valid_to
    }

    /// Stable key of the slot, as reported by the API (`2024-06-15T10:00:00Z`)
    pub fn slot_key(&self) -> String {
        self.valid_from.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}
