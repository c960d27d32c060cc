//! Authoritative rate sequence and its fetch lifecycle

use crate::error::{PlungeError, Result};
use crate::logging::get_logger;
use crate::rates::api::{RatesApi, TariffQuery};
use crate::rates::model::RateInterval;
use crate::settings::Settings;
use crate::slots::fetch_window;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;
use tokio::sync::watch;

/// Stored when credential, MPAN or serial is missing
pub const MISSING_CREDENTIALS_MESSAGE: &str =
    "Please configure API key, MPAN, and serial in Settings.";

/// Snapshot of the store
#[derive(Debug, Clone, PartialEq)]
pub struct RateState {
    /// Rates for today and tomorrow, ascending by `valid_from`
    pub rates: Arc<[RateInterval]>,

    /// A fetch is in flight
    pub loading: bool,

    /// Message of the last failed fetch, cleared when a fetch starts
    pub error: Option<String>,
}

impl Default for RateState {
    fn default() -> Self {
        Self {
            rates: Arc::from(Vec::new()),
            loading: false,
            error: None,
        }
    }
}

impl RateState {
    pub fn status(&self) -> FetchStatus {
        if self.loading {
            FetchStatus::Loading
        } else if self.error.is_some() {
            FetchStatus::Error
        } else {
            FetchStatus::Idle
        }
    }
}

/// Coarse fetch status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Loading,
    Error,
}

/// Owns the rate sequence; replaced wholesale on every successful fetch
pub struct RateStore {
    api: Arc<dyn RatesApi>,
    tz: Tz,
    state: watch::Sender<RateState>,
    logger: crate::logging::StructuredLogger,
}

impl RateStore {
    pub fn new(api: Arc<dyn RatesApi>, tz: Tz) -> Self {
        let (state, _rx) = watch::channel(RateState::default());
        Self {
            api,
            tz,
            state,
            logger: get_logger("rates"),
        }
    }

    pub fn snapshot(&self) -> RateState {
        self.state.borrow().clone()
    }

    /// Current rate sequence
    pub fn rates(&self) -> Arc<[RateInterval]> {
        self.state.borrow().rates.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn status(&self) -> FetchStatus {
        self.state.borrow().status()
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<RateState> {
        self.state.subscribe()
    }

    /// Replace the sequence directly; sorted here so the ordering invariant holds
    pub fn set_rates(&self, mut rates: Vec<RateInterval>) {
        rates.sort_by_key(|r| r.valid_from);
        self.state.send_modify(|state| state.rates = Arc::from(rates));
    }

    /// Fetch today's and tomorrow's rates
    ///
    /// Returns the number of stored rates. On any failure the previous rates
    /// are kept and the failure's message is stored as the error.
    /// Concurrent calls are not coalesced; callers gate on [`Self::is_loading`].
    pub async fn fetch(&self, settings: &Settings, now: DateTime<Utc>) -> Result<usize> {
        let missing = settings.missing_credentials();
        if !missing.is_empty() {
            self.logger.warn(&format!(
                "Not fetching rates, missing settings: {}",
                missing.join(", ")
            ));
            self.state.send_modify(|state| {
                state.error = Some(MISSING_CREDENTIALS_MESSAGE.to_string());
            });
            return Err(PlungeError::config(MISSING_CREDENTIALS_MESSAGE));
        }

        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let (window_start, window_end) = fetch_window(now, self.tz);
        let query = TariffQuery::from_settings(settings, window_start, window_end);
        match self.api.fetch_unit_rates(&query).await {
            Ok(fetched) => {
                let mut rates: Vec<RateInterval> = fetched
                    .into_iter()
                    .filter(|r| r.valid_from >= window_start && r.valid_from < window_end)
                    .collect();
                rates.sort_by_key(|r| r.valid_from);
                let count = rates.len();
                self.state.send_modify(|state| {
                    state.rates = Arc::from(rates);
                    state.loading = false;
                });
                self.logger.info(&format!("Stored {} rates", count));
                Ok(count)
            }
            Err(err) => {
                let message = err.user_message();
                self.logger.error(&format!("Failed to fetch rates: {}", message));
                self.state.send_modify(|state| {
                    state.error = Some(message);
                    state.loading = false;
                });
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeDelta, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedApi {
        rates: Vec<RateInterval>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RatesApi for FixedApi {
        async fn fetch_unit_rates(&self, _query: &TariffQuery) -> Result<Vec<RateInterval>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rates.clone())
        }
    }

    fn rate(from: DateTime<Utc>) -> RateInterval {
        RateInterval::new(1.0, 1.05, from, from + TimeDelta::minutes(30)).unwrap()
    }

    fn configured() -> Settings {
        Settings {
            api_key: "sk_test".to_string(),
            mpan: "1200000000000".to_string(),
            serial: "21L000000".to_string(),
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn fetch_filters_to_window_and_sorts() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        let today = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let api = Arc::new(FixedApi {
            rates: vec![
                rate(today + TimeDelta::hours(30)),
                rate(today - TimeDelta::minutes(30)),
                rate(today),
                rate(today + TimeDelta::hours(48)),
            ],
            calls: AtomicUsize::new(0),
        });
        let store = RateStore::new(api.clone(), chrono_tz::Europe::London);

        let count = store.fetch(&configured(), now).await.unwrap();
        assert_eq!(count, 2);
        let rates = store.rates();
        assert_eq!(rates[0].valid_from, today);
        assert_eq!(rates[1].valid_from, today + TimeDelta::hours(30));
        assert_eq!(store.status(), FetchStatus::Idle);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_state_is_idle_and_empty() {
        let api = Arc::new(FixedApi {
            rates: Vec::new(),
            calls: AtomicUsize::new(0),
        });
        let store = RateStore::new(api, chrono_tz::Europe::London);
        assert!(store.rates().is_empty());
        assert_eq!(store.status(), FetchStatus::Idle);
    }
}
