use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use plunge::error::{PlungeError, Result};
use plunge::rates::{FetchStatus, RateInterval, RateStore, RatesApi, TariffQuery};
use plunge::settings::Settings;
use std::sync::{Arc, Mutex};

enum Reply {
    Rates(Vec<RateInterval>),
    Fail(String),
}

struct ScriptedApi {
    replies: Mutex<Vec<Reply>>,
    queries: Mutex<Vec<TariffQuery>>,
}

impl ScriptedApi {
    fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies),
            queries: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl RatesApi for ScriptedApi {
    async fn fetch_unit_rates(&self, query: &TariffQuery) -> Result<Vec<RateInterval>> {
        self.queries.lock().unwrap().push(query.clone());
        match self.replies.lock().unwrap().remove(0) {
            Reply::Rates(rates) => Ok(rates),
            Reply::Fail(message) => Err(PlungeError::transport(message)),
        }
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap()
}

fn slot(h: u32, m: u32, price: f64) -> RateInterval {
    let from = Utc.with_ymd_and_hms(2024, 1, 10, h, m, 0).unwrap();
    RateInterval::new(price, price, from, from + TimeDelta::minutes(30)).unwrap()
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
async fn missing_credentials_never_call_the_api() {
    let api = ScriptedApi::new(Vec::new());
    let store = RateStore::new(api.clone(), chrono_tz::Europe::London);
    store.set_rates(vec![slot(10, 0, 1.0), slot(10, 30, 2.0)]);
    let before = store.rates();

    for settings in [
        Settings::default(),
        Settings {
            serial: String::new(),
            ..configured()
        },
        Settings {
            api_key: "   ".to_string(),
            ..configured()
        },
    ] {
        let err = store.fetch(&settings, now()).await.unwrap_err();
        assert!(matches!(err, PlungeError::Config { .. }));
    }
    assert_eq!(api.calls(), 0);
    assert_eq!(*store.rates(), *before);
    assert_eq!(
        store.error().as_deref(),
        Some("Please configure API key, MPAN, and serial in Settings.")
    );
    assert_eq!(store.status(), FetchStatus::Error);
    assert!(!store.is_loading());
}

#[tokio::test]
async fn successful_fetch_stores_sorted_rates_and_builds_query() {
    let api = ScriptedApi::new(vec![Reply::Rates(vec![
        slot(10, 30, 2.0),
        slot(10, 0, 1.0),
    ])]);
    let store = RateStore::new(api.clone(), chrono_tz::Europe::London);

    assert_eq!(store.fetch(&configured(), now()).await.unwrap(), 2);
    let rates = store.rates();
    assert_eq!(rates[0].value_inc_vat, 1.0);
    assert_eq!(rates[1].value_inc_vat, 2.0);
    assert_eq!(store.status(), FetchStatus::Idle);

    let query = api.queries.lock().unwrap()[0].clone();
    assert_eq!(
        query.path(),
        "/products/AGILE-FLEX-22-11-25/electricity-tariffs/E-1R-AGILE-FLEX-22-11-25-H/standard-unit-rates/"
    );
    assert_eq!(query.api_key, "sk_test");
    assert_eq!(query.period_from, Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap());
    assert_eq!(query.period_to, Utc.with_ymd_and_hms(2024, 1, 12, 0, 0, 0).unwrap());
}

#[tokio::test]
async fn failure_keeps_previous_rates() {
    let api = ScriptedApi::new(vec![
        Reply::Rates(vec![slot(10, 0, 1.0)]),
        Reply::Fail("API error: 503 Service Unavailable".to_string()),
        Reply::Rates(vec![slot(11, 0, 4.0)]),
    ]);
    let store = RateStore::new(api.clone(), chrono_tz::Europe::London);

    store.fetch(&configured(), now()).await.unwrap();
    let before = store.rates();

    assert!(store.fetch(&configured(), now()).await.is_err());
    assert_eq!(store.rates(), before);
    assert_eq!(
        store.error().as_deref(),
        Some("API error: 503 Service Unavailable")
    );
    assert!(!store.is_loading());

    // Next fetch clears the error and replaces the sequence
    store.fetch(&configured(), now()).await.unwrap();
    assert!(store.error().is_none());
    assert_eq!(store.rates()[0].value_inc_vat, 4.0);
}

#[tokio::test]
async fn replacement_is_a_single_update() {
    let api = ScriptedApi::new(vec![Reply::Rates(vec![slot(10, 0, 1.0), slot(10, 30, 2.0)])]);
    let store = RateStore::new(api, chrono_tz::Europe::London);
    let mut rx = store.subscribe();
    rx.borrow_and_update();

    store.fetch(&configured(), now()).await.unwrap();
    let state = rx.borrow_and_update().clone();
    assert_eq!(state.rates.len(), 2);
    assert!(!state.loading);
    assert!(state.error.is_none());
}
