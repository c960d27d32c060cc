//! Octopus Energy standard-unit-rates client

use crate::config::ApiConfig;
use crate::error::{PlungeError, Result};
use crate::logging::get_logger;
use crate::rates::model::RateInterval;
use crate::settings::Settings;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;

/// Upper bound on followed `next` links per fetch
const MAX_PAGES: usize = 5;

/// Everything needed to address one tariff's unit rates
#[derive(Debug, Clone, PartialEq)]
pub struct TariffQuery {
    /// API key, sent as the basic-auth user name
    pub api_key: String,

    /// Product code, e.g. `AGILE-FLEX-22-11-25`
    pub product_code: String,

    /// Grid supply point region letter, e.g. `H`
    pub region: String,

    /// Inclusive start of the requested period
    pub period_from: DateTime<Utc>,

    /// Exclusive end of the requested period
    pub period_to: DateTime<Utc>,
}

impl TariffQuery {
    /// Build a query from user settings for the given window
    pub fn from_settings(
        settings: &Settings,
        period_from: DateTime<Utc>,
        period_to: DateTime<Utc>,
    ) -> Self {
        Self {
            api_key: settings.api_key.trim().to_string(),
            product_code: settings.agile_plan_version.trim().to_string(),
            region: settings.region.trim().to_uppercase(),
            period_from,
            period_to,
        }
    }

    /// Single-register electricity tariff code for the region
    pub fn tariff_code(&self) -> String {
        format!("E-1R-{}-{}", self.product_code, self.region)
    }

    /// Path of the unit-rates resource relative to the API base URL
    pub fn path(&self) -> String {
        format!(
            "/products/{}/electricity-tariffs/{}/standard-unit-rates/",
            self.product_code,
            self.tariff_code()
        )
    }
}

/// Source of unit rates
#[async_trait]
pub trait RatesApi: Send + Sync {
    /// Fetch the unit rates for a tariff; records come back unsorted
    async fn fetch_unit_rates(&self, query: &TariffQuery) -> Result<Vec<RateInterval>>;
}

#[derive(Debug, Deserialize)]
struct ApiRate {
    value_exc_vat: f64,
    value_inc_vat: f64,
    valid_from: DateTime<Utc>,
    // Open-ended rates carry a null end
    valid_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct UnitRatesPage {
    #[serde(default)]
    next: Option<String>,
    results: Vec<ApiRate>,
}

/// Parse one response page into rate intervals
///
/// Records without an end, or whose end is not after their start, are dropped.
pub fn parse_unit_rates(body: &[u8]) -> Result<Vec<RateInterval>> {
    Ok(parse_page(body)?.1)
}

fn parse_page(body: &[u8]) -> Result<(Option<String>, Vec<RateInterval>)> {
    let page: UnitRatesPage = serde_json::from_slice(body)?;
    let rates = page
        .results
        .into_iter()
        .filter_map(|r| {
            let valid_to = r.valid_to?;
            RateInterval::new(r.value_exc_vat, r.value_inc_vat, r.valid_from, valid_to).ok()
        })
        .collect();
    Ok((page.next, rates))
}

/// HTTP client for the Octopus Energy REST API
pub struct OctopusClient {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
    logger: crate::logging::StructuredLogger,
}

impl OctopusClient {
    /// Create a new client; no request timeout beyond the platform default
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            logger: get_logger("octopus"),
        })
    }

    /// Full URL of the first page for a query
    pub fn url_for(&self, query: &TariffQuery) -> String {
        format!("{}{}", self.base_url, query.path())
    }

    async fn get_page(
        &self,
        url: &str,
        query: &TariffQuery,
        with_period: bool,
    ) -> Result<(Option<String>, Vec<RateInterval>)> {
        let mut request = self
            .http
            .get(url)
            .basic_auth(&query.api_key, Some(""))
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, &self.user_agent);
        // `next` links already carry the period parameters
        if with_period {
            request = request.query(&[
                (
                    "period_from",
                    query
                        .period_from
                        .to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
                (
                    "period_to",
                    query.period_to.to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
            ]);
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = format!(
                "API error: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            );
            self.logger.error(&message);
            return Err(PlungeError::transport(message.trim_end().to_string()));
        }

        let body = resp.bytes().await?;
        parse_page(&body)
    }
}

#[async_trait]
impl RatesApi for OctopusClient {
    async fn fetch_unit_rates(&self, query: &TariffQuery) -> Result<Vec<RateInterval>> {
        let first = self.url_for(query);
        self.logger.debug(&format!("Fetching unit rates from {}", first));

        let (mut next, mut rates) = self.get_page(&first, query, true).await?;
        let mut pages = 1;
        while let Some(url) = next.take() {
            if pages >= MAX_PAGES {
                self.logger
                    .warn(&format!("Stopped after {} pages of unit rates", pages));
                break;
            }
            let (following, more) = self.get_page(&url, query, false).await?;
            rates.extend(more);
            next = following;
            pages += 1;
        }

        self.logger.info(&format!(
            "Fetched {} unit rates for {}",
            rates.len(),
            query.tariff_code()
        ));
        Ok(rates)
    }
}
