//! Half-hourly unit rates: model, pricing API client, and the rate store
//!
//! The store owns the authoritative rate sequence for the "today + tomorrow"
//! window and its fetch lifecycle. The pricing API sits behind [`RatesApi`]
//! so the store can be exercised without network access.

pub mod api;
pub mod model;
pub mod store;

pub use api::{OctopusClient, RatesApi, TariffQuery, parse_unit_rates};
pub use model::RateInterval;
pub use store::{FetchStatus, RateState, RateStore};
