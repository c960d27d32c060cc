//! # Plunge - Octopus Agile price watcher
//!
//! Tracks half-hourly electricity unit prices for the Octopus Agile tariff,
//! keeps the current slot live, and raises an alert when a slot with a
//! negative price begins.
//!
//! ## Features
//!
//! - **Rate store**: fetches today's and tomorrow's unit rates from the Octopus Energy API
//! - **Current slot**: re-resolved at each slot boundary and when the view becomes visible, no polling
//! - **Negative prices**: contiguous negative slots merged into ranges for display
//! - **Alerts**: one notification per upcoming negative slot, via webhook or console
//! - **Settings**: local JSON key-value record with update and reset
//! - **Configuration**: YAML-based configuration with validation
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `settings`: Persisted user settings
//! - `slots`: Day and slot keys in the viewer's timezone
//! - `rates`: Rate model, pricing API client, and rate store
//! - `negative`: Negative-price range aggregation
//! - `current`: Current-slot resolution and liveness
//! - `timer`: Clock and one-shot timer seam
//! - `notify`: Notification scheduling, channels, and delivery
//! - `summary`: Day summaries and text overview
//! - `refresh`: Refresh gating
//! - `app`: Application shell
//! - `console`: Console command parsing

pub mod app;
pub mod config;
pub mod console;
pub mod current;
pub mod error;
pub mod logging;
pub mod negative;
pub mod notify;
pub mod rates;
pub mod refresh;
pub mod settings;
pub mod slots;
pub mod summary;
pub mod timer;

// Re-export commonly used types
pub use app::{App, AppDeps, Day};
pub use config::Config;
pub use error::{PlungeError, Result};
pub use rates::RateInterval;
