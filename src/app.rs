//! Application shell
//!
//! [`App`] owns every state container (settings, rates, current-slot
//! tracker, notification scheduler) and keeps them reconciled: each
//! successful fetch and each settings change feeds the latest rates and the
//! notification flag to the tracker and the scheduler.

use crate::config::Config;
use crate::current::CurrentSlotTracker;
use crate::error::{PlungeError, Result};
use crate::logging::get_logger;
use crate::negative::banner_lines;
use crate::notify::{Notification, NotificationDispatcher, NotificationScheduler};
use crate::rates::{RateInterval, RateState, RateStore, RatesApi};
use crate::refresh::{RefreshDecision, refresh_decision};
use crate::settings::{Settings, SettingsStore};
use crate::slots::{today_key, tomorrow_key};
use crate::summary::overview_text;
use crate::timer::{Clock, Timers};
use chrono::TimeDelta;
use chrono_tz::Tz;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Day shown by the overview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Day {
    Today,
    Tomorrow,
}

impl Day {
    pub fn label(self) -> &'static str {
        match self {
            Day::Today => "Today",
            Day::Tomorrow => "Tomorrow",
        }
    }
}

/// Collaborators injected into the [`App`]
pub struct AppDeps {
    pub api: Arc<dyn RatesApi>,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub clock: Arc<dyn Clock>,
    pub timers: Arc<dyn Timers>,
}

/// Explicitly constructed application state
pub struct App {
    config: Config,
    tz: Tz,
    clock: Arc<dyn Clock>,
    settings: SettingsStore,
    store: RateStore,
    tracker: CurrentSlotTracker,
    scheduler: NotificationScheduler,
    dispatcher: Arc<NotificationDispatcher>,
    outbox: Option<mpsc::UnboundedReceiver<Notification>>,
    logger: crate::logging::StructuredLogger,
}

impl App {
    /// Build the application; `settings` should already be loaded
    pub fn new(config: Config, settings: SettingsStore, deps: AppDeps) -> Result<Self> {
        let tz = config.tz()?;
        let guard = TimeDelta::milliseconds(
            i64::try_from(config.current_slot.boundary_guard_ms).map_err(|_| {
                PlungeError::validation("current_slot.boundary_guard_ms", "out of range")
            })?,
        );
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();

        Ok(Self {
            tz,
            store: RateStore::new(deps.api, tz),
            tracker: CurrentSlotTracker::new(deps.clock.clone(), deps.timers.clone(), guard),
            scheduler: NotificationScheduler::new(deps.clock.clone(), deps.timers, tz, outbox_tx),
            clock: deps.clock,
            dispatcher: deps.dispatcher,
            outbox: Some(outbox_rx),
            settings,
            config,
            logger: get_logger("app"),
        })
    }

    /// Receiver of fired notifications; hand it to [`NotificationDispatcher::run`]
    pub fn take_outbox(&mut self) -> Option<mpsc::UnboundedReceiver<Notification>> {
        self.outbox.take()
    }

    pub fn dispatcher(&self) -> Arc<NotificationDispatcher> {
        self.dispatcher.clone()
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn settings(&self) -> &Settings {
        self.settings.settings()
    }

    pub fn rate_state(&self) -> RateState {
        self.store.snapshot()
    }

    pub fn current_slot(&self) -> Option<RateInterval> {
        self.tracker.current()
    }

    /// Receive every change of the current slot
    pub fn subscribe_current(&self) -> watch::Receiver<Option<RateInterval>> {
        self.tracker.subscribe()
    }

    /// Number of armed negative-price alerts
    pub fn armed_alerts(&self) -> usize {
        self.scheduler.armed_count()
    }

    /// User-triggered refresh, gated on loading state and publication time
    pub async fn refresh(&self) -> Result<RefreshDecision> {
        let decision = refresh_decision(
            &self.store.rates(),
            self.clock.now(),
            self.tz,
            self.store.is_loading(),
            self.config.refresh.publish_hour,
        );
        if decision == RefreshDecision::Fetch {
            self.fetch().await?;
        } else {
            self.logger.debug(&format!("Refresh skipped: {:?}", decision));
        }
        Ok(decision)
    }

    /// Fetch regardless of publication time; skipped while a fetch is in flight
    ///
    /// Returns the number of stored rates.
    pub async fn refresh_forced(&self) -> Result<usize> {
        if self.store.is_loading() {
            self.logger.debug("Fetch already in flight");
            return Ok(self.store.rates().len());
        }
        self.fetch().await
    }

    async fn fetch(&self) -> Result<usize> {
        let count = self
            .store
            .fetch(self.settings.settings(), self.clock.now())
            .await?;
        self.reconcile();
        Ok(count)
    }

    /// The view became visible again
    pub fn on_visible(&self) {
        self.tracker.on_visible();
        self.reconcile_alerts();
    }

    /// Re-arm alerts against the current rates and local date
    ///
    /// A no-op unless the rates, the notification flag, the permission or
    /// the local date changed since the last call. Call it whenever the
    /// current slot changes so alerts follow the date across midnight.
    pub fn reconcile_alerts(&self) {
        self.scheduler.schedule(
            self.store.rates(),
            self.settings.settings().notifications_enabled,
            self.dispatcher.permission(),
        );
    }

    /// Turn negative-price notifications on or off
    ///
    /// Enabling checks permission first; on refusal the flag stays off and
    /// the permission error is returned for display.
    pub fn set_notifications_enabled(&mut self, enabled: bool) -> Result<()> {
        if enabled {
            self.dispatcher.request_permission()?;
        }
        self.settings.set("notificationsEnabled", enabled)?;
        self.logger.info(&format!(
            "Notifications {}",
            if enabled { "enabled" } else { "disabled" }
        ));
        self.reconcile();
        Ok(())
    }

    /// Update one setting from user input
    ///
    /// `raw` is interpreted according to the setting's type: numbers that
    /// fail to parse become `0`, booleans accept `true/false/on/off/yes/no`.
    pub fn update_setting(&mut self, key: &str, raw: &str) -> Result<()> {
        let current: Value = self
            .settings
            .get(key)
            .ok_or_else(|| PlungeError::validation(key, "unknown setting"))?;
        let value = match current {
            Value::Bool(_) => Value::Bool(parse_flag(key, raw)?),
            Value::Number(_) => {
                let number = raw.trim().parse::<f64>().unwrap_or(0.0);
                serde_json::Number::from_f64(number).map_or(Value::from(0), Value::Number)
            }
            _ => Value::String(raw.trim().to_string()),
        };

        if key == "notificationsEnabled" {
            return self.set_notifications_enabled(value.as_bool().unwrap_or(false));
        }

        let mut partial = Map::new();
        partial.insert(key.to_string(), value);
        self.settings.update(Value::Object(partial))?;
        self.logger.info(&format!("Updated setting {}", key));
        self.reconcile();
        Ok(())
    }

    /// Restore default settings
    pub fn reset_settings(&mut self) -> Result<()> {
        self.settings.reset_to_defaults()?;
        self.reconcile();
        Ok(())
    }

    /// Text overview of one day's rates
    pub fn overview(&self, day: Day) -> String {
        let now = self.clock.now();
        let key = match day {
            Day::Today => today_key(now, self.tz),
            Day::Tomorrow => tomorrow_key(now, self.tz),
        };
        let current = self.tracker.current();
        overview_text(
            &self.store.rates(),
            day.label(),
            &key,
            current.as_ref(),
            self.settings.settings().ofgem_cap_rate,
            self.tz,
        )
    }

    /// Negative-price banner lines for today and tomorrow
    pub fn banner(&self) -> Vec<String> {
        banner_lines(&self.store.rates(), self.clock.now(), self.tz)
    }

    /// Cancel every timer
    pub fn shutdown(&self) {
        self.tracker.shutdown();
        self.scheduler.teardown();
        self.logger.info("Shut down");
    }

    fn reconcile(&self) {
        self.tracker.set_rates(self.store.rates());
        self.reconcile_alerts();
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        other => Err(PlungeError::validation(
            key.to_string(),
            format!("expected on/off, got '{}'", other),
        )),
    }
}
