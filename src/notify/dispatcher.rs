//! Best-effort notification delivery with fallback

use super::channel::{ConsoleChannel, NotificationChannel, WebhookChannel};
use super::{DENIED_MESSAGE, Notification, Permission, UNSUPPORTED_MESSAGE};
use crate::config::NotificationsConfig;
use crate::error::{PlungeError, Result};
use crate::logging::get_logger;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Where a notification ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Persistent,
    InSession,
    Dropped,
}

/// Delivers notifications through a persistent channel, falling back to an
/// in-session channel
pub struct NotificationDispatcher {
    persistent: Option<Arc<dyn NotificationChannel>>,
    in_session: Arc<dyn NotificationChannel>,
    logger: crate::logging::StructuredLogger,
}

impl NotificationDispatcher {
    pub fn new(
        persistent: Option<Arc<dyn NotificationChannel>>,
        in_session: Arc<dyn NotificationChannel>,
    ) -> Self {
        Self {
            persistent,
            in_session,
            logger: get_logger("notify"),
        }
    }

    /// Build the channels described by the configuration
    pub fn from_config(config: &NotificationsConfig) -> Result<Self> {
        let persistent: Option<Arc<dyn NotificationChannel>> =
            if config.webhook_url.trim().is_empty() {
                None
            } else {
                Some(Arc::new(WebhookChannel::new(&config.webhook_url)?))
            };

        Ok(Self::new(persistent, Arc::new(ConsoleChannel::new(config.console))))
    }

    /// Combined permission: granted if any channel may show notifications
    pub fn permission(&self) -> Permission {
        let all: Vec<Permission> = self
            .persistent
            .iter()
            .map(|c| c.permission())
            .chain(std::iter::once(self.in_session.permission()))
            .collect();
        if all.contains(&Permission::Granted) {
            Permission::Granted
        } else if all.contains(&Permission::Denied) {
            Permission::Denied
        } else {
            Permission::Unsupported
        }
    }

    /// Check that notifications can be shown before the user enables them
    pub fn request_permission(&self) -> Result<()> {
        match self.permission() {
            Permission::Granted => Ok(()),
            Permission::Denied => Err(PlungeError::permission(DENIED_MESSAGE)),
            Permission::Unsupported => Err(PlungeError::permission(UNSUPPORTED_MESSAGE)),
        }
    }

    /// Show a notification; failures are logged, never returned
    pub async fn deliver(&self, notification: &Notification) -> DeliveryOutcome {
        if let Some(channel) = &self.persistent
            && channel.permission() == Permission::Granted
        {
            match channel.show(notification).await {
                Ok(()) => {
                    self.logger
                        .debug(&format!("Delivered {} via {}", notification.tag, channel.name()));
                    return DeliveryOutcome::Persistent;
                }
                Err(e) => self.logger.warn(&format!(
                    "{} delivery failed, falling back to {}: {}",
                    channel.name(),
                    self.in_session.name(),
                    e
                )),
            }
        }

        if self.in_session.permission() != Permission::Granted {
            self.logger
                .warn(&format!("Dropped notification {}", notification.tag));
            return DeliveryOutcome::Dropped;
        }
        match self.in_session.show(notification).await {
            Ok(()) => DeliveryOutcome::InSession,
            Err(e) => {
                self.logger.error(&format!(
                    "{} delivery failed: {}",
                    self.in_session.name(),
                    e
                ));
                DeliveryOutcome::Dropped
            }
        }
    }

    /// Deliver everything sent to the outbox until all senders are gone
    pub async fn run(self: Arc<Self>, mut outbox: mpsc::UnboundedReceiver<Notification>) {
        while let Some(notification) = outbox.recv().await {
            self.deliver(&notification).await;
        }
        self.logger.debug("Notification outbox closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeChannel {
        permission: Permission,
        fail: bool,
        shown: Mutex<Vec<String>>,
    }

    impl FakeChannel {
        fn new(permission: Permission, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                permission,
                fail,
                shown: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl NotificationChannel for FakeChannel {
        fn name(&self) -> &'static str {
            "fake"
        }

        fn permission(&self) -> Permission {
            self.permission
        }

        async fn show(&self, notification: &Notification) -> Result<()> {
            if self.fail {
                return Err(PlungeError::delivery("boom"));
            }
            self.shown.lock().unwrap().push(notification.tag.clone());
            Ok(())
        }
    }

    fn note() -> Notification {
        Notification {
            title: "t".to_string(),
            body: "b".to_string(),
            tag: "negative-x".to_string(),
        }
    }

    #[tokio::test]
    async fn falls_back_when_persistent_fails() {
        let persistent = FakeChannel::new(Permission::Granted, true);
        let session = FakeChannel::new(Permission::Granted, false);
        let dispatcher = NotificationDispatcher::new(
            Some(persistent.clone() as Arc<dyn NotificationChannel>),
            session.clone(),
        );

        assert_eq!(dispatcher.deliver(&note()).await, DeliveryOutcome::InSession);
        assert_eq!(*session.shown.lock().unwrap(), vec!["negative-x".to_string()]);
    }

    #[tokio::test]
    async fn prefers_persistent_channel() {
        let persistent = FakeChannel::new(Permission::Granted, false);
        let session = FakeChannel::new(Permission::Granted, false);
        let dispatcher = NotificationDispatcher::new(
            Some(persistent.clone() as Arc<dyn NotificationChannel>),
            session.clone(),
        );

        assert_eq!(dispatcher.deliver(&note()).await, DeliveryOutcome::Persistent);
        assert!(session.shown.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failures_are_swallowed() {
        let session = FakeChannel::new(Permission::Granted, true);
        let dispatcher = NotificationDispatcher::new(None, session);
        assert_eq!(dispatcher.deliver(&note()).await, DeliveryOutcome::Dropped);
    }

    #[test]
    fn configured_webhook_grants_without_console() {
        let with_webhook = NotificationDispatcher::from_config(&NotificationsConfig {
            webhook_url: " https://hooks.example.test/plunge ".to_string(),
            console: false,
        })
        .unwrap();
        assert_eq!(with_webhook.permission(), Permission::Granted);

        let console_only = NotificationDispatcher::from_config(&NotificationsConfig {
            webhook_url: "  ".to_string(),
            console: false,
        })
        .unwrap();
        assert_eq!(console_only.permission(), Permission::Denied);
    }

    #[test]
    fn permission_messages() {
        let denied = NotificationDispatcher::new(None, FakeChannel::new(Permission::Denied, false));
        let err = denied.request_permission().unwrap_err();
        assert!(matches!(err, PlungeError::Permission { .. }));
        assert_eq!(err.user_message(), DENIED_MESSAGE);

        let unsupported = NotificationDispatcher::new(
            Some(FakeChannel::new(Permission::Unsupported, false) as Arc<dyn NotificationChannel>),
            FakeChannel::new(Permission::Unsupported, false),
        );
        assert_eq!(
            unsupported.request_permission().unwrap_err().user_message(),
            UNSUPPORTED_MESSAGE
        );
    }
}
