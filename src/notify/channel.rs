//! Notification channels

use super::{Notification, Permission};
use crate::error::Result;
use async_trait::async_trait;
use std::io::Write;

/// Something that can show a notification to the user
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn permission(&self) -> Permission;

    /// Show a notification; errors are delivery failures
    async fn show(&self, notification: &Notification) -> Result<()>;
}

/// In-session channel: prints to the terminal the application runs in
#[derive(Debug, Clone)]
pub struct ConsoleChannel {
    enabled: bool,
}

impl ConsoleChannel {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl NotificationChannel for ConsoleChannel {
    fn name(&self) -> &'static str {
        "console"
    }

    fn permission(&self) -> Permission {
        if self.enabled {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    async fn show(&self, notification: &Notification) -> Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "[{}] {}", notification.title, notification.body)?;
        out.flush()?;
        Ok(())
    }
}

/// Persistent channel: POSTs the notification as JSON to a webhook
///
/// An empty URL makes the channel unsupported.
pub struct WebhookChannel {
    http: reqwest::Client,
    url: String,
}

impl WebhookChannel {
    pub fn new(url: &str) -> Result<Self> {
        Ok(Self {
            http: reqwest::Client::builder().build()?,
            url: url.trim().to_string(),
        })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &'static str {
        "webhook"
    }

    fn permission(&self) -> Permission {
        if self.url.is_empty() {
            Permission::Unsupported
        } else {
            Permission::Granted
        }
    }

    async fn show(&self, notification: &Notification) -> Result<()> {
        let resp = self
            .http
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| crate::error::PlungeError::delivery(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(crate::error::PlungeError::delivery(format!(
                "webhook returned {}",
                status.as_u16()
            )));
        }
        Ok(())
    }
}
