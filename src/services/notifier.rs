//! Push notification of pipeline summaries

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

pub type NotifyError = Box<dyn std::error::Error + Send + Sync>;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<(), NotifyError>;
}

/// Posts `{"content": message}` to a chat webhook
pub struct WebhookNotifier {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(&self.url)
            .json(&json!({ "content": message }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Webhook rejected notification");
            return Err(format!("webhook returned {}", status).into());
        }

        info!("Notification delivered");
        Ok(())
    }
}

/// Logs instead of sending; used when no webhook is configured
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifyError> {
        info!(message = %message, "Notification (no webhook configured)");
        Ok(())
    }
}
