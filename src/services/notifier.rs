use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webhook returned status {0}")]
    Status(u16),
}

/// Presentation color of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertColor {
    Danger,
    Info,
}

impl AlertColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertColor::Danger => "danger",
            AlertColor::Info => "#439FE0",
        }
    }
}

impl fmt::Display for AlertColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Attachment {
    pub fallback: String,
    pub color: String,
    pub title: String,
    pub text: String,
}

/// Slack-compatible webhook body with a single attachment.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WebhookMessage {
    pub attachments: Vec<Attachment>,
}

impl WebhookMessage {
    pub fn new(title: &str, text: &str, color: AlertColor) -> Self {
        Self {
            attachments: vec![Attachment {
                fallback: format!("**{}**\n{}", title, text),
                color: color.as_str().to_string(),
                title: title.to_string(),
                text: text.to_string(),
            }],
        }
    }
}

/// Outbound alert channel.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        title: &str,
        text: &str,
        color: AlertColor,
    ) -> Result<(), NotificationError>;
}

/// Posts alerts to a Slack-compatible incoming webhook. Inert without a URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: Option<String>, timeout: Duration) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }
}

#[async_trait::async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(
        &self,
        title: &str,
        text: &str,
        color: AlertColor,
    ) -> Result<(), NotificationError> {
        let Some(url) = &self.url else {
            return Ok(());
        };

        let message = WebhookMessage::new(title, text, color);
        let response = self.client.post(url).json(&message).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Status(status.as_u16()));
        }

        tracing::debug!(title = %title, color = %color, "Webhook delivered");
        Ok(())
    }
}
