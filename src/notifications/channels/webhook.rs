//! Webhook notification channel
//!
//! Delivers lifecycle events as JSON payloads via HTTP POST.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Channel, ChannelError, ChannelResult, DeliveryStatus};
use crate::notifications::Notification;
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Webhook channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Webhook URL endpoint
    pub url: String,
    /// Optional authentication token (sent as Bearer token)
    pub auth_token: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Maximum retry attempts on failure
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

fn default_timeout() -> u64 {
    10
}

fn default_retries() -> u32 {
    3
}

impl WebhookConfig {
    /// Create a new webhook configuration
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
        }
    }

    /// Set authentication token
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set max retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() {
            return Err("Webhook URL cannot be empty".to_string());
        }

        let parsed = url::Url::parse(&self.url).map_err(|e| format!("Invalid webhook URL: {e}"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err("Webhook URL must use http or https".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("Timeout must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Webhook notification channel
///
/// The payload is the serialized [`Notification`] (tagged with an `event`
/// field) plus a `message` string and `sent_at` timestamp.
pub struct WebhookChannel {
    config: WebhookConfig,
    client: Client,
    retry: RetryConfig,
}

impl WebhookChannel {
    /// Create a new webhook channel
    pub fn new(config: WebhookConfig) -> ChannelResult<Self> {
        config.validate().map_err(ChannelError::InvalidConfig)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let retry = RetryConfig::new(config.max_retries);

        Ok(Self { config, client, retry })
    }

    /// Create a simple webhook channel with just a URL
    pub fn from_url(url: impl Into<String>) -> ChannelResult<Self> {
        Self::new(WebhookConfig::new(url))
    }

    /// Get the webhook URL
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Build the webhook payload from a notification
    fn build_payload(&self, notification: &Notification) -> ChannelResult<serde_json::Value> {
        let mut payload = serde_json::to_value(notification)?;
        if let Some(object) = payload.as_object_mut() {
            object.insert("message".to_string(), notification.message().into());
            object.insert(
                "sent_at".to_string(),
                chrono::Utc::now().to_rfc3339().into(),
            );
        }
        Ok(payload)
    }

    async fn post_once(&self, payload: &serde_json::Value) -> ChannelResult<()> {
        let mut request = self.client.post(&self.config.url);
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.json(payload).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unreadable response body".to_string());
        Err(ChannelError::Other(format!("HTTP {status}: {body}")))
    }

    /// Retry server-side failures; client errors (4xx) fail immediately
    fn retryable(error: &ChannelError) -> bool {
        match error {
            ChannelError::Http(e) => e.is_timeout() || e.is_connect(),
            ChannelError::Other(msg) => !msg.starts_with("HTTP 4"),
            _ => false,
        }
    }
}

#[async_trait]
impl Channel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, notification: &Notification) -> ChannelResult<DeliveryStatus> {
        let payload = self.build_payload(notification)?;

        match with_retry_if(&self.retry, || self.post_once(&payload), Self::retryable).await {
            Ok(()) => {
                tracing::debug!(url = %self.config.url, event = notification.kind(), "Webhook delivered");
                Ok(DeliveryStatus::success("webhook"))
            }
            Err(e) => {
                tracing::error!(url = %self.config.url, error = %e, "Webhook delivery failed");
                Ok(DeliveryStatus::failure("webhook", e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::FlightSummary;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_notification() -> Notification {
        Notification::CheckinSuccess {
            flight: FlightSummary {
                confirmation_number: "TEST".to_string(),
                traveler: "Berkant Marika".to_string(),
                departure_airport: "LAX".to_string(),
                destination: "test_inbound".to_string(),
                departs_at: chrono::Utc::now(),
            },
        }
    }

    #[test]
    fn test_webhook_config_validation() {
        assert!(WebhookConfig::new("https://example.com/hook").validate().is_ok());
        assert!(WebhookConfig::new("").validate().is_err());
        assert!(WebhookConfig::new("example.com/hook").validate().is_err());
        assert!(WebhookConfig::new("https://example.com")
            .with_timeout(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_webhook_from_url() {
        assert!(WebhookChannel::from_url("https://example.com/hook").is_ok());
        assert!(WebhookChannel::from_url("not-a-url").is_err());
    }

    #[test]
    fn test_payload_shape() {
        let channel = WebhookChannel::from_url("https://example.com/hook").unwrap();
        let payload = channel.build_payload(&sample_notification()).unwrap();

        assert_eq!(payload["event"], "checkin_success");
        assert_eq!(payload["flight"]["confirmation_number"], "TEST");
        assert!(payload["message"].as_str().unwrap().contains("LAX"));
        assert!(payload["sent_at"].is_string());
    }

    #[tokio::test]
    async fn test_send_posts_json() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel = WebhookChannel::from_url(format!("{}/hook", server.uri())).unwrap();
        let status = channel.send(&sample_notification()).await.unwrap();
        assert!(status.success);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400))
            .expect(1)
            .mount(&server)
            .await;

        let config = WebhookConfig::new(format!("{}/hook", server.uri())).with_max_retries(3);
        let channel = WebhookChannel::new(config).unwrap();

        let status = channel.send(&sample_notification()).await.unwrap();
        assert!(!status.success);
    }
}
