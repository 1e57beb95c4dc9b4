//! HTTP webhook alert channel.
//!
//! [`WebhookNotifier`] POSTs the JSON-encoded [`AlertMessage`] to a fixed
//! URL. Each alert gets exactly one attempt; the `Idempotency-Key` header
//! lets receivers drop duplicates within a cooldown window.

use std::time::Duration;

use async_trait::async_trait;
use faultwatch_core::notifier::{AlertMessage, Notifier, NotifierError};

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Delivers alerts to an external webhook endpoint.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl WebhookNotifier {
    /// Create a notifier whose HTTP client enforces `timeout` per request.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifierError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::Misconfigured(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn channel(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, message: &AlertMessage) -> Result<(), NotifierError> {
        let response = self
            .client
            .post(&self.url)
            .header(IDEMPOTENCY_HEADER, &message.idempotency_key)
            .json(message)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifierError::Timeout(self.timeout)
                } else {
                    NotifierError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                url = %self.url,
                status = status.as_u16(),
                machine_id = %message.machine_id,
                "Webhook rejected alert"
            );
            return Err(NotifierError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
