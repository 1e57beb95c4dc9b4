//! Delivery channels and endpoint-based channel selection.

pub mod log;
pub mod sns;
pub mod webhook;

use std::sync::Arc;
use std::time::Duration;

use faultwatch_core::notifier::{Notifier, NotifierError};

use self::log::LogNotifier;
use self::sns::SnsNotifier;
use self::webhook::WebhookNotifier;

/// Prefix identifying an SNS topic ARN.
const SNS_ARN_PREFIX: &str = "arn:aws:sns:";

/// Channel selected by a `NOTIFIER_ENDPOINT` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierTarget {
    Sns { topic_arn: String },
    Webhook { url: String },
    Log,
}

impl NotifierTarget {
    /// Classify an endpoint string.
    ///
    /// | Value                  | Channel |
    /// |------------------------|---------|
    /// | `arn:aws:sns:...`      | SNS     |
    /// | `http://`, `https://`  | Webhook |
    /// | anything else (`log`)  | Log     |
    pub fn parse(endpoint: &str) -> Self {
        let endpoint = endpoint.trim();
        if endpoint.starts_with(SNS_ARN_PREFIX) {
            Self::Sns {
                topic_arn: endpoint.to_string(),
            }
        } else if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            Self::Webhook {
                url: endpoint.to_string(),
            }
        } else {
            Self::Log
        }
    }
}

/// Build the notifier for `endpoint`.
///
/// `timeout` bounds a single webhook request; the caller still wraps every
/// send in [`faultwatch_core::notifier::send_with_timeout`].
pub async fn build_notifier(
    endpoint: &str,
    timeout: Duration,
) -> Result<Arc<dyn Notifier>, NotifierError> {
    let notifier: Arc<dyn Notifier> = match NotifierTarget::parse(endpoint) {
        NotifierTarget::Sns { topic_arn } => Arc::new(SnsNotifier::from_env(topic_arn).await),
        NotifierTarget::Webhook { url } => Arc::new(WebhookNotifier::new(url, timeout)?),
        NotifierTarget::Log => Arc::new(LogNotifier),
    };
    tracing::info!(channel = notifier.channel(), "Alert notifier configured");
    Ok(notifier)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sns_arn_selects_sns() {
        let arn = "arn:aws:sns:us-east-1:123456789012:machine-alerts";
        assert_eq!(
            NotifierTarget::parse(arn),
            NotifierTarget::Sns {
                topic_arn: arn.to_string()
            }
        );
    }

    #[test]
    fn http_urls_select_webhook() {
        assert_eq!(
            NotifierTarget::parse(" https://hooks.example.com/alerts "),
            NotifierTarget::Webhook {
                url: "https://hooks.example.com/alerts".to_string()
            }
        );
        assert!(matches!(
            NotifierTarget::parse("http://localhost:9000"),
            NotifierTarget::Webhook { .. }
        ));
    }

    #[test]
    fn anything_else_logs() {
        assert_eq!(NotifierTarget::parse("log"), NotifierTarget::Log);
        assert_eq!(NotifierTarget::parse(""), NotifierTarget::Log);
        assert_eq!(NotifierTarget::parse("ftp://nope"), NotifierTarget::Log);
    }

    #[tokio::test]
    async fn builds_webhook_channel() {
        let notifier = build_notifier("http://127.0.0.1:9/alerts", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(notifier.channel(), "webhook");
    }

    #[tokio::test]
    async fn builds_log_channel() {
        let notifier = build_notifier("log", Duration::from_secs(1)).await.unwrap();
        assert_eq!(notifier.channel(), "log");
    }
}
