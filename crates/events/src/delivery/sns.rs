//! AWS SNS alert channel.
//!
//! Publishes one message per alert to a topic. Credentials and region come
//! from the standard AWS environment chain.

use async_trait::async_trait;
use aws_sdk_sns::error::DisplayErrorContext;
use faultwatch_core::notifier::{AlertMessage, Notifier, NotifierError};

/// SNS rejects subjects longer than this.
const MAX_SUBJECT_CHARS: usize = 100;

/// Publishes alerts to an SNS topic.
#[derive(Debug, Clone)]
pub struct SnsNotifier {
    client: aws_sdk_sns::Client,
    topic_arn: String,
}

impl SnsNotifier {
    pub fn new(client: aws_sdk_sns::Client, topic_arn: impl Into<String>) -> Self {
        Self {
            client,
            topic_arn: topic_arn.into(),
        }
    }

    /// Build a client from the ambient AWS configuration.
    pub async fn from_env(topic_arn: impl Into<String>) -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(aws_sdk_sns::Client::new(&config), topic_arn)
    }
}

fn truncate_subject(subject: String) -> String {
    if subject.chars().count() <= MAX_SUBJECT_CHARS {
        subject
    } else {
        subject.chars().take(MAX_SUBJECT_CHARS).collect()
    }
}

#[async_trait]
impl Notifier for SnsNotifier {
    fn channel(&self) -> &'static str {
        "sns"
    }

    async fn send(&self, message: &AlertMessage) -> Result<(), NotifierError> {
        let output = self
            .client
            .publish()
            .topic_arn(&self.topic_arn)
            .subject(truncate_subject(message.subject()))
            .message(message.body())
            .send()
            .await
            .map_err(|e| NotifierError::Request(DisplayErrorContext(&e).to_string()))?;

        tracing::info!(
            machine_id = %message.machine_id,
            status = %message.status,
            topic_arn = %self.topic_arn,
            message_id = output.message_id().unwrap_or_default(),
            "Alert published to SNS"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
