//! Log-only alert channel for local development.

use async_trait::async_trait;
use faultwatch_core::notifier::{AlertMessage, Notifier, NotifierError};

/// Writes alerts to the tracing log instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn channel(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &AlertMessage) -> Result<(), NotifierError> {
        tracing::warn!(
            machine_id = %message.machine_id,
            status = %message.status,
            confidence = ?message.confidence,
            idempotency_key = %message.idempotency_key,
            subject = %message.subject(),
            "Machine alert"
        );
        Ok(())
    }
}
