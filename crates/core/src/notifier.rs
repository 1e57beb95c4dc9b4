//! Outbound alert contract.
//!
//! The notifier is best-effort: a failed send is reported to the caller for
//! logging but never fails the read request that triggered it. Concrete
//! channels live in the `faultwatch-events` crate.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::prediction::{Assessment, PredictionStatus};
use crate::telemetry::MachineEvent;
use crate::types::Timestamp;

/// Payload handed to a [`Notifier`].
#[derive(Debug, Clone, Serialize)]
pub struct AlertMessage {
    pub machine_id: String,
    pub status: PredictionStatus,
    pub confidence: Option<f64>,
    /// Flattened readings of the sample that triggered the alert.
    pub readings: serde_json::Value,
    /// When the triggering sample was recorded.
    pub recorded_at: Timestamp,
    /// When the fault was detected (the read that fired).
    pub detected_at: Timestamp,
    /// `machine_id:status:bucket`, stable within one cooldown window.
    pub idempotency_key: String,
}

impl AlertMessage {
    pub fn new(
        event: &MachineEvent,
        assessment: Assessment,
        detected_at: Timestamp,
        cooldown: Duration,
    ) -> Self {
        let bucket = detected_at.timestamp().max(0) / cooldown.as_secs().max(1) as i64;
        Self {
            machine_id: event.machine_id.clone(),
            status: assessment.status,
            confidence: assessment.confidence,
            readings: event.readings(),
            recorded_at: event.recorded_at,
            detected_at,
            idempotency_key: format!("{}:{}:{bucket}", event.machine_id, assessment.status),
        }
    }

    /// One-line subject for channels that have one (SNS, email).
    pub fn subject(&self) -> String {
        format!("Machine Alert: {} - {}", self.status, self.machine_id)
    }

    /// Human-readable alert body.
    pub fn body(&self) -> String {
        let mut body = format!("Machine ID: {}\n", self.machine_id);
        if let serde_json::Value::Object(readings) = &self.readings {
            for (name, value) in readings {
                body.push_str(&format!("{name}: {value}\n"));
            }
        }
        body.push_str(&format!("\nPrediction: {}\n", self.status));
        if let Some(confidence) = self.confidence {
            body.push_str(&format!("Confidence: {:.0}%\n", confidence * 100.0));
        }
        let action = match self.status {
            PredictionStatus::Fault => "IMMEDIATE ACTION REQUIRED - fault detected.",
            PredictionStatus::FaultSoon => "Fault expected soon - inspection recommended.",
            PredictionStatus::Normal => "Condition back to normal.",
        };
        body.push_str(&format!("\n{action}\n\nRecorded at: {}\n", self.recorded_at.to_rfc3339()));
        body
    }
}

/// Error type for alert delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    /// Transport-level failure (network, DNS, SDK error).
    #[error("notifier request failed: {0}")]
    Request(String),

    /// The remote endpoint answered with a non-success status.
    #[error("notifier rejected alert with HTTP {0}")]
    Rejected(u16),

    /// The send did not complete within its time budget.
    #[error("notifier timed out after {0:?}")]
    Timeout(Duration),

    /// The channel could not be constructed from its configuration.
    #[error("notifier misconfigured: {0}")]
    Misconfigured(String),
}

/// Delivers alert messages to subscribers.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short channel name used in logs (`"sns"`, `"webhook"`, ...).
    fn channel(&self) -> &'static str;

    async fn send(&self, message: &AlertMessage) -> Result<(), NotifierError>;
}

/// Run a notifier send under a hard deadline.
pub async fn send_with_timeout(
    notifier: &dyn Notifier,
    message: &AlertMessage,
    timeout: Duration,
) -> Result<(), NotifierError> {
    match tokio::time::timeout(timeout, notifier.send(message)).await {
        Ok(result) => result,
        Err(_) => Err(NotifierError::Timeout(timeout)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;

    fn event() -> MachineEvent {
        MachineEvent {
            id: 7,
            machine_id: "M-202".into(),
            temperature: 95.0,
            vibration: 4.0,
            extra_readings: BTreeMap::new(),
            recorded_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    fn fault() -> Assessment {
        Assessment {
            status: PredictionStatus::Fault,
            confidence: Some(0.97),
        }
    }

    struct SlowNotifier;

    #[async_trait]
    impl Notifier for SlowNotifier {
        fn channel(&self) -> &'static str {
            "slow"
        }

        async fn send(&self, _message: &AlertMessage) -> Result<(), NotifierError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        }
    }

    #[test]
    fn idempotency_key_is_stable_within_bucket() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 10).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 3, 1, 12, 1, 0).unwrap();
        let a = AlertMessage::new(&event(), fault(), at, Duration::from_secs(300));
        let b = AlertMessage::new(&event(), fault(), later, Duration::from_secs(300));
        assert_eq!(a.idempotency_key, b.idempotency_key);
        assert!(a.idempotency_key.starts_with("M-202:FAULT:"));
    }

    #[test]
    fn body_mentions_readings_and_confidence() {
        let message = AlertMessage::new(&event(), fault(), Utc::now(), Duration::from_secs(300));
        let body = message.body();
        assert!(body.contains("Machine ID: M-202"));
        assert!(body.contains("temperature: 95.0"));
        assert!(body.contains("Confidence: 97%"));
        assert!(body.contains("IMMEDIATE ACTION REQUIRED"));
        assert_eq!(message.subject(), "Machine Alert: FAULT - M-202");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_notifier_times_out() {
        let message = AlertMessage::new(&event(), fault(), Utc::now(), Duration::from_secs(300));
        let result = send_with_timeout(&SlowNotifier, &message, Duration::from_secs(1)).await;
        assert_matches!(result, Err(NotifierError::Timeout(_)));
    }
}
