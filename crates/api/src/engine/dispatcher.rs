//! Write and read paths for machine telemetry.
//!
//! Writes are stored verbatim. Reads pull the latest samples, classify them,
//! let the [`AlertGate`] decide whether this read must alert, and call the
//! notifier under a hard deadline when it must. A notifier failure is logged
//! and reported as `alert_sent: false`; it never fails the read.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use faultwatch_core::alert::{AlertDecision, AlertGate};
use faultwatch_core::error::CoreError;
use faultwatch_core::notifier::{send_with_timeout, AlertMessage, Notifier};
use faultwatch_core::prediction::{Assessment, FaultPredictor, PredictionStatus};
use faultwatch_core::telemetry::{
    clamp_limit, MachineEvent, NewMachineEvent, StoreError, TelemetryStore,
};
use faultwatch_core::types::Timestamp;
use serde::Serialize;

/// Samples handed to the predictor when not configured.
pub const DEFAULT_HISTORY_LIMIT: i64 = 10;

/// Notifier deadline when not configured.
pub const DEFAULT_NOTIFIER_TIMEOUT: Duration = Duration::from_secs(5);

/// Body of a successful status read.
#[derive(Debug, Clone, Serialize)]
pub struct MachineStatusReport {
    pub machine_id: String,
    pub status: PredictionStatus,
    pub confidence: Option<f64>,
    /// All readings of the newest sample.
    pub latest_readings: serde_json::Value,
    /// When the newest sample was recorded.
    pub recorded_at: Timestamp,
    /// True only if this read fired an alert and the notifier accepted it.
    pub alert_sent: bool,
}

/// Coordinates store, predictor, alert gate and notifier.
pub struct FaultDispatcher {
    store: Arc<dyn TelemetryStore>,
    predictor: Arc<dyn FaultPredictor>,
    gate: AlertGate,
    notifier: Arc<dyn Notifier>,
    history_limit: i64,
    notifier_timeout: Duration,
}

impl FaultDispatcher {
    pub fn new(
        store: Arc<dyn TelemetryStore>,
        predictor: Arc<dyn FaultPredictor>,
        gate: AlertGate,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            predictor,
            gate,
            notifier,
            history_limit: DEFAULT_HISTORY_LIMIT,
            notifier_timeout: DEFAULT_NOTIFIER_TIMEOUT,
        }
    }

    pub fn with_history_limit(mut self, limit: i64) -> Self {
        self.history_limit = clamp_limit(limit);
        self
    }

    pub fn with_notifier_timeout(mut self, timeout: Duration) -> Self {
        self.notifier_timeout = timeout;
        self
    }

    /// Store one sample. No prediction or alerting happens on write.
    pub async fn record(&self, event: NewMachineEvent) -> Result<MachineEvent, StoreError> {
        let stored = self.store.append(event).await?;
        tracing::debug!(
            machine_id = %stored.machine_id,
            event_id = stored.id,
            temperature = stored.temperature,
            vibration = stored.vibration,
            "Telemetry recorded"
        );
        Ok(stored)
    }

    /// Classify a machine's current condition and alert if the gate fires.
    ///
    /// Fails with [`CoreError::NotFound`] when the machine has no samples,
    /// before the predictor or notifier is involved.
    pub async fn inspect(&self, machine_id: &str) -> Result<MachineStatusReport, CoreError> {
        let history = self
            .store
            .query_latest(machine_id, self.history_limit)
            .await?;
        let Some(latest) = history.first() else {
            return Err(CoreError::NotFound {
                entity: "telemetry",
                id: machine_id.to_string(),
            });
        };

        let assessment = self.predictor.assess(&history);
        let now = Utc::now();
        let decision = self.gate.decide(machine_id, assessment.status, now).await?;

        let alert_sent = match decision {
            AlertDecision::Fire => self.notify(latest, assessment, now).await,
            AlertDecision::Suppress => false,
        };

        tracing::info!(
            machine_id,
            status = %assessment.status,
            confidence = ?assessment.confidence,
            decision = ?decision,
            alert_sent,
            "Machine inspected"
        );

        Ok(MachineStatusReport {
            machine_id: machine_id.to_string(),
            status: assessment.status,
            confidence: assessment.confidence,
            latest_readings: latest.readings(),
            recorded_at: latest.recorded_at,
            alert_sent,
        })
    }

    /// Latest samples for a machine, newest first, without prediction.
    pub async fn history(
        &self,
        machine_id: &str,
        limit: i64,
    ) -> Result<Vec<MachineEvent>, StoreError> {
        self.store.query_latest(machine_id, limit).await
    }

    /// Whether the telemetry store answers its liveness probe.
    pub async fn store_healthy(&self) -> bool {
        match self.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Store health check failed");
                false
            }
        }
    }

    async fn notify(&self, latest: &MachineEvent, assessment: Assessment, now: Timestamp) -> bool {
        let cooldown = self.gate.policy().cooldown().to_std().unwrap_or_default();
        let message = AlertMessage::new(latest, assessment, now, cooldown);

        match send_with_timeout(self.notifier.as_ref(), &message, self.notifier_timeout).await {
            Ok(()) => {
                tracing::info!(
                    machine_id = %message.machine_id,
                    status = %message.status,
                    channel = self.notifier.channel(),
                    idempotency_key = %message.idempotency_key,
                    "Alert sent"
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    machine_id = %message.machine_id,
                    status = %message.status,
                    channel = self.notifier.channel(),
                    error = %e,
                    "Alert delivery failed"
                );
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use faultwatch_core::alert::AlertPolicy;
    use faultwatch_core::memory::{InMemoryAlertStateStore, InMemoryTelemetryStore};
    use faultwatch_core::notifier::NotifierError;
    use faultwatch_core::prediction::ThresholdPredictor;

    use super::*;

    #[derive(Default)]
    struct CountingNotifier {
        sent: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for CountingNotifier {
        fn channel(&self) -> &'static str {
            "counting"
        }

        async fn send(&self, _message: &AlertMessage) -> Result<(), NotifierError> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(NotifierError::Rejected(500))
            } else {
                Ok(())
            }
        }
    }

    fn dispatcher(notifier: Arc<CountingNotifier>) -> FaultDispatcher {
        let gate = AlertGate::new(
            Arc::new(InMemoryAlertStateStore::new()),
            AlertPolicy::new(Duration::from_secs(300)),
        );
        FaultDispatcher::new(
            Arc::new(InMemoryTelemetryStore::new()),
            Arc::new(ThresholdPredictor::default()),
            gate,
            notifier,
        )
    }

    #[tokio::test]
    async fn unknown_machine_is_not_found_and_silent() {
        let notifier = Arc::new(CountingNotifier::default());
        let dispatcher = dispatcher(Arc::clone(&notifier));

        let result = dispatcher.inspect("ghost").await;
        assert_matches!(result, Err(CoreError::NotFound { .. }));
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fault_alerts_once_within_cooldown() {
        let notifier = Arc::new(CountingNotifier::default());
        let dispatcher = dispatcher(Arc::clone(&notifier));
        dispatcher
            .record(NewMachineEvent::new("M-202", 95.0, 4.0))
            .await
            .unwrap();

        let first = dispatcher.inspect("M-202").await.unwrap();
        assert_eq!(first.status, PredictionStatus::Fault);
        assert!(first.alert_sent);

        let second = dispatcher.inspect("M-202").await.unwrap();
        assert_eq!(second.status, PredictionStatus::Fault);
        assert!(!second.alert_sent);
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_delivery_reports_not_sent_and_keeps_state() {
        let notifier = Arc::new(CountingNotifier {
            fail: true,
            ..Default::default()
        });
        let dispatcher = dispatcher(Arc::clone(&notifier));
        dispatcher
            .record(NewMachineEvent::new("M-7", 90.0, 1.0))
            .await
            .unwrap();

        assert!(!dispatcher.inspect("M-7").await.unwrap().alert_sent);
        // The fire was committed, so the next read is inside the cooldown.
        assert!(!dispatcher.inspect("M-7").await.unwrap().alert_sent);
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_reads_alert_once() {
        let notifier = Arc::new(CountingNotifier::default());
        let dispatcher = Arc::new(dispatcher(Arc::clone(&notifier)));
        dispatcher
            .record(NewMachineEvent::new("M-1", 99.0, 5.0))
            .await
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move { dispatcher.inspect("M-1").await.unwrap().alert_sent })
            })
            .collect();

        let mut sent = 0;
        for handle in handles {
            if handle.await.unwrap() {
                sent += 1;
            }
        }
        assert_eq!(sent, 1);
        assert_eq!(notifier.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn history_limit_is_clamped() {
        let dispatcher =
            dispatcher(Arc::new(CountingNotifier::default())).with_history_limit(10_000);
        assert_eq!(dispatcher.history_limit, 500);
    }
}
