//! Alert gate: decides whether a freshly computed status must notify.
//!
//! The decision rule lives in [`AlertPolicy`] and is pure. [`AlertGate`]
//! wraps it with a read / evaluate / compare-and-swap loop against an
//! [`AlertStateStore`], so two readers racing on the same machine cannot
//! both fire for the same transition.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::TimeDelta;
use serde::Serialize;

use crate::prediction::PredictionStatus;
use crate::telemetry::StoreError;
use crate::types::Timestamp;

/// Default minimum interval between repeated alerts for an unchanged fault.
pub const DEFAULT_ALERT_COOLDOWN: Duration = Duration::from_secs(300);

/// Default number of read / CAS rounds before giving up and suppressing.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Persisted per-machine alert bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertState {
    pub machine_id: String,
    pub last_status: PredictionStatus,
    /// When the last fire decision was committed, if any.
    pub last_alert_at: Option<Timestamp>,
    /// Bumped on every write; the compare-and-swap token.
    pub version: i64,
    pub updated_at: Timestamp,
}

/// The values an evaluation wants written back.
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate {
    pub last_status: PredictionStatus,
    pub last_alert_at: Option<Timestamp>,
}

/// Outcome of the alert gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertDecision {
    Suppress,
    Fire,
}

/// Persistent home of [`AlertState`] rows.
#[async_trait]
pub trait AlertStateStore: Send + Sync {
    async fn get(&self, machine_id: &str) -> Result<Option<AlertState>, StoreError>;

    /// Write `update` only if the stored row still has `expected_version`
    /// (`None` means the row must not exist yet).
    ///
    /// Returns the new state, or `None` when another writer got there first.
    async fn compare_and_swap(
        &self,
        machine_id: &str,
        expected_version: Option<i64>,
        update: &StateUpdate,
    ) -> Result<Option<AlertState>, StoreError>;
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Result of evaluating the policy against a prior state.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub decision: AlertDecision,
    /// `None` when the stored state is already correct.
    pub update: Option<StateUpdate>,
}

/// Transition-or-cooldown alert rule.
#[derive(Debug, Clone, Copy)]
pub struct AlertPolicy {
    cooldown: TimeDelta,
}

impl AlertPolicy {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown: TimeDelta::from_std(cooldown).unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn cooldown(&self) -> TimeDelta {
        self.cooldown
    }

    /// Decide for `new_status` given the machine's prior state.
    ///
    /// - `NORMAL` never fires and resets `last_alert_at`.
    /// - A fault fires when there is no prior state, the status changed, no
    ///   alert was recorded, or the cooldown has elapsed.
    pub fn evaluate(
        &self,
        prior: Option<&AlertState>,
        new_status: PredictionStatus,
        now: Timestamp,
    ) -> Evaluation {
        if !new_status.is_fault() {
            let cleared = StateUpdate {
                last_status: PredictionStatus::Normal,
                last_alert_at: None,
            };
            let update = match prior {
                Some(p) if p.last_status == cleared.last_status && p.last_alert_at.is_none() => {
                    None
                }
                _ => Some(cleared),
            };
            return Evaluation {
                decision: AlertDecision::Suppress,
                update,
            };
        }

        let fire = match prior {
            None => true,
            Some(p) if p.last_status != new_status => true,
            Some(p) => match p.last_alert_at {
                None => true,
                Some(last) => now.signed_duration_since(last) >= self.cooldown,
            },
        };

        if fire {
            Evaluation {
                decision: AlertDecision::Fire,
                update: Some(StateUpdate {
                    last_status: new_status,
                    last_alert_at: Some(now),
                }),
            }
        } else {
            Evaluation {
                decision: AlertDecision::Suppress,
                update: None,
            }
        }
    }
}


// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

/// Applies [`AlertPolicy`] against persisted state with optimistic
/// concurrency.
///
/// A `Fire` is committed to the store before it is returned, so the caller
/// notifies only after the state already reflects the alert. A failed
/// notification is never rolled back here.
pub struct AlertGate {
    store: Arc<dyn AlertStateStore>,
    policy: AlertPolicy,
    max_attempts: u32,
}

impl AlertGate {
    pub fn new(store: Arc<dyn AlertStateStore>, policy: AlertPolicy) -> Self {
        Self {
            store,
            policy,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override the number of CAS rounds (minimum 1).
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn policy(&self) -> &AlertPolicy {
        &self.policy
    }

    /// Decide whether `new_status` must notify now, committing the state
    /// change atomically.
    pub async fn decide(
        &self,
        machine_id: &str,
        new_status: PredictionStatus,
        now: Timestamp,
    ) -> Result<AlertDecision, StoreError> {
        for attempt in 1..=self.max_attempts {
            let prior = self.store.get(machine_id).await?;
            let evaluation = self.policy.evaluate(prior.as_ref(), new_status, now);

            let Some(update) = evaluation.update else {
                return Ok(evaluation.decision);
            };

            let expected = prior.as_ref().map(|p| p.version);
            match self
                .store
                .compare_and_swap(machine_id, expected, &update)
                .await?
            {
                Some(state) => {
                    tracing::debug!(
                        machine_id,
                        status = %state.last_status,
                        version = state.version,
                        decision = ?evaluation.decision,
                        "Alert state committed"
                    );
                    return Ok(evaluation.decision);
                }
                None => {
                    tracing::debug!(
                        machine_id,
                        attempt,
                        "Alert state changed concurrently, re-evaluating"
                    );
                }
            }
        }

        tracing::warn!(
            machine_id,
            status = %new_status,
            attempts = self.max_attempts,
            "Alert state contention not resolved, suppressing"
        );
        Ok(AlertDecision::Suppress)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
