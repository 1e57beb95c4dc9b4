//! Fault classification for machine telemetry.
//!
//! Pure logic, no I/O. The [`FaultPredictor`] trait is the seam for swapping
//! in a smarter model; [`ThresholdPredictor`] is the default implementation
//! and scores only the most recent sample.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::telemetry::MachineEvent;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Health classification of a machine, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredictionStatus {
    /// Within normal range, or not enough data to say otherwise.
    Normal,
    /// A warning threshold was crossed.
    FaultSoon,
    /// A critical threshold was crossed.
    Fault,
}

impl PredictionStatus {
    /// Canonical upper-case name, as used on the wire and in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::FaultSoon => "FAULT_SOON",
            Self::Fault => "FAULT",
        }
    }

    /// Id in the `prediction_statuses` lookup table.
    pub fn id(self) -> i16 {
        match self {
            Self::Normal => 1,
            Self::FaultSoon => 2,
            Self::Fault => 3,
        }
    }

    /// Inverse of [`PredictionStatus::id`].
    pub fn from_id(id: i16) -> Result<Self, CoreError> {
        match id {
            1 => Ok(Self::Normal),
            2 => Ok(Self::FaultSoon),
            3 => Ok(Self::Fault),
            other => Err(CoreError::Internal(format!(
                "unknown prediction status id {other}"
            ))),
        }
    }

    /// Whether this status warrants a notification.
    pub fn is_fault(self) -> bool {
        self != Self::Normal
    }
}

impl fmt::Display for PredictionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Default temperature warning threshold.
pub const DEFAULT_TEMPERATURE_WARN: f64 = 74.0;
/// Default temperature critical threshold.
pub const DEFAULT_TEMPERATURE_CRITICAL: f64 = 82.0;
/// Default vibration warning threshold.
pub const DEFAULT_VIBRATION_WARN: f64 = 2.3;
/// Default vibration critical threshold.
pub const DEFAULT_VIBRATION_CRITICAL: f64 = 3.0;

/// Warning / critical levels for each sensor.
///
/// A reading at or above `*_warn` maps to [`PredictionStatus::FaultSoon`];
/// at or above `*_critical` maps to [`PredictionStatus::Fault`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub temperature_warn: f64,
    pub temperature_critical: f64,
    pub vibration_warn: f64,
    pub vibration_critical: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temperature_warn: DEFAULT_TEMPERATURE_WARN,
            temperature_critical: DEFAULT_TEMPERATURE_CRITICAL,
            vibration_warn: DEFAULT_VIBRATION_WARN,
            vibration_critical: DEFAULT_VIBRATION_CRITICAL,
        }
    }
}

impl Thresholds {
    /// Reject non-finite levels and any warn level not strictly below its
    /// critical level.
    pub fn validate(&self) -> Result<(), CoreError> {
        check_pair(
            "temperature",
            self.temperature_warn,
            self.temperature_critical,
        )?;
        check_pair("vibration", self.vibration_warn, self.vibration_critical)
    }
}

fn check_pair(sensor: &str, warn: f64, critical: f64) -> Result<(), CoreError> {
    if !warn.is_finite() || !critical.is_finite() {
        return Err(CoreError::Validation(format!(
            "{sensor} thresholds must be finite numbers"
        )));
    }
    if warn >= critical {
        return Err(CoreError::Validation(format!(
            "{sensor}_warn ({warn}) must be below {sensor}_critical ({critical})"
        )));
    }
    Ok(())
}

/// Classify a single reading against its warn / critical pair.
fn level(value: f64, warn: f64, critical: f64) -> PredictionStatus {
    if value >= critical {
        PredictionStatus::Fault
    } else if value >= warn {
        PredictionStatus::FaultSoon
    } else {
        PredictionStatus::Normal
    }
}

// ---------------------------------------------------------------------------
// Predictor
// ---------------------------------------------------------------------------

/// A classification together with the model's confidence in it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Assessment {
    pub status: PredictionStatus,
    /// Confidence in `[0, 1]`, when the model provides one.
    pub confidence: Option<f64>,
}

/// Maps a machine's telemetry history to a fault status.
///
/// `history` is ordered newest first. Implementations must be deterministic
/// and total: an empty history yields [`PredictionStatus::Normal`].
pub trait FaultPredictor: Send + Sync {
    fn classify(&self, history: &[MachineEvent]) -> PredictionStatus;

    /// Classification plus an optional confidence score.
    fn assess(&self, history: &[MachineEvent]) -> Assessment {
        Assessment {
            status: self.classify(history),
            confidence: None,
        }
    }
}

/// Scores the latest sample against fixed thresholds; the most severe
/// sensor wins.
#[derive(Debug, Clone, Default)]
pub struct ThresholdPredictor {
    thresholds: Thresholds,
}

impl ThresholdPredictor {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    fn classify_sample(&self, sample: &MachineEvent) -> PredictionStatus {
        let t = &self.thresholds;
        let temperature = level(
            sample.temperature,
            t.temperature_warn,
            t.temperature_critical,
        );
        let vibration = level(sample.vibration, t.vibration_warn, t.vibration_critical);
        temperature.max(vibration)
    }
}

impl FaultPredictor for ThresholdPredictor {
    fn classify(&self, history: &[MachineEvent]) -> PredictionStatus {
        history
            .first()
            .map(|latest| self.classify_sample(latest))
            .unwrap_or(PredictionStatus::Normal)
    }

    fn assess(&self, history: &[MachineEvent]) -> Assessment {
        let Some(latest) = history.first() else {
            return Assessment {
                status: PredictionStatus::Normal,
                confidence: None,
            };
        };
        let status = self.classify_sample(latest);
        let raw = logistic_score(latest.temperature, latest.vibration);
        let confidence = match status {
            PredictionStatus::Fault => raw.max(0.85),
            PredictionStatus::FaultSoon => raw.max(0.45),
            PredictionStatus::Normal => raw.min(0.30),
        };
        Assessment {
            status,
            confidence: Some(confidence),
        }
    }
}

/// Logistic score over normalised temperature (60..90 °C) and vibration
/// (1..4), including an interaction term.
fn logistic_score(temperature: f64, vibration: f64) -> f64 {
    let t = (temperature - 60.0) / 30.0;
    let v = (vibration - 1.0) / 3.0;
    let z = 2.5 * t + 3.0 * v + 0.8 * t * v - 1.2;
    1.0 / (1.0 + (-z.clamp(-500.0, 500.0)).exp())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
