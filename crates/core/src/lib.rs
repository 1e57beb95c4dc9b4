//! Faultwatch domain logic.
//!
//! Everything in this crate is independent of HTTP and of the concrete
//! database: the telemetry and alert-state stores, the fault predictor and
//! the notifier are traits, with in-memory store implementations for tests
//! and local development.

pub mod alert;
pub mod error;
pub mod memory;
pub mod notifier;
pub mod prediction;
pub mod telemetry;
pub mod types;
