//! Request-independent fault detection pipeline.
//!
//! The [`FaultDispatcher`] owns the telemetry store, predictor, alert gate
//! and notifier; HTTP handlers only translate requests into dispatcher
//! calls.

pub mod dispatcher;

pub use dispatcher::{FaultDispatcher, MachineStatusReport};
