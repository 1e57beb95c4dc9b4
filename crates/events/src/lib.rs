//! Outbound alert delivery for faultwatch.
//!
//! Each channel implements [`faultwatch_core::notifier::Notifier`]:
//!
//! - [`SnsNotifier`] — publishes to an AWS SNS topic.
//! - [`WebhookNotifier`] — POSTs the alert as JSON to an HTTP endpoint.
//! - [`LogNotifier`] — writes the alert to the tracing log only.
//!
//! [`build_notifier`] picks a channel from a single endpoint string.

pub mod delivery;

pub use delivery::log::LogNotifier;
pub use delivery::sns::SnsNotifier;
pub use delivery::webhook::WebhookNotifier;
pub use delivery::{build_notifier, NotifierTarget};
