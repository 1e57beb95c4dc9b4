//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod alert_state_repo;
pub mod machine_event_repo;

pub use alert_state_repo::AlertStateRepo;
pub use machine_event_repo::MachineEventRepo;
