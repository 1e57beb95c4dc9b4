//! Database row structs.
//!
//! Each submodule contains a `FromRow` struct matching the table and a
//! conversion into the corresponding `faultwatch_core` domain type.

pub mod alert_state;
pub mod machine_event;
