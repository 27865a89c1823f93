//! fabric-bus: the message bus trait boundary and an in-memory reference
//! implementation.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod bus;
mod error;
mod local;

pub use bus::{Bus, Subscription};
pub use error::BusError;
pub use local::LocalBus;

/// Canonical queue names, per the wire-level contract shared with `fabric-core`.
pub mod queue {
    pub const TASK_CREATED: &str = "task_created";
    pub const TASK_STATUS: &str = "task_status";
    pub const WORKER_STATUS: &str = "worker_status";
    pub const TASK_CHECKPOINT: &str = "task_checkpoint";
}
