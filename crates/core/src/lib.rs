//! fabric-core: the data model shared by the coordinator and worker runtime.
//!
//! Nothing here talks to a bus or a store — those are the adjoining crates'
//! job. This crate only defines what a [`Task`], a [`checkpoint::CheckpointRecord`],
//! a [`worker_record::WorkerRecord`], and the [`envelope::MessageEnvelope`] that
//! carries them over the wire look like, plus the small set of pure helpers
//! (clock, ids, store key layout) that both sides need to agree on.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod checkpoint;
pub mod clock;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod keys;
pub mod task;
pub mod worker_record;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use checkpoint::CheckpointRecord;
pub use clock::{Clock, FakeClock, SystemClock};
pub use envelope::{msg_type, MessageContent, MessageEnvelope, MigrationDirective, WorkerStatusPayload};
pub use error::CoreError;
pub use ids::{TaskId, WorkerId};
pub use keys::{checkpoint_key, checkpoint_prefix, parse_checkpoint_progress, task_key, TASK_PREFIX};
pub use task::{Task, TaskStatus};
pub use worker_record::{WorkerRecord, WorkerStatus};
