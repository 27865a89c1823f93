//! fabric-worker: the worker runtime — execution loop, checkpoint and
//! heartbeat tickers, and recovery/migration intake.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod error;
mod recovery;
mod runtime;
mod worker;

pub use config::WorkerConfig;
pub use error::WorkerError;
pub use recovery::resume_progress;
pub use runtime::run;
pub use worker::WorkerRuntime;
