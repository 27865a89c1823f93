//! fabric-daemon: the `fabricd` binary's supporting modules, exposed as a
//! library so the admin HTTP surface and environment wiring are unit
//! testable independent of the process entry point.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod http;
