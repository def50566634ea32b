//! Test-only helpers shared by unit and integration tests.
//!
//! Compiled for unit tests and, through the `test-util` feature, for the
//! integration tests under `tests/`.

pub mod collector;

pub use collector::{Collector, dead_addr};
