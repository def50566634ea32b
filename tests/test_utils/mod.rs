#![allow(dead_code, unused_imports)]

pub mod fixtures;

pub use fixtures::{WAIT, collector, config_in, spill_dir, spilled_lines};
pub use femtosyslog::test_utils::{Collector, dead_addr};
