//! Common test utilities for feed integration tests.

pub mod fixtures;

pub use fixtures::{feed_over, new_event, now, wait_for_state};
