//! Change notification for the local event store.
//!
//! Every write to the store publishes the complete event list on a broadcast
//! channel. Subscribers always receive whole snapshots, so a lagging receiver
//! only needs the newest one.

mod event_bus;

pub use event_bus::SnapshotBus;
