//! Live event feed.
//!
//! Snapshots flow from an [`EventSource`] into the [`FeedController`]. The
//! controller caches the snapshot and builds the visible list with the pure
//! functions in [`filter`]. Presentation code reads [`FeedState`].

pub mod controller;
pub mod filter;
pub mod source;
pub mod status;


pub use controller::{ControllerError, FeedController};
pub use filter::{SortMode, SortOptions};
pub use source::{
    CurrentUser, EventSource, FixedUser, SessionUser, SnapshotResult, SourceError, Subscription,
};
pub use status::{FeedError, FeedState, FeedStatus};
