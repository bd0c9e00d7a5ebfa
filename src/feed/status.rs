use thiserror::Error;

use crate::core::Event;
use crate::feed::filter::SortMode;

pub const NO_EVENTS_MESSAGE: &str = "No events found.";
pub const UNAVAILABLE_MESSAGE: &str = "Unable to load events. Please try again.";

/// Why the feed is in its error state.
///
/// `Empty` is not a failure, but it is shown through the error state with its
/// own message. Match on the variant rather than the text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("No events found.")]
    Empty,
    /// The cause is kept for logs. Users only see the generic message.
    #[error("Unable to load events. Please try again.")]
    Unavailable(String),
}

impl FeedError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => NO_EVENTS_MESSAGE,
            Self::Unavailable(_) => UNAVAILABLE_MESSAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedStatus {
    Loading,
    Error(FeedError),
    /// Carries the full snapshot, not the filtered view.
    Success(Vec<Event>),
}

impl FeedStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn error_message(&self) -> Option<&'static str> {
        match self {
            Self::Error(err) => Some(err.message()),
            _ => None,
        }
    }
}

/// Everything the presentation layer reads from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedState {
    pub status: FeedStatus,
    /// The derived, filtered and sorted view.
    pub events: Vec<Event>,
    pub sort_mode: SortMode,
    pub ascending: bool,
}

impl Default for FeedState {
    fn default() -> Self {
        Self {
            status: FeedStatus::Loading,
            events: Vec::new(),
            sort_mode: SortMode::default(),
            ascending: true,
        }
    }
}
