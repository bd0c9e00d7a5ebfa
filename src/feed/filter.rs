//! Pure sort/filter functions behind the event feed.
//!
//! The feed view is always built in the same order: bucket by [`SortMode`],
//! sort by date, then narrow by title query. The query never changes which
//! bucket an event lands in.
//!
//! Events whose date could not be parsed never appear in a date-bucketed or
//! date-sorted result.

use std::cmp::Ordering;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::core::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Upcoming events.
    #[default]
    Soon,
    /// Events the current user participates in.
    Participate,
    /// Events whose date has passed.
    Finished,
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Soon => "soon",
            Self::Participate => "participate",
            Self::Finished => "finished",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for SortMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soon" => Ok(Self::Soon),
            "participate" => Ok(Self::Participate),
            "finished" => Ok(Self::Finished),
            other => Err(format!(
                "unknown sort mode '{other}'. Use soon, participate, or finished"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOptions {
    pub mode: SortMode,
    pub ascending: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            mode: SortMode::Soon,
            ascending: true,
        }
    }
}

pub fn only_incoming(events: &[Event], now: NaiveDateTime) -> Vec<Event> {
    events
        .iter()
        .filter(|event| matches!(event.starts_at(), Some(start) if start > now))
        .cloned()
        .collect()
}

pub fn only_finished(events: &[Event], now: NaiveDateTime) -> Vec<Event> {
    events
        .iter()
        .filter(|event| matches!(event.starts_at(), Some(start) if start < now))
        .cloned()
        .collect()
}

/// Events whose participants include `user_id`. A signed-out user (`None`)
/// participates in nothing.
pub fn only_participating(events: &[Event], user_id: Option<&str>) -> Vec<Event> {
    let Some(user_id) = user_id else {
        return Vec::new();
    };
    events
        .iter()
        .filter(|event| event.is_participant(user_id))
        .cloned()
        .collect()
}

/// Order by date, then time, then id. Undated events are dropped.
pub fn sort_by_date(events: Vec<Event>, ascending: bool) -> Vec<Event> {
    let mut dated: Vec<Event> = events.into_iter().filter(|e| e.date.is_some()).collect();
    dated.sort_by(|a, b| {
        let ord = compare_by_date(a, b);
        if ascending {
            ord
        } else {
            ord.reverse()
        }
    });
    dated
}

fn compare_by_date(a: &Event, b: &Event) -> Ordering {
    a.date
        .cmp(&b.date)
        .then_with(|| a.time.cmp(&b.time))
        .then_with(|| a.id.cmp(&b.id))
}

/// Case-insensitive substring match on the title. A missing or blank query
/// returns the input unchanged.
pub fn filter_by_title(events: Vec<Event>, query: Option<&str>) -> Vec<Event> {
    let Some(query) = query.filter(|q| !q.trim().is_empty()) else {
        return events;
    };
    let needle = query.to_lowercase();
    events
        .into_iter()
        .filter(|event| event.title.to_lowercase().contains(&needle))
        .collect()
}

/// Build the visible feed from the full event list.
pub fn derive_view(
    events: &[Event],
    options: SortOptions,
    query: Option<&str>,
    user_id: Option<&str>,
    now: NaiveDateTime,
) -> Vec<Event> {
    let bucket = match options.mode {
        SortMode::Soon => only_incoming(events, now),
        SortMode::Participate => only_participating(events, user_id),
        SortMode::Finished => only_finished(events, now),
    };
    let sorted = sort_by_date(bucket, options.ascending);
    filter_by_title(sorted, query)
}
