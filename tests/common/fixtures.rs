//! Store and feed fixtures backed by an in-memory SQLite event store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::watch;

use eventorias_lib::core::FixedClock;
use eventorias_lib::feed::{FeedController, FeedState, FixedUser};
use eventorias_lib::repository::{EventRepository, NewEvent};

/// 2025-01-01 00:00.
pub fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid date")
}

pub fn new_event(title: &str, date: &str) -> NewEvent {
    NewEvent {
        title: title.to_string(),
        description: format!("{title} details"),
        date: date.to_string(),
        time: "18:00".to_string(),
        location: "Main Square".to_string(),
        author_id: "author-1".to_string(),
        ..Default::default()
    }
}

/// Start a feed over `repo` and wait for its first snapshot.
pub async fn feed_over(repo: &EventRepository, user: Option<&str>) -> FeedController {
    let controller = FeedController::new(
        Arc::new(repo.clone()),
        Arc::new(FixedUser(user.map(str::to_string))),
        Arc::new(FixedClock(now())),
    );
    let mut rx = controller.watch();
    wait_for_state(&mut rx, |s| !s.status.is_loading()).await;
    controller
}

pub async fn wait_for_state(
    rx: &mut watch::Receiver<FeedState>,
    predicate: impl FnMut(&FeedState) -> bool,
) -> FeedState {
    tokio::time::timeout(Duration::from_secs(2), rx.wait_for(predicate))
        .await
        .expect("timed out waiting for feed state")
        .expect("feed state channel closed")
        .clone()
}
