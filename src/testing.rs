//! Test helpers shared by unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use futures::StreamExt;
use tokio::sync::{mpsc, watch};

use crate::core::Event;
use crate::feed::{EventSource, FeedState, SnapshotResult, SourceError, Subscription};

/// 2025-01-01 00:00, the "now" used across feed tests.
pub fn test_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid test date")
}

/// Build an event dated `MM/DD/YYYY`. Unparseable strings give an undated
/// event, the same way records from the store do.
pub fn sample_event(id: &str, title: &str, date: &str) -> Event {
    Event {
        id: id.to_string(),
        title: title.to_string(),
        description: format!("{title} description"),
        date: crate::core::parse_event_date(date),
        time: NaiveTime::from_hms_opt(19, 0, 0),
        location: "Town Hall".to_string(),
        author_id: "author-1".to_string(),
        ..Default::default()
    }
}

/// Wait until the feed state satisfies `predicate`, failing after two seconds.
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

#[derive(Default)]
struct ScriptedInner {
    sender: Mutex<Option<mpsc::UnboundedSender<SnapshotResult>>>,
    subscribes: AtomicUsize,
    cancels: AtomicUsize,
    refuse: AtomicBool,
}

/// Event source driven by the test. Each `subscribe` opens a fresh channel;
/// `push` and `fail` write to the most recent one.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    inner: Arc<ScriptedInner>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, events: Vec<Event>) -> bool {
        self.send(Ok(events))
    }

    pub fn fail(&self, message: &str) -> bool {
        self.send(Err(SourceError::Unavailable(message.to_string())))
    }

    /// Make the next `subscribe` calls return an error.
    pub fn refuse_subscriptions(&self, refuse: bool) {
        self.inner.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn subscribe_count(&self) -> usize {
        self.inner.subscribes.load(Ordering::SeqCst)
    }

    pub fn cancel_count(&self) -> usize {
        self.inner.cancels.load(Ordering::SeqCst)
    }

    fn send(&self, item: SnapshotResult) -> bool {
        let guard = self.inner.sender.lock().expect("scripted source mutex poisoned");
        guard.as_ref().is_some_and(|tx| tx.send(item).is_ok())
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    async fn subscribe(&self) -> Result<Subscription, SourceError> {
        self.inner.subscribes.fetch_add(1, Ordering::SeqCst);
        if self.inner.refuse.load(Ordering::SeqCst) {
            return Err(SourceError::Unavailable("offline".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.inner.sender.lock().expect("scripted source mutex poisoned") = Some(tx);

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed();
        let inner = self.inner.clone();
        Ok(Subscription::new(stream).on_cancel(move || {
            inner.cancels.fetch_add(1, Ordering::SeqCst);
        }))
    }
}
