//! Local event store.
//!
//! Persists event records in SQLite and publishes the complete event list on
//! a [`SnapshotBus`] after every write. It is also an [`EventSource`]: a
//! subscription starts with the current list and then follows every write.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::bus::SnapshotBus;
use crate::core::{parse_event_date, parse_event_time, Event, EventRecord};
use crate::db::{queries, Database, DbError};
use crate::feed::{EventSource, SnapshotResult, SourceError, Subscription};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{0}")]
    Db(#[from] DbError),
    #[error("event not found: {0}")]
    NotFound(String),
    #[error("invalid event: {0}")]
    Invalid(String),
}

/// Input for creating an event. Date and time use the store's string forms.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    /// `MM/DD/YYYY`
    pub date: String,
    /// `HH:MM`, 24-hour
    pub time: String,
    pub location: String,
    #[serde(rename = "pictureURL")]
    pub picture_url: Option<String>,
    #[serde(rename = "authorPictureURL")]
    pub author_picture_url: Option<String>,
    pub author_id: String,
}

impl NewEvent {
    pub fn validate(&self) -> Result<(), RepositoryError> {
        let required = [
            ("title", &self.title),
            ("date", &self.date),
            ("time", &self.time),
            ("author id", &self.author_id),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(RepositoryError::Invalid(format!("{field} is required")));
            }
        }
        if parse_event_date(&self.date).is_none() {
            return Err(RepositoryError::Invalid(format!(
                "date '{}' is not MM/DD/YYYY",
                self.date
            )));
        }
        if parse_event_time(&self.time).is_none() {
            return Err(RepositoryError::Invalid(format!(
                "time '{}' is not HH:MM",
                self.time
            )));
        }
        Ok(())
    }
}

/// Writes are serialized: each one holds the writer lock until its snapshot
/// has been published, so snapshots reach the bus in write order.
#[derive(Clone)]
pub struct EventRepository {
    db: Arc<Database>,
    bus: Arc<SnapshotBus>,
    writer: Arc<Mutex<()>>,
}

impl EventRepository {
    pub fn new(db: Arc<Database>, bus: Arc<SnapshotBus>) -> Self {
        Self {
            db,
            bus,
            writer: Arc::new(Mutex::new(())),
        }
    }

    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, RepositoryError> {
        let db = Database::open(path)?;
        Ok(Self::new(Arc::new(db), Arc::new(SnapshotBus::new())))
    }

    pub fn open_in_memory() -> Result<Self, RepositoryError> {
        let db = Database::open_in_memory()?;
        Ok(Self::new(Arc::new(db), Arc::new(SnapshotBus::new())))
    }

    pub fn create_event(&self, new_event: NewEvent) -> Result<Event, RepositoryError> {
        new_event.validate()?;

        let row = queries::EventRow {
            id: Uuid::new_v4().to_string(),
            title: new_event.title.trim().to_string(),
            description: new_event.description,
            date: new_event.date.trim().to_string(),
            time: new_event.time.trim().to_string(),
            location: new_event.location,
            picture_url: new_event.picture_url,
            author_picture_url: new_event.author_picture_url,
            author_id: new_event.author_id,
            created_at: Utc::now().to_rfc3339(),
        };
        let _writer = self.lock_writer();
        queries::insert_event(&self.db, &row)?;
        tracing::info!(event_id = %row.id, title = %row.title, "event created");

        let event = Event::from(record_from_row(row, Vec::new()));
        self.notify();
        Ok(event)
    }

    pub fn get_event(&self, id: &str) -> Result<Event, RepositoryError> {
        let row = queries::get_event(&self.db, id)?
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        let participants = queries::list_participants(&self.db, id)?;
        Ok(Event::from(record_from_row(row, participants)))
    }

    /// All events in creation order.
    pub fn list_events(&self) -> Result<Vec<Event>, RepositoryError> {
        let rows = queries::list_events(&self.db)?;
        let mut participants = queries::list_all_participants(&self.db)?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let members = participants.remove(&row.id).unwrap_or_default();
                Event::from(record_from_row(row, members))
            })
            .collect())
    }

    pub fn delete_event(&self, id: &str) -> Result<(), RepositoryError> {
        let _writer = self.lock_writer();
        if !queries::delete_event(&self.db, id)? {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        tracing::info!(event_id = %id, "event deleted");
        self.notify();
        Ok(())
    }

    /// Add `user_id` to the event's participants. Joining twice is a no-op.
    pub fn join_event(&self, id: &str, user_id: &str) -> Result<Event, RepositoryError> {
        let _writer = self.lock_writer();
        self.ensure_exists(id)?;
        let joined_at = Utc::now().to_rfc3339();
        if queries::add_participant(&self.db, id, user_id, &joined_at)? {
            tracing::info!(event_id = %id, user_id = %user_id, "participant joined");
            self.notify();
        }
        self.get_event(id)
    }

    /// Remove `user_id` from the event's participants, if present.
    pub fn leave_event(&self, id: &str, user_id: &str) -> Result<Event, RepositoryError> {
        let _writer = self.lock_writer();
        self.ensure_exists(id)?;
        if queries::remove_participant(&self.db, id, user_id)? {
            tracing::info!(event_id = %id, user_id = %user_id, "participant left");
            self.notify();
        }
        self.get_event(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }

    fn ensure_exists(&self, id: &str) -> Result<(), RepositoryError> {
        match queries::get_event(&self.db, id)? {
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound(id.to_string())),
        }
    }

    /// A poisoned lock is recovered; the store itself stays consistent.
    fn lock_writer(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Publish the current event list. Callers hold the writer lock.
    fn notify(&self) {
        match self.list_events() {
            Ok(events) => {
                self.bus.publish(events);
            }
            Err(e) => tracing::warn!("failed to read events for snapshot: {e}"),
        }
    }
}

fn record_from_row(row: queries::EventRow, participants: Vec<String>) -> EventRecord {
    EventRecord {
        id: row.id,
        title: row.title,
        description: row.description,
        date: row.date,
        time: row.time,
        location: row.location,
        picture_url: row.picture_url,
        author_picture_url: row.author_picture_url,
        participants,
        author_id: row.author_id,
    }
}

// ---------------------------------------------------------------------------
// Live subscription
// ---------------------------------------------------------------------------

enum Phase {
    Initial,
    Live,
    Done,
}

struct Cursor {
    repo: EventRepository,
    rx: broadcast::Receiver<Vec<Event>>,
    phase: Phase,
}

impl Cursor {
    fn read_all(&self) -> SnapshotResult {
        self.repo
            .list_events()
            .map_err(|e| SourceError::Storage(e.to_string()))
    }

    async fn next_item(mut self) -> Option<(SnapshotResult, Cursor)> {
        let item = match self.phase {
            Phase::Done => return None,
            Phase::Initial => self.read_all(),
            Phase::Live => match self.rx.recv().await {
                Ok(events) => Ok(events),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("event subscription lagged by {n} snapshots, re-reading");
                    self.read_all()
                }
                Err(broadcast::error::RecvError::Closed) => Err(SourceError::Closed),
            },
        };
        self.phase = if item.is_ok() { Phase::Live } else { Phase::Done };
        Some((item, self))
    }
}

#[async_trait]
impl EventSource for EventRepository {
    async fn subscribe(&self) -> Result<Subscription, SourceError> {
        // Subscribe before the first read so no write can slip between them.
        let cursor = Cursor {
            repo: self.clone(),
            rx: self.bus.subscribe(),
            phase: Phase::Initial,
        };
        tracing::debug!(subscribers = self.bus.subscriber_count(), "event source subscribed");

        let stream = futures::stream::unfold(cursor, Cursor::next_item).boxed();
        Ok(Subscription::new(stream).on_cancel(|| {
            tracing::debug!("event source subscription released");
        }))
    }
}
