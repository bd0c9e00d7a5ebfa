//! Eventorias event feed library.
//!
//! This crate holds the event feed behind the Eventorias app:
//! - A live subscription to the set of events
//! - A cached snapshot plus a sorted, filtered view of it
//! - A coarse loading / error / success status for presentation
//!
//! # Architecture
//!
//! - `core`: the `Event` entity and the injectable clock
//! - `feed`: event source traits, the sort/filter functions and the controller task
//! - `db`: SQLite persistence for event records
//! - `bus`: broadcast of full event snapshots after each write
//! - `repository`: the local event store, which is also an event source
//! - `config`: environment configuration

pub mod bus;
pub mod config;
pub mod core;
pub mod db;
pub mod feed;
pub mod repository;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::{Event, SystemClock};
use crate::feed::{FeedController, SessionUser};
use crate::repository::{EventRepository, NewEvent, RepositoryError};

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Db(#[from] db::DbError),
    #[error("{0}")]
    Repository(#[from] RepositoryError),
    #[error("{0}")]
    Feed(#[from] feed::ControllerError),
    #[error("{0}")]
    Other(String),
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Install the global tracing subscriber. `RUST_LOG` wins over `fallback`.
pub fn init_tracing(fallback: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

// ---------------------------------------------------------------------------
// Application wiring
// ---------------------------------------------------------------------------

pub struct App {
    pub repository: EventRepository,
    pub session: SessionUser,
    pub feed: FeedController,
}

impl App {
    /// Open the store from `config` and start the feed. Must run inside a
    /// tokio runtime.
    pub fn start(config: &AppConfig) -> Result<Self, AppError> {
        let db_path = config.prepare_db_path().map_err(AppError::Other)?;
        let repository = EventRepository::open(&db_path)?;
        tracing::info!("event store opened at {}", db_path.display());
        Ok(Self::with_repository(repository, config.user_id.clone()))
    }

    pub fn with_repository(repository: EventRepository, user_id: Option<String>) -> Self {
        let session = SessionUser::new(user_id);
        let feed = FeedController::new(
            Arc::new(repository.clone()),
            Arc::new(session.clone()),
            Arc::new(SystemClock),
        );
        Self {
            repository,
            session,
            feed,
        }
    }

    pub async fn shutdown(self) -> Result<(), AppError> {
        self.feed.shutdown().await?;
        Ok(())
    }
}

/// Add a few sample events around `today` when the store is empty.
pub fn seed_sample_events(
    repository: &EventRepository,
    today: chrono::NaiveDate,
    author_id: &str,
) -> Result<Vec<Event>, AppError> {
    if !repository.list_events()?.is_empty() {
        return Ok(Vec::new());
    }

    let samples = [
        ("Birthday Party", "Cake and music", 7, "20:00", "8 Rue Oberkampf, Paris"),
        ("Tech Conference", "Talks about mobile apps", 30, "09:00", "Palais des Congrès, Paris"),
        ("Art Exhibition", "Contemporary painters", -14, "10:30", "Centre Pompidou, Paris"),
        ("Charity Run", "10km around the lake", 60, "08:00", "Bois de Vincennes, Paris"),
    ];

    let mut created = Vec::with_capacity(samples.len());
    for (title, description, offset_days, time, location) in samples {
        let date = today + chrono::Duration::days(offset_days);
        let event = repository.create_event(NewEvent {
            title: title.to_string(),
            description: description.to_string(),
            date: date.format(crate::core::event::DATE_FORMAT).to_string(),
            time: time.to_string(),
            location: location.to_string(),
            author_id: author_id.to_string(),
            ..Default::default()
        })?;
        created.push(event);
    }
    tracing::info!("seeded {} sample events", created.len());
    Ok(created)
}
