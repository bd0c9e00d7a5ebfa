//! Feed state controller.
//!
//! One tokio task owns the subscription, the cached snapshot, the sort options
//! and the derived view. Commands from the handle and snapshots from the
//! subscription are applied one at a time on that task. Readers see whole
//! [`FeedState`] values through a `watch` channel.

use std::sync::Arc;

use futures::StreamExt;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::core::{Clock, Event};
use crate::feed::filter::{derive_view, SortMode, SortOptions};
use crate::feed::source::{CurrentUser, EventSource, SnapshotResult, Subscription};
use crate::feed::status::{FeedError, FeedState, FeedStatus};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("feed controller has stopped")]
    Closed,
    #[error("feed task failed: {0}")]
    Join(String),
}

enum Command {
    Observe {
        reply: oneshot::Sender<FeedState>,
    },
    UpdateSortOption {
        mode: SortMode,
        query: Option<String>,
        reply: oneshot::Sender<FeedState>,
    },
    SetDateSortingType {
        ascending: bool,
        reply: oneshot::Sender<FeedState>,
    },
    UpdateSortFilteredEvents {
        query: Option<String>,
        reply: oneshot::Sender<FeedState>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to the running feed. Dropping it stops the feed task, which
/// cancels the subscription.
pub struct FeedController {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<FeedState>,
    task: JoinHandle<()>,
}

impl FeedController {
    /// Spawn the feed task and start observing `source`. Must be called from
    /// within a tokio runtime.
    pub fn new(
        source: Arc<dyn EventSource>,
        user: Arc<dyn CurrentUser>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(FeedState::default());

        let actor = FeedActor {
            source,
            user,
            clock,
            cache: Vec::new(),
            view: Vec::new(),
            options: SortOptions::default(),
            status: FeedStatus::Loading,
            subscription: None,
            state_tx,
        };
        let task = tokio::spawn(actor.run(rx));

        // Queued first, so it is applied before any caller command.
        let (reply, _) = oneshot::channel();
        let _ = commands.send(Command::Observe { reply });

        Self {
            commands,
            state,
            task,
        }
    }

    /// (Re)open the subscription. Any current subscription is cancelled first.
    pub async fn observe_events(&self) -> Result<FeedState, ControllerError> {
        self.request(|reply| Command::Observe { reply }).await
    }

    pub async fn update_sort_option(
        &self,
        mode: SortMode,
        query: Option<&str>,
    ) -> Result<FeedState, ControllerError> {
        let query = query.map(str::to_string);
        self.request(|reply| Command::UpdateSortOption { mode, query, reply })
            .await
    }

    /// Recomputes without a query, even if one was applied before.
    pub async fn set_date_sorting_type(
        &self,
        ascending: bool,
    ) -> Result<FeedState, ControllerError> {
        self.request(|reply| Command::SetDateSortingType { ascending, reply })
            .await
    }

    pub async fn update_sort_filtered_events(
        &self,
        query: Option<&str>,
    ) -> Result<FeedState, ControllerError> {
        let query = query.map(str::to_string);
        self.request(|reply| Command::UpdateSortFilteredEvents { query, reply })
            .await
    }

    pub fn state(&self) -> FeedState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<FeedState> {
        self.state.clone()
    }

    /// Cancel the subscription and stop the feed task.
    pub async fn shutdown(self) -> Result<(), ControllerError> {
        let (reply, done) = oneshot::channel();
        if self.commands.send(Command::Shutdown { reply }).is_ok() {
            let _ = done.await;
        }
        drop(self.commands);
        self.task
            .await
            .map_err(|e| ControllerError::Join(e.to_string()))
    }

    async fn request(
        &self,
        build: impl FnOnce(oneshot::Sender<FeedState>) -> Command,
    ) -> Result<FeedState, ControllerError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| ControllerError::Closed)?;
        rx.await.map_err(|_| ControllerError::Closed)
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

enum Input {
    Command(Option<Command>),
    Update(Option<SnapshotResult>),
}

struct FeedActor {
    source: Arc<dyn EventSource>,
    user: Arc<dyn CurrentUser>,
    clock: Arc<dyn Clock>,
    cache: Vec<Event>,
    view: Vec<Event>,
    options: SortOptions,
    status: FeedStatus,
    subscription: Option<Subscription>,
    state_tx: watch::Sender<FeedState>,
}

impl FeedActor {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            let input = tokio::select! {
                command = commands.recv() => Input::Command(command),
                update = next_update(&mut self.subscription) => Input::Update(update),
            };

            match input {
                Input::Command(None) => {
                    tracing::debug!("feed handle dropped");
                    break;
                }
                Input::Command(Some(command)) => {
                    if !self.handle(command).await {
                        break;
                    }
                }
                Input::Update(Some(Ok(events))) => self.apply_snapshot(events),
                Input::Update(Some(Err(e))) => {
                    tracing::warn!("event subscription failed: {e}");
                    self.release_subscription();
                    self.status = FeedStatus::Error(FeedError::Unavailable(e.to_string()));
                    self.publish();
                }
                Input::Update(None) => {
                    tracing::info!("event subscription ended");
                    self.release_subscription();
                }
            }
        }

        self.release_subscription();
        tracing::debug!("feed task stopped");
    }

    /// Apply one command. Returns `false` once the feed should stop.
    async fn handle(&mut self, command: Command) -> bool {
        let reply = match command {
            Command::Shutdown { reply } => {
                self.release_subscription();
                let _ = reply.send(());
                return false;
            }
            Command::Observe { reply } => {
                self.observe().await;
                reply
            }
            Command::UpdateSortOption { mode, query, reply } => {
                self.options.mode = mode;
                self.recompute(query.as_deref());
                reply
            }
            Command::SetDateSortingType { ascending, reply } => {
                self.options.ascending = ascending;
                self.recompute(None);
                reply
            }
            Command::UpdateSortFilteredEvents { query, reply } => {
                self.recompute(query.as_deref());
                reply
            }
        };
        self.publish();
        let _ = reply.send(self.snapshot());
        true
    }

    async fn observe(&mut self) {
        self.release_subscription();
        self.status = FeedStatus::Loading;
        self.publish();

        match self.source.subscribe().await {
            Ok(subscription) => {
                tracing::info!("event subscription opened");
                self.subscription = Some(subscription);
            }
            Err(e) => {
                tracing::warn!("failed to open event subscription: {e}");
                self.status = FeedStatus::Error(FeedError::Unavailable(e.to_string()));
            }
        }
    }

    fn apply_snapshot(&mut self, events: Vec<Event>) {
        tracing::debug!(count = events.len(), "event snapshot received");
        self.cache = events;
        self.recompute(None);
        self.status = if self.cache.is_empty() {
            FeedStatus::Error(FeedError::Empty)
        } else {
            FeedStatus::Success(self.cache.clone())
        };
        self.publish();
    }

    fn recompute(&mut self, query: Option<&str>) {
        let user_id = self.user.current_user_id();
        self.view = derive_view(
            &self.cache,
            self.options,
            query,
            user_id.as_deref(),
            self.clock.now(),
        );
        tracing::debug!(
            mode = %self.options.mode,
            ascending = self.options.ascending,
            query = query.unwrap_or(""),
            visible = self.view.len(),
            "feed view recomputed"
        );
    }

    fn release_subscription(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.cancel();
            tracing::info!("event subscription cancelled");
        }
    }

    fn snapshot(&self) -> FeedState {
        FeedState {
            status: self.status.clone(),
            events: self.view.clone(),
            sort_mode: self.options.mode,
            ascending: self.options.ascending,
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.snapshot());
    }
}

async fn next_update(subscription: &mut Option<Subscription>) -> Option<SnapshotResult> {
    match subscription {
        Some(subscription) => subscription.next().await,
        None => std::future::pending().await,
    }
}
