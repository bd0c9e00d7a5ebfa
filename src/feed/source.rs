//! Collaborators consumed by the feed: a live event source and the
//! signed-in user.

use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::Stream;
use thiserror::Error;

use crate::core::Event;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("event source unavailable: {0}")]
    Unavailable(String),
    #[error("event storage error: {0}")]
    Storage(String),
    #[error("event source closed")]
    Closed,
}

pub type SnapshotResult = Result<Vec<Event>, SourceError>;

/// A push-based feed of full event snapshots.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Open a live subscription. Every `Ok` item is the complete current set
    /// of events. An `Err` item ends the subscription.
    async fn subscribe(&self) -> Result<Subscription, SourceError>;
}

type CancelHook = Box<dyn FnOnce() + Send>;

/// A live snapshot stream that is cancelled exactly once, either by
/// [`Subscription::cancel`] or on drop.
pub struct Subscription {
    stream: BoxStream<'static, SnapshotResult>,
    on_cancel: Option<CancelHook>,
}

impl Subscription {
    pub fn new(stream: BoxStream<'static, SnapshotResult>) -> Self {
        Self {
            stream,
            on_cancel: None,
        }
    }

    /// Run `hook` when the subscription is cancelled or dropped.
    pub fn on_cancel(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_cancel = Some(Box::new(hook));
        self
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Stream for Subscription {
    type Item = SnapshotResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.stream.as_mut().poll_next(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hook) = self.on_cancel.take() {
            hook();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("cancel_pending", &self.on_cancel.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Current user
// ---------------------------------------------------------------------------

pub trait CurrentUser: Send + Sync {
    /// `None` when signed out.
    fn current_user_id(&self) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
pub struct FixedUser(pub Option<String>);

impl FixedUser {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self(Some(user_id.into()))
    }

    pub fn signed_out() -> Self {
        Self(None)
    }
}

impl CurrentUser for FixedUser {
    fn current_user_id(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Signed-in user that can change while the feed is running.
#[derive(Debug, Clone, Default)]
pub struct SessionUser {
    inner: Arc<RwLock<Option<String>>>,
}

impl SessionUser {
    pub fn new(user_id: Option<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(user_id)),
        }
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        tracing::info!(%user_id, "user signed in");
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = Some(user_id);
    }

    pub fn sign_out(&self) {
        tracing::info!("user signed out");
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl CurrentUser for SessionUser {
    fn current_user_id(&self) -> Option<String> {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
