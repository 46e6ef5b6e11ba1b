use futures::Stream;

use std::pin::Pin;

use crate::realtime::LiveEvent;
use crate::types::model::Notification;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type LiveStream = Pin<Box<dyn Stream<Item = LiveEvent> + Send>>;

/// Server view of one user's notifications.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub notifications: Vec<Notification>,
    pub unread: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("notification not found")]
    NotFound,
    #[error("notification service unavailable: {0}")]
    Unavailable(String),
}

/// Remote side of a client inbox, scoped to one signed-in user.
pub trait NotificationSource: Clone + Send + Sync + 'static {
    fn fetch_recent(&self) -> BoxFuture<'_, Result<Snapshot, SourceError>>;
    /// Open the live channel. The stream ends when the connection drops.
    fn connect(&self) -> BoxFuture<'_, Result<LiveStream, SourceError>>;
    fn mark_read<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), SourceError>>;
    fn mark_all_read(&self) -> BoxFuture<'_, Result<(), SourceError>>;
    fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), SourceError>>;
    fn delete_all(&self) -> BoxFuture<'_, Result<(), SourceError>>;
}
