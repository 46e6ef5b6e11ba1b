//! In-process live channel for freshly inserted notifications.

use futures::Stream;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::types::model::Notification;

const DEFAULT_CAPACITY: usize = 256;

/// What a live subscriber observes.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    Inserted(Notification),
    /// Events were dropped for this subscriber; its cache must be reloaded.
    Lagged(u64),
}

#[derive(Clone)]
pub struct RealtimeHub {
    sender: broadcast::Sender<Arc<Notification>>,
    active: Arc<AtomicUsize>,
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl RealtimeHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publish committed notifications in insertion order.
    pub fn publish(&self, notifications: &[Notification]) {
        for notification in notifications {
            // No receivers is not an error: nobody is listening right now.
            let _ = self.sender.send(Arc::new(notification.clone()));
        }
    }

    /// Open a subscription scoped to `recipient_id`.
    pub fn subscribe(&self, recipient_id: &str) -> LiveSubscription {
        self.active.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(recipient = recipient_id, "live subscription opened");
        LiveSubscription {
            recipient_id: recipient_id.to_string(),
            receiver: Some(self.sender.subscribe()),
            active: Arc::clone(&self.active),
        }
    }

    pub fn active_subscriptions(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// A standing connection to the hub. Dropping it releases the slot.
pub struct LiveSubscription {
    recipient_id: String,
    receiver: Option<broadcast::Receiver<Arc<Notification>>>,
    active: Arc<AtomicUsize>,
}

impl LiveSubscription {
    pub fn recipient_id(&self) -> &str {
        &self.recipient_id
    }

    /// Next event for this recipient; `None` once the hub is gone or after `unsubscribe`.
    pub async fn recv(&mut self) -> Option<LiveEvent> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(notification) if notification.recipient_id == self.recipient_id => {
                    return Some(LiveEvent::Inserted(notification.as_ref().clone()));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => return Some(LiveEvent::Lagged(skipped)),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn unsubscribe(&mut self) {
        if self.receiver.take().is_some() {
            self.active.fetch_sub(1, Ordering::SeqCst);
            tracing::debug!(recipient = %self.recipient_id, "live subscription closed");
        }
    }

    /// Consume the subscription as a stream; the slot is released when the stream drops.
    pub fn into_stream(self) -> impl Stream<Item = LiveEvent> + Send + 'static {
        futures::stream::unfold(self, |mut subscription| async move {
            let event = subscription.recv().await?;
            Some((event, subscription))
        })
    }
}

impl Drop for LiveSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::db;
    use crate::types::model::NotificationKind;
    use futures::StreamExt;

    fn notification(id: &str, recipient: &str) -> Notification {
        let now = db::now();
        Notification {
            id: id.to_string(),
            recipient_id: recipient.to_string(),
            document_id: None,
            title: "Title".to_string(),
            message: "Message".to_string(),
            kind: NotificationKind::StatusUpdated,
            payload: serde_json::Value::Null,
            read: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn recv__should_only_deliver_own_notifications_in_order() {
        // Given
        let hub = RealtimeHub::default();
        let mut ada = hub.subscribe("ada");

        // When
        hub.publish(&[
            notification("1", "bob"),
            notification("2", "ada"),
            notification("3", "ada"),
        ]);

        // Then
        let first = ada.recv().await.expect("first event");
        let second = ada.recv().await.expect("second event");
        assert!(matches!(first, LiveEvent::Inserted(ref n) if n.id == "2"));
        assert!(matches!(second, LiveEvent::Inserted(ref n) if n.id == "3"));
    }

    #[tokio::test]
    async fn recv__should_report_lag_when_buffer_overflows() {
        // Given
        let hub = RealtimeHub::new(2);
        let mut ada = hub.subscribe("ada");

        // When
        hub.publish(&[
            notification("1", "ada"),
            notification("2", "ada"),
            notification("3", "ada"),
        ]);

        // Then
        assert_eq!(ada.recv().await, Some(LiveEvent::Lagged(1)));
    }

    #[test]
    fn unsubscribe__should_release_slot_on_drop() {
        // Given
        let hub = RealtimeHub::default();
        let first = hub.subscribe("ada");
        let mut second = hub.subscribe("bob");
        assert_eq!(hub.active_subscriptions(), 2);

        // When
        second.unsubscribe();
        second.unsubscribe();
        drop(first);

        // Then
        assert_eq!(hub.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn into_stream__should_release_slot_when_stream_drops() {
        // Given
        let hub = RealtimeHub::default();
        let stream = hub.subscribe("ada").into_stream();
        assert_eq!(hub.active_subscriptions(), 1);
        hub.publish(&[notification("1", "ada")]);
        let mut stream = Box::pin(stream);

        // When
        let event = stream.next().await;
        drop(stream);

        // Then
        assert!(matches!(event, Some(LiveEvent::Inserted(ref n)) if n.id == "1"));
        assert_eq!(hub.active_subscriptions(), 0);
    }
}
