use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::db::Store;
use crate::db::queries::subscriptions;
use crate::ports::push::{PushSendError, PushSender};
use crate::types::model::Notification;
use crate::types::push::PushPayload;

use super::payload::{build_payload, test_payload};

/// One payload addressed to every registration of one user.
#[derive(Debug, Clone)]
pub(crate) struct PushJob {
    pub(crate) recipient_id: String,
    pub(crate) payload: PushPayload,
}

impl From<&Notification> for PushJob {
    fn from(notification: &Notification) -> Self {
        Self {
            recipient_id: notification.recipient_id.clone(),
            payload: build_payload(notification),
        }
    }
}

/// Hands committed notifications to the background dispatcher.
#[derive(Clone, Default)]
pub struct PushQueue {
    sender: Option<mpsc::UnboundedSender<PushJob>>,
}

impl PushQueue {
    /// A queue that drops everything; used when push is not configured.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    pub fn enqueue(&self, notifications: &[Notification]) {
        for notification in notifications {
            if !self.push(PushJob::from(notification)) {
                return;
            }
        }
    }

    /// Queue a test message for `user_id`. Returns false when push is disabled.
    pub fn enqueue_test(&self, user_id: &str, message: &str) -> bool {
        self.push(PushJob {
            recipient_id: user_id.to_string(),
            payload: test_payload(message),
        })
    }

    fn push(&self, job: PushJob) -> bool {
        let Some(sender) = &self.sender else {
            return false;
        };
        if sender.send(job).is_err() {
            tracing::warn!("push dispatcher stopped; dropping queued notifications");
            return false;
        }
        true
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DeliveryReport {
    pub(crate) sent: usize,
    pub(crate) failed: usize,
    pub(crate) removed: usize,
}

#[derive(Clone)]
pub(crate) struct PushDispatcher<S> {
    store: Store,
    sender: S,
}

impl<S> PushDispatcher<S>
where
    S: PushSender,
{
    pub(crate) fn new(store: Store, sender: S) -> Self {
        Self { store, sender }
    }

    /// Start the delivery task. It ends once every [`PushQueue`] clone is dropped.
    pub(crate) fn spawn(self) -> (PushQueue, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<PushJob>();
        let handle = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                let report = self.deliver(&job).await;
                tracing::debug!(
                    recipient = %job.recipient_id,
                    sent = report.sent,
                    failed = report.failed,
                    removed = report.removed,
                    "push job delivered"
                );
            }
        });
        (
            PushQueue {
                sender: Some(sender),
            },
            handle,
        )
    }

    /// Send one job to every registration of its recipient. No retries.
    pub(crate) async fn deliver(&self, job: &PushJob) -> DeliveryReport {
        let recipient_id = job.recipient_id.as_str();
        let mut report = DeliveryReport::default();
        let registrations = {
            let conn = self.store.lock();
            subscriptions::list_for_user(&conn, recipient_id)
        };
        let registrations = match registrations {
            Ok(registrations) => registrations,
            Err(err) => {
                tracing::warn!(recipient = recipient_id, "failed to load push subscriptions: {err}");
                return report;
            }
        };
        if registrations.is_empty() {
            return report;
        }
        let body = match serde_json::to_string(&job.payload) {
            Ok(body) => body,
            Err(err) => {
                tracing::warn!("failed to encode push payload: {err}");
                return report;
            }
        };

        for registration in &registrations {
            match self.sender.send(registration, &body).await {
                Ok(()) => report.sent += 1,
                Err(PushSendError::Gone) => {
                    let removed = {
                        let conn = self.store.lock();
                        subscriptions::delete_by_id(&conn, &registration.id)
                    };
                    match removed {
                        Ok(_) => {
                            report.removed += 1;
                            tracing::info!(
                                recipient = recipient_id,
                                endpoint = %registration.endpoint,
                                "removed expired push subscription"
                            );
                        }
                        Err(err) => {
                            report.failed += 1;
                            tracing::warn!("failed to remove expired push subscription: {err}");
                        }
                    }
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        recipient = recipient_id,
                        endpoint = %registration.endpoint,
                        "push delivery error: {err}"
                    );
                }
            }
        }
        report
    }
}
