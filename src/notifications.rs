//! Per-user notification operations and post-commit delivery.

use serde::Deserialize;
use serde_json::json;

use crate::db::{DbError, Store};
use crate::db::queries::notifications::{self, NewNotification, RECENT_LIMIT};
use crate::db::queries::{documents, subscriptions, users};
use crate::error::{ServiceError, ServiceResult};
use crate::fanout;
use crate::push::PushQueue;
use crate::realtime::{LiveSubscription, RealtimeHub};
use crate::types::model::{Notification, NotificationKind, User};
use crate::types::push::Subscription;

#[derive(Debug, Clone, Deserialize)]
pub struct AdminNotice {
    pub title: String,
    pub message: String,
    /// Single recipient; everyone but the sender when absent.
    #[serde(default)]
    pub recipient_id: Option<String>,
    #[serde(default)]
    pub document_id: Option<String>,
}

#[derive(Clone)]
pub struct NotificationService {
    store: Store,
    hub: RealtimeHub,
    push: PushQueue,
}

impl NotificationService {
    pub fn new(store: Store, hub: RealtimeHub, push: PushQueue) -> Self {
        Self { store, hub, push }
    }

    pub fn push_enabled(&self) -> bool {
        self.push.is_enabled()
    }

    /// Hand committed rows to live subscribers and to the push dispatcher.
    pub(crate) fn deliver(&self, inserted: &[Notification]) {
        if inserted.is_empty() {
            return;
        }
        tracing::debug!(count = inserted.len(), "delivering notifications");
        self.hub.publish(inserted);
        self.push.enqueue(inserted);
    }

    pub fn subscribe_live(&self, user: &User) -> LiveSubscription {
        self.hub.subscribe(&user.id)
    }

    /// Newest first; `limit` is clamped to the recent window.
    pub fn list_recent(&self, user: &User, limit: Option<usize>) -> ServiceResult<Vec<Notification>> {
        let limit = limit.unwrap_or(RECENT_LIMIT).min(RECENT_LIMIT);
        let conn = self.store.lock();
        Ok(notifications::list_recent(&conn, &user.id, limit)?)
    }

    pub fn unread_count(&self, user: &User) -> ServiceResult<u64> {
        let conn = self.store.lock();
        Ok(notifications::unread_count(&conn, &user.id)?)
    }

    /// Idempotent; someone else's notification reads as missing.
    pub fn mark_read(&self, user: &User, id: &str) -> ServiceResult<()> {
        let conn = self.store.lock();
        if notifications::mark_read(&conn, &user.id, id)? {
            Ok(())
        } else {
            Err(ServiceError::NotFound)
        }
    }

    pub fn mark_all_read(&self, user: &User) -> ServiceResult<usize> {
        let conn = self.store.lock();
        Ok(notifications::mark_all_read(&conn, &user.id)?)
    }

    pub fn delete(&self, user: &User, id: &str) -> ServiceResult<Notification> {
        let conn = self.store.lock();
        notifications::delete(&conn, &user.id, id)?.ok_or(ServiceError::NotFound)
    }

    pub fn delete_all(&self, user: &User) -> ServiceResult<usize> {
        let conn = self.store.lock();
        Ok(notifications::delete_all(&conn, &user.id)?)
    }

    /// Register or refresh a browser endpoint for `user`.
    pub fn subscribe_push(
        &self,
        user: &User,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
    ) -> ServiceResult<Subscription> {
        let (endpoint, p256dh, auth) = (endpoint.trim(), p256dh.trim(), auth.trim());
        if endpoint.is_empty() || p256dh.is_empty() || auth.is_empty() {
            return Err(ServiceError::validation(
                "endpoint, p256dh, and auth are required.",
            ));
        }
        let conn = self.store.lock();
        let subscription = subscriptions::upsert(&conn, &user.id, endpoint, p256dh, auth)?;
        tracing::info!(user = %user.id, "push subscription stored");
        Ok(subscription)
    }

    pub fn unsubscribe_push(&self, user: &User, endpoint: &str) -> ServiceResult<()> {
        let conn = self.store.lock();
        if subscriptions::delete(&conn, &user.id, endpoint.trim())? {
            Ok(())
        } else {
            Err(ServiceError::NotFound)
        }
    }

    /// Queue a test push to the caller's own registrations.
    pub fn send_test_push(&self, user: &User, message: &str) -> ServiceResult<()> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ServiceError::validation("message must not be empty."));
        }
        if !self.push.enqueue_test(&user.id, message) {
            return Err(ServiceError::validation(
                "Push notifications are not configured.",
            ));
        }
        Ok(())
    }

    /// Administrative broadcast; non-admins are told the target does not exist.
    pub fn admin_notify(
        &self,
        actor: &User,
        notice: &AdminNotice,
    ) -> ServiceResult<Vec<Notification>> {
        if !actor.is_admin() {
            return Err(ServiceError::NotFound);
        }
        let title = notice.title.trim();
        let message = notice.message.trim();
        if title.is_empty() || message.is_empty() {
            return Err(ServiceError::validation("title and message are required."));
        }

        let draft = NewNotification {
            document_id: notice.document_id.clone(),
            title: title.to_string(),
            message: message.to_string(),
            kind: NotificationKind::StatusUpdated,
            payload: json!({
                "actor_id": actor.id,
                "actor_name": actor.display_name,
                "document_id": notice.document_id,
            }),
        };

        let inserted = {
            let mut conn = self.store.lock();
            let tx = conn.transaction()?;
            if let Some(document_id) = notice.document_id.as_deref() {
                match documents::get(&tx, document_id) {
                    Ok(_) => {}
                    Err(DbError::NotFound(_)) => {
                        return Err(ServiceError::validation("Unknown document."));
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            let inserted = match notice.recipient_id.as_deref() {
                Some(recipient_id) => {
                    users::get(&tx, recipient_id)?;
                    vec![fanout::notify_user(&tx, recipient_id, &draft)?]
                }
                None => fanout::notify_all_except(&tx, &draft, Some(&actor.id))?,
            };
            tx.commit()?;
            inserted
        };
        tracing::info!(actor = %actor.id, count = inserted.len(), "admin notification sent");
        self.deliver(&inserted);
        Ok(inserted)
    }
}
