//! Client-side mirror of one user's notifications.
//!
//! [`NotificationInbox`] is a plain cache merged by notification id, so an
//! optimistic local change and a live event for the same row converge in
//! either order. [`InboxSync`] keeps it fed from a [`NotificationSource`]:
//! it holds one live connection, reloads the full list after every
//! (re)connect and backs off exponentially between failed attempts.

use futures::StreamExt;
use time::OffsetDateTime;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::db::queries::notifications::RECENT_LIMIT;
use crate::ports::inbox::{NotificationSource, Snapshot, SourceError};
use crate::ports::time::TimeProvider;
use crate::realtime::LiveEvent;
use crate::types::model::Notification;

#[derive(Debug, Clone, Default)]
pub struct NotificationInbox {
    items: Vec<Notification>,
    unread: u64,
    /// Marked read locally before the row itself was seen.
    pending_read: HashSet<String>,
    /// Deleted locally; a late live event must not bring these back.
    deleted: HashSet<String>,
    /// Rows created at or before this instant were covered by "mark all read".
    read_through: Option<OffsetDateTime>,
    /// Rows created at or before this instant were covered by "delete all".
    deleted_through: Option<OffsetDateTime>,
    last_synced_at: Option<OffsetDateTime>,
}

impl NotificationInbox {
    /// Newest first, at most the recent window.
    pub fn notifications(&self) -> &[Notification] {
        &self.items
    }

    pub fn unread(&self) -> u64 {
        self.unread
    }

    pub fn last_synced_at(&self) -> Option<OffsetDateTime> {
        self.last_synced_at
    }

    /// Replace everything with the server's view.
    pub fn reload(&mut self, snapshot: Snapshot, at: OffsetDateTime) {
        let mut items = snapshot.notifications;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items.truncate(RECENT_LIMIT);
        self.items = items;
        self.unread = snapshot.unread;
        self.pending_read.clear();
        self.deleted.clear();
        self.read_through = None;
        self.deleted_through = None;
        self.last_synced_at = Some(at);
    }

    /// Merge a row delivered by the live channel. Returns true when it was new.
    pub fn apply_live(&mut self, mut notification: Notification) -> bool {
        if self.deleted.contains(&notification.id)
            || covered(self.deleted_through, &notification)
        {
            return false;
        }
        notification.read |= covered(self.read_through, &notification);
        if let Some(existing) = self.items.iter_mut().find(|n| n.id == notification.id) {
            // Read is monotonic: a stale unread copy never reopens a row.
            let was_unread = !existing.read;
            notification.read |= existing.read;
            *existing = notification;
            if was_unread && existing.read {
                self.unread = self.unread.saturating_sub(1);
            }
            return false;
        }

        notification.read |= self.pending_read.remove(&notification.id);
        if !notification.read {
            self.unread += 1;
        }
        let position = self
            .items
            .iter()
            .position(|n| n.created_at <= notification.created_at)
            .unwrap_or(self.items.len());
        self.items.insert(position, notification);
        self.items.truncate(RECENT_LIMIT);
        true
    }

    /// Optimistic read. Idempotent; never increases the counter.
    pub fn mark_read(&mut self, id: &str) {
        match self.items.iter_mut().find(|n| n.id == id) {
            Some(notification) if !notification.read => {
                notification.read = true;
                self.unread = self.unread.saturating_sub(1);
            }
            Some(_) => {}
            None => {
                self.pending_read.insert(id.to_string());
            }
        }
    }

    /// Optimistic "mark all read" issued at `at`. Rows the live channel
    /// delivers later but that were created by then arrive already read.
    pub fn mark_all_read(&mut self, at: OffsetDateTime) {
        for notification in &mut self.items {
            notification.read = true;
        }
        self.unread = 0;
        self.read_through = self.read_through.max(Some(at));
    }

    pub fn delete(&mut self, id: &str) -> Option<Notification> {
        self.deleted.insert(id.to_string());
        self.pending_read.remove(id);
        let index = self.items.iter().position(|n| n.id == id)?;
        let removed = self.items.remove(index);
        if !removed.read {
            self.unread = self.unread.saturating_sub(1);
        }
        Some(removed)
    }

    pub fn delete_all(&mut self, at: OffsetDateTime) {
        self.deleted.extend(self.items.drain(..).map(|n| n.id));
        self.pending_read.clear();
        self.unread = 0;
        self.deleted_through = self.deleted_through.max(Some(at));
    }
}

fn covered(watermark: Option<OffsetDateTime>, notification: &Notification) -> bool {
    watermark.is_some_and(|at| notification.created_at <= at)
}

/// Exponential backoff between live reconnect attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub max: Duration,
    pub factor: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(30),
            factor: 2,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before attempt number `attempt` (0-based) after a failure.
    pub fn delay(&self, attempt: u32) -> Duration {
        let multiplier = self.factor.max(1).checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial
            .checked_mul(multiplier)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

pub struct InboxSync<S, T> {
    source: S,
    time: T,
    policy: ReconnectPolicy,
}

impl<S, T> InboxSync<S, T>
where
    S: NotificationSource,
    T: TimeProvider,
{
    pub fn new(source: S, time: T) -> Self {
        Self {
            source,
            time,
            policy: ReconnectPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Start the sync task. Dropping the handle stops it as well.
    pub fn spawn(self) -> InboxHandle<S, T> {
        let shared = SharedInbox::default();
        let (stop, stopped) = oneshot::channel();
        let worker = SyncWorker {
            source: self.source.clone(),
            time: self.time.clone(),
            policy: self.policy,
            inbox: shared.clone(),
        };
        let task = tokio::spawn(worker.run(stopped));
        InboxHandle {
            source: self.source,
            time: self.time,
            inbox: shared,
            stop: Some(stop),
            task: Some(task),
        }
    }
}

#[derive(Clone, Default)]
struct SharedInbox(Arc<Mutex<NotificationInbox>>);

impl SharedInbox {
    fn lock(&self) -> MutexGuard<'_, NotificationInbox> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct SyncWorker<S, T> {
    source: S,
    time: T,
    policy: ReconnectPolicy,
    inbox: SharedInbox,
}

impl<S, T> SyncWorker<S, T>
where
    S: NotificationSource,
    T: TimeProvider,
{
    async fn run(self, mut stop: oneshot::Receiver<()>) {
        let mut attempt = 0u32;
        loop {
            let connected = tokio::select! {
                _ = &mut stop => return,
                connected = self.source.connect() => connected,
            };
            match connected {
                Ok(mut stream) => {
                    attempt = 0;
                    tracing::debug!("live channel connected");
                    self.reload().await;
                    loop {
                        let event = tokio::select! {
                            _ = &mut stop => return,
                            event = stream.next() => event,
                        };
                        match event {
                            Some(LiveEvent::Inserted(notification)) => {
                                self.inbox.lock().apply_live(notification);
                            }
                            Some(LiveEvent::Lagged(skipped)) => {
                                tracing::warn!(skipped, "live channel lagged; reloading");
                                self.reload().await;
                            }
                            None => break,
                        }
                    }
                    tracing::info!("live channel closed");
                }
                Err(err) => tracing::warn!("live channel connect failed: {err}"),
            }

            let delay = self.policy.delay(attempt);
            attempt = attempt.saturating_add(1);
            tokio::select! {
                _ = &mut stop => return,
                _ = self.time.sleep(delay) => {}
            }
        }
    }

    async fn reload(&self) {
        match self.source.fetch_recent().await {
            Ok(snapshot) => self.inbox.lock().reload(snapshot, self.time.now()),
            Err(err) => tracing::warn!("notification reload failed: {err}"),
        }
    }
}

/// Owner of a running [`InboxSync`] task.
pub struct InboxHandle<S, T> {
    source: S,
    time: T,
    inbox: SharedInbox,
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl<S, T> InboxHandle<S, T>
where
    S: NotificationSource,
    T: TimeProvider,
{
    pub fn unread(&self) -> u64 {
        self.inbox.lock().unread()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.inbox.lock().notifications().to_vec()
    }

    pub fn inbox(&self) -> NotificationInbox {
        self.inbox.lock().clone()
    }

    /// Full reload from the source, correcting any drift.
    pub async fn refresh(&self) -> Result<(), SourceError> {
        let snapshot = self.source.fetch_recent().await?;
        self.inbox.lock().reload(snapshot, self.time.now());
        Ok(())
    }

    pub async fn mark_read(&self, id: &str) -> Result<(), SourceError> {
        self.inbox.lock().mark_read(id);
        let result = self.source.mark_read(id).await;
        self.settle(result).await
    }

    pub async fn mark_all_read(&self) -> Result<(), SourceError> {
        self.inbox.lock().mark_all_read(self.time.now());
        let result = self.source.mark_all_read().await;
        self.settle(result).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), SourceError> {
        self.inbox.lock().delete(id);
        let result = self.source.delete(id).await;
        self.settle(result).await
    }

    pub async fn delete_all(&self) -> Result<(), SourceError> {
        self.inbox.lock().delete_all(self.time.now());
        let result = self.source.delete_all().await;
        self.settle(result).await
    }

    /// A rejected optimistic change is undone by reloading; the error still surfaces.
    async fn settle(&self, result: Result<(), SourceError>) -> Result<(), SourceError> {
        if let Err(err) = result {
            if let Err(reload_err) = self.refresh().await {
                tracing::warn!("notification reload failed: {reload_err}");
            }
            return Err(err);
        }
        Ok(())
    }

    /// Close the live connection and wait for the task to finish.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(err) = task.await
        {
            tracing::warn!("inbox sync task failed: {err}");
        }
    }
}

impl<S, T> Drop for InboxHandle<S, T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::db;
    use crate::ports::inbox::{BoxFuture, LiveStream};
    use crate::types::model::NotificationKind;
    use futures::channel::mpsc;
    use std::collections::VecDeque;

    fn notification(id: &str, created_millis: i64, read: bool) -> Notification {
        let at = db::from_millis(created_millis);
        Notification {
            id: id.to_string(),
            recipient_id: "ada".to_string(),
            document_id: None,
            title: "Title".to_string(),
            message: format!("message {id}"),
            kind: NotificationKind::DocumentCreated,
            payload: serde_json::Value::Null,
            read,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn apply_live__should_converge_with_optimistic_read_in_either_order() {
        // Given
        let row = notification("n-1", 1_000, false);
        let mut live_first = NotificationInbox::default();
        let mut read_first = NotificationInbox::default();

        // When
        live_first.apply_live(row.clone());
        live_first.mark_read("n-1");
        read_first.mark_read("n-1");
        read_first.apply_live(row);

        // Then
        assert_eq!(live_first.notifications(), read_first.notifications());
        assert_eq!(live_first.unread(), 0);
        assert_eq!(read_first.unread(), 0);
        assert!(read_first.notifications()[0].read);
    }

    #[test]
    fn apply_live__should_merge_duplicates_by_id() {
        let mut inbox = NotificationInbox::default();

        assert!(inbox.apply_live(notification("n-1", 1_000, false)));
        assert!(!inbox.apply_live(notification("n-1", 1_000, false)));

        assert_eq!(inbox.notifications().len(), 1);
        assert_eq!(inbox.unread(), 1);
    }

    #[test]
    fn apply_live__should_keep_newest_first_and_cap_window() {
        // Given
        let mut inbox = NotificationInbox::default();

        // When
        for i in 0..(RECENT_LIMIT as i64 + 5) {
            inbox.apply_live(notification(&format!("n-{i}"), 1_000 + i, false));
        }
        inbox.apply_live(notification("late", 500, false));

        // Then
        assert_eq!(inbox.notifications().len(), RECENT_LIMIT);
        assert_eq!(inbox.notifications()[0].id, format!("n-{}", RECENT_LIMIT + 4));
        assert_eq!(inbox.unread(), RECENT_LIMIT as u64 + 6);
    }

    #[test]
    fn mark_read__should_be_idempotent() {
        let mut inbox = NotificationInbox::default();
        inbox.apply_live(notification("n-1", 1_000, false));
        inbox.apply_live(notification("n-2", 2_000, false));

        inbox.mark_read("n-1");
        inbox.mark_read("n-1");

        assert_eq!(inbox.unread(), 1);
    }

    #[test]
    fn delete__should_not_be_undone_by_late_live_event() {
        // Given
        let mut inbox = NotificationInbox::default();
        inbox.apply_live(notification("n-1", 1_000, false));

        // When
        inbox.delete("n-1");
        inbox.apply_live(notification("n-1", 1_000, false));

        // Then
        assert!(inbox.notifications().is_empty());
        assert_eq!(inbox.unread(), 0);
    }

    #[test]
    fn delete_all__should_zero_counter() {
        let mut inbox = NotificationInbox::default();
        inbox.reload(
            Snapshot {
                notifications: vec![notification("n-1", 1_000, false)],
                unread: 70,
            },
            db::now(),
        );

        inbox.delete_all(db::now());

        assert_eq!(inbox.unread(), 0);
        assert!(inbox.notifications().is_empty());
    }

    #[test]
    fn mark_all_read__should_converge_with_late_live_event_in_either_order() {
        // Given
        let older = notification("n-1", 1_000, false);
        let unseen = notification("n-2", 2_000, false);
        let mut read_first = NotificationInbox::default();
        let mut live_first = NotificationInbox::default();

        // When
        read_first.apply_live(older.clone());
        read_first.mark_all_read(db::from_millis(3_000));
        read_first.apply_live(unseen.clone());
        live_first.apply_live(older);
        live_first.apply_live(unseen);
        live_first.mark_all_read(db::from_millis(3_000));

        // Then
        assert_eq!(read_first.notifications(), live_first.notifications());
        assert_eq!(read_first.unread(), 0);
        assert_eq!(live_first.unread(), 0);
    }

    #[test]
    fn mark_all_read__should_leave_newer_rows_unread() {
        // Given
        let mut inbox = NotificationInbox::default();
        inbox.apply_live(notification("n-1", 1_000, false));

        // When
        inbox.mark_all_read(db::from_millis(3_000));
        inbox.apply_live(notification("n-2", 4_000, false));

        // Then
        assert_eq!(inbox.unread(), 1);
        assert!(!inbox.notifications()[0].read);
    }

    #[test]
    fn delete_all__should_drop_late_rows_created_before_it() {
        // Given
        let mut inbox = NotificationInbox::default();
        inbox.apply_live(notification("n-1", 1_000, false));

        // When
        inbox.delete_all(db::from_millis(3_000));
        let stale = inbox.apply_live(notification("n-2", 2_000, false));
        let fresh = inbox.apply_live(notification("n-3", 4_000, false));

        // Then
        assert!(!stale);
        assert!(fresh);
        let ids: Vec<&str> = inbox.notifications().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["n-3"]);
        assert_eq!(inbox.unread(), 1);
    }

    #[test]
    fn reload__should_clear_bulk_watermarks() {
        // Given
        let mut inbox = NotificationInbox::default();
        inbox.mark_all_read(db::from_millis(3_000));
        inbox.delete_all(db::from_millis(3_000));

        // When
        inbox.reload(Snapshot::default(), db::from_millis(5_000));
        inbox.apply_live(notification("n-1", 2_000, false));

        // Then
        assert_eq!(inbox.notifications().len(), 1);
        assert_eq!(inbox.unread(), 1);
    }

    #[test]
    fn delay__should_double_from_half_second_up_to_cap() {
        // Given
        let policy = ReconnectPolicy::default();

        // When
        let delays: Vec<Duration> = (0..8).map(|attempt| policy.delay(attempt)).collect();

        // Then
        assert_eq!(delays[0], Duration::from_millis(500));
        assert_eq!(delays[1], Duration::from_secs(1));
        assert_eq!(delays[2], Duration::from_secs(2));
        assert_eq!(delays[5], Duration::from_secs(16));
        assert_eq!(delays[6], Duration::from_secs(30));
        assert_eq!(policy.delay(200), Duration::from_secs(30));
    }

    enum Connect {
        Fail,
        Stream(mpsc::UnboundedReceiver<LiveEvent>),
    }

    #[derive(Default)]
    struct SourceState {
        snapshot: Snapshot,
        connects: VecDeque<Connect>,
        fetches: usize,
        marked: Vec<String>,
        reject_writes: bool,
    }

    #[derive(Clone, Default)]
    struct FakeSource(Arc<Mutex<SourceState>>);

    impl FakeSource {
        fn state(&self) -> MutexGuard<'_, SourceState> {
            self.0.lock().expect("source lock")
        }

        fn write(&self, id: String) -> BoxFuture<'_, Result<(), SourceError>> {
            let mut state = self.state();
            let result = if state.reject_writes {
                Err(SourceError::Unavailable("offline".to_string()))
            } else {
                state.marked.push(id);
                Ok(())
            };
            Box::pin(std::future::ready(result))
        }
    }

    impl NotificationSource for FakeSource {
        fn fetch_recent(&self) -> BoxFuture<'_, Result<Snapshot, SourceError>> {
            let mut state = self.state();
            state.fetches += 1;
            Box::pin(std::future::ready(Ok(state.snapshot.clone())))
        }

        fn connect(&self) -> BoxFuture<'_, Result<LiveStream, SourceError>> {
            let next = self.state().connects.pop_front();
            let result = match next {
                Some(Connect::Fail) => Err(SourceError::Unavailable("refused".to_string())),
                Some(Connect::Stream(receiver)) => Ok(Box::pin(receiver) as LiveStream),
                None => Ok(Box::pin(futures::stream::pending::<LiveEvent>()) as LiveStream),
            };
            Box::pin(std::future::ready(result))
        }

        fn mark_read<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), SourceError>> {
            self.write(format!("read:{id}"))
        }

        fn mark_all_read(&self) -> BoxFuture<'_, Result<(), SourceError>> {
            self.write("read:*".to_string())
        }

        fn delete<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<(), SourceError>> {
            self.write(format!("delete:{id}"))
        }

        fn delete_all(&self) -> BoxFuture<'_, Result<(), SourceError>> {
            self.write("delete:*".to_string())
        }
    }

    #[derive(Clone, Default)]
    struct FakeTime {
        sleeps: Arc<Mutex<Vec<Duration>>>,
    }

    impl TimeProvider for FakeTime {
        type Sleep<'a>
            = std::future::Ready<()>
        where
            Self: 'a;

        fn now(&self) -> OffsetDateTime {
            db::from_millis(42_000)
        }

        fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
            self.sleeps.lock().expect("sleeps lock").push(duration);
            std::future::ready(())
        }
    }

    async fn eventually(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn spawn__should_reload_on_connect_and_apply_live_events() {
        // Given
        let source = FakeSource::default();
        let (live, receiver) = mpsc::unbounded();
        {
            let mut state = source.state();
            state.snapshot = Snapshot {
                notifications: vec![notification("n-1", 1_000, false)],
                unread: 1,
            };
            state.connects.push_back(Connect::Stream(receiver));
        }
        let handle = InboxSync::new(source.clone(), FakeTime::default()).spawn();
        eventually(|| handle.unread() == 1).await;

        // When
        live.unbounded_send(LiveEvent::Inserted(notification("n-2", 2_000, false)))
            .expect("send live event");

        // Then
        eventually(|| handle.unread() == 2).await;
        let ids: Vec<String> = handle.notifications().into_iter().map(|n| n.id).collect();
        assert_eq!(ids, vec!["n-2".to_string(), "n-1".to_string()]);
        assert_eq!(handle.inbox().last_synced_at(), Some(db::from_millis(42_000)));
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn spawn__should_reload_when_live_channel_lags() {
        // Given
        let source = FakeSource::default();
        let (live, receiver) = mpsc::unbounded();
        source.state().connects.push_back(Connect::Stream(receiver));
        let handle = InboxSync::new(source.clone(), FakeTime::default()).spawn();
        eventually(|| source.state().fetches == 1).await;

        // When
        live.unbounded_send(LiveEvent::Lagged(3)).expect("send lag");

        // Then
        eventually(|| source.state().fetches == 2).await;
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn spawn__should_back_off_and_reset_after_connecting() {
        // Given
        let source = FakeSource::default();
        let (live, receiver) = mpsc::unbounded::<LiveEvent>();
        drop(live);
        {
            let mut state = source.state();
            state.connects.push_back(Connect::Fail);
            state.connects.push_back(Connect::Fail);
            state.connects.push_back(Connect::Stream(receiver));
        }
        let time = FakeTime::default();

        // When
        let handle = InboxSync::new(source.clone(), time.clone()).spawn();
        eventually(|| source.state().fetches == 2).await;

        // Then
        let sleeps = time.sleeps.lock().expect("sleeps lock").clone();
        assert_eq!(
            sleeps,
            vec![
                Duration::from_millis(500),
                Duration::from_secs(1),
                Duration::from_millis(500),
            ]
        );
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn with_policy__should_drive_reconnect_delays() {
        // Given
        let source = FakeSource::default();
        {
            let mut state = source.state();
            state.connects.push_back(Connect::Fail);
            state.connects.push_back(Connect::Fail);
        }
        let time = FakeTime::default();
        let policy = ReconnectPolicy {
            initial: Duration::from_millis(100),
            max: Duration::from_millis(250),
            factor: 3,
        };

        // When
        let handle = InboxSync::new(source.clone(), time.clone())
            .with_policy(policy)
            .spawn();
        eventually(|| source.state().fetches == 1).await;

        // Then
        let sleeps = time.sleeps.lock().expect("sleeps lock").clone();
        assert_eq!(
            sleeps,
            vec![Duration::from_millis(100), Duration::from_millis(250)]
        );
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn mark_read__should_apply_locally_and_forward() {
        // Given
        let source = FakeSource::default();
        source.state().snapshot = Snapshot {
            notifications: vec![notification("n-1", 1_000, false)],
            unread: 1,
        };
        let handle = InboxSync::new(source.clone(), FakeTime::default()).spawn();
        eventually(|| handle.unread() == 1).await;

        // When
        handle.mark_read("n-1").await.expect("mark read");

        // Then
        assert_eq!(handle.unread(), 0);
        assert_eq!(source.state().marked, vec!["read:n-1".to_string()]);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn delete__should_reload_when_source_rejects() {
        // Given
        let source = FakeSource::default();
        source.state().snapshot = Snapshot {
            notifications: vec![notification("n-1", 1_000, false)],
            unread: 1,
        };
        let handle = InboxSync::new(source.clone(), FakeTime::default()).spawn();
        eventually(|| handle.unread() == 1).await;
        source.state().reject_writes = true;

        // When
        let result = handle.delete("n-1").await;

        // Then
        assert!(matches!(result, Err(SourceError::Unavailable(_))));
        assert_eq!(handle.unread(), 1);
        assert_eq!(handle.notifications().len(), 1);
        handle.shutdown().await;
    }
}
