use rusqlite::{Connection, OptionalExtension, Row};

use super::invalid_column;
use crate::db::{self, DbError, Result};
use crate::types::model::{Notification, NotificationKind};

const COLUMNS: &str =
    "id, recipient_id, document_id, title, message, kind, payload, read, created_at, updated_at";

/// Upper bound of a single listing.
pub const RECENT_LIMIT: usize = 50;

/// Notification contents shared by every recipient of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub document_id: Option<String>,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
}

pub fn insert(
    conn: &Connection,
    recipient_id: &str,
    notification: &NewNotification,
) -> Result<Notification> {
    let id = db::new_id();
    let now = db::now();
    let payload = serde_json::to_string(&notification.payload)
        .map_err(|err| DbError::Serialization(err.to_string()))?;
    conn.execute(
        "INSERT INTO notifications (id, recipient_id, document_id, title, message, kind, payload,
             read, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8, ?8)",
        rusqlite::params![
            id,
            recipient_id,
            notification.document_id,
            notification.title,
            notification.message,
            notification.kind.as_str(),
            payload,
            db::to_millis(now),
        ],
    )?;
    Ok(Notification {
        id,
        recipient_id: recipient_id.to_string(),
        document_id: notification.document_id.clone(),
        title: notification.title.clone(),
        message: notification.message.clone(),
        kind: notification.kind,
        payload: notification.payload.clone(),
        read: false,
        created_at: now,
        updated_at: now,
    })
}

/// Newest notifications of a recipient, at most [`RECENT_LIMIT`].
pub fn list_recent(conn: &Connection, recipient_id: &str, limit: usize) -> Result<Vec<Notification>> {
    let limit = limit.min(RECENT_LIMIT) as i64;
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM notifications WHERE recipient_id = ?1
         ORDER BY created_at DESC, rowid DESC LIMIT ?2"
    ))?;
    let rows = stmt
        .query_map(rusqlite::params![recipient_id, limit], notification_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get(conn: &Connection, recipient_id: &str, id: &str) -> Result<Option<Notification>> {
    let found = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM notifications WHERE id = ?1 AND recipient_id = ?2"),
            [id, recipient_id],
            notification_from_row,
        )
        .optional()?;
    Ok(found)
}

pub fn unread_count(conn: &Connection, recipient_id: &str) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND read = 0",
        [recipient_id],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Mark one notification read. Returns false when the recipient has no such row.
/// Already-read rows keep their `updated_at`.
pub fn mark_read(conn: &Connection, recipient_id: &str, id: &str) -> Result<bool> {
    let matched = conn.execute(
        "UPDATE notifications
         SET updated_at = CASE WHEN read = 0 THEN ?3 ELSE updated_at END, read = 1
         WHERE id = ?1 AND recipient_id = ?2",
        rusqlite::params![id, recipient_id, db::to_millis(db::now())],
    )?;
    Ok(matched > 0)
}

/// Returns the number of rows that changed from unread to read.
pub fn mark_all_read(conn: &Connection, recipient_id: &str) -> Result<usize> {
    let changed = conn.execute(
        "UPDATE notifications SET read = 1, updated_at = ?2 WHERE recipient_id = ?1 AND read = 0",
        rusqlite::params![recipient_id, db::to_millis(db::now())],
    )?;
    Ok(changed)
}

/// Delete one notification, returning the removed row.
pub fn delete(conn: &Connection, recipient_id: &str, id: &str) -> Result<Option<Notification>> {
    let Some(existing) = get(conn, recipient_id, id)? else {
        return Ok(None);
    };
    conn.execute(
        "DELETE FROM notifications WHERE id = ?1 AND recipient_id = ?2",
        [id, recipient_id],
    )?;
    Ok(Some(existing))
}

pub fn delete_all(conn: &Connection, recipient_id: &str) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM notifications WHERE recipient_id = ?1",
        [recipient_id],
    )?;
    Ok(deleted)
}

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<Notification> {
    let kind: String = row.get(5)?;
    let payload: String = row.get(6)?;
    Ok(Notification {
        id: row.get(0)?,
        recipient_id: row.get(1)?,
        document_id: row.get(2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        kind: NotificationKind::parse(&kind).ok_or_else(|| invalid_column(5, &kind))?,
        payload: serde_json::from_str(&payload).unwrap_or(serde_json::Value::Null),
        read: row.get(7)?,
        created_at: db::from_millis(row.get(8)?),
        updated_at: db::from_millis(row.get(9)?),
    })
}
