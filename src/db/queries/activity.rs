use rusqlite::{Connection, Row};

use crate::db::{self, DbError, Result};
use crate::types::model::Activity;

pub fn record(
    conn: &Connection,
    document_id: &str,
    actor_id: Option<&str>,
    action: &str,
    description: &str,
    metadata: Option<&serde_json::Value>,
) -> Result<Activity> {
    let id = db::new_id();
    let created_at = db::now();
    let metadata_text = metadata
        .map(serde_json::to_string)
        .transpose()
        .map_err(|err| DbError::Serialization(err.to_string()))?;
    conn.execute(
        "INSERT INTO document_activity (id, document_id, actor_id, action, description, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            id,
            document_id,
            actor_id,
            action,
            description,
            metadata_text,
            db::to_millis(created_at),
        ],
    )?;
    Ok(Activity {
        id,
        document_id: document_id.to_string(),
        actor_id: actor_id.map(str::to_string),
        action: action.to_string(),
        description: description.to_string(),
        metadata: metadata.cloned(),
        created_at,
    })
}

/// Audit trail of a document, newest first.
pub fn list(conn: &Connection, document_id: &str) -> Result<Vec<Activity>> {
    let mut stmt = conn.prepare(
        "SELECT id, document_id, actor_id, action, description, metadata, created_at
         FROM document_activity WHERE document_id = ?1 ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt
        .query_map([document_id], activity_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn activity_from_row(row: &Row<'_>) -> rusqlite::Result<Activity> {
    let metadata: Option<String> = row.get(5)?;
    Ok(Activity {
        id: row.get(0)?,
        document_id: row.get(1)?,
        actor_id: row.get(2)?,
        action: row.get(3)?,
        description: row.get(4)?,
        metadata: metadata.and_then(|raw| serde_json::from_str(&raw).ok()),
        created_at: db::from_millis(row.get(6)?),
    })
}
