use rusqlite::{Connection, Row};
use time::OffsetDateTime;

use super::{invalid_column, not_found};
use crate::db::{self, Result};
use crate::types::model::{Approval, Attachment, Document, DocumentStatus};

const COLUMNS: &str = "id, name, description, file_url, file_name, created_by, \
    requires_approval, approval, approved_by, approved_at, status, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub name: String,
    pub description: String,
    pub attachment: Option<Attachment>,
    pub created_by: String,
    pub requires_approval: bool,
}

pub fn insert(conn: &Connection, document: &NewDocument) -> Result<Document> {
    let id = db::new_id();
    let now = db::now();
    let (file_url, file_name) = match &document.attachment {
        Some(attachment) => (Some(attachment.url.as_str()), Some(attachment.name.as_str())),
        None => (None, None),
    };
    conn.execute(
        "INSERT INTO documents (id, name, description, file_url, file_name, created_by,
             requires_approval, approval, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'unreviewed', 'pending', ?8, ?8)",
        rusqlite::params![
            id,
            document.name,
            document.description,
            file_url,
            file_name,
            document.created_by,
            document.requires_approval,
            db::to_millis(now),
        ],
    )?;
    Ok(Document {
        id,
        name: document.name.clone(),
        description: document.description.clone(),
        attachment: document.attachment.clone(),
        created_by: document.created_by.clone(),
        requires_approval: document.requires_approval,
        approval: Approval::Unreviewed,
        approved_by: None,
        approved_at: None,
        status: DocumentStatus::Pending,
        created_at: now,
        updated_at: now,
    })
}

pub fn get(conn: &Connection, id: &str) -> Result<Document> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM documents WHERE id = ?1"),
        [id],
        document_from_row,
    )
    .map_err(not_found("document"))
}

/// All documents, newest first.
pub fn list(conn: &Connection) -> Result<Vec<Document>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM documents ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt
        .query_map([], document_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn set_approval(
    conn: &Connection,
    id: &str,
    approval: Approval,
    approver: Option<&str>,
    at: OffsetDateTime,
) -> Result<()> {
    let approved_at = approver.map(|_| db::to_millis(at));
    conn.execute(
        "UPDATE documents SET approval = ?2, approved_by = ?3, approved_at = ?4, updated_at = ?5
         WHERE id = ?1",
        rusqlite::params![
            id,
            approval.as_str(),
            approver,
            approved_at,
            db::to_millis(at)
        ],
    )?;
    Ok(())
}

pub fn set_status(
    conn: &Connection,
    id: &str,
    status: DocumentStatus,
    at: OffsetDateTime,
) -> Result<()> {
    conn.execute(
        "UPDATE documents SET status = ?2, updated_at = ?3 WHERE id = ?1",
        rusqlite::params![id, status.as_str(), db::to_millis(at)],
    )?;
    Ok(())
}

pub fn touch(conn: &Connection, id: &str, at: OffsetDateTime) -> Result<()> {
    conn.execute(
        "UPDATE documents SET updated_at = ?2 WHERE id = ?1",
        rusqlite::params![id, db::to_millis(at)],
    )?;
    Ok(())
}

/// Delete a document; signatories, comments and activity cascade.
pub fn delete(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM documents WHERE id = ?1", [id])?;
    Ok(deleted > 0)
}

fn document_from_row(row: &Row<'_>) -> rusqlite::Result<Document> {
    let file_url: Option<String> = row.get(3)?;
    let file_name: Option<String> = row.get(4)?;
    let attachment = match (file_url, file_name) {
        (Some(url), Some(name)) => Some(Attachment { url, name }),
        (Some(url), None) => Some(Attachment {
            name: url.rsplit('/').next().unwrap_or_default().to_string(),
            url,
        }),
        _ => None,
    };
    let approval: String = row.get(7)?;
    let status: String = row.get(10)?;
    Ok(Document {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        attachment,
        created_by: row.get(5)?,
        requires_approval: row.get(6)?,
        approval: Approval::parse(&approval).ok_or_else(|| invalid_column(7, &approval))?,
        approved_by: row.get(8)?,
        approved_at: db::optional_millis(row.get(9)?),
        status: DocumentStatus::parse(&status).ok_or_else(|| invalid_column(10, &status))?,
        created_at: db::from_millis(row.get(11)?),
        updated_at: db::from_millis(row.get(12)?),
    })
}
