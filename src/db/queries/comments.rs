use rusqlite::{Connection, Row};

use super::not_found;
use crate::db::{self, Result};
use crate::types::model::Comment;

const COLUMNS: &str = "id, document_id, author_id, text, created_at";

pub fn insert(conn: &Connection, document_id: &str, author_id: &str, text: &str) -> Result<Comment> {
    let id = db::new_id();
    let created_at = db::now();
    conn.execute(
        "INSERT INTO document_comments (id, document_id, author_id, text, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![id, document_id, author_id, text, db::to_millis(created_at)],
    )?;
    Ok(Comment {
        id,
        document_id: document_id.to_string(),
        author_id: author_id.to_string(),
        text: text.to_string(),
        created_at,
    })
}

/// Comments on a document, newest first.
pub fn list(conn: &Connection, document_id: &str) -> Result<Vec<Comment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM document_comments WHERE document_id = ?1
         ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt
        .query_map([document_id], comment_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get(conn: &Connection, document_id: &str, id: &str) -> Result<Comment> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM document_comments WHERE document_id = ?1 AND id = ?2"),
        [document_id, id],
        comment_from_row,
    )
    .map_err(not_found("comment"))
}

pub fn delete(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM document_comments WHERE id = ?1", [id])?;
    Ok(deleted > 0)
}

/// Distinct commenters of a document, in order of their first comment.
pub fn commenter_ids(conn: &Connection, document_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT author_id FROM document_comments WHERE document_id = ?1
         GROUP BY author_id ORDER BY MIN(created_at), MIN(rowid)",
    )?;
    let ids = stmt
        .query_map([document_id], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(ids)
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        document_id: row.get(1)?,
        author_id: row.get(2)?,
        text: row.get(3)?,
        created_at: db::from_millis(row.get(4)?),
    })
}
