use rusqlite::{Connection, Row};
use serde::Deserialize;
use time::OffsetDateTime;

use super::not_found;
use crate::db::{self, Result};
use crate::types::model::Signatory;

const COLUMNS: &str =
    "id, document_id, name, position, email, phone, signed, signed_at, notes, ordinal";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSignatory {
    pub name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

pub fn insert(
    conn: &Connection,
    document_id: &str,
    signatory: &NewSignatory,
    ordinal: i64,
) -> Result<Signatory> {
    let id = db::new_id();
    conn.execute(
        "INSERT INTO document_signatories (id, document_id, name, position, email, phone, ordinal)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            id,
            document_id,
            signatory.name,
            signatory.position,
            signatory.email,
            signatory.phone,
            ordinal,
        ],
    )?;
    Ok(Signatory {
        id,
        document_id: document_id.to_string(),
        name: signatory.name.clone(),
        position: signatory.position.clone(),
        email: signatory.email.clone(),
        phone: signatory.phone.clone(),
        signed: false,
        signed_at: None,
        notes: String::new(),
        ordinal,
    })
}

/// Signatories of a document in signing order.
pub fn list(conn: &Connection, document_id: &str) -> Result<Vec<Signatory>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM document_signatories WHERE document_id = ?1 ORDER BY ordinal, rowid"
    ))?;
    let rows = stmt
        .query_map([document_id], signatory_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get(conn: &Connection, document_id: &str, id: &str) -> Result<Signatory> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM document_signatories WHERE document_id = ?1 AND id = ?2"),
        [document_id, id],
        signatory_from_row,
    )
    .map_err(not_found("signatory"))
}

pub fn set_signed(
    conn: &Connection,
    id: &str,
    signed: bool,
    signed_at: Option<OffsetDateTime>,
) -> Result<()> {
    conn.execute(
        "UPDATE document_signatories SET signed = ?2, signed_at = ?3 WHERE id = ?1",
        rusqlite::params![id, signed, signed_at.map(db::to_millis)],
    )?;
    Ok(())
}

pub fn set_notes(conn: &Connection, id: &str, notes: &str) -> Result<()> {
    conn.execute(
        "UPDATE document_signatories SET notes = ?2 WHERE id = ?1",
        rusqlite::params![id, notes],
    )?;
    Ok(())
}

/// `(signed, total)` for a document.
pub fn tally(conn: &Connection, document_id: &str) -> Result<(usize, usize)> {
    let (signed, total): (i64, i64) = conn.query_row(
        "SELECT COALESCE(SUM(signed), 0), COUNT(*) FROM document_signatories WHERE document_id = ?1",
        [document_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok((signed as usize, total as usize))
}

fn signatory_from_row(row: &Row<'_>) -> rusqlite::Result<Signatory> {
    Ok(Signatory {
        id: row.get(0)?,
        document_id: row.get(1)?,
        name: row.get(2)?,
        position: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        signed: row.get(6)?,
        signed_at: db::optional_millis(row.get(7)?),
        notes: row.get(8)?,
        ordinal: row.get(9)?,
    })
}
