//! Document lifecycle: creation, approval, signatures, comments and deletion.
//!
//! Every mutation writes its rows, fans out notifications and appends to the
//! activity log inside one transaction. Live and push delivery only happen
//! after that transaction commits.

use rusqlite::Transaction;
use serde::{Deserialize, Serialize};
use serde_json::json;

use std::path::PathBuf;

use crate::db::queries::documents::{self, NewDocument};
use crate::db::queries::signatories::{self, NewSignatory};
use crate::db::queries::{activity, comments};
use crate::db::{self, Store};
use crate::error::{ServiceError, ServiceResult};
use crate::fanout::{self, Event};
use crate::notifications::NotificationService;
use crate::types::model::{
    Activity, Approval, Attachment, Comment, Document, DocumentStatus, Notification, Signatory,
    User, progress_percent,
};
use crate::uploads;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requires_approval: bool,
    #[serde(default)]
    pub signatories: Vec<NewSignatory>,
}

/// Raw file received alongside a new document.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignatoryChange {
    #[serde(default)]
    pub signed: Option<bool>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    #[serde(flatten)]
    pub document: Document,
    pub signed: usize,
    pub signatory_count: usize,
    pub progress: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub document: Document,
    pub progress: u8,
    pub signatories: Vec<Signatory>,
    pub comments: Vec<Comment>,
    pub activity: Vec<Activity>,
}

#[derive(Clone)]
pub struct DocumentService {
    root: PathBuf,
    store: Store,
    notifications: NotificationService,
}

impl DocumentService {
    pub fn new(root: PathBuf, store: Store, notifications: NotificationService) -> Self {
        Self {
            root,
            store,
            notifications,
        }
    }

    pub fn list(&self) -> ServiceResult<Vec<DocumentSummary>> {
        let conn = self.store.lock();
        documents::list(&conn)?
            .into_iter()
            .map(|document| {
                let (signed, total) = signatories::tally(&conn, &document.id)?;
                Ok(DocumentSummary {
                    document,
                    signed,
                    signatory_count: total,
                    progress: progress_percent(signed, total),
                })
            })
            .collect()
    }

    pub fn detail(&self, id: &str) -> ServiceResult<DocumentDetail> {
        let conn = self.store.lock();
        load_detail(&conn, id)
    }

    pub fn create(
        &self,
        actor: &User,
        request: CreateDocument,
        file: Option<AttachmentUpload>,
    ) -> ServiceResult<DocumentDetail> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::validation("Document name is required."));
        }
        if request.signatories.is_empty() {
            return Err(ServiceError::validation("Add at least one signatory."));
        }
        let signatory_rows: Vec<NewSignatory> = request
            .signatories
            .iter()
            .map(normalize_signatory)
            .collect();
        if signatory_rows.iter().any(|row| row.name.is_empty()) {
            return Err(ServiceError::validation("Every signatory needs a name."));
        }
        if let Some(file) = &file {
            uploads::validate_attachment(
                &file.bytes,
                file.content_type.as_deref(),
                file.filename.as_deref(),
            )?;
        }

        let stored = match &file {
            Some(file) => Some(uploads::store_upload(
                &self.root,
                &file.bytes,
                file.content_type.as_deref(),
                file.filename.as_deref(),
            )?),
            None => None,
        };
        let attachment = stored.as_ref().map(|stored| Attachment {
            url: stored.url(),
            name: stored.display_name.clone(),
        });

        let draft = NewDocument {
            name,
            description: request.description.trim().to_string(),
            attachment: attachment.clone(),
            created_by: actor.id.clone(),
            requires_approval: request.requires_approval,
        };
        let result = self.mutate(|tx| {
            let document = documents::insert(tx, &draft)?;
            for (ordinal, row) in signatory_rows.iter().enumerate() {
                signatories::insert(tx, &document.id, row, ordinal as i64)?;
            }
            activity::record(
                tx,
                &document.id,
                Some(&actor.id),
                "document_created",
                &format!("{} created the document", actor.display_name),
                Some(&json!({ "signatories": signatory_rows.len() })),
            )?;
            let inserted = fanout::fan_out(
                tx,
                Event::DocumentCreated {
                    document: &document,
                    creator: actor,
                },
            )?;
            Ok((load_detail(tx, &document.id)?, inserted))
        });

        if result.is_err()
            && let Some(attachment) = &attachment
        {
            self.discard_upload(&attachment.url);
        }
        let detail = result?;
        tracing::info!(document = %detail.document.id, actor = %actor.id, "document created");
        Ok(detail)
    }

    /// Creator or admin only; the stored file is removed after the rows are gone.
    pub fn delete(&self, actor: &User, id: &str) -> ServiceResult<()> {
        let document = self.mutate(|tx| {
            let document = documents::get(tx, id)?;
            if !can_manage(actor, &document) {
                return Err(ServiceError::NotFound);
            }
            let inserted = fanout::fan_out(
                tx,
                Event::DocumentDeleted {
                    document: &document,
                    actor,
                },
            )?;
            documents::delete(tx, id)?;
            Ok((document, inserted))
        })?;

        if let Some(attachment) = &document.attachment {
            self.discard_upload(&attachment.url);
        }
        tracing::info!(document = %id, actor = %actor.id, "document deleted");
        Ok(())
    }

    /// Admin only. Writing the current value again changes nothing.
    pub fn set_approval(
        &self,
        actor: &User,
        id: &str,
        approval: Approval,
    ) -> ServiceResult<DocumentDetail> {
        if !actor.is_admin() {
            return Err(ServiceError::NotFound);
        }
        self.mutate(|tx| {
            let document = documents::get(tx, id)?;
            let previous = document.approval;
            if previous == approval {
                return Ok((load_detail(tx, id)?, Vec::new()));
            }

            let now = db::now();
            let approver = (approval != Approval::Unreviewed).then_some(actor.id.as_str());
            documents::set_approval(tx, id, approval, approver, now)?;
            let status = refresh_status(tx, id)?;
            let document = documents::get(tx, id)?;
            activity::record(
                tx,
                id,
                Some(&actor.id),
                "approval_changed",
                &format!("{} {} the document", actor.display_name, approval.verb()),
                Some(&json!({
                    "previous": previous,
                    "approval": approval,
                    "status": status,
                })),
            )?;
            let inserted = fanout::fan_out(
                tx,
                Event::ApprovalChanged {
                    document: &document,
                    actor,
                    previous,
                    current: approval,
                },
            )?;
            Ok((load_detail(tx, id)?, inserted))
        })
    }

    /// Record or withdraw a signature and update its notes. Creator or admin only.
    pub fn set_signature(
        &self,
        actor: &User,
        document_id: &str,
        signatory_id: &str,
        change: SignatoryChange,
    ) -> ServiceResult<DocumentDetail> {
        self.mutate(|tx| {
            let document = documents::get(tx, document_id)?;
            if !can_manage(actor, &document) {
                return Err(ServiceError::NotFound);
            }
            let signatory = signatories::get(tx, document_id, signatory_id)?;
            let flip = change.signed.filter(|signed| *signed != signatory.signed);
            if flip.is_some() && !document.accepts_signatures() {
                return Err(ServiceError::validation(
                    "Signatures can only be collected once the document is approved.",
                ));
            }

            let now = db::now();
            if let Some(notes) = change.notes.as_deref().map(str::trim)
                && notes != signatory.notes
            {
                signatories::set_notes(tx, signatory_id, notes)?;
                documents::touch(tx, document_id, now)?;
                activity::record(
                    tx,
                    document_id,
                    Some(&actor.id),
                    "signatory_notes_updated",
                    &format!("{} updated notes for {}", actor.display_name, signatory.name),
                    None,
                )?;
            }

            let Some(signed) = flip else {
                return Ok((load_detail(tx, document_id)?, Vec::new()));
            };
            signatories::set_signed(tx, signatory_id, signed, signed.then_some(now))?;
            let previous_status = document.status;
            let current_status = refresh_status(tx, document_id)?;
            let document = documents::get(tx, document_id)?;
            let signatory = signatories::get(tx, document_id, signatory_id)?;
            let (action, description) = if signed {
                (
                    "signature_added",
                    format!("{} recorded {}'s signature", actor.display_name, signatory.name),
                )
            } else {
                (
                    "signature_removed",
                    format!("{} withdrew {}'s signature", actor.display_name, signatory.name),
                )
            };
            activity::record(
                tx,
                document_id,
                Some(&actor.id),
                action,
                &description,
                Some(&json!({
                    "signatory_id": signatory.id,
                    "previous_status": previous_status,
                    "status": current_status,
                })),
            )?;
            let inserted = fanout::fan_out(
                tx,
                Event::SignatureChanged {
                    document: &document,
                    signatory: &signatory,
                    actor,
                    previous_status,
                    current_status,
                },
            )?;
            Ok((load_detail(tx, document_id)?, inserted))
        })
    }

    pub fn add_comment(&self, actor: &User, document_id: &str, text: &str) -> ServiceResult<Comment> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::validation("Comment cannot be empty."));
        }
        self.mutate(|tx| {
            let document = documents::get(tx, document_id)?;
            let comment = comments::insert(tx, document_id, &actor.id, text)?;
            documents::touch(tx, document_id, comment.created_at)?;
            activity::record(
                tx,
                document_id,
                Some(&actor.id),
                "comment_added",
                &format!("{} commented", actor.display_name),
                Some(&json!({ "comment_id": comment.id })),
            )?;
            let inserted = fanout::fan_out(
                tx,
                Event::CommentAdded {
                    document: &document,
                    comment: &comment,
                    author: actor,
                },
            )?;
            Ok((comment, inserted))
        })
    }

    /// Author or admin only.
    pub fn delete_comment(
        &self,
        actor: &User,
        document_id: &str,
        comment_id: &str,
    ) -> ServiceResult<()> {
        self.mutate(|tx| {
            let comment = comments::get(tx, document_id, comment_id)?;
            if comment.author_id != actor.id && !actor.is_admin() {
                return Err(ServiceError::NotFound);
            }
            comments::delete(tx, comment_id)?;
            activity::record(
                tx,
                document_id,
                Some(&actor.id),
                "comment_deleted",
                &format!("{} removed a comment", actor.display_name),
                Some(&json!({ "comment_id": comment.id })),
            )?;
            Ok(((), Vec::new()))
        })
    }

    /// Run `write` in one transaction, then deliver whatever it inserted.
    fn mutate<T, F>(&self, write: F) -> ServiceResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> ServiceResult<(T, Vec<Notification>)>,
    {
        let (value, inserted) = {
            let mut conn = self.store.lock();
            let tx = conn.transaction()?;
            let (value, inserted) = write(&tx)?;
            tx.commit()?;
            (value, inserted)
        };
        self.notifications.deliver(&inserted);
        Ok(value)
    }

    fn discard_upload(&self, url: &str) {
        if let Err(err) = uploads::remove_upload(&self.root, url) {
            tracing::warn!(url, "failed to remove stored attachment: {err}");
        }
    }
}

fn can_manage(user: &User, document: &Document) -> bool {
    user.is_admin() || document.created_by == user.id
}

fn normalize_signatory(row: &NewSignatory) -> NewSignatory {
    let optional = |value: &Option<String>| {
        value
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };
    NewSignatory {
        name: row.name.trim().to_string(),
        position: optional(&row.position),
        email: optional(&row.email),
        phone: optional(&row.phone),
    }
}

/// Recompute and persist the derived status; returns the current value.
fn refresh_status(conn: &rusqlite::Connection, id: &str) -> ServiceResult<DocumentStatus> {
    let document = documents::get(conn, id)?;
    let (signed, total) = signatories::tally(conn, id)?;
    let status = DocumentStatus::derive(document.requires_approval, document.approval, signed, total);
    if status != document.status {
        documents::set_status(conn, id, status, db::now())?;
    }
    Ok(status)
}

fn load_detail(conn: &rusqlite::Connection, id: &str) -> ServiceResult<DocumentDetail> {
    let document = documents::get(conn, id)?;
    let signatories = signatories::list(conn, id)?;
    let signed = signatories.iter().filter(|s| s.signed).count();
    Ok(DocumentDetail {
        progress: progress_percent(signed, signatories.len()),
        signatories,
        comments: comments::list(conn, id)?,
        activity: activity::list(conn, id)?,
        document,
    })
}
