//! Notification fan-out for document events.
//!
//! Every function runs on the caller's connection, which is expected to be the
//! open transaction of the triggering mutation: an error here aborts that
//! mutation together with any notification rows already inserted.

use rusqlite::Connection;
use serde_json::json;

use std::collections::HashSet;

use crate::db::Result;
use crate::db::queries::notifications::{self, NewNotification};
use crate::db::queries::{comments, users};
use crate::types::model::{
    Approval, Comment, Document, DocumentStatus, Notification, NotificationKind, Signatory, User,
};

/// A mutation that produces notifications.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Event<'a> {
    DocumentCreated {
        document: &'a Document,
        creator: &'a User,
    },
    /// Must be fanned out before the row is deleted so commenters can be resolved.
    DocumentDeleted {
        document: &'a Document,
        actor: &'a User,
    },
    ApprovalChanged {
        document: &'a Document,
        actor: &'a User,
        previous: Approval,
        current: Approval,
    },
    SignatureChanged {
        document: &'a Document,
        signatory: &'a Signatory,
        actor: &'a User,
        previous_status: DocumentStatus,
        current_status: DocumentStatus,
    },
    CommentAdded {
        document: &'a Document,
        comment: &'a Comment,
        author: &'a User,
    },
}

/// Compute the audience of `event` and insert one notification per recipient.
pub(crate) fn fan_out(conn: &Connection, event: Event<'_>) -> Result<Vec<Notification>> {
    match event {
        Event::DocumentCreated { document, creator } => {
            let draft = NewNotification {
                document_id: Some(document.id.clone()),
                title: "New document".to_string(),
                message: format!(
                    "{} created \"{}\"",
                    creator.display_name, document.name
                ),
                kind: NotificationKind::DocumentCreated,
                payload: json!({
                    "document_id": document.id,
                    "document_name": document.name,
                    "actor_id": creator.id,
                    "actor_name": creator.display_name,
                }),
            };
            notify_all_except(conn, &draft, Some(&creator.id))
        }
        Event::DocumentDeleted { document, actor } => {
            let draft = NewNotification {
                // The row is about to disappear; the payload keeps the reference.
                document_id: None,
                title: "Document deleted".to_string(),
                message: format!("{} deleted \"{}\"", actor.display_name, document.name),
                kind: NotificationKind::DocumentDeleted,
                payload: json!({
                    "document_id": document.id,
                    "document_name": document.name,
                    "actor_id": actor.id,
                    "actor_name": actor.display_name,
                }),
            };
            notify_interested_except(conn, document, &draft, Some(&actor.id))
        }
        Event::ApprovalChanged {
            document,
            actor,
            previous,
            current,
        } => {
            if previous == current {
                return Ok(Vec::new());
            }
            let draft = NewNotification {
                document_id: Some(document.id.clone()),
                title: "Approval updated".to_string(),
                message: format!(
                    "{} {} \"{}\"",
                    actor.display_name,
                    current.verb(),
                    document.name
                ),
                kind: NotificationKind::AdminApproval,
                payload: json!({
                    "document_id": document.id,
                    "document_name": document.name,
                    "actor_id": actor.id,
                    "actor_name": actor.display_name,
                    "previous_approval": previous,
                    "approval": current,
                }),
            };
            notify_interested_except(conn, document, &draft, Some(&actor.id))
        }
        Event::SignatureChanged {
            document,
            signatory,
            actor,
            previous_status,
            current_status,
        } => {
            let message = if signatory.signed {
                format!("{} signed \"{}\"", signatory.name, document.name)
            } else {
                format!(
                    "{}'s signature on \"{}\" was withdrawn",
                    signatory.name, document.name
                )
            };
            let draft = NewNotification {
                document_id: Some(document.id.clone()),
                title: "Signature updated".to_string(),
                message,
                kind: NotificationKind::SignatureAdded,
                payload: json!({
                    "document_id": document.id,
                    "document_name": document.name,
                    "signatory_id": signatory.id,
                    "signatory_name": signatory.name,
                    "signed": signatory.signed,
                    "actor_id": actor.id,
                    "actor_name": actor.display_name,
                    "previous_status": previous_status,
                    "status": current_status,
                }),
            };
            // Signatories are often not users; the recording actor is kept in the audience.
            notify_interested_except(conn, document, &draft, None)
        }
        Event::CommentAdded {
            document,
            comment,
            author,
        } => {
            let draft = NewNotification {
                document_id: Some(document.id.clone()),
                title: "New comment".to_string(),
                message: format!(
                    "{} commented on \"{}\"",
                    author.display_name, document.name
                ),
                kind: NotificationKind::CommentAdded,
                payload: json!({
                    "document_id": document.id,
                    "document_name": document.name,
                    "comment_id": comment.id,
                    "actor_id": author.id,
                    "actor_name": author.display_name,
                }),
            };
            notify_interested_except(conn, document, &draft, Some(&author.id))
        }
    }
}

/// Notify every user except `except`.
pub(crate) fn notify_all_except(
    conn: &Connection,
    notification: &NewNotification,
    except: Option<&str>,
) -> Result<Vec<Notification>> {
    let recipients = users::ids_except(conn, except)?;
    insert_for(conn, &recipients, notification)
}

pub(crate) fn notify_user(
    conn: &Connection,
    recipient_id: &str,
    notification: &NewNotification,
) -> Result<Notification> {
    notifications::insert(conn, recipient_id, notification)
}

/// Notify the creator, every admin and every commenter of `document`, except `except`.
pub(crate) fn notify_interested_except(
    conn: &Connection,
    document: &Document,
    notification: &NewNotification,
    except: Option<&str>,
) -> Result<Vec<Notification>> {
    let recipients: Vec<String> = interested_parties(conn, document)?
        .into_iter()
        .filter(|id| Some(id.as_str()) != except)
        .collect();
    insert_for(conn, &recipients, notification)
}

/// Creator, admins and commenters of a document, deduplicated in first-seen order.
pub(crate) fn interested_parties(conn: &Connection, document: &Document) -> Result<Vec<String>> {
    let mut candidates = vec![document.created_by.clone()];
    candidates.extend(users::admin_ids(conn)?);
    candidates.extend(comments::commenter_ids(conn, &document.id)?);
    Ok(dedupe(candidates))
}

fn dedupe(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.into_iter()
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

fn insert_for(
    conn: &Connection,
    recipients: &[String],
    notification: &NewNotification,
) -> Result<Vec<Notification>> {
    recipients
        .iter()
        .map(|recipient| notifications::insert(conn, recipient, notification))
        .collect()
}
