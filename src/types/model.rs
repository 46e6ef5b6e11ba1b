use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Member,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "member" => Some(Role::Member),
            _ => None,
        }
    }
}

/// Admin decision on a document. `Unreviewed` is distinct from `Rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Approval {
    #[default]
    Unreviewed,
    Approved,
    Rejected,
}

impl Approval {
    pub fn as_str(self) -> &'static str {
        match self {
            Approval::Unreviewed => "unreviewed",
            Approval::Approved => "approved",
            Approval::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "unreviewed" => Some(Approval::Unreviewed),
            "approved" => Some(Approval::Approved),
            "rejected" => Some(Approval::Rejected),
            _ => None,
        }
    }

    pub(crate) fn verb(self) -> &'static str {
        match self {
            Approval::Unreviewed => "reset the approval of",
            Approval::Approved => "approved",
            Approval::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    InProgress,
    Completed,
    Rejected,
}

impl DocumentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::InProgress => "in_progress",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Rejected => "rejected",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(DocumentStatus::Pending),
            "in_progress" => Some(DocumentStatus::InProgress),
            "completed" => Some(DocumentStatus::Completed),
            "rejected" => Some(DocumentStatus::Rejected),
            _ => None,
        }
    }

    /// Status implied by the approval decision and the signature tally.
    pub fn derive(requires_approval: bool, approval: Approval, signed: usize, total: usize) -> Self {
        if approval == Approval::Rejected {
            return DocumentStatus::Rejected;
        }
        let approval_ok = !requires_approval || approval == Approval::Approved;
        if total > 0 && signed == total && approval_ok {
            return DocumentStatus::Completed;
        }
        if signed > 0 {
            return DocumentStatus::InProgress;
        }
        DocumentStatus::Pending
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DocumentCreated,
    DocumentDeleted,
    StatusUpdated,
    SignatureAdded,
    AdminApproval,
    CommentAdded,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::DocumentCreated => "document_created",
            NotificationKind::DocumentDeleted => "document_deleted",
            NotificationKind::StatusUpdated => "status_updated",
            NotificationKind::SignatureAdded => "signature_added",
            NotificationKind::AdminApproval => "admin_approval",
            NotificationKind::CommentAdded => "comment_added",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "document_created" => Some(NotificationKind::DocumentCreated),
            "document_deleted" => Some(NotificationKind::DocumentDeleted),
            "status_updated" => Some(NotificationKind::StatusUpdated),
            "signature_added" => Some(NotificationKind::SignatureAdded),
            "admin_approval" => Some(NotificationKind::AdminApproval),
            "comment_added" => Some(NotificationKind::CommentAdded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub description: String,
    pub attachment: Option<Attachment>,
    pub created_by: String,
    pub requires_approval: bool,
    pub approval: Approval,
    pub approved_by: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub approved_at: Option<OffsetDateTime>,
    pub status: DocumentStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Document {
    /// Signatures may only be collected once the approval gate is open.
    pub fn accepts_signatures(&self) -> bool {
        !self.requires_approval || self.approval == Approval::Approved
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signatory {
    pub id: String,
    pub document_id: String,
    pub name: String,
    pub position: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub signed: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub signed_at: Option<OffsetDateTime>,
    pub notes: String,
    pub ordinal: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub document_id: String,
    pub author_id: String,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub document_id: String,
    pub actor_id: Option<String>,
    pub action: String,
    pub description: String,
    pub metadata: Option<serde_json::Value>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub document_id: Option<String>,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub payload: serde_json::Value,
    pub read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Percentage of signed signatories, rounded half up; 0 without signatories.
pub fn progress_percent(signed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let signed = signed.min(total);
    ((200 * signed + total) / (2 * total)) as u8
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn progress_percent__should_be_zero_without_signatories() {
        assert_eq!(progress_percent(0, 0), 0);
    }

    #[test]
    fn progress_percent__should_round_to_nearest() {
        assert_eq!(progress_percent(1, 3), 33);
        assert_eq!(progress_percent(2, 3), 67);
        assert_eq!(progress_percent(1, 2), 50);
        assert_eq!(progress_percent(1, 8), 13);
        assert_eq!(progress_percent(4, 4), 100);
    }

    #[test]
    fn derive__should_require_every_signature_and_an_open_gate() {
        // Given
        let approval_required = true;

        // Then
        assert_eq!(
            DocumentStatus::derive(approval_required, Approval::Unreviewed, 0, 2),
            DocumentStatus::Pending
        );
        assert_eq!(
            DocumentStatus::derive(approval_required, Approval::Approved, 1, 2),
            DocumentStatus::InProgress
        );
        assert_eq!(
            DocumentStatus::derive(approval_required, Approval::Unreviewed, 2, 2),
            DocumentStatus::InProgress
        );
        assert_eq!(
            DocumentStatus::derive(approval_required, Approval::Approved, 2, 2),
            DocumentStatus::Completed
        );
        assert_eq!(
            DocumentStatus::derive(false, Approval::Unreviewed, 2, 2),
            DocumentStatus::Completed
        );
        assert_eq!(
            DocumentStatus::derive(false, Approval::Rejected, 2, 2),
            DocumentStatus::Rejected
        );
    }

    #[test]
    fn derive__should_reopen_signed_document_when_required_approval_is_reset() {
        // Given
        let signed_and_approved = DocumentStatus::derive(true, Approval::Approved, 2, 2);

        // When
        let after_reset = DocumentStatus::derive(true, Approval::Unreviewed, 2, 2);

        // Then
        assert_eq!(signed_and_approved, DocumentStatus::Completed);
        assert_eq!(after_reset, DocumentStatus::InProgress);
    }

    #[test]
    fn derive__should_keep_empty_documents_pending() {
        assert_eq!(
            DocumentStatus::derive(false, Approval::Approved, 0, 0),
            DocumentStatus::Pending
        );
    }
}
