use crate::types::model::Notification;
use crate::types::push::{PushAction, PushData, PushPayload};

pub(crate) const ICON_URL: &str = "/static/icon.svg";

/// Where a click on the OS notification should land.
pub(crate) fn target_url(document_id: Option<&str>) -> String {
    match document_id {
        Some(id) => format!("/documents/{id}"),
        None => "/".to_string(),
    }
}

pub(crate) fn build_payload(notification: &Notification) -> PushPayload {
    let mut actions = Vec::new();
    if notification.document_id.is_some() {
        actions.push(PushAction {
            action: "open".to_string(),
            title: "Open document".to_string(),
        });
    }
    PushPayload {
        title: notification.title.clone(),
        body: notification.message.clone(),
        icon: ICON_URL.to_string(),
        badge: ICON_URL.to_string(),
        tag: notification.id.clone(),
        data: PushData {
            url: target_url(notification.document_id.as_deref()),
            notification_id: notification.id.clone(),
            document_id: notification.document_id.clone(),
        },
        actions,
    }
}

pub(crate) fn test_payload(message: &str) -> PushPayload {
    PushPayload {
        title: "Test notification".to_string(),
        body: message.to_string(),
        icon: ICON_URL.to_string(),
        badge: ICON_URL.to_string(),
        tag: "test".to_string(),
        data: PushData {
            url: "/".to_string(),
            notification_id: "test".to_string(),
            document_id: None,
        },
        actions: Vec::new(),
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::db;
    use crate::types::model::NotificationKind;

    #[test]
    fn build_payload__should_link_to_document_detail() {
        // Given
        let now = db::now();
        let notification = Notification {
            id: "n-1".to_string(),
            recipient_id: "u-1".to_string(),
            document_id: Some("d-1".to_string()),
            title: "New document".to_string(),
            message: "Ada created \"Budget Request\"".to_string(),
            kind: NotificationKind::DocumentCreated,
            payload: serde_json::json!({}),
            read: false,
            created_at: now,
            updated_at: now,
        };

        // When
        let payload = build_payload(&notification);
        let json = serde_json::to_value(&payload).expect("serialize");

        // Then
        assert_eq!(json["title"], "New document");
        assert_eq!(json["body"], "Ada created \"Budget Request\"");
        assert_eq!(json["tag"], "n-1");
        assert_eq!(json["data"]["url"], "/documents/d-1");
        assert_eq!(json["data"]["notification_id"], "n-1");
        assert_eq!(json["actions"][0]["action"], "open");
    }

    #[test]
    fn build_payload__should_fall_back_to_root_without_document() {
        let now = db::now();
        let notification = Notification {
            id: "n-2".to_string(),
            recipient_id: "u-1".to_string(),
            document_id: None,
            title: "Document deleted".to_string(),
            message: "gone".to_string(),
            kind: NotificationKind::DocumentDeleted,
            payload: serde_json::json!({}),
            read: false,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(build_payload(&notification)).expect("serialize");

        assert_eq!(json["data"]["url"], "/");
        assert!(json.get("actions").is_none());
        assert!(json["data"].get("document_id").is_none());
    }
}
