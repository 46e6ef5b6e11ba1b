use crate::app::auth::CurrentUser;
use crate::error::ServiceResult;
use crate::realtime::LiveEvent;
use crate::state;
use crate::types::model::Notification;

use axum::Extension;
use axum::Json;
use axum::extract::Path as AxumPath;
use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::StreamExt;
use serde::Deserialize;
use serde::Serialize;

use std::convert::Infallible;

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    limit: Option<usize>,
}

#[derive(Serialize)]
pub(crate) struct NotificationList {
    notifications: Vec<Notification>,
    unread: u64,
}

#[derive(Serialize)]
pub(crate) struct UnreadCount {
    unread: u64,
}

#[derive(Serialize)]
pub(crate) struct Affected {
    count: usize,
}

pub(crate) async fn list(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> ServiceResult<Json<NotificationList>> {
    let notifications = state.notifications.list_recent(&user, query.limit)?;
    let unread = state.notifications.unread_count(&user)?;
    Ok(Json(NotificationList {
        notifications,
        unread,
    }))
}

pub(crate) async fn unread_count(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ServiceResult<Json<UnreadCount>> {
    Ok(Json(UnreadCount {
        unread: state.notifications.unread_count(&user)?,
    }))
}

pub(crate) async fn mark_read(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AxumPath(id): AxumPath<String>,
) -> ServiceResult<StatusCode> {
    state.notifications.mark_read(&user, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn mark_all_read(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ServiceResult<Json<Affected>> {
    Ok(Json(Affected {
        count: state.notifications.mark_all_read(&user)?,
    }))
}

pub(crate) async fn delete(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AxumPath(id): AxumPath<String>,
) -> ServiceResult<StatusCode> {
    state.notifications.delete(&user, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn delete_all(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ServiceResult<Json<Affected>> {
    Ok(Json(Affected {
        count: state.notifications.delete_all(&user)?,
    }))
}

fn sse_event(event: LiveEvent) -> Event {
    match event {
        LiveEvent::Inserted(notification) => {
            let data = serde_json::to_string(&notification).unwrap_or_default();
            Event::default()
                .event("notification")
                .id(notification.id)
                .data(data)
        }
        // The client answers with a full reload.
        LiveEvent::Lagged(skipped) => Event::default()
            .event("resync")
            .data(skipped.to_string()),
    }
}

/// Server-sent events carrying the caller's new notifications.
pub(crate) async fn live(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> impl IntoResponse {
    let stream = state
        .notifications
        .subscribe_live(&user)
        .into_stream()
        .map(|event| Ok::<_, Infallible>(sse_event(event)));

    (
        [("X-Accel-Buffering", "no"), ("Cache-Control", "no-cache")],
        Sse::new(stream).keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(30))
                .text(""),
        ),
    )
}
