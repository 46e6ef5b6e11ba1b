use crate::app::auth::CurrentUser;
use crate::error::ServiceResult;
use crate::notifications::AdminNotice;
use crate::state;

use axum::Extension;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

#[derive(Serialize)]
pub(crate) struct NotifyResponse {
    sent: usize,
}

/// Broadcast to every other member, or to one recipient when `recipient_id` is set.
pub(crate) async fn notify(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(notice): Json<AdminNotice>,
) -> ServiceResult<(StatusCode, Json<NotifyResponse>)> {
    let inserted = state.notifications.admin_notify(&user, &notice)?;
    Ok((
        StatusCode::CREATED,
        Json(NotifyResponse {
            sent: inserted.len(),
        }),
    ))
}
