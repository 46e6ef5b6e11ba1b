use crate::app::auth::CurrentUser;
use crate::error::{ErrorResponse, ServiceResult};
use crate::state;
use crate::templates;
use crate::types::push::Subscription;

use axum::Extension;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde::Serialize;

#[derive(Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

fn not_configured() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: "Push notifications are not configured.".to_string(),
        }),
    )
        .into_response()
}

pub(crate) async fn push_public_key(
    State(state): State<state::AppState>,
) -> Result<Json<PublicKeyResponse>, Response> {
    match state.push_public_key {
        Some(public_key) => Ok(Json(PublicKeyResponse { public_key })),
        None => Err(not_configured()),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubscribeRequest {
    endpoint: String,
    p256dh: String,
    auth: String,
}

pub(crate) async fn subscribe(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<SubscribeRequest>,
) -> ServiceResult<(StatusCode, Json<Subscription>)> {
    let subscription = state.notifications.subscribe_push(
        &user,
        &request.endpoint,
        &request.p256dh,
        &request.auth,
    )?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

#[derive(Debug, Deserialize)]
pub(crate) struct UnsubscribeRequest {
    endpoint: String,
}

pub(crate) async fn unsubscribe(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<UnsubscribeRequest>,
) -> ServiceResult<StatusCode> {
    state.notifications.unsubscribe_push(&user, &request.endpoint)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TestPushRequest {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct TestPushResponse {
    pub(crate) status: &'static str,
}

pub(crate) async fn push_test(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(request): Json<TestPushRequest>,
) -> Result<(StatusCode, Json<TestPushResponse>), Response> {
    if !state.notifications.push_enabled() {
        return Err(not_configured());
    }
    let message = request
        .message
        .unwrap_or_else(|| format!("Test notification from {}", state.config.app_name));
    state
        .notifications
        .send_test_push(&user, &message)
        .map_err(IntoResponse::into_response)?;
    Ok((
        StatusCode::ACCEPTED,
        Json(TestPushResponse { status: "queued" }),
    ))
}

pub(crate) async fn push_settings(
    State(state): State<state::AppState>,
) -> templates::PushSettingsTemplate {
    templates::PushSettingsTemplate {
        app_name: state.config.app_name,
    }
}
