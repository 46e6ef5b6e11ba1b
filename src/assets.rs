use crate::state::AppState;

use axum::body::Body;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

const PUSH_JS_CONTENT: &str = include_str!("../static/push.js");
const ICON_CONTENT: &str = include_str!("../static/icon.svg");

fn asset(content_type: &str, cache_control: &str, body: impl Into<Body>) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", content_type)
        .header("cache-control", cache_control)
        .body(body.into())
        .unwrap_or_else(|err| {
            tracing::error!("failed to build asset response: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}

pub(crate) async fn manifest(State(state): State<AppState>) -> Response {
    asset(
        "application/manifest+json",
        "public, max-age=3600",
        state.manifest,
    )
}

pub(crate) async fn service_worker(State(state): State<AppState>) -> Response {
    asset("application/javascript", "no-cache", state.service_worker)
}

pub(crate) async fn push_script() -> Response {
    asset(
        "application/javascript",
        "public, max-age=3600",
        PUSH_JS_CONTENT,
    )
}

pub(crate) async fn icon() -> Response {
    asset("image/svg+xml", "public, max-age=86400", ICON_CONTENT)
}
