use crate::auth as auth_service;
use crate::db::queries::users;
use crate::error::ErrorResponse;
use crate::state;
use crate::types::model::{Role, User};

use axum::Extension;
use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde::Serialize;

/// The signed-in account, resolved once per request by [`auth_middleware`].
#[derive(Debug, Clone)]
pub(crate) struct CurrentUser(pub(crate) User);

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

pub(crate) async fn auth_middleware(
    State(state): State<state::AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if is_auth_bypass_path(req.uri().path()) {
        return next.run(req).await;
    }

    let subject = request_token(req.headers(), state.auth.cookie_name())
        .and_then(|token| state.auth.verify_token(token).ok());
    let user = subject.and_then(|user_id| {
        let conn = state.store.lock();
        match users::get(&conn, &user_id) {
            Ok(user) => Some(user),
            Err(err) => {
                tracing::debug!(user = %user_id, "token subject rejected: {err}");
                None
            }
        }
    });

    match user {
        Some(user) => {
            req.extensions_mut().insert(CurrentUser(user));
            next.run(req).await
        }
        None => api_error(StatusCode::UNAUTHORIZED, "unauthorized").into_response(),
    }
}

fn is_auth_bypass_path(path: &str) -> bool {
    path == "/api/login"
        || path == "/api/logout"
        || path == "/sw.js"
        || path == "/health"
        || path.starts_with("/static/")
}

/// Bearer header first, then the session cookie.
fn request_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok())
        && let Some(token) = value.strip_prefix("Bearer ")
    {
        let token = token.trim();
        if !token.is_empty() {
            return Some(token);
        }
    }
    auth_cookie(headers, cookie_name)
}

fn auth_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    for header in headers.get_all(COOKIE).iter() {
        if let Ok(raw) = header.to_str()
            && let Some(value) = cookie_from_header(raw, name)
        {
            return Some(value);
        }
    }
    None
}

fn cookie_from_header<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    for part in header.split(';') {
        let trimmed = part.trim();
        if let Some((cookie_name, cookie_value)) = trimmed.split_once('=')
            && cookie_name == name
        {
            return Some(cookie_value);
        }
    }
    None
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
pub(crate) struct LoginResponse {
    token: String,
    user: User,
}

#[derive(Serialize)]
pub(crate) struct UserSummary {
    id: String,
    display_name: String,
    role: Role,
}

pub(crate) async fn login(
    State(state): State<state::AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(invalid_credentials());
    }

    let credentials = {
        let conn = state.store.lock();
        users::credentials_by_email(&conn, &request.email)
    }
    .map_err(|err| {
        tracing::error!("failed to look up credentials: {err}");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    })?;

    let Some((user, password_hash)) = credentials else {
        return Err(invalid_credentials());
    };
    if !auth_service::verify_password(&request.password, &password_hash) {
        tracing::info!(user = %user.id, "rejected login");
        return Err(invalid_credentials());
    }

    let token = state.auth.issue_token(&user.id).map_err(|err| {
        tracing::error!("failed to issue auth token: {err}");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to sign in.")
    })?;
    let cookie = HeaderValue::from_str(&state.auth.auth_cookie(&token)).map_err(|err| {
        tracing::error!("invalid auth cookie header: {err}");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to sign in.")
    })?;

    tracing::info!(user = %user.id, "signed in");
    let mut response = Json(LoginResponse { token, user }).into_response();
    response.headers_mut().append(SET_COOKIE, cookie);
    Ok(response)
}

pub(crate) async fn logout(State(state): State<state::AppState>) -> Result<Response, ApiError> {
    let cookie = HeaderValue::from_str(&state.auth.clear_cookie()).map_err(|err| {
        tracing::error!("invalid logout cookie header: {err}");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    })?;
    let mut response = StatusCode::NO_CONTENT.into_response();
    response.headers_mut().append(SET_COOKIE, cookie);
    Ok(response)
}

pub(crate) async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<User> {
    Json(user)
}

pub(crate) async fn list_users(
    State(state): State<state::AppState>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let users = {
        let conn = state.store.lock();
        users::list(&conn)
    }
    .map_err(|err| {
        tracing::error!("failed to list users: {err}");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    })?;
    Ok(Json(
        users
            .into_iter()
            .map(|user| UserSummary {
                id: user.id,
                display_name: user.display_name,
                role: user.role,
            })
            .collect(),
    ))
}

fn invalid_credentials() -> ApiError {
    api_error(StatusCode::UNAUTHORIZED, "Invalid email or password.")
}
