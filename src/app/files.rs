use crate::state;
use crate::uploads;

use axum::extract::Path as AxumPath;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;

/// Serve a stored attachment by its path under the root.
pub(crate) async fn attachment(
    State(state): State<state::AppState>,
    AxumPath(path): AxumPath<String>,
) -> Result<Response, (StatusCode, &'static str)> {
    let Some(content_type) = uploads::content_type_for_path(&path) else {
        return Err((StatusCode::NOT_FOUND, "not found"));
    };

    let resolved = match uploads::resolve_file_path(&state.config.root, &path) {
        Ok(path) => path,
        Err(uploads::UploadError::NotFound) | Err(uploads::UploadError::BadPath) => {
            return Err((StatusCode::NOT_FOUND, "not found"));
        }
        Err(err) => {
            tracing::error!("failed to resolve file path {path}: {err}");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "internal error"));
        }
    };

    let bytes = match tokio::fs::read(&resolved).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err((StatusCode::NOT_FOUND, "not found"));
        }
        Err(err) => {
            tracing::error!("failed to read file {}: {err}", resolved.display());
            return Err((StatusCode::INTERNAL_SERVER_ERROR, "internal error"));
        }
    };

    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", content_type)
        .header("cache-control", "private, max-age=86400")
        .header("x-content-type-options", "nosniff")
        .body(bytes.into())
        .map_err(|err| {
            tracing::error!("failed to build file response: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        })
}
