use crate::app::auth::CurrentUser;
use crate::documents::{
    AttachmentUpload, CreateDocument, DocumentDetail, DocumentSummary, SignatoryChange,
};
use crate::error::{ServiceError, ServiceResult};
use crate::state;
use crate::types::model::{Approval, Comment};

use axum::Extension;
use axum::Json;
use axum::extract::Multipart;
use axum::extract::Path as AxumPath;
use axum::extract::State;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use serde::Deserialize;

pub(crate) async fn list(
    State(state): State<state::AppState>,
) -> ServiceResult<Json<Vec<DocumentSummary>>> {
    Ok(Json(state.documents.list()?))
}

pub(crate) async fn detail(
    State(state): State<state::AppState>,
    AxumPath(id): AxumPath<String>,
) -> ServiceResult<Json<DocumentDetail>> {
    Ok(Json(state.documents.detail(&id)?))
}

fn multipart_error(err: MultipartError) -> ServiceError {
    ServiceError::validation(format!("Multipart read error: {err}"))
}

/// Multipart body: a `document` part holding JSON and an optional `file` part.
pub(crate) async fn create(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    mut multipart: Multipart,
) -> ServiceResult<(StatusCode, Json<DocumentDetail>)> {
    let mut request: Option<CreateDocument> = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "document" => {
                let raw = field.text().await.map_err(multipart_error)?;
                let parsed = serde_json::from_str(&raw).map_err(|err| {
                    ServiceError::validation(format!("Invalid document fields: {err}"))
                })?;
                request = Some(parsed);
            }
            "file" => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                // Browsers send an empty part when no file was picked.
                if !bytes.is_empty() || filename.as_deref().is_some_and(|name| !name.is_empty())
                {
                    file = Some(AttachmentUpload {
                        bytes: bytes.to_vec(),
                        content_type,
                        filename,
                    });
                }
            }
            other => {
                tracing::debug!(field = other, "ignoring multipart field");
            }
        }
    }

    let request = request.ok_or_else(|| ServiceError::validation("Missing document fields."))?;
    let detail = state.documents.create(&user, request, file)?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub(crate) async fn delete(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AxumPath(id): AxumPath<String>,
) -> ServiceResult<StatusCode> {
    state.documents.delete(&user, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApprovalRequest {
    approval: Approval,
}

pub(crate) async fn set_approval(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AxumPath(id): AxumPath<String>,
    Json(request): Json<ApprovalRequest>,
) -> ServiceResult<Json<DocumentDetail>> {
    Ok(Json(
        state.documents.set_approval(&user, &id, request.approval)?,
    ))
}

pub(crate) async fn set_signature(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AxumPath((id, signatory_id)): AxumPath<(String, String)>,
    Json(change): Json<SignatoryChange>,
) -> ServiceResult<Json<DocumentDetail>> {
    Ok(Json(state.documents.set_signature(
        &user,
        &id,
        &signatory_id,
        change,
    )?))
}

#[derive(Debug, Deserialize)]
pub(crate) struct CommentRequest {
    text: String,
}

pub(crate) async fn add_comment(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AxumPath(id): AxumPath<String>,
    Json(request): Json<CommentRequest>,
) -> ServiceResult<(StatusCode, Json<Comment>)> {
    let comment = state.documents.add_comment(&user, &id, &request.text)?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub(crate) async fn delete_comment(
    State(state): State<state::AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    AxumPath((id, comment_id)): AxumPath<(String, String)>,
) -> ServiceResult<StatusCode> {
    state.documents.delete_comment(&user, &id, &comment_id)?;
    Ok(StatusCode::NO_CONTENT)
}
