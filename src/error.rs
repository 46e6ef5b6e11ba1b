use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::db::DbError;
use crate::uploads::UploadError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Rejected before any write; the message is shown to the user.
    #[error("{0}")]
    Validation(String),

    /// Missing row or row-policy rejection; the two are deliberately indistinguishable.
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Db(DbError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(_) => ServiceError::NotFound,
            other => ServiceError::Db(other),
        }
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(err: rusqlite::Error) -> Self {
        ServiceError::from(DbError::from(err))
    }
}

impl ServiceError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub(crate) fn status(&self) -> StatusCode {
        match self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Upload(UploadError::TooLarge) => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::Upload(UploadError::UnsupportedType) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            ServiceError::Upload(UploadError::EmptyBody | UploadError::BadPath) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Upload(UploadError::NotFound) => StatusCode::NOT_FOUND,
            ServiceError::Upload(UploadError::Io(_)) | ServiceError::Db(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
            "internal error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn status__should_hide_storage_details() {
        let err = ServiceError::Db(DbError::Migration("boom".to_string()));

        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn from__should_fold_missing_rows_into_not_found() {
        let err = ServiceError::from(DbError::NotFound("document".to_string()));

        assert!(matches!(err, ServiceError::NotFound));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn status__should_map_upload_limits() {
        assert_eq!(
            ServiceError::Upload(UploadError::TooLarge).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ServiceError::Upload(UploadError::UnsupportedType).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            ServiceError::validation("Name is required.").status(),
            StatusCode::BAD_REQUEST
        );
    }
}
