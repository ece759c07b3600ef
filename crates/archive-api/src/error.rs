use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::error::Error as StdError;
use tracing::error;

#[derive(Debug, serde::Serialize)]
struct ProblemDetails {
    title: String,
    detail: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct ErrorWrapper {
    error: ProblemDetails,
}

/// Application errors that map to an HTTP response, per the teacher's
/// `control::error::AppError`. Read-only mode is rejected upstream by
/// [`crate::middleware::reject_when_read_only`], not represented here.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error")]
    Db(#[from] sqlx::Error),

    #[error("ingest review queue error")]
    ReviewQueue(#[from] archive_ingest::ReviewQueueError),

    #[error("content store error")]
    ContentStore(#[from] archive_content_store::ContentStoreError),

    #[error("search sync error")]
    Search(#[from] archive_search::SearchSyncError),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::Db(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ReviewQueue(archive_ingest::ReviewQueueError::NotInReview(_)) => StatusCode::CONFLICT,
            AppError::ReviewQueue(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ContentStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Search(_) => StatusCode::BAD_GATEWAY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(status = ?status, message = ?self, details = ?self.source());
        }

        let body = Json(ErrorWrapper {
            error: ProblemDetails {
                title: self.to_string(),
                detail: self.source().map(ToString::to_string),
            },
        });

        (status, body).into_response()
    }
}
