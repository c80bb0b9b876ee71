//! Error handling - RFC 7807 problem responses.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use feed_core::{FeedError, StorageError};
use feed_shared::ErrorResponse;

/// Application-level error type that converts to RFC 7807 responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Feed(#[from] FeedError),

    /// Malformed request the engine never saw.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Feed(err) => match err {
                FeedError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                FeedError::AuthRequired => StatusCode::UNAUTHORIZED,
                FeedError::Forbidden(_) => StatusCode::FORBIDDEN,
                FeedError::NotFound(_) => StatusCode::NOT_FOUND,
                FeedError::InvalidTransition { .. } => StatusCode::CONFLICT,
                FeedError::TimedOut { .. } => StatusCode::ACCEPTED,
                FeedError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            AppError::BadRequest(detail) => ErrorResponse::bad_request(detail),
            AppError::Feed(err) => match err {
                FeedError::Validation(msg) => ErrorResponse::unprocessable(msg),
                FeedError::AuthRequired => ErrorResponse::unauthorized(),
                FeedError::Forbidden(_) => ErrorResponse::forbidden(err.to_string()),
                FeedError::NotFound(_) => ErrorResponse::not_found(err.to_string()),
                FeedError::InvalidTransition { .. } => ErrorResponse::conflict(err.to_string()),
                FeedError::TimedOut { .. } => {
                    tracing::warn!(error = %err, "Request answered before the operation settled");
                    ErrorResponse::new(202, "Still Pending")
                        .with_detail(format!(
                            "{err}. The change will appear once it completes; retry with the same idempotency key to check."
                        ))
                }
                FeedError::Storage(storage) => {
                    match storage {
                        StorageError::Corrupt(_) | StorageError::Unavailable(_) => {
                            tracing::error!(error = %storage, "Storage failure");
                        }
                        StorageError::QuotaExceeded(_) | StorageError::ReadOnly(_) => {
                            tracing::warn!(error = %storage, "Write rejected by store");
                        }
                    }
                    ErrorResponse::service_unavailable(storage.to_string())
                }
            },
        };

        HttpResponse::build(self.status_code()).json(error)
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use feed_core::domain::{PostId, PostStatus};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::from(FeedError::validation("empty")), 422),
            (AppError::from(FeedError::AuthRequired), 401),
            (AppError::from(FeedError::Forbidden(PostId(1))), 403),
            (AppError::from(FeedError::NotFound(PostId(1))), 404),
            (
                AppError::from(FeedError::InvalidTransition {
                    id: PostId(1),
                    from: PostStatus::Deleted,
                    to: PostStatus::Archived,
                }),
                409,
            ),
            (
                AppError::from(FeedError::TimedOut {
                    operation: "submit",
                    waited_ms: 6000,
                }),
                202,
            ),
            (
                AppError::from(FeedError::Storage(StorageError::QuotaExceeded("full".into()))),
                503,
            ),
            (AppError::BadRequest("bad".into()), 400),
        ];

        for (error, status) in cases {
            assert_eq!(error.status_code().as_u16(), status, "{error}");
        }
    }
}
