use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::domain::event::CatalogError;
use crate::domain::member::IdentityError;
use crate::domain::signup::{InvalidEventReason, SignupError};
use crate::utils::IsTransient;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized: please sign in")]
    Unauthenticated,

    #[error("Forbidden: requires admin access")]
    Forbidden,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string()
        }))
    }
}

impl From<SignupError> for ApiError {
    fn from(error: SignupError) -> Self {
        match error {
            SignupError::Unauthenticated => ApiError::Unauthenticated,
            SignupError::InvalidEvent {
                reason: InvalidEventReason::NotFound,
                ..
            } => ApiError::NotFound(error.to_string()),
            SignupError::InvalidEvent {
                reason: InvalidEventReason::Inactive,
                ..
            } => ApiError::Conflict(error.to_string()),
            SignupError::RetryableFailure(_) => ApiError::Unavailable(error.to_string()),
            SignupError::Internal(_) => ApiError::Internal(error.to_string()),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::EmptyTitle | CatalogError::InvalidTimeRange { .. } => {
                ApiError::BadRequest(error.to_string())
            }
            CatalogError::Store(_) if error.is_transient() => ApiError::Unavailable(error.to_string()),
            CatalogError::Store(_) => ApiError::Internal(error.to_string()),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(error: IdentityError) -> Self {
        match error {
            IdentityError::Unauthenticated => ApiError::Unauthenticated,
            IdentityError::MemberNotFound(_) => ApiError::NotFound(error.to_string()),
            IdentityError::Store(_) if error.is_transient() => ApiError::Unavailable(error.to_string()),
            IdentityError::Store(_) => ApiError::Internal(error.to_string()),
        }
    }
}
