//! Error handling middleware - RFC 7807 compliant responses, plus the
//! redirect outcomes the ownership gate prescribes.

use actix_web::{HttpResponse, ResponseError, http::StatusCode, http::header};
use chronicle_core::ownership::MutationCheck;
use chronicle_shared::ErrorResponse;
use std::fmt;

/// Where anonymous viewers are sent when a mutation needs a login.
pub const LOGIN_PATH: &str = "/api/auth/login";

/// Application-level error type that converts to RFC 7807 responses.
///
/// `Redirect` is not a failure: a denied mutation keeps the viewer's
/// read-only experience by sending them to a safe fallback view.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Unauthorized,
    Forbidden,
    Conflict(String),
    Internal(String),
    Redirect(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::Unauthorized => write!(f, "Unauthorized"),
            AppError::Forbidden => write!(f, "Forbidden"),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::Redirect(location) => write!(f, "Redirect to {}", location),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Redirect(_) => StatusCode::SEE_OTHER,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            AppError::Redirect(location) => {
                return HttpResponse::SeeOther()
                    .insert_header((header::LOCATION, location.clone()))
                    .finish();
            }
            AppError::NotFound(detail) => ErrorResponse::not_found(detail),
            AppError::BadRequest(detail) => ErrorResponse::bad_request(detail),
            AppError::Unauthorized => ErrorResponse::unauthorized(),
            AppError::Forbidden => ErrorResponse::forbidden(),
            AppError::Conflict(detail) => ErrorResponse::new(409, "Conflict").with_detail(detail),
            AppError::Internal(detail) => {
                // Log internal errors
                tracing::error!("Internal error: {}", detail);
                ErrorResponse::internal_error()
            }
        };

        HttpResponse::build(self.status_code()).json(error)
    }
}

/// Translate an ownership-gate verdict into flow control: `Allowed`
/// passes, denials become the prescribed redirect.
pub fn require_allowed(check: MutationCheck, detail_path: impl Into<String>) -> Result<(), AppError> {
    match check {
        MutationCheck::Allowed => Ok(()),
        MutationCheck::RedirectToLogin => Err(AppError::Redirect(LOGIN_PATH.to_string())),
        MutationCheck::RedirectToDetail => Err(AppError::Redirect(detail_path.into())),
    }
}

// Conversion from domain errors
impl From<chronicle_core::error::DomainError> for AppError {
    fn from(err: chronicle_core::error::DomainError) -> Self {
        match err {
            chronicle_core::error::DomainError::NotFound { entity_type, id } => {
                AppError::NotFound(format!("{} with id {} not found", entity_type, id))
            }
            chronicle_core::error::DomainError::Validation(msg) => AppError::BadRequest(msg),
            chronicle_core::error::DomainError::Duplicate(msg) => AppError::Conflict(msg),
            chronicle_core::error::DomainError::Unauthorized => AppError::Unauthorized,
            chronicle_core::error::DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<chronicle_core::error::RepoError> for AppError {
    fn from(err: chronicle_core::error::RepoError) -> Self {
        match err {
            chronicle_core::error::RepoError::NotFound => {
                AppError::NotFound("Resource not found".to_string())
            }
            chronicle_core::error::RepoError::Constraint(msg) => AppError::Conflict(msg),
            chronicle_core::error::RepoError::Connection(msg) => {
                tracing::error!("Database connection error: {}", msg);
                AppError::Internal("Database error".to_string())
            }
            chronicle_core::error::RepoError::Query(msg) => {
                tracing::error!("Database query error: {}", msg);
                AppError::Internal("Database error".to_string())
            }
        }
    }
}

/// Result type alias for handlers.
pub type AppResult<T> = Result<T, AppError>;
