//! JSON error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::error;
use patient_core::RepoError;
use serde::Serialize;

/// Error returned by every handler; rendered as
/// `{"error":{"code":..,"message":..}}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    code: &'a str,
    message: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<RepoError> for ApiError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => {
                Self::new(StatusCode::BAD_REQUEST, "validation_failed", err.to_string())
            }
            // Reported as a validation failure of the submitted pair; the
            // code keeps it distinguishable from field errors.
            RepoError::Conflict { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "conflict", value.to_string())
            }
            RepoError::NotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "not_found", value.to_string())
            }
            other => {
                error!(
                    "event=http_store_failure module=server status=error error_code={} error={}",
                    other.code(),
                    other
                );
                Self::internal("internal storage error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorEnvelope {
            error: ErrorBody {
                code: self.code,
                message: &self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::ApiError;
    use axum::http::StatusCode;
    use patient_core::{PatientValidationError, RepoError};

    #[test]
    fn maps_repo_errors_to_statuses() {
        let cases = [
            (
                RepoError::Validation(PatientValidationError::EmptyName),
                StatusCode::BAD_REQUEST,
                "validation_failed",
            ),
            (
                RepoError::Conflict {
                    name: "Anna".to_string(),
                    birth_year: 1980,
                },
                StatusCode::BAD_REQUEST,
                "conflict",
            ),
            (RepoError::NotFound(5), StatusCode::NOT_FOUND, "not_found"),
            (
                RepoError::InvalidData("broken row".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
            ),
        ];

        for (repo_error, status, code) in cases {
            let api_error = ApiError::from(repo_error);
            assert_eq!(api_error.status(), status);
            assert_eq!(api_error.code(), code);
        }
    }
}
