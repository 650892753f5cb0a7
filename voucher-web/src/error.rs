//! JSON error envelope returned by every endpoint.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use voucher_core::allocator::AllocatorError;
use voucher_sim::{SimulationError, ValidationError};

/// Errors surfaced to HTTP callers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Body could not be parsed as a simulation request
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// Request parsed but failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Global rate limit exhausted
    #[error("Too many requests")]
    RateLimited,

    /// Simulation aborted
    #[error(transparent)]
    Simulation(#[from] SimulationError),
}

/// Wire form of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable code
    pub code: &'static str,
    /// Human-readable detail
    pub message: String,
}

impl ApiError {
    /// HTTP status and stable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::InvalidBody(_)
            | ApiError::Validation(_)
            | ApiError::Simulation(SimulationError::InvalidPolicy { .. }) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST")
            }
            ApiError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            ApiError::Simulation(SimulationError::Allocator(error)) => match error {
                AllocatorError::AlreadyInitialized { .. } => {
                    (StatusCode::CONFLICT, "DUPLICATE_RESOURCE")
                }
                error if error.is_store_failure() => {
                    (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
            ApiError::Simulation(SimulationError::Scheduling(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(code, error = %self, "Request failed");
        } else {
            tracing::debug!(code, error = %self, "Request rejected");
        }

        let body = ErrorBody {
            code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use voucher_core::domain::SimulationId;

    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApiError::InvalidBody("eof".to_string()),
                StatusCode::BAD_REQUEST,
                "INVALID_REQUEST",
            ),
            (
                ApiError::Validation(ValidationError::NonPositiveClients { value: 0 }),
                StatusCode::BAD_REQUEST,
                "INVALID_REQUEST",
            ),
            (
                ApiError::RateLimited,
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
            ),
            (
                ApiError::Simulation(SimulationError::Allocator(
                    AllocatorError::AlreadyInitialized {
                        id: SimulationId::generate(),
                    },
                )),
                StatusCode::CONFLICT,
                "DUPLICATE_RESOURCE",
            ),
            (
                ApiError::Simulation(SimulationError::Allocator(AllocatorError::Timeout {
                    operation: "DECRBY",
                    timeout: Duration::from_secs(1),
                })),
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE",
            ),
            (
                ApiError::Simulation(SimulationError::Allocator(AllocatorError::Protocol {
                    reason: "bad reply".to_string(),
                })),
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];

        for (error, status, code) in cases {
            assert_eq!(error.status_and_code(), (status, code), "{error}");
        }
    }

    #[tokio::test]
    async fn test_scheduling_failure_is_internal() {
        let join_error = tokio::spawn(async { panic!("selector bug") })
            .await
            .unwrap_err();
        let error = ApiError::Simulation(SimulationError::Scheduling(join_error));

        assert_eq!(
            error.status_and_code(),
            (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
        );
    }

    #[test]
    fn test_response_status() {
        let response = ApiError::RateLimited.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
