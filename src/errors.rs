//! Crate-wide error type and its mapping onto the HTTP surface.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("not connected to upstream")]
    NotConnected,

    #[error("invalid or expired oauth state")]
    InvalidState,

    #[error("upstream rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },

    #[error("upstream transient failure")]
    UpstreamTransient { internal: String },

    #[error("upstream permanent failure")]
    UpstreamPermanent { internal: String },

    #[error("record failed normalization")]
    Normalization { internal: String },

    #[error("repository error")]
    Repository { internal: String },

    #[error("internal error")]
    Internal { internal: String },
}

impl AppError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal {
            internal: err.to_string(),
        }
    }

    pub fn repository(err: impl std::fmt::Display) -> Self {
        Self::Repository {
            internal: err.to_string(),
        }
    }

    /// Message safe to hand back to an API caller. Never includes upstream
    /// response bodies, SQL text, or token values.
    fn sanitized_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) => msg.clone(),
            Self::Unauthenticated => "authentication required".to_string(),
            Self::NotConnected => "no active whoop connection for this user".to_string(),
            Self::InvalidState => "oauth state is invalid or already used".to_string(),
            Self::RateLimited { retry_after_secs } => {
                format!("rate limited, retry after {retry_after_secs}s")
            }
            Self::UpstreamTransient { .. } => "upstream temporarily unavailable".to_string(),
            Self::UpstreamPermanent { .. } => "upstream rejected the request".to_string(),
            Self::Normalization { .. } => "failed to normalize upstream record".to_string(),
            Self::Repository { .. } => "storage error".to_string(),
            Self::Internal { .. } => "internal error".to_string(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Unauthenticated => "unauthenticated",
            Self::NotConnected => "not_connected",
            Self::InvalidState => "invalid_state",
            Self::RateLimited { .. } => "rate_limited",
            Self::UpstreamTransient { .. } => "upstream_transient",
            Self::UpstreamPermanent { .. } => "upstream_permanent",
            Self::Normalization { .. } => "normalization_error",
            Self::Repository { .. } => "repository_error",
            Self::Internal { .. } => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::NotConnected => StatusCode::FORBIDDEN,
            Self::InvalidState => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::UpstreamTransient { .. } | Self::UpstreamPermanent { .. } => {
                StatusCode::BAD_GATEWAY
            }
            Self::Normalization { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Repository { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Detail that belongs only in server-side logs, never in a response body.
    pub fn internal_details(&self) -> Option<&str> {
        match self {
            Self::UpstreamTransient { internal }
            | Self::UpstreamPermanent { internal }
            | Self::Normalization { internal }
            | Self::Repository { internal }
            | Self::Internal { internal } => Some(internal),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(detail) = self.internal_details() {
            tracing::error!(error = %self, internal = %detail, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }

        let status = self.status();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.sanitized_message(),
            },
        };

        if let Self::RateLimited { retry_after_secs } = self {
            let mut response = (status, Json(body)).into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
            return response;
        }

        (status, Json(body)).into_response()
    }
}

/// Lightweight constructor used by handlers that only need a JSON error
/// payload without going through the full `AppError` machinery (e.g. 404s
/// for an unknown data type path segment).
pub fn simple_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "error": { "code": code, "message": message.into() } })),
    )
        .into_response()
}
