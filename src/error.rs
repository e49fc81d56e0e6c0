use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::sheets::SheetsError;
use crate::submission::validate::FieldViolation;

/// Missing or malformed deployment configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Missing(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => {
                write!(f, "Missing required environment variable: {key}")
            }
            ConfigError::Invalid(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Validation(Vec<FieldViolation>),
    RateLimited(u64),
    Config(ConfigError),
    External(SheetsError),
    Internal(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad Request: {msg}"),
            AppError::Validation(details) => {
                write!(f, "Validation failed on {} field(s)", details.len())
            }
            AppError::RateLimited(secs) => write!(f, "Rate Limited: retry after {secs}s"),
            AppError::Config(err) => write!(f, "Configuration Error: {err}"),
            AppError::External(err) => write!(f, "External Service Error: {err}"),
            AppError::Internal(msg) => write!(f, "Internal Error: {msg}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({ "ok": false, "error": "BAD_REQUEST", "message": msg })),
            )
                .into_response(),
            AppError::Validation(details) => (
                StatusCode::BAD_REQUEST,
                axum::Json(json!({
                    "ok": false,
                    "error": "VALIDATION_ERROR",
                    "details": details,
                })),
            )
                .into_response(),
            AppError::RateLimited(secs) => {
                let mut resp = (
                    StatusCode::TOO_MANY_REQUESTS,
                    axum::Json(json!({
                        "ok": false,
                        "error": "RATE_LIMITED",
                        "retry_after": secs,
                    })),
                )
                    .into_response();
                resp.headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
                resp
            }
            AppError::Config(err) => {
                tracing::error!("Configuration error: {err}");
                server_error()
            }
            AppError::External(err) => {
                tracing::error!("Sheets append failed: {err}");
                server_error()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                server_error()
            }
        }
    }
}

fn server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(json!({ "ok": false, "error": "SERVER_ERROR" })),
    )
        .into_response()
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<SheetsError> for AppError {
    fn from(err: SheetsError) -> Self {
        AppError::External(err)
    }
}
