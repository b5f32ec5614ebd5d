use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures raised by a market data source for a single request.
///
/// Both variants are recovered at the per-symbol task boundary of a scan
/// cycle: the symbol is dropped from that cycle and the batch continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("insufficient data for {symbol}: got {got} points, need {need}")]
    InsufficientData {
        symbol: String,
        got: usize,
        need: usize,
    },
}

/// Invalid configuration value. Fatal at startup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// HTTP boundary error types.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Unauthorized(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Config(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        };

        let body = Json(json!({
            "ok": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
