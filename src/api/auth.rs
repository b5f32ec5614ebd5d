//! `x-api-key` check for protected routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Reject requests without a known API key; attach the caller's
/// [`crate::config::Role`] to the request extensions otherwise.
pub async fn require_api_key(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();

    if key.is_empty() {
        return Err(AppError::Unauthorized("Missing x-api-key".to_string()));
    }

    let role = state
        .config
        .role_for_key(key)
        .ok_or_else(|| AppError::Unauthorized("Invalid API key".to_string()))?;

    request.extensions_mut().insert(role);
    Ok(next.run(request).await)
}
