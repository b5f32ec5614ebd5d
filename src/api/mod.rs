pub mod auth;
pub mod health;
pub mod scan;

use crate::AppState;
use axum::{
    http::{header::CONTENT_TYPE, HeaderName},
    middleware,
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the full application router.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/top30", get(scan::get_top))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(auth::API_KEY_HEADER)]);

    Router::new()
        .merge(health::router())
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
