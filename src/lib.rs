//! Trend-turn scanner - detects moving-average band reversals across futures
//! contracts and keeps each detected signal visible for a fixed TTL.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub scan_service: Arc<services::ScanService>,
}
