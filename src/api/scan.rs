//! Ranked turn-signal endpoint.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{Role, ScanParams};
use crate::error::Result;
use crate::types::ScanRow;
use crate::AppState;

/// Per-request overrides of the configured scan parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ScanQuery {
    pub band_pct: Option<f64>,
    pub near_pct: Option<f64>,
    pub rsi_threshold: Option<f64>,
    pub use_rsi_gate: Option<bool>,
    pub top_n: Option<usize>,
    pub max_symbols: Option<usize>,
    pub concurrency: Option<usize>,
}

impl ScanQuery {
    /// Overlay the query on `base`. Symbol and worker caps can only be
    /// lowered per request.
    pub fn apply(&self, base: &ScanParams) -> ScanParams {
        ScanParams {
            band_pct: self.band_pct.unwrap_or(base.band_pct),
            near_pct: self.near_pct.unwrap_or(base.near_pct),
            rsi_threshold: self.rsi_threshold.unwrap_or(base.rsi_threshold),
            use_rsi_gate: self.use_rsi_gate.unwrap_or(base.use_rsi_gate),
            top_n: self.top_n.unwrap_or(base.top_n),
            max_symbols: self
                .max_symbols
                .map_or(base.max_symbols, |n| n.min(base.max_symbols)),
            concurrency_limit: self
                .concurrency
                .map_or(base.concurrency_limit, |n| n.min(base.concurrency_limit)),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TopResponse {
    pub ok: bool,
    pub role: Role,
    pub updated: DateTime<Utc>,
    pub data: Vec<ScanRow>,
}

/// GET /api/top30 - ranked CONFIRM/NEAR signals.
pub async fn get_top(
    State(state): State<AppState>,
    Extension(role): Extension<Role>,
    Query(query): Query<ScanQuery>,
) -> Result<Json<TopResponse>> {
    let params = query.apply(&state.config.scan);
    params.validate()?;

    let report = state.scan_service.scan(params).await;

    Ok(Json(TopResponse {
        ok: true,
        role,
        updated: report.completed_at,
        data: report.rows.clone(),
    }))
}
