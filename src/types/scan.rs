use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Direction, SignalKind, Trend};

/// A tradable contract as listed by the data source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Exchange symbol, e.g. `BTC_USDT`.
    pub symbol: String,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }
}

/// Convert an exchange symbol to display form: `btc_usdt` -> `BTCUSDT`.
pub fn display_symbol(api_symbol: &str) -> String {
    api_symbol.trim().to_uppercase().replacen('_', "", 1)
}

/// Result of classifying one symbol in one scan cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub symbol: String,
    pub price: f64,
    pub moving_average: Option<f64>,
    pub rsi: Option<f64>,
    pub deviation_pct: Option<f64>,
    pub previous: Option<Trend>,
    pub trend: Trend,
    pub kind: Option<SignalKind>,
    pub direction: Direction,
    pub passes_rsi: bool,
    pub band_pct: f64,
    pub observed_at: DateTime<Utc>,
}

/// One ranked row of a scan result, as served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRow {
    pub rank: usize,
    pub symbol: String,
    pub direction: Direction,
    pub kind: SignalKind,
    pub band_pct: f64,
    pub price: f64,
    pub moving_average: Option<f64>,
    pub rsi: Option<f64>,
    pub deviation_pct: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

/// Output of one scan cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub rows: Vec<ScanRow>,
    /// Symbols dispatched this cycle.
    pub scanned: usize,
    /// Symbols that produced a fresh observation.
    pub observed: usize,
    /// Symbols dropped because of fetch failure, timeout or short history.
    pub failed: usize,
    /// Live retained signals before ranking and truncation.
    pub retained: usize,
    pub completed_at: DateTime<Utc>,
}

impl ScanReport {
    pub fn empty(completed_at: DateTime<Utc>) -> Self {
        Self {
            rows: Vec::new(),
            scanned: 0,
            observed: 0,
            failed: 0,
            retained: 0,
            completed_at,
        }
    }
}
