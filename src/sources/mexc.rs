use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::http::{RetryPolicy, RetryingClient};
use super::MarketDataSource;
use crate::error::SourceError;
use crate::types::Instrument;

pub const DEFAULT_MEXC_BASE_URL: &str = "https://contract.mexc.com";

/// Standard MEXC response envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ContractDetail {
    #[serde(default)]
    symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FairPrice {
    #[serde(default, rename = "fairPrice", alias = "fair_price")]
    fair_price: Option<Value>,
}

/// Kline payload: either one object per candle or one array per column.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KlineData {
    Rows(Vec<KlineRow>),
    Columns(KlineColumns),
}

#[derive(Debug, Deserialize)]
struct KlineRow {
    #[serde(default)]
    close: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct KlineColumns {
    #[serde(default)]
    close: Vec<Value>,
}

impl KlineData {
    fn closes(self) -> Vec<f64> {
        match self {
            KlineData::Rows(rows) => rows
                .iter()
                .filter_map(|row| row.close.as_ref().and_then(finite_number))
                .collect(),
            KlineData::Columns(columns) => {
                columns.close.iter().filter_map(finite_number).collect()
            }
        }
    }
}

/// Numbers arrive either as JSON numbers or numeric strings.
fn finite_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// MEXC futures REST client.
#[derive(Clone)]
pub struct MexcClient {
    http: RetryingClient,
    base_url: String,
    interval: String,
}

impl MexcClient {
    /// Create a new MEXC client against `base_url` (API root or a proxy).
    pub fn new(base_url: impl Into<String>, interval: impl Into<String>, policy: RetryPolicy) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: RetryingClient::new(policy),
            base_url: base_url.trim_end_matches('/').to_string(),
            interval: interval.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait::async_trait]
impl MarketDataSource for MexcClient {
    async fn list_instruments(&self) -> Result<Vec<Instrument>, SourceError> {
        let envelope: Envelope<Vec<ContractDetail>> =
            self.http.get_json(&self.url("/api/v1/contract/detail")).await?;

        let instruments: Vec<Instrument> = envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| c.symbol)
            .filter(|s| !s.trim().is_empty())
            .map(Instrument::new)
            .collect();

        debug!("MEXC listed {} contracts", instruments.len());
        Ok(instruments)
    }

    async fn current_price(&self, symbol: &str) -> Result<f64, SourceError> {
        let url = self.url(&format!("/api/v1/contract/fair_price/{}", symbol));
        let envelope: Envelope<FairPrice> = self.http.get_json(&url).await?;

        envelope
            .data
            .and_then(|d| d.fair_price)
            .as_ref()
            .and_then(finite_number)
            .ok_or_else(|| SourceError::Fetch(format!("fairPrice invalid for {}", symbol)))
    }

    async fn historical_closes(
        &self,
        symbol: &str,
        count: usize,
        min_points: usize,
    ) -> Result<Vec<f64>, SourceError> {
        let url = self.url(&format!(
            "/api/v1/contract/kline/{}?interval={}&limit={}",
            symbol, self.interval, count
        ));
        let envelope: Envelope<KlineData> = self.http.get_json(&url).await?;

        let mut closes = envelope.data.map(KlineData::closes).unwrap_or_default();
        if closes.len() > count {
            closes = closes.split_off(closes.len() - count);
        }

        if closes.len() < min_points {
            return Err(SourceError::InsufficientData {
                symbol: symbol.to_string(),
                got: closes.len(),
                need: min_points,
            });
        }

        Ok(closes)
    }

    fn name(&self) -> &str {
        "mexc"
    }
}
