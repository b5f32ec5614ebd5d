//! Market data sources.

pub mod http;
pub mod mexc;

pub use http::{RetryPolicy, RetryingClient};
pub use mexc::MexcClient;

use crate::error::SourceError;
use crate::types::Instrument;

/// Contract every market data source fulfils for the scanner.
#[async_trait::async_trait]
pub trait MarketDataSource: Send + Sync {
    /// All tradable instruments, in exchange order.
    async fn list_instruments(&self) -> Result<Vec<Instrument>, SourceError>;

    /// Current fair (mark) price. Fails on non-2xx or a missing/non-finite value.
    async fn current_price(&self, symbol: &str) -> Result<f64, SourceError>;

    /// Up to `count` closes, oldest to newest.
    ///
    /// Fails with [`SourceError::InsufficientData`] when fewer than
    /// `min_points` usable closes come back.
    async fn historical_closes(
        &self,
        symbol: &str,
        count: usize,
        min_points: usize,
    ) -> Result<Vec<f64>, SourceError>;

    /// Source name for logs.
    fn name(&self) -> &str;
}
