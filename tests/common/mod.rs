#![allow(dead_code)]

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use trend_scanner::config::ScannerSettings;
use trend_scanner::error::SourceError;
use trend_scanner::services::{RetentionTtl, Scanner, SignalRetentionStore, TrendStateStore};
use trend_scanner::sources::MarketDataSource;
use trend_scanner::types::Instrument;

/// In-memory market data source with failure injection and in-flight counting.
pub struct MockSource {
    instruments: Vec<String>,
    prices: DashMap<String, f64>,
    closes: DashMap<String, Vec<f64>>,
    failing: DashMap<String, ()>,
    delays: DashMap<String, Duration>,
    default_delay: Duration,
    list_fails: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    price_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl MockSource {
    /// Every symbol starts at price 100 over a flat 100.0 history.
    pub fn new(symbols: &[&str]) -> Self {
        Self {
            instruments: symbols.iter().map(|s| s.to_string()).collect(),
            prices: symbols.iter().map(|s| (s.to_string(), 100.0)).collect(),
            closes: DashMap::new(),
            failing: DashMap::new(),
            delays: DashMap::new(),
            default_delay: Duration::ZERO,
            list_fails: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            price_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
        }
    }

    pub fn numbered(count: usize) -> Self {
        let symbols: Vec<String> = (0..count).map(|i| format!("S{:02}_USDT", i)).collect();
        let refs: Vec<&str> = symbols.iter().map(String::as_str).collect();
        Self::new(&refs)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        self.prices.insert(symbol.to_string(), price);
    }

    pub fn set_closes(&self, symbol: &str, closes: Vec<f64>) {
        self.closes.insert(symbol.to_string(), closes);
    }

    pub fn set_delay(&self, symbol: &str, delay: Duration) {
        self.delays.insert(symbol.to_string(), delay);
    }

    pub fn fail(&self, symbol: &str) {
        self.failing.insert(symbol.to_string(), ());
    }

    pub fn recover(&self, symbol: &str) {
        self.failing.remove(symbol);
    }

    pub fn fail_listing(&self, fail: bool) {
        self.list_fails.store(fail, Ordering::SeqCst);
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MarketDataSource for MockSource {
    async fn list_instruments(&self) -> Result<Vec<Instrument>, SourceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.default_delay).await;

        if self.list_fails.load(Ordering::SeqCst) {
            return Err(SourceError::Fetch("HTTP 503 from mock".to_string()));
        }
        Ok(self.instruments.iter().map(Instrument::new).collect())
    }

    async fn current_price(&self, symbol: &str) -> Result<f64, SourceError> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .delays
            .get(symbol)
            .map(|d| *d)
            .unwrap_or(self.default_delay);
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains_key(symbol) {
            return Err(SourceError::Fetch(format!("simulated failure for {}", symbol)));
        }
        self.prices
            .get(symbol)
            .map(|p| *p)
            .ok_or_else(|| SourceError::Fetch(format!("no price for {}", symbol)))
    }

    async fn historical_closes(
        &self,
        symbol: &str,
        count: usize,
        min_points: usize,
    ) -> Result<Vec<f64>, SourceError> {
        let closes = self
            .closes
            .get(symbol)
            .map(|c| c.clone())
            .unwrap_or_else(|| vec![100.0; count]);

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
        "mock"
    }
}

pub fn ttl() -> RetentionTtl {
    RetentionTtl {
        confirm: chrono::Duration::seconds(180),
        near: chrono::Duration::seconds(60),
    }
}

pub fn scanner(source: Arc<MockSource>) -> Scanner {
    scanner_with(source, ScannerSettings::default())
}

pub fn scanner_with(source: Arc<MockSource>, settings: ScannerSettings) -> Scanner {
    Scanner::new(
        source,
        Arc::new(TrendStateStore::new()),
        Arc::new(SignalRetentionStore::new(ttl())),
        settings,
    )
}
