//! Scan orchestrator: one bounded-parallelism pass over the symbol universe.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::{ScanParams, ScannerSettings};
use crate::error::SourceError;
use crate::services::indicators::{deviation_pct, moving_average, rsi};
use crate::services::retention::{RetainedSignal, SignalRetentionStore};
use crate::services::trend::{ClassifierParams, TrendStateStore};
use crate::sources::MarketDataSource;
use crate::types::{display_symbol, Instrument, Observation, ScanReport, ScanRow};

/// Drives scan cycles against a data source.
///
/// Owns references to the two shared state maps. Cycles must not overlap;
/// callers go through [`crate::services::ScanService`] for that guarantee.
pub struct Scanner {
    source: Arc<dyn MarketDataSource>,
    trends: Arc<TrendStateStore>,
    retention: Arc<SignalRetentionStore>,
    settings: ScannerSettings,
}

impl Scanner {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        trends: Arc<TrendStateStore>,
        retention: Arc<SignalRetentionStore>,
        settings: ScannerSettings,
    ) -> Self {
        Self {
            source,
            trends,
            retention,
            settings,
        }
    }

    pub fn trends(&self) -> &Arc<TrendStateStore> {
        &self.trends
    }

    pub fn retention(&self) -> &Arc<SignalRetentionStore> {
        &self.retention
    }

    /// Run one full cycle. Never fails: per-symbol errors only shrink the
    /// set of fresh observations.
    pub async fn run_cycle(&self, params: &ScanParams) -> ScanReport {
        let started = std::time::Instant::now();

        let symbols = match self.source.list_instruments().await {
            Ok(instruments) => {
                select_symbols(instruments, &self.settings.quote_suffix, params.max_symbols)
            }
            Err(e) => {
                warn!(
                    "Listing instruments from {} failed: {}",
                    self.source.name(),
                    e
                );
                Vec::new()
            }
        };

        let scanned = symbols.len();
        let (observations, failed) = self.observe_all(symbols, params).await;

        let now = Utc::now();
        self.record(&observations, params, now);

        let retained = self.retention.list(now);
        let retained_count = retained.len();
        let rows = rank_signals(retained, params);

        info!(
            "Scan cycle done in {:?}: {} scanned, {} observed, {} failed, {} retained, {} ranked",
            started.elapsed(),
            scanned,
            observations.len(),
            failed,
            retained_count,
            rows.len()
        );

        ScanReport {
            rows,
            scanned,
            observed: observations.len(),
            failed,
            retained: retained_count,
            completed_at: now,
        }
    }

    /// Fetch and classify every symbol, at most `concurrency_limit` at a time.
    ///
    /// Permits are taken in symbol order before each task is spawned, so
    /// queued symbols start FIFO.
    async fn observe_all(
        &self,
        symbols: Vec<String>,
        params: &ScanParams,
    ) -> (Vec<Observation>, usize) {
        let semaphore = Arc::new(Semaphore::new(params.concurrency_limit.max(1)));
        let classifier = ClassifierParams {
            band_pct: params.band_pct,
            near_pct: params.near_pct,
            rsi_threshold: params.rsi_threshold,
        };

        let mut tasks = JoinSet::new();
        for (index, api_symbol) in symbols.into_iter().enumerate() {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!("Scan semaphore closed: {}", e);
                    break;
                }
            };

            let source = Arc::clone(&self.source);
            let trends = Arc::clone(&self.trends);
            let settings = self.settings.clone();

            tasks.spawn(async move {
                let result =
                    observe_symbol(source.as_ref(), &trends, &settings, &classifier, &api_symbol)
                        .await;
                drop(permit);
                (index, api_symbol, result)
            });
        }

        let mut observations = Vec::new();
        let mut failed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(observation))) => observations.push((index, observation)),
                Ok((_, api_symbol, Err(e))) => {
                    failed += 1;
                    warn!("[scan] {} skipped: {}", api_symbol, e);
                }
                Err(e) => {
                    failed += 1;
                    error!("[scan] symbol task aborted: {}", e);
                }
            }
        }

        observations.sort_by_key(|(index, _)| *index);
        (
            observations.into_iter().map(|(_, o)| o).collect(),
            failed,
        )
    }

    /// Push this cycle's reportable events into the retention store.
    fn record(&self, observations: &[Observation], params: &ScanParams, now: DateTime<Utc>) {
        for observation in observations {
            let Some(kind) = observation.kind else {
                continue;
            };
            if params.use_rsi_gate && !observation.passes_rsi {
                debug!(
                    "{} {} suppressed by RSI gate (rsi {:?})",
                    observation.symbol,
                    kind.as_str(),
                    observation.rsi
                );
                continue;
            }
            self.retention
                .upsert(&observation.symbol, kind, observation.clone(), now);
        }
    }
}

/// Fetch price and history for one symbol, compute indicators and classify.
async fn observe_symbol(
    source: &dyn MarketDataSource,
    trends: &TrendStateStore,
    settings: &ScannerSettings,
    params: &ClassifierParams,
    api_symbol: &str,
) -> Result<Observation, SourceError> {
    let fetch = async {
        let price = source.current_price(api_symbol).await?;
        let closes = source
            .historical_closes(api_symbol, settings.history_len(), settings.min_points())
            .await?;
        Ok::<_, SourceError>((price, closes))
    };

    let (price, closes) = tokio::time::timeout(settings.fetch_timeout, fetch)
        .await
        .map_err(|_| {
            SourceError::Fetch(format!(
                "{} timed out after {:?}",
                api_symbol, settings.fetch_timeout
            ))
        })??;

    let ma = moving_average(&closes, settings.ma_period);
    let rsi = rsi(&closes, settings.rsi_period);
    let deviation = ma.and_then(|ma| deviation_pct(price, ma));

    let symbol = display_symbol(api_symbol);
    let classification = trends.classify(&symbol, price, ma, rsi, params);

    Ok(Observation {
        symbol,
        price,
        moving_average: ma,
        rsi,
        deviation_pct: deviation,
        previous: classification.previous,
        trend: classification.trend,
        kind: classification.kind,
        direction: classification.direction,
        passes_rsi: classification.passes_rsi,
        band_pct: params.band_pct,
        observed_at: Utc::now(),
    })
}

/// Filter by quote suffix, then cap to `max_symbols`.
pub fn select_symbols(
    instruments: Vec<Instrument>,
    quote_suffix: &str,
    max_symbols: usize,
) -> Vec<String> {
    instruments
        .into_iter()
        .map(|i| i.symbol)
        .filter(|s| quote_suffix.is_empty() || s.ends_with(quote_suffix))
        .take(max_symbols)
        .collect()
}

/// Rank live signals: newest `first_seen_at` first, then higher score.
///
/// Applies the RSI gate when enabled, truncates to `top_n` and assigns
/// dense ranks starting at 1.
pub fn rank_signals(signals: Vec<RetainedSignal>, params: &ScanParams) -> Vec<ScanRow> {
    let mut candidates: Vec<RetainedSignal> = signals
        .into_iter()
        .filter(|s| !params.use_rsi_gate || s.observation.passes_rsi)
        .collect();

    candidates.sort_by(|a, b| {
        b.first_seen_at
            .cmp(&a.first_seen_at)
            .then_with(|| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal))
            .then_with(|| a.symbol.cmp(&b.symbol))
    });

    candidates
        .into_iter()
        .take(params.top_n)
        .enumerate()
        .map(|(i, s)| ScanRow {
            rank: i + 1,
            symbol: s.symbol,
            direction: s.direction,
            kind: s.kind,
            band_pct: s.observation.band_pct,
            price: s.observation.price,
            moving_average: s.observation.moving_average,
            rsi: s.observation.rsi,
            deviation_pct: s.observation.deviation_pct,
            updated_at: s.updated_at,
        })
        .collect()
}
