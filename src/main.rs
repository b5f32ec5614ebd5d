use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trend_scanner::config::Config;
use trend_scanner::services::{ScanService, Scanner, SignalRetentionStore, TrendStateStore};
use trend_scanner::sources::{MarketDataSource, MexcClient};
use trend_scanner::{api, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trend_scanner=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Invalid configuration is fatal here and nowhere else
    let config = Arc::new(Config::from_env()?);
    info!(
        "Starting trend scanner on {}:{} (band {}%, near {}%, top {})",
        config.host, config.port, config.scan.band_pct, config.scan.near_pct, config.scan.top_n
    );

    let source: Arc<dyn MarketDataSource> = Arc::new(MexcClient::new(
        config.mexc_base_url.clone(),
        config.kline_interval.clone(),
        config.retry.clone(),
    ));
    info!("Using {} market data at {}", source.name(), config.mexc_base_url);

    let trends = Arc::new(TrendStateStore::new());
    let retention = Arc::new(SignalRetentionStore::new(config.retention));
    let scanner = Arc::new(Scanner::new(
        source,
        trends,
        retention.clone(),
        config.scanner.clone(),
    ));
    let scan_service = ScanService::new(scanner, config.result_cache_ttl);

    // Periodic retention sweep; reads evict lazily as well
    {
        let retention = retention.clone();
        let interval = config.sweep_interval;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let evicted = retention.evict_expired(chrono::Utc::now());
                if evicted > 0 {
                    debug!("Retention sweep evicted {} signals", evicted);
                }
            }
        });
    }

    // Optional background scanning
    if let Some(interval) = config.scan_interval {
        info!("Background scan every {:?}", interval);
        let scan_service = scan_service.clone();
        let params = config.scan.clone();
        tokio::spawn(async move {
            loop {
                let report = scan_service.refresh(params.clone()).await;
                debug!("Background scan ranked {} signals", report.rows.len());
                tokio::time::sleep(interval).await;
            }
        });
    }

    let state = AppState {
        config: config.clone(),
        scan_service,
    };

    let app = api::router(state);

    // Start the server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Trend scanner listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
