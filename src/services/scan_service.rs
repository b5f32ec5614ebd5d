//! Single-flight access to the scanner.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error};

use crate::config::ScanParams;
use crate::services::scanner::Scanner;
use crate::types::ScanReport;

struct CachedReport {
    params: ScanParams,
    report: Arc<ScanReport>,
    finished_at: Instant,
}

/// Serializes scan cycles and memoizes the latest result.
///
/// The lock is held for a whole cycle, so two cycles never run against the
/// shared state maps at once. Callers that queue behind an in-flight cycle get
/// its result if they asked for the same parameters within `result_ttl`.
///
/// Each cycle runs on its own task that owns the lock. A caller that goes
/// away mid-cycle (client disconnect, timeout) does not cancel it.
pub struct ScanService {
    scanner: Arc<Scanner>,
    result_ttl: Duration,
    last: Arc<Mutex<Option<CachedReport>>>,
}

impl ScanService {
    pub fn new(scanner: Arc<Scanner>, result_ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            scanner,
            result_ttl,
            last: Arc::new(Mutex::new(None)),
        })
    }

    pub fn scanner(&self) -> &Arc<Scanner> {
        &self.scanner
    }

    /// Latest ranked result for `params`, running a cycle if none is fresh.
    pub async fn scan(&self, params: ScanParams) -> Arc<ScanReport> {
        let last = Arc::clone(&self.last).lock_owned().await;

        if let Some(cached) = last.as_ref() {
            if cached.params == params && cached.finished_at.elapsed() < self.result_ttl {
                debug!("Serving memoized scan result");
                return Arc::clone(&cached.report);
            }
        }

        self.run_detached(last, params).await
    }

    /// Run a cycle regardless of any memoized result. Used by the timer.
    pub async fn refresh(&self, params: ScanParams) -> Arc<ScanReport> {
        let last = Arc::clone(&self.last).lock_owned().await;
        self.run_detached(last, params).await
    }

    async fn run_detached(
        &self,
        mut last: OwnedMutexGuard<Option<CachedReport>>,
        params: ScanParams,
    ) -> Arc<ScanReport> {
        let scanner = Arc::clone(&self.scanner);

        let cycle = tokio::spawn(async move {
            let report = Arc::new(scanner.run_cycle(&params).await);
            *last = Some(CachedReport {
                params,
                report: Arc::clone(&report),
                finished_at: Instant::now(),
            });
            report
        });

        match cycle.await {
            Ok(report) => report,
            Err(e) => {
                error!("Scan cycle task failed: {}", e);
                Arc::new(ScanReport::empty(Utc::now()))
            }
        }
    }
}
