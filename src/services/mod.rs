//! Detection and retention engine.

pub mod indicators;
pub mod retention;
pub mod scan_service;
pub mod scanner;
pub mod trend;

pub use retention::{RetainedSignal, RetentionTtl, SignalRetentionStore};
pub use scan_service::ScanService;
pub use scanner::Scanner;
pub use trend::TrendStateStore;
