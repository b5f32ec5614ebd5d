use serde::Serialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::services::retention::RetentionTtl;
use crate::sources::http::RetryPolicy;
use crate::sources::mexc::DEFAULT_MEXC_BASE_URL;

/// Parameters read once per scan cycle. Requests may override them.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanParams {
    /// Half-width of the trend band around the moving average (percent).
    pub band_pct: f64,
    /// Distance to the reversal edge that counts as a near-turn (percent).
    pub near_pct: f64,
    pub rsi_threshold: f64,
    pub use_rsi_gate: bool,
    pub top_n: usize,
    pub max_symbols: usize,
    /// Maximum number of per-symbol fetches in flight.
    pub concurrency_limit: usize,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            band_pct: 0.3,
            near_pct: 0.15,
            rsi_threshold: 50.0,
            use_rsi_gate: true,
            top_n: 30,
            max_symbols: 80,
            concurrency_limit: 6,
        }
    }
}

impl ScanParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.band_pct.is_finite() || !(0.0..100.0).contains(&self.band_pct) {
            return Err(ConfigError::Invalid(format!(
                "band_pct must be in [0, 100), got {}",
                self.band_pct
            )));
        }
        if !self.near_pct.is_finite() || self.near_pct < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "near_pct must be >= 0, got {}",
                self.near_pct
            )));
        }
        if !self.rsi_threshold.is_finite() || !(0.0..=100.0).contains(&self.rsi_threshold) {
            return Err(ConfigError::Invalid(format!(
                "rsi_threshold must be in [0, 100], got {}",
                self.rsi_threshold
            )));
        }
        if self.top_n == 0 {
            return Err(ConfigError::Invalid("top_n must be > 0".to_string()));
        }
        if self.max_symbols == 0 {
            return Err(ConfigError::Invalid("max_symbols must be > 0".to_string()));
        }
        if self.concurrency_limit == 0 {
            return Err(ConfigError::Invalid(
                "concurrency must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fixed scanner settings. Not overridable per request.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerSettings {
    pub ma_period: usize,
    pub rsi_period: usize,
    /// Only symbols ending with this suffix are scanned. Empty disables the filter.
    pub quote_suffix: String,
    /// Upper bound on one symbol's price + history fetch, retries included.
    pub fetch_timeout: Duration,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            ma_period: 30,
            rsi_period: 14,
            quote_suffix: "_USDT".to_string(),
            // Two requests per symbol, each allowed its full retry budget
            fetch_timeout: RetryPolicy::default().worst_case() * 2,
        }
    }
}

impl ScannerSettings {
    /// Fewest closes that make every indicator available.
    pub fn min_points(&self) -> usize {
        self.ma_period.max(self.rsi_period + 1)
    }

    /// Number of closes requested from the data source.
    pub fn history_len(&self) -> usize {
        self.min_points() + 1
    }
}

/// Role granted by an API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    View,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Base URL of the MEXC futures API (or a proxy in front of it).
    pub mexc_base_url: String,
    /// Candle interval requested for the close history.
    pub kline_interval: String,
    pub api_key_admin: Option<String>,
    pub api_key_view: Option<String>,
    pub scan: ScanParams,
    pub scanner: ScannerSettings,
    pub retention: RetentionTtl,
    pub retry: RetryPolicy,
    /// How long a finished cycle is reused for identical requests.
    pub result_cache_ttl: Duration,
    /// Background scan period. `None` scans on request only.
    pub scan_interval: Option<Duration>,
    /// Period of the retention sweep task.
    pub sweep_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = ScanParams::default();
        let scan = ScanParams {
            band_pct: parse_or(&get, "TREND_BAND_PCT", defaults.band_pct)?,
            near_pct: parse_or(&get, "TURN_NEAR_PCT", defaults.near_pct)?,
            rsi_threshold: parse_or(&get, "RSI_THRESHOLD", defaults.rsi_threshold)?,
            use_rsi_gate: parse_bool_or(&get, "RSI50_FILTER", defaults.use_rsi_gate)?,
            top_n: parse_or(&get, "TOP_N", defaults.top_n)?,
            max_symbols: parse_or(&get, "MAX_SYMBOLS", defaults.max_symbols)?,
            concurrency_limit: parse_or(&get, "CONCURRENCY", defaults.concurrency_limit)?,
        };

        let retry = RetryPolicy {
            max_attempts: parse_or(&get, "HTTP_MAX_ATTEMPTS", 3u32)?,
            base_delay: Duration::from_millis(parse_or(&get, "HTTP_BACKOFF_MS", 500u64)?),
            attempt_timeout: Duration::from_secs(parse_or(&get, "HTTP_ATTEMPT_TIMEOUT_SECS", 4u64)?),
            ..RetryPolicy::default()
        };

        let settings = ScannerSettings::default();
        let scanner = ScannerSettings {
            ma_period: parse_or(&get, "MA_PERIOD", settings.ma_period)?,
            rsi_period: parse_or(&get, "RSI_PERIOD", settings.rsi_period)?,
            // An explicitly empty QUOTE_SUFFIX disables the filter.
            quote_suffix: lookup("QUOTE_SUFFIX")
                .map(|v| v.trim().to_string())
                .unwrap_or(settings.quote_suffix),
            fetch_timeout: match get("FETCH_TIMEOUT_SECS") {
                Some(_) => Duration::from_secs(parse_or(&get, "FETCH_TIMEOUT_SECS", 0u64)?),
                None => retry.worst_case() * 2,
            },
        };

        let retention = RetentionTtl {
            confirm: ttl_or(&get, "TTL_CONFIRM_SECS", 180)?,
            near: ttl_or(&get, "TTL_NEAR_SECS", 60)?,
        };

        let scan_interval_secs: u64 = parse_or(&get, "SCAN_INTERVAL_SECS", 0)?;

        let config = Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 10000)?,
            mexc_base_url: get("MEXC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_MEXC_BASE_URL.to_string()),
            kline_interval: get("KLINE_INTERVAL").unwrap_or_else(|| "Day1".to_string()),
            api_key_admin: get("API_KEY_ADMIN"),
            api_key_view: get("API_KEY_VIEW"),
            scan,
            scanner,
            retention,
            retry,
            result_cache_ttl: Duration::from_secs(parse_or(&get, "RESULT_CACHE_SECS", 5)?),
            scan_interval: (scan_interval_secs > 0)
                .then(|| Duration::from_secs(scan_interval_secs)),
            sweep_interval: Duration::from_secs(parse_or(&get, "SWEEP_INTERVAL_SECS", 30)?),
        };

        config.validate()?;
        Ok(config)
    }

    /// Cross-field checks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scan.validate()?;
        self.retention.validate()?;

        if self.scanner.ma_period == 0 || self.scanner.rsi_period == 0 {
            return Err(ConfigError::Invalid(
                "MA_PERIOD and RSI_PERIOD must be > 0".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "HTTP_MAX_ATTEMPTS must be > 0".to_string(),
            ));
        }
        if self.retry.attempt_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "HTTP_ATTEMPT_TIMEOUT_SECS must be > 0".to_string(),
            ));
        }
        if self.scanner.fetch_timeout < self.retry.worst_case() {
            return Err(ConfigError::Invalid(format!(
                "FETCH_TIMEOUT_SECS ({:?}) must cover every HTTP attempt and backoff ({:?})",
                self.scanner.fetch_timeout,
                self.retry.worst_case()
            )));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "SWEEP_INTERVAL_SECS must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the role for an `x-api-key` value. Unset keys never match.
    pub fn role_for_key(&self, key: &str) -> Option<Role> {
        let matches = |configured: &Option<String>| {
            configured.as_deref().is_some_and(|k| !k.is_empty() && k == key)
        };

        if matches(&self.api_key_admin) {
            Some(Role::Admin)
        } else if matches(&self.api_key_view) {
            Some(Role::View)
        } else {
            None
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

fn ttl_or<G>(get: &G, key: &str, default_secs: i64) -> Result<chrono::Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let secs: i64 = parse_or(get, key, default_secs)?;
    chrono::Duration::try_seconds(secs).ok_or_else(|| ConfigError::InvalidValue {
        key: key.to_string(),
        value: secs.to_string(),
    })
}

fn parse_bool_or<G>(get: &G, key: &str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => match raw.to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        },
        None => Ok(default),
    }
}
