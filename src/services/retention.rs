//! Time-bounded memory of detected turn signals.
//!
//! Upstream prices flap across thresholds, so once a CONFIRM or NEAR event is
//! seen it stays visible for its kind's TTL after the last observation. This
//! store is the only place that knows about expiry: `upsert`, `evict_expired`
//! and `list` are its whole mutation/read surface.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::debug;

use crate::error::ConfigError;
use crate::types::{Direction, Observation, SignalKind};

/// Retention time per signal kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionTtl {
    pub confirm: Duration,
    pub near: Duration,
}

impl Default for RetentionTtl {
    fn default() -> Self {
        Self {
            confirm: Duration::minutes(3),
            near: Duration::minutes(1),
        }
    }
}

impl RetentionTtl {
    /// Longest TTL accepted from configuration.
    pub const MAX_SECS: i64 = 7 * 24 * 60 * 60;

    pub fn for_kind(&self, kind: SignalKind) -> Duration {
        match kind {
            SignalKind::Confirm => self.confirm,
            SignalKind::Near => self.near,
        }
    }

    /// Both TTLs positive, at most [`Self::MAX_SECS`], and CONFIRM strictly
    /// longer than NEAR.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.near <= Duration::zero() {
            return Err(ConfigError::Invalid("TTL_NEAR_SECS must be > 0".to_string()));
        }
        if self.confirm.num_seconds() > Self::MAX_SECS {
            return Err(ConfigError::Invalid(format!(
                "TTL_CONFIRM_SECS ({}s) must not exceed {}s",
                self.confirm.num_seconds(),
                Self::MAX_SECS
            )));
        }
        if self.confirm <= self.near {
            return Err(ConfigError::Invalid(format!(
                "TTL_CONFIRM_SECS ({}s) must exceed TTL_NEAR_SECS ({}s)",
                self.confirm.num_seconds(),
                self.near.num_seconds()
            )));
        }
        Ok(())
    }
}

/// A retained turn signal.
#[derive(Debug, Clone, PartialEq)]
pub struct RetainedSignal {
    pub symbol: String,
    pub kind: SignalKind,
    pub direction: Direction,
    pub score: f64,
    /// When this kind was first seen for the symbol. Reset when the kind changes.
    pub first_seen_at: DateTime<Utc>,
    /// Time of the latest refresh.
    pub updated_at: DateTime<Utc>,
    /// Always `updated_at + TTL(kind)`.
    pub expires_at: DateTime<Utc>,
    /// Latest observation that produced or refreshed the signal.
    pub observation: Observation,
}

impl RetainedSignal {
    pub fn is_alive(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Store of retained signals keyed by display symbol.
pub struct SignalRetentionStore {
    entries: DashMap<String, RetainedSignal>,
    ttl: RetentionTtl,
}

impl SignalRetentionStore {
    pub fn new(ttl: RetentionTtl) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Record an observation of `kind` for `symbol` at `now`.
    ///
    /// Keeps `first_seen_at` when the same kind is already retained; a new or
    /// different kind starts a fresh signal. The expiry is always pushed to
    /// `now + TTL(kind)` and the payload replaced.
    pub fn upsert(
        &self,
        symbol: &str,
        kind: SignalKind,
        observation: Observation,
        now: DateTime<Utc>,
    ) -> RetainedSignal {
        let expires_at = now
            .checked_add_signed(self.ttl.for_kind(kind))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let score = kind.score(observation.deviation_pct);
        let direction = observation.direction;

        let mut entry = self
            .entries
            .entry(symbol.to_string())
            .or_insert_with(|| RetainedSignal {
                symbol: symbol.to_string(),
                kind,
                direction,
                score,
                first_seen_at: now,
                updated_at: now,
                expires_at,
                observation: observation.clone(),
            });

        let signal = entry.value_mut();
        if signal.kind != kind {
            debug!(
                "{} signal superseded: {} -> {}",
                symbol,
                signal.kind.as_str(),
                kind.as_str()
            );
            signal.kind = kind;
            signal.first_seen_at = now;
        }
        signal.direction = direction;
        signal.score = score;
        signal.updated_at = now;
        signal.expires_at = expires_at;
        signal.observation = observation;

        signal.clone()
    }

    /// Remove every entry with `expires_at <= now`. Returns how many were removed.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, signal| signal.is_alive(now));
        before.saturating_sub(self.entries.len())
    }

    /// Evict expired entries, then return the live ones.
    pub fn list(&self, now: DateTime<Utc>) -> Vec<RetainedSignal> {
        let evicted = self.evict_expired(now);
        if evicted > 0 {
            debug!("Retention store: evicted {} expired signals", evicted);
        }

        self.entries
            .iter()
            .filter(|entry| entry.is_alive(now))
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Live signal for one symbol.
    pub fn get(&self, symbol: &str, now: DateTime<Utc>) -> Option<RetainedSignal> {
        self.entries
            .get(symbol)
            .filter(|entry| entry.is_alive(now))
            .map(|entry| entry.value().clone())
    }

    /// Number of entries, including any not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
