//! Per-symbol trend state machine.
//!
//! Each scan cycle classifies a symbol's fair price against a band around its
//! moving average, compares the result with the trend persisted from earlier
//! cycles, and reports a CONFIRM (full reversal) or NEAR (approaching the
//! reversal edge) event.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::types::{Direction, SignalKind, Trend};

/// Band and gate parameters for one classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierParams {
    pub band_pct: f64,
    pub near_pct: f64,
    pub rsi_threshold: f64,
}

/// Upper and lower edges of the trend band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub upper: f64,
    pub lower: f64,
}

impl Band {
    pub fn around(ma: f64, band_pct: f64) -> Self {
        Self {
            upper: ma * (1.0 + band_pct / 100.0),
            lower: ma * (1.0 - band_pct / 100.0),
        }
    }
}

/// Outcome of classifying one symbol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub previous: Option<Trend>,
    pub trend: Trend,
    pub kind: Option<SignalKind>,
    pub direction: Direction,
    /// Whether the RSI gate lets this event be reported.
    pub passes_rsi: bool,
}

fn usable_ma(price: f64, ma: Option<f64>) -> Option<f64> {
    ma.filter(|m| m.is_finite() && *m != 0.0 && price.is_finite())
}

/// New trend state for `price` given the moving average and the previous state.
///
/// Inside the band the previous state is kept (NEUTRAL when there is none).
pub fn next_trend(price: f64, ma: Option<f64>, band_pct: f64, previous: Option<Trend>) -> Trend {
    let Some(ma) = usable_ma(price, ma) else {
        return Trend::None;
    };

    let band = Band::around(ma, band_pct);
    if price > band.upper {
        Trend::Up
    } else if price < band.lower {
        Trend::Down
    } else {
        match previous {
            Some(Trend::None) | None => Trend::Neutral,
            Some(trend) => trend,
        }
    }
}

/// Turn event for a `previous -> current` transition, if any.
pub fn turn_kind(
    price: f64,
    ma: Option<f64>,
    params: &ClassifierParams,
    previous: Option<Trend>,
    current: Trend,
) -> Option<SignalKind> {
    let ma = usable_ma(price, ma)?;

    match (previous, current) {
        (Some(Trend::Up), Trend::Down) | (Some(Trend::Down), Trend::Up) => {
            return Some(SignalKind::Confirm)
        }
        _ => {}
    }

    let band = Band::around(ma, params.band_pct);
    let distance_pct = |edge: f64| (price - edge).abs() / price * 100.0;
    let distance = match previous {
        Some(Trend::Up) => distance_pct(band.lower),
        Some(Trend::Down) => distance_pct(band.upper),
        _ => distance_pct(band.lower).min(distance_pct(band.upper)),
    };

    (distance <= params.near_pct).then_some(SignalKind::Near)
}

/// RSI gate: UP needs `rsi >= threshold`, DOWN needs `rsi <= threshold`.
///
/// Other trends and an unavailable RSI always pass.
pub fn passes_rsi_gate(trend: Trend, rsi: Option<f64>, threshold: f64) -> bool {
    match (trend, rsi.filter(|r| r.is_finite())) {
        (Trend::Up, Some(rsi)) => rsi >= threshold,
        (Trend::Down, Some(rsi)) => rsi <= threshold,
        _ => true,
    }
}

/// Process-wide map of the last known trend per symbol.
///
/// Entries are never removed: a symbol keeps its last trend until shutdown.
#[derive(Default)]
pub struct TrendStateStore {
    states: DashMap<String, Trend>,
}

impl TrendStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last persisted trend for a symbol.
    pub fn get(&self, symbol: &str) -> Option<Trend> {
        self.states.get(symbol).map(|t| *t)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Classify `symbol` and persist the new trend in one locked step.
    ///
    /// A `NONE` result leaves the stored trend untouched.
    pub fn classify(
        &self,
        symbol: &str,
        price: f64,
        ma: Option<f64>,
        rsi: Option<f64>,
        params: &ClassifierParams,
    ) -> Classification {
        let entry = self.states.entry(symbol.to_string());
        let previous = match &entry {
            Entry::Occupied(occupied) => Some(*occupied.get()),
            Entry::Vacant(_) => None,
        };

        let trend = next_trend(price, ma, params.band_pct, previous);
        let kind = turn_kind(price, ma, params, previous, trend);

        if trend != Trend::None {
            entry.insert(trend);
        }

        Classification {
            previous,
            trend,
            kind,
            direction: Direction::from_transition(previous, trend),
            passes_rsi: passes_rsi_gate(trend, rsi, params.rsi_threshold),
        }
    }
}
