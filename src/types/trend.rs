use serde::{Deserialize, Serialize};

/// Trend classification of a symbol relative to its moving-average band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    /// No usable moving average this cycle. Never persisted.
    None,
    Neutral,
    Up,
    Down,
}

/// Kind of turn event detected by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    /// Full reversal (UP→DOWN or DOWN→UP) within one cycle.
    Confirm,
    /// Price approaching the band edge whose crossing would reverse the trend.
    Near,
}

impl SignalKind {
    /// Ranking bonus that keeps confirmed turns above any near-turn score.
    pub const CONFIRM_BONUS: f64 = 1_000_000.0;
    /// Multiplier applied to |deviation %| in the ranking score.
    pub const DEVIATION_SCALE: f64 = 1_000.0;

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirm => "CONFIRM",
            Self::Near => "NEAR",
        }
    }

    /// Ranking score for an event of this kind at the given deviation.
    pub fn score(&self, deviation_pct: Option<f64>) -> f64 {
        let base = match self {
            Self::Confirm => Self::CONFIRM_BONUS,
            Self::Near => 0.0,
        };
        let deviation = deviation_pct.filter(|d| d.is_finite()).unwrap_or(0.0);
        base + deviation.abs() * Self::DEVIATION_SCALE
    }
}

/// Direction of a transition between two trend states, as reported in rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    ReversalDown,
    ReversalUp,
    UpCandidate,
    DownCandidate,
    Neutral,
}

impl Direction {
    pub fn from_transition(previous: Option<Trend>, current: Trend) -> Self {
        match (previous, current) {
            (Some(Trend::Up), Trend::Down) => Self::ReversalDown,
            (Some(Trend::Down), Trend::Up) => Self::ReversalUp,
            (_, Trend::Up) => Self::UpCandidate,
            (_, Trend::Down) => Self::DownCandidate,
            _ => Self::Neutral,
        }
    }
}
