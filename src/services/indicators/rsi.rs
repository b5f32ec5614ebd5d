//! Relative Strength Index (RSI) indicator.

/// RSI with Wilder smoothing over closes ordered oldest to newest.
///
/// The first `period` deltas seed the average gain and loss; every later
/// delta is folded in with weight `1/period`. Returns 100 when the average
/// loss is zero, and `None` when fewer than `period + 1` closes are given.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let mut gain = 0.0;
    let mut loss = 0.0;
    for window in closes[..=period].windows(2) {
        let change = window[1] - window[0];
        if change > 0.0 {
            gain += change;
        } else {
            loss -= change;
        }
    }

    let period_f = period as f64;
    let mut avg_gain = gain / period_f;
    let mut avg_loss = loss / period_f;

    for window in closes[period..].windows(2) {
        let change = window[1] - window[0];
        let (g, l) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (period_f - 1.0) + g) / period_f;
        avg_loss = (avg_loss * (period_f - 1.0) + l) / period_f;
    }

    if avg_loss == 0.0 {
        return Some(100.0);
    }

    let rs = avg_gain / avg_loss;
    Some(100.0 - (100.0 / (1.0 + rs)))
}
