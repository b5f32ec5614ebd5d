//! Simple Moving Average (SMA) indicator.

/// Arithmetic mean of the last `period` closes.
///
/// Returns `None` when the series is shorter than `period` (or `period` is
/// zero). A short series is "unavailable", not an error.
pub fn moving_average(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }

    let sum: f64 = closes.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma_mean_of_last_period() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(moving_average(&closes, 3), Some(4.0));
        assert_eq!(moving_average(&closes, 5), Some(3.0));
        assert_eq!(moving_average(&closes, 1), Some(5.0));
    }

    #[test]
    fn test_sma_insufficient_data() {
        let closes = [1.0, 2.0];
        assert_eq!(moving_average(&closes, 3), None);
        assert_eq!(moving_average(&[], 1), None);
    }

    #[test]
    fn test_sma_zero_period() {
        assert_eq!(moving_average(&[1.0, 2.0], 0), None);
    }

    #[test]
    fn test_sma_matches_exact_mean_for_many_lengths() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();

        for period in 1..=closes.len() {
            let tail = &closes[closes.len() - period..];
            let expected = tail.iter().sum::<f64>() / period as f64;
            let actual = moving_average(&closes, period).unwrap();
            assert!((actual - expected).abs() < 1e-9, "period {}", period);
        }
    }
}
