//! Returns calculator.

use crate::market::AlignedPair;

/// Simple returns `(p[t] - p[t-1]) / p[t-1]`.
///
/// The output has one element fewer than the input. A pair whose denominator is
/// zero or whose values are not finite yields a return of `0.0` so that the series
/// stays aligned with its partner.
#[must_use]
pub fn simple_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| {
            let (prev, curr) = (w[0], w[1]);
            if prev == 0.0 || !prev.is_finite() || !curr.is_finite() {
                0.0
            } else {
                (curr - prev) / prev
            }
        })
        .collect()
}

/// Returns of both legs of an aligned pair: `(dependent, explanatory)`.
#[must_use]
pub fn aligned_returns(pair: &AlignedPair) -> (Vec<f64>, Vec<f64>) {
    (
        simple_returns(&pair.dependent),
        simple_returns(&pair.explanatory),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_returns() {
        let r = simple_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(r.len(), 2);
        assert!((r[0] - 0.10).abs() < 1e-12);
        assert!((r[1] + 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_simple_returns_skips_bad_pairs() {
        let r = simple_returns(&[0.0, 10.0, f64::NAN, 12.0, 12.0]);
        assert_eq!(r, vec![0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_simple_returns_short_input() {
        assert!(simple_returns(&[]).is_empty());
        assert!(simple_returns(&[5.0]).is_empty());
    }
}
