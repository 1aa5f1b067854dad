//! Facies probability vectors: validation and caller-side normalization.

use tracing::warn;

use crate::error::ProbabilityError;

/// Slack allowed on individual values before they count as out of range.
const VALUE_SLACK: f64 = 1e-9;

/// Check length, per-value range and that the sum is within `tol` of 1.
pub fn validate_probabilities(
    probs: &[f64],
    expected: usize,
    tol: f64,
) -> Result<(), ProbabilityError> {
    if probs.len() != expected {
        return Err(ProbabilityError::Length {
            expected,
            got: probs.len(),
        });
    }
    for (index, &value) in probs.iter().enumerate() {
        if !value.is_finite() || value < -VALUE_SLACK || value > 1.0 + VALUE_SLACK {
            return Err(ProbabilityError::OutOfRange { index, value });
        }
    }
    let sum: f64 = probs.iter().sum();
    if (sum - 1.0).abs() > tol {
        return Err(ProbabilityError::NotNormalized { sum, tol });
    }
    Ok(())
}

/// Clamp negatives to zero and rescale to unit sum.
///
/// Returns true when the input sum was off by more than `tol`; that case is
/// logged as a normalization warning. A vector summing to zero is left as is.
pub fn normalize_probabilities(probs: &mut [f64], tol: f64) -> bool {
    let corrected = rescale_probabilities(probs, tol);
    if corrected {
        warn!(tol, "facies probabilities did not sum to 1; rescaled");
    }
    corrected
}

/// `normalize_probabilities` without the log event, for per-cell loops that
/// report corrections in aggregate.
pub(crate) fn rescale_probabilities(probs: &mut [f64], tol: f64) -> bool {
    for p in probs.iter_mut() {
        if *p < 0.0 || !p.is_finite() {
            *p = 0.0;
        }
    }
    let sum: f64 = probs.iter().sum();
    if sum <= 0.0 {
        return false;
    }
    if sum != 1.0 {
        probs.iter_mut().for_each(|p| *p /= sum);
    }
    (sum - 1.0).abs() > tol
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_checks_length_range_and_sum() {
        assert!(validate_probabilities(&[0.5, 0.5], 2, 1e-3).is_ok());
        assert_eq!(
            validate_probabilities(&[0.5, 0.5], 3, 1e-3),
            Err(ProbabilityError::Length {
                expected: 3,
                got: 2
            })
        );
        assert!(matches!(
            validate_probabilities(&[1.2, -0.2], 2, 1e-3),
            Err(ProbabilityError::OutOfRange { index: 0, .. })
        ));
        assert!(matches!(
            validate_probabilities(&[0.5, 0.4], 2, 1e-3),
            Err(ProbabilityError::NotNormalized { .. })
        ));
        assert!(validate_probabilities(&[0.5, 0.4995], 2, 1e-3).is_ok());
    }

    #[test]
    fn normalize_rescales_and_reports() {
        let mut p = [0.2, 0.2, 0.2];
        assert!(normalize_probabilities(&mut p, 1e-3));
        assert!(p.iter().all(|&v| (v - 1.0 / 3.0).abs() < 1e-12));

        let mut q = [0.5, 0.5000001];
        assert!(!normalize_probabilities(&mut q, 1e-3));
        assert!((q.iter().sum::<f64>() - 1.0).abs() < 1e-12);

        let mut r = [-0.1, 1.1];
        normalize_probabilities(&mut r, 1e-3);
        assert_eq!(r[0], 0.0);
        assert!((r[1] - 1.0).abs() < 1e-12);
    }
}
