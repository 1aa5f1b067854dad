//! Monte-Carlo check of a rule's facies frequencies against its probabilities.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::TruncationError;
use crate::rules::TruncationRule;

/// Observed facies frequencies over uniform alpha samples.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrequencyEstimate {
    pub samples: usize,
    pub seed: u64,
    /// Probabilities the partition was built for, zone order.
    pub expected: Vec<f64>,
    pub observed: Vec<f64>,
}

impl FrequencyEstimate {
    pub fn max_abs_error(&self) -> f64 {
        self.expected
            .iter()
            .zip(&self.observed)
            .map(|(e, o)| (e - o).abs())
            .fold(0.0, f64::max)
    }

    /// True when every facies is within `tol` plus three binomial standard
    /// deviations of its probability.
    pub fn within(&self, tol: f64) -> bool {
        let n = self.samples.max(1) as f64;
        self.expected.iter().zip(&self.observed).all(|(&e, &o)| {
            let noise = 3.0 * (e.clamp(0.0, 1.0) * (1.0 - e.clamp(0.0, 1.0)) / n).sqrt();
            (e - o).abs() <= tol + noise
        })
    }
}

/// Build the partition for `probs` and locate `samples` uniform alpha points
/// drawn from a `StdRng` seeded with `seed`.
pub fn estimate_frequencies<R: TruncationRule + ?Sized>(
    rule: &mut R,
    probs: &[f64],
    samples: usize,
    seed: u64,
) -> Result<FrequencyEstimate, TruncationError> {
    rule.set_probabilities(probs)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut counts = vec![0usize; rule.catalog().len()];
    let mut alpha = vec![0.0; rule.alpha_dims()];
    for _ in 0..samples {
        for a in alpha.iter_mut() {
            *a = rng.gen::<f64>();
        }
        counts[rule.locate(&alpha)?.index] += 1;
    }
    let n = samples.max(1) as f64;
    Ok(FrequencyEstimate {
        samples,
        seed,
        expected: probs.to_vec(),
        observed: counts.into_iter().map(|c| c as f64 / n).collect(),
    })
}
