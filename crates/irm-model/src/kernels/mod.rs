//! Sampling primitives acting on bound states.

pub mod gibbs;
pub mod grid;
pub mod slice;

use irm_core::special::scores_to_probs;
use irm_core::{ErrorInfo, IrmError};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Draws an index with probability proportional to `exp(scores[i])`.
pub fn sample_from_scores<R: Rng + ?Sized>(scores: &[f64], rng: &mut R) -> Result<usize, IrmError> {
    if scores.is_empty() || scores.iter().any(|s| s.is_nan()) || scores.iter().all(|s| *s == f64::NEG_INFINITY) {
        return Err(IrmError::Primitive(
            ErrorInfo::new("degenerate-scores", "cannot sample from the given log weights")
                .with_context("n", scores.len()),
        ));
    }
    let probs = scores_to_probs(scores);
    let dist = WeightedIndex::new(&probs)
        .map_err(|err| IrmError::primitive("degenerate-scores", err.to_string()))?;
    Ok(dist.sample(rng))
}
