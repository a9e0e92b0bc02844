//! Griddy Gibbs over candidate hyperparameter records.

use irm_core::{ErrorInfo, HyperParams, IrmError, JointPrior};
use rand::Rng;
use tracing::trace;

use super::sample_from_scores;
use crate::bind::BoundRelation;

/// Replaces the bound relation's hyperparameters with a record drawn from
/// `grid`, weighted by `hpdf` plus the relation's log likelihood.
pub fn relation_hp<R: Rng + ?Sized>(
    bound: &mut BoundRelation<'_>,
    hpdf: &JointPrior,
    grid: &[HyperParams],
    rng: &mut R,
) -> Result<(), IrmError> {
    if grid.is_empty() {
        return Err(IrmError::Primitive(
            ErrorInfo::new("empty-grid", "grid has no candidate records")
                .with_context("relation", bound.relation()),
        ));
    }
    let scores = grid
        .iter()
        .map(|candidate| Ok(hpdf.log_density(candidate) + bound.score_likelihood_with(candidate)?))
        .collect::<Result<Vec<f64>, IrmError>>()?;
    let choice = sample_from_scores(&scores, rng)?;
    trace!(relation = bound.relation(), choice, "grid relation hp");
    bound.set_hp(grid[choice].clone())
}
