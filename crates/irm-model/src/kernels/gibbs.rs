//! Gibbs reassignment of entities.

use irm_core::{ErrorInfo, IrmError};
use rand::seq::SliceRandom;
use rand::Rng;

use super::sample_from_scores;
use crate::bind::BoundState;

/// One collapsed Gibbs sweep over the bound domain. Each entity is removed,
/// scored against every group plus exactly one empty group, and reinserted
/// at a sampled group. Empty groups are dropped afterwards.
pub fn assign<R: Rng + ?Sized>(bound: &mut BoundState<'_>, rng: &mut R) -> Result<(), IrmError> {
    let mut order: Vec<usize> = (0..bound.nentities()?).collect();
    order.shuffle(rng);
    for eid in order {
        bound.remove_value(eid)?;
        let empties = bound.empty_groups()?;
        if empties.is_empty() {
            bound.create_group()?;
        } else {
            for gid in empties.into_iter().skip(1) {
                bound.delete_group(gid)?;
            }
        }
        let (gids, scores) = bound.score_value(eid, rng)?;
        let choice = sample_from_scores(&scores, rng)?;
        bound.add_value(gids[choice], eid, rng)?;
    }
    drop_empty_groups(bound)
}

/// One sweep of auxiliary-group reassignment for non-conjugate relations.
/// `m` fresh empty groups (with newly drawn latent parameters) are offered
/// each step; an entity that was alone keeps its old group as one of them.
pub fn assign_resample<R: Rng + ?Sized>(
    bound: &mut BoundState<'_>,
    m: usize,
    rng: &mut R,
) -> Result<(), IrmError> {
    if m == 0 {
        return Err(IrmError::Primitive(
            ErrorInfo::new("auxiliary-groups", "at least one auxiliary group is required")
                .with_context("m", m),
        ));
    }
    let mut order: Vec<usize> = (0..bound.nentities()?).collect();
    order.shuffle(rng);
    for eid in order {
        let previous = bound.remove_value(eid)?;
        let mut kept = 0;
        for gid in bound.empty_groups()? {
            if gid == previous {
                kept = 1;
            } else {
                bound.delete_group(gid)?;
            }
        }
        for _ in kept..m {
            bound.create_group()?;
        }
        let (gids, scores) = bound.score_value(eid, rng)?;
        let choice = sample_from_scores(&scores, rng)?;
        bound.add_value(gids[choice], eid, rng)?;
        drop_empty_groups(bound)?;
    }
    Ok(())
}

fn drop_empty_groups(bound: &mut BoundState<'_>) -> Result<(), IrmError> {
    for gid in bound.empty_groups()? {
        bound.delete_group(gid)?;
    }
    Ok(())
}
