//! Univariate slice sampling of hyperparameters and latent parameters.

use std::collections::BTreeMap;

use irm_core::{check_cluster_hyperparams, ErrorInfo, IrmError, SliceParam};
use rand::Rng;
use tracing::trace;

use crate::bind::{BoundRelation, BoundState};

const MAX_STEP_OUT: usize = 32;
const MAX_SHRINK: usize = 256;

/// Draws one slice-sampling update of `x0` under the log density `target`
/// using stepping out and shrinkage. Non-finite densities outside the
/// support are treated as zero probability.
pub fn slice_sample<R, F>(x0: f64, width: f64, mut target: F, rng: &mut R) -> Result<f64, IrmError>
where
    R: Rng + ?Sized,
    F: FnMut(f64) -> Result<f64, IrmError>,
{
    if !(width.is_finite() && width > 0.0) {
        return Err(IrmError::Primitive(
            ErrorInfo::new("slice-width", "slice width must be positive and finite")
                .with_context("width", width),
        ));
    }
    let mut log_density = |x: f64| -> Result<f64, IrmError> {
        let value = target(x)?;
        Ok(if value.is_nan() { f64::NEG_INFINITY } else { value })
    };
    let fx0 = log_density(x0)?;
    if !fx0.is_finite() {
        return Err(IrmError::Primitive(
            ErrorInfo::new("slice-start", "log density at the current value is not finite")
                .with_context("x", x0)
                .with_context("log_density", fx0),
        ));
    }
    let level = fx0 + rng.gen::<f64>().ln();

    let mut left = x0 - width * rng.gen::<f64>();
    let mut right = left + width;
    let mut steps_left = (MAX_STEP_OUT as f64 * rng.gen::<f64>()) as usize;
    let mut steps_right = MAX_STEP_OUT - 1 - steps_left;
    while steps_left > 0 && level < log_density(left)? {
        left -= width;
        steps_left -= 1;
    }
    while steps_right > 0 && level < log_density(right)? {
        right += width;
        steps_right -= 1;
    }

    for _ in 0..MAX_SHRINK {
        let x1 = left + rng.gen::<f64>() * (right - left);
        if level < log_density(x1)? {
            return Ok(x1);
        }
        if x1 < x0 {
            left = x1;
        } else {
            right = x1;
        }
    }
    Err(IrmError::Primitive(
        ErrorInfo::new("slice-shrinkage", "shrinkage did not find a point inside the slice")
            .with_context("x", x0)
            .with_context("width", width),
    ))
}

/// Slice-samples each named clustering hyperparameter of the bound domain
/// under its prior plus the clustering log prior.
pub fn cluster_hp<R: Rng + ?Sized>(
    bound: &mut BoundState<'_>,
    params: &BTreeMap<String, SliceParam>,
    rng: &mut R,
) -> Result<(), IrmError> {
    for (name, param) in params {
        let mut hp = bound.hp()?.clone();
        let current = current_value(&hp, name)?;
        let next = {
            let view = &*bound;
            slice_sample(
                current,
                param.width,
                |x| {
                    let mut candidate = hp.clone();
                    candidate.insert(name.clone(), x);
                    if check_cluster_hyperparams(&candidate).is_err() {
                        return Ok(f64::NEG_INFINITY);
                    }
                    Ok(param.prior.log_density(x) + view.score_assignment_with(x)?)
                },
                rng,
            )?
        };
        trace!(domain = bound.domain(), %name, from = current, to = next, "cluster hp");
        hp.insert(name.clone(), next);
        bound.set_hp(hp)?;
    }
    Ok(())
}

/// Slice-samples each named component hyperparameter of the bound relation
/// under its prior plus the relation's log likelihood.
pub fn relation_hp<R: Rng + ?Sized>(
    bound: &mut BoundRelation<'_>,
    params: &BTreeMap<String, SliceParam>,
    rng: &mut R,
) -> Result<(), IrmError> {
    let model = bound.model()?;
    for (name, param) in params {
        let mut hp = bound.hp()?.clone();
        let current = current_value(&hp, name)?;
        let next = {
            let view = &*bound;
            slice_sample(
                current,
                param.width,
                |x| {
                    let mut candidate = hp.clone();
                    candidate.insert(name.clone(), x);
                    if model.check_hyperparams(&candidate).is_err() {
                        return Ok(f64::NEG_INFINITY);
                    }
                    Ok(param.prior.log_density(x) + view.score_likelihood_with(&candidate)?)
                },
                rng,
            )?
        };
        trace!(relation = bound.relation(), %name, from = current, to = next, "relation hp");
        hp.insert(name.clone(), next);
        bound.set_hp(hp)?;
    }
    Ok(())
}

/// Slice-samples the named latent parameters of every group tuple of the
/// bound relation, conditioned on the data summarised in that tuple.
pub fn theta<R: Rng + ?Sized>(
    bound: &mut BoundRelation<'_>,
    widths: &BTreeMap<String, f64>,
    rng: &mut R,
) -> Result<(), IrmError> {
    for key in bound.keys()? {
        for (name, &width) in widths {
            let current = bound.theta(&key, name)?;
            let next = {
                let view = &*bound;
                slice_sample(current, width, |x| view.score_theta(&key, name, x), rng)?
            };
            bound.set_theta(&key, name, next)?;
        }
    }
    Ok(())
}

fn current_value(hp: &irm_core::HyperParams, name: &str) -> Result<f64, IrmError> {
    hp.get(name).copied().ok_or_else(|| {
        IrmError::Model(
            ErrorInfo::new("unknown-hyperparameter", "no hyperparameter with this name")
                .with_context("name", name),
        )
    })
}
