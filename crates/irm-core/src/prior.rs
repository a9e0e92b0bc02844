//! Closed family of hyperprior log-densities.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, IrmError};
use crate::special::{ln_beta, ln_gamma};
use crate::HyperParams;

/// Prior density over a single scalar hyperparameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Prior {
    /// Gamma distribution parameterised by shape and scale.
    Gamma {
        /// Shape parameter `k`.
        shape: f64,
        /// Scale parameter `theta`.
        scale: f64,
    },
    /// Inverse-gamma distribution parameterised by shape and scale.
    InverseGamma {
        /// Shape parameter.
        shape: f64,
        /// Scale parameter.
        scale: f64,
    },
    /// Beta distribution on the unit interval.
    Beta {
        /// First shape parameter.
        alpha: f64,
        /// Second shape parameter.
        beta: f64,
    },
    /// Exponential distribution parameterised by its rate.
    Exponential {
        /// Rate parameter.
        rate: f64,
    },
    /// Uniform distribution on `[low, high]`.
    Uniform {
        /// Lower bound.
        low: f64,
        /// Upper bound.
        high: f64,
    },
    /// Normal distribution.
    Normal {
        /// Mean.
        mean: f64,
        /// Standard deviation.
        std_dev: f64,
    },
}

impl Prior {
    /// Log density at `x`; `-inf` outside the support.
    pub fn log_density(&self, x: f64) -> f64 {
        if !x.is_finite() {
            return f64::NEG_INFINITY;
        }
        match *self {
            Prior::Gamma { shape, scale } => {
                if x <= 0.0 {
                    return f64::NEG_INFINITY;
                }
                (shape - 1.0) * x.ln() - x / scale - ln_gamma(shape) - shape * scale.ln()
            }
            Prior::InverseGamma { shape, scale } => {
                if x <= 0.0 {
                    return f64::NEG_INFINITY;
                }
                shape * scale.ln() - ln_gamma(shape) - (shape + 1.0) * x.ln() - scale / x
            }
            Prior::Beta { alpha, beta } => {
                if x <= 0.0 || x >= 1.0 {
                    return f64::NEG_INFINITY;
                }
                (alpha - 1.0) * x.ln() + (beta - 1.0) * (1.0 - x).ln() - ln_beta(alpha, beta)
            }
            Prior::Exponential { rate } => {
                if x < 0.0 {
                    return f64::NEG_INFINITY;
                }
                rate.ln() - rate * x
            }
            Prior::Uniform { low, high } => {
                if x < low || x > high {
                    return f64::NEG_INFINITY;
                }
                -(high - low).ln()
            }
            Prior::Normal { mean, std_dev } => {
                let z = (x - mean) / std_dev;
                -0.5 * z * z - std_dev.ln() - 0.5 * (2.0 * PI).ln()
            }
        }
    }

    /// Checks that the prior's own parameters describe a proper density.
    pub fn validate(&self) -> Result<(), IrmError> {
        let valid = match *self {
            Prior::Gamma { shape, scale } | Prior::InverseGamma { shape, scale } => {
                shape > 0.0 && scale > 0.0
            }
            Prior::Beta { alpha, beta } => alpha > 0.0 && beta > 0.0,
            Prior::Exponential { rate } => rate > 0.0,
            Prior::Uniform { low, high } => low.is_finite() && high.is_finite() && low < high,
            Prior::Normal { mean, std_dev } => mean.is_finite() && std_dev > 0.0,
        };
        if valid {
            Ok(())
        } else {
            Err(IrmError::Config(
                ErrorInfo::new("invalid-prior", "prior parameters are out of range")
                    .with_context("prior", format!("{self:?}")),
            ))
        }
    }
}

/// A hyperprior paired with the slice-sampler tuning width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SliceParam {
    /// Prior density of the hyperparameter.
    pub prior: Prior,
    /// Initial bracket width used when stepping out.
    pub width: f64,
}

impl SliceParam {
    /// Pairs a prior with a tuning width.
    pub fn new(prior: Prior, width: f64) -> Self {
        Self { prior, width }
    }

    /// Validates both the prior and the width.
    pub fn validate(&self) -> Result<(), IrmError> {
        self.prior.validate()?;
        validate_width(self.width)
    }
}

/// Rejects non-positive or non-finite slice widths.
pub fn validate_width(width: f64) -> Result<(), IrmError> {
    if width.is_finite() && width > 0.0 {
        Ok(())
    } else {
        Err(IrmError::Config(
            ErrorInfo::new("invalid-width", "slice width must be positive and finite")
                .with_context("width", width),
        ))
    }
}

/// Joint prior over a full hyperparameter record: the sum of per-key log densities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JointPrior(pub BTreeMap<String, Prior>);

impl JointPrior {
    /// Builds a joint prior from per-key priors.
    pub fn new(priors: BTreeMap<String, Prior>) -> Self {
        Self(priors)
    }

    /// Log density of `record`. Keys without a prior contribute nothing.
    pub fn log_density(&self, record: &HyperParams) -> f64 {
        self.0
            .iter()
            .map(|(key, prior)| match record.get(key) {
                Some(value) => prior.log_density(*value),
                None => 0.0,
            })
            .sum()
    }

    /// Validates every per-key prior.
    pub fn validate(&self) -> Result<(), IrmError> {
        self.0.values().try_for_each(Prior::validate)
    }
}
