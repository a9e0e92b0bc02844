//! Sufficient statistics and scoring for the supported component models.

use std::f64::consts::PI;

use irm_core::special::{ln_beta, ln_gamma};
use irm_core::{ComponentModel, ErrorInfo, HyperParams, IrmError, Value};
use rand::Rng;
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};

/// Per-group-tuple sufficient statistics of one relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Suffstats {
    /// Counts for the conjugate Beta–Bernoulli model.
    BetaBernoulli {
        /// Number of `true` observations.
        heads: u64,
        /// Number of `false` observations.
        tails: u64,
    },
    /// Counts plus the instantiated success probability.
    BetaBernoulliNonConj {
        /// Number of `true` observations.
        heads: u64,
        /// Number of `false` observations.
        tails: u64,
        /// Instantiated success probability.
        p: f64,
    },
    /// Statistics for the Gamma–Poisson model.
    GammaPoisson {
        /// Number of observations.
        n: u64,
        /// Sum of the observed counts.
        sum: u64,
        /// Sum of `ln(x!)` over observations.
        log_prod: f64,
    },
    /// Running moments for the Normal–Inverse-chi-squared model.
    NormalInverseChiSq {
        /// Number of observations.
        count: u64,
        /// Running mean.
        mean: f64,
        /// Sum of squared deviations from the mean.
        count_times_variance: f64,
    },
}

fn hyper(hp: &HyperParams, key: &str) -> f64 {
    hp.get(key).copied().unwrap_or(f64::NAN)
}

fn kind_mismatch(model: &str, value: Value) -> IrmError {
    IrmError::Model(
        ErrorInfo::new("value-kind", "observation type does not match the component model")
            .with_context("model", model)
            .with_context("value", format!("{value:?}")),
    )
}

fn remove_from_empty(model: &str) -> IrmError {
    IrmError::Model(
        ErrorInfo::new("suffstats-underflow", "removing a value from empty statistics")
            .with_context("model", model),
    )
}

struct NixPosterior {
    kappa: f64,
    mu: f64,
    nu: f64,
    sigmasq: f64,
}

impl Suffstats {
    /// Fresh statistics for a new group tuple. Non-conjugate models draw their
    /// latent parameter from the prior here.
    pub fn create<R: Rng + ?Sized>(
        model: ComponentModel,
        hp: &HyperParams,
        rng: &mut R,
    ) -> Result<Self, IrmError> {
        Ok(match model {
            ComponentModel::BetaBernoulli => Suffstats::BetaBernoulli { heads: 0, tails: 0 },
            ComponentModel::BetaBernoulliNonConj => {
                let prior = Beta::new(hyper(hp, "alpha"), hyper(hp, "beta")).map_err(|err| {
                    IrmError::Primitive(
                        ErrorInfo::new("theta-prior", err.to_string())
                            .with_context("model", model.name()),
                    )
                })?;
                Suffstats::BetaBernoulliNonConj {
                    heads: 0,
                    tails: 0,
                    p: prior.sample(rng),
                }
            }
            ComponentModel::GammaPoisson => Suffstats::GammaPoisson {
                n: 0,
                sum: 0,
                log_prod: 0.0,
            },
            ComponentModel::NormalInverseChiSq => Suffstats::NormalInverseChiSq {
                count: 0,
                mean: 0.0,
                count_times_variance: 0.0,
            },
        })
    }

    /// Model these statistics belong to.
    pub fn model(&self) -> ComponentModel {
        match self {
            Suffstats::BetaBernoulli { .. } => ComponentModel::BetaBernoulli,
            Suffstats::BetaBernoulliNonConj { .. } => ComponentModel::BetaBernoulliNonConj,
            Suffstats::GammaPoisson { .. } => ComponentModel::GammaPoisson,
            Suffstats::NormalInverseChiSq { .. } => ComponentModel::NormalInverseChiSq,
        }
    }

    /// Number of observations summarised.
    pub fn len(&self) -> u64 {
        match self {
            Suffstats::BetaBernoulli { heads, tails }
            | Suffstats::BetaBernoulliNonConj { heads, tails, .. } => heads + tails,
            Suffstats::GammaPoisson { n, .. } => *n,
            Suffstats::NormalInverseChiSq { count, .. } => *count,
        }
    }

    /// True when no observation is summarised.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds one observation.
    pub fn add_value(&mut self, value: Value) -> Result<(), IrmError> {
        match (self, value) {
            (Suffstats::BetaBernoulli { heads, tails }, Value::Bool(v))
            | (Suffstats::BetaBernoulliNonConj { heads, tails, .. }, Value::Bool(v)) => {
                if v {
                    *heads += 1;
                } else {
                    *tails += 1;
                }
            }
            (Suffstats::GammaPoisson { n, sum, log_prod }, Value::Count(x)) => {
                *n += 1;
                *sum += x;
                *log_prod += ln_gamma(x as f64 + 1.0);
            }
            (
                Suffstats::NormalInverseChiSq {
                    count,
                    mean,
                    count_times_variance,
                },
                Value::Real(x),
            ) => {
                *count += 1;
                let delta = x - *mean;
                *mean += delta / *count as f64;
                *count_times_variance += delta * (x - *mean);
            }
            (stats, value) => return Err(kind_mismatch(stats.model().name(), value)),
        }
        Ok(())
    }

    /// Removes one previously added observation.
    pub fn remove_value(&mut self, value: Value) -> Result<(), IrmError> {
        let model = self.model().name();
        match (self, value) {
            (Suffstats::BetaBernoulli { heads, tails }, Value::Bool(v))
            | (Suffstats::BetaBernoulliNonConj { heads, tails, .. }, Value::Bool(v)) => {
                let counter = if v { heads } else { tails };
                *counter = counter.checked_sub(1).ok_or_else(|| remove_from_empty(model))?;
            }
            (Suffstats::GammaPoisson { n, sum, log_prod }, Value::Count(x)) => {
                if *n == 0 || *sum < x {
                    return Err(remove_from_empty(model));
                }
                *n -= 1;
                *sum -= x;
                *log_prod = if *n == 0 {
                    0.0
                } else {
                    *log_prod - ln_gamma(x as f64 + 1.0)
                };
            }
            (
                Suffstats::NormalInverseChiSq {
                    count,
                    mean,
                    count_times_variance,
                },
                Value::Real(x),
            ) => match *count {
                0 => return Err(remove_from_empty(model)),
                1 => {
                    *count = 0;
                    *mean = 0.0;
                    *count_times_variance = 0.0;
                }
                n => {
                    let n = n as f64;
                    let previous_mean = (n * *mean - x) / (n - 1.0);
                    *count_times_variance =
                        (*count_times_variance - (x - previous_mean) * (x - *mean)).max(0.0);
                    *mean = previous_mean;
                    *count -= 1;
                }
            },
            (stats, value) => return Err(kind_mismatch(stats.model().name(), value)),
        }
        Ok(())
    }

    /// Log predictive probability of `value` given the summarised data.
    pub fn score_value(&self, hp: &HyperParams, value: Value) -> Result<f64, IrmError> {
        match (self, value) {
            (Suffstats::BetaBernoulli { heads, tails }, Value::Bool(v)) => {
                let alpha = hyper(hp, "alpha") + *heads as f64;
                let beta = hyper(hp, "beta") + *tails as f64;
                let numerator = if v { alpha } else { beta };
                Ok((numerator / (alpha + beta)).ln())
            }
            (Suffstats::BetaBernoulliNonConj { p, .. }, Value::Bool(v)) => {
                Ok(if v { p.ln() } else { (1.0 - p).ln() })
            }
            (Suffstats::GammaPoisson { n, sum, .. }, Value::Count(x)) => {
                let inv_beta = hyper(hp, "inv_beta");
                let shape = hyper(hp, "alpha") + *sum as f64;
                let scale = inv_beta / (1.0 + *n as f64 * inv_beta);
                let x = x as f64;
                Ok(ln_gamma(shape + x) - ln_gamma(shape) - ln_gamma(x + 1.0) + x * scale.ln()
                    - (shape + x) * (1.0 + scale).ln())
            }
            (Suffstats::NormalInverseChiSq { .. }, Value::Real(x)) => {
                let post = self.nix_posterior(hp);
                let scale_sq = post.sigmasq * (1.0 + post.kappa) / post.kappa;
                Ok(student_t_ln_pdf(x, post.nu, post.mu, scale_sq))
            }
            (stats, value) => Err(kind_mismatch(stats.model().name(), value)),
        }
    }

    /// Log marginal likelihood of the summarised data (for the non-conjugate
    /// model: joint density of the data and the instantiated parameter).
    pub fn score_data(&self, hp: &HyperParams) -> f64 {
        match self {
            Suffstats::BetaBernoulli { heads, tails } => {
                let alpha = hyper(hp, "alpha");
                let beta = hyper(hp, "beta");
                ln_beta(alpha + *heads as f64, beta + *tails as f64) - ln_beta(alpha, beta)
            }
            Suffstats::BetaBernoulliNonConj { heads, tails, p } => {
                let alpha = hyper(hp, "alpha");
                let beta = hyper(hp, "beta");
                if *p <= 0.0 || *p >= 1.0 {
                    return f64::NEG_INFINITY;
                }
                (alpha - 1.0 + *heads as f64) * p.ln() + (beta - 1.0 + *tails as f64) * (1.0 - p).ln()
                    - ln_beta(alpha, beta)
            }
            Suffstats::GammaPoisson { n, sum, log_prod } => {
                let alpha = hyper(hp, "alpha");
                let inv_beta = hyper(hp, "inv_beta");
                let shape = alpha + *sum as f64;
                let scale = inv_beta / (1.0 + *n as f64 * inv_beta);
                ln_gamma(shape) - ln_gamma(alpha) + shape * scale.ln() - alpha * inv_beta.ln()
                    - log_prod
            }
            Suffstats::NormalInverseChiSq { count, .. } => {
                let kappa = hyper(hp, "kappa");
                let nu = hyper(hp, "nu");
                let sigmasq = hyper(hp, "sigmasq");
                let post = self.nix_posterior(hp);
                let n = *count as f64;
                ln_gamma(post.nu / 2.0) - ln_gamma(nu / 2.0) + 0.5 * (kappa / post.kappa).ln()
                    + (nu / 2.0) * (nu * sigmasq).ln()
                    - (post.nu / 2.0) * (post.nu * post.sigmasq).ln()
                    - (n / 2.0) * PI.ln()
            }
        }
    }

    /// Current value of the latent parameter `name`, if the model has one.
    pub fn theta(&self, name: &str) -> Option<f64> {
        match (self, name) {
            (Suffstats::BetaBernoulliNonConj { p, .. }, "p") => Some(*p),
            _ => None,
        }
    }

    /// Overwrites the latent parameter `name`.
    pub fn set_theta(&mut self, name: &str, value: f64) -> Result<(), IrmError> {
        match (self, name) {
            (Suffstats::BetaBernoulliNonConj { p, .. }, "p") => {
                *p = value;
                Ok(())
            }
            (stats, name) => Err(IrmError::Model(
                ErrorInfo::new("unknown-theta", "component model has no such latent parameter")
                    .with_context("model", stats.model().name())
                    .with_context("name", name),
            )),
        }
    }

    fn nix_posterior(&self, hp: &HyperParams) -> NixPosterior {
        let (n, mean, ctv) = match self {
            Suffstats::NormalInverseChiSq {
                count,
                mean,
                count_times_variance,
            } => (*count as f64, *mean, *count_times_variance),
            _ => (0.0, 0.0, 0.0),
        };
        let mu = hyper(hp, "mu");
        let kappa = hyper(hp, "kappa");
        let sigmasq = hyper(hp, "sigmasq");
        let nu = hyper(hp, "nu");
        let kappa_n = kappa + n;
        let nu_n = nu + n;
        let mu_n = (kappa * mu + n * mean) / kappa_n;
        let sigmasq_n =
            (nu * sigmasq + ctv + n * kappa * (mu - mean).powi(2) / kappa_n) / nu_n;
        NixPosterior {
            kappa: kappa_n,
            mu: mu_n,
            nu: nu_n,
            sigmasq: sigmasq_n,
        }
    }
}

fn student_t_ln_pdf(x: f64, nu: f64, mu: f64, scale_sq: f64) -> f64 {
    let z = (x - mu).powi(2) / (nu * scale_sq);
    ln_gamma((nu + 1.0) / 2.0) - ln_gamma(nu / 2.0) - 0.5 * (nu * PI * scale_sq).ln()
        - (nu + 1.0) / 2.0 * z.ln_1p()
}

#[cfg(test)]
mod tests {
    use super::*;
    use irm_core::RngHandle;

    fn sequential_score(model: ComponentModel, values: &[Value]) -> (f64, f64) {
        let hp = model.default_hyperparams();
        let mut rng = RngHandle::from_seed(0);
        let mut stats = Suffstats::create(model, &hp, &mut rng).unwrap();
        let mut sequential = 0.0;
        for value in values {
            sequential += stats.score_value(&hp, *value).unwrap();
            stats.add_value(*value).unwrap();
        }
        (sequential, stats.score_data(&hp))
    }

    #[test]
    fn conjugate_predictives_chain_to_the_marginal() {
        let cases = [
            (
                ComponentModel::BetaBernoulli,
                vec![Value::Bool(true), Value::Bool(false), Value::Bool(true)],
            ),
            (
                ComponentModel::GammaPoisson,
                vec![Value::Count(3), Value::Count(0), Value::Count(7)],
            ),
            (
                ComponentModel::NormalInverseChiSq,
                vec![Value::Real(0.3), Value::Real(-1.2), Value::Real(2.5)],
            ),
        ];
        for (model, values) in cases {
            let (sequential, marginal) = sequential_score(model, &values);
            assert!(
                (sequential - marginal).abs() < 1e-9,
                "{model}: {sequential} vs {marginal}"
            );
        }
    }

    #[test]
    fn removal_inverts_addition() {
        let mut stats = Suffstats::NormalInverseChiSq {
            count: 0,
            mean: 0.0,
            count_times_variance: 0.0,
        };
        for x in [1.0, 2.0, 4.0] {
            stats.add_value(Value::Real(x)).unwrap();
        }
        stats.remove_value(Value::Real(4.0)).unwrap();
        match stats {
            Suffstats::NormalInverseChiSq {
                count,
                mean,
                count_times_variance,
            } => {
                assert_eq!(count, 2);
                assert!((mean - 1.5).abs() < 1e-12);
                assert!((count_times_variance - 0.5).abs() < 1e-12);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn mismatched_values_are_rejected() {
        let mut stats = Suffstats::BetaBernoulli { heads: 0, tails: 0 };
        let err = stats.add_value(Value::Real(1.0)).unwrap_err();
        assert_eq!(err.info().code, "value-kind");
        assert!(stats.remove_value(Value::Bool(true)).is_err());
    }
}
