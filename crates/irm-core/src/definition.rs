//! Immutable structural description of an IRM.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::dataview::ValueKind;
use crate::errors::{ErrorInfo, IrmError};
use crate::prior::Prior;
use crate::HyperParams;

/// Name of the clustering concentration hyperparameter of every domain.
pub const CLUSTER_ALPHA: &str = "alpha";

/// Component model attached to a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentModel {
    /// Conjugate Beta–Bernoulli.
    #[serde(rename = "bb")]
    BetaBernoulli,
    /// Beta–Bernoulli with an explicitly instantiated per-group parameter.
    #[serde(rename = "bbnc")]
    BetaBernoulliNonConj,
    /// Conjugate Gamma–Poisson.
    #[serde(rename = "gp")]
    GammaPoisson,
    /// Conjugate Normal–Inverse-chi-squared.
    #[serde(rename = "nich")]
    NormalInverseChiSq,
}

impl ComponentModel {
    /// Short descriptor name.
    pub fn name(&self) -> &'static str {
        match self {
            ComponentModel::BetaBernoulli => "bb",
            ComponentModel::BetaBernoulliNonConj => "bbnc",
            ComponentModel::GammaPoisson => "gp",
            ComponentModel::NormalInverseChiSq => "nich",
        }
    }

    /// Parses a descriptor name.
    pub fn from_name(name: &str) -> Result<Self, IrmError> {
        match name {
            "bb" => Ok(ComponentModel::BetaBernoulli),
            "bbnc" => Ok(ComponentModel::BetaBernoulliNonConj),
            "gp" => Ok(ComponentModel::GammaPoisson),
            "nich" => Ok(ComponentModel::NormalInverseChiSq),
            other => Err(IrmError::Config(
                ErrorInfo::new("unknown-model", "unknown component model")
                    .with_context("name", other),
            )),
        }
    }

    /// Whether the model admits a closed-form marginal likelihood.
    pub fn is_conjugate(&self) -> bool {
        !matches!(self, ComponentModel::BetaBernoulliNonConj)
    }

    /// Type of the observations the model consumes.
    pub fn value_kind(&self) -> ValueKind {
        match self {
            ComponentModel::BetaBernoulli | ComponentModel::BetaBernoulliNonConj => {
                ValueKind::Bool
            }
            ComponentModel::GammaPoisson => ValueKind::Count,
            ComponentModel::NormalInverseChiSq => ValueKind::Real,
        }
    }

    /// Names of the relation-level hyperparameters.
    pub fn hyperparameter_names(&self) -> &'static [&'static str] {
        match self {
            ComponentModel::BetaBernoulli | ComponentModel::BetaBernoulliNonConj => {
                &["alpha", "beta"]
            }
            ComponentModel::GammaPoisson => &["alpha", "inv_beta"],
            ComponentModel::NormalInverseChiSq => &["mu", "kappa", "sigmasq", "nu"],
        }
    }

    /// Names of the per-group latent parameters sampled by the theta kernel.
    pub fn theta_names(&self) -> &'static [&'static str] {
        match self {
            ComponentModel::BetaBernoulliNonConj => &["p"],
            _ => &[],
        }
    }

    /// Hyperparameters used when none are supplied.
    pub fn default_hyperparams(&self) -> HyperParams {
        let pairs: &[(&str, f64)] = match self {
            ComponentModel::BetaBernoulli | ComponentModel::BetaBernoulliNonConj => {
                &[("alpha", 1.0), ("beta", 1.0)]
            }
            ComponentModel::GammaPoisson => &[("alpha", 1.0), ("inv_beta", 1.0)],
            ComponentModel::NormalInverseChiSq => {
                &[("mu", 0.0), ("kappa", 1.0), ("sigmasq", 1.0), ("nu", 1.0)]
            }
        };
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    /// Finite grid of hyperparameter settings, for models that expose one.
    pub fn default_grid(&self) -> Option<Vec<HyperParams>> {
        let (first, second, first_values, second_values): (&str, &str, &[f64], &[f64]) =
            match self {
                ComponentModel::BetaBernoulli | ComponentModel::BetaBernoulliNonConj => (
                    "alpha",
                    "beta",
                    &[0.5, 1.0, 2.0, 5.0],
                    &[0.5, 1.0, 2.0, 5.0],
                ),
                ComponentModel::GammaPoisson => {
                    ("alpha", "inv_beta", &[0.5, 1.0, 2.0, 5.0], &[0.5, 1.0, 2.0])
                }
                ComponentModel::NormalInverseChiSq => return None,
            };
        let mut grid = Vec::with_capacity(first_values.len() * second_values.len());
        for a in first_values {
            for b in second_values {
                let record: HyperParams = [(first.to_string(), *a), (second.to_string(), *b)]
                    .into_iter()
                    .collect();
                grid.push(record);
            }
        }
        Some(grid)
    }

    /// Checks that `hp` names exactly this model's hyperparameters with admissible values.
    pub fn check_hyperparams(&self, hp: &HyperParams) -> Result<(), IrmError> {
        let names = self.hyperparameter_names();
        if hp.len() != names.len() || names.iter().any(|name| !hp.contains_key(*name)) {
            return Err(IrmError::Config(
                ErrorInfo::new("hyperparam-keys", "hyperparameter keys do not match the model")
                    .with_context("model", self.name())
                    .with_context("expected", names.join(","))
                    .with_context(
                        "found",
                        hp.keys().cloned().collect::<Vec<_>>().join(","),
                    ),
            ));
        }
        for (key, value) in hp {
            let admissible = match key.as_str() {
                "mu" => value.is_finite(),
                _ => value.is_finite() && *value > 0.0,
            };
            if !admissible {
                return Err(IrmError::Config(
                    ErrorInfo::new("hyperparam-value", "hyperparameter outside its domain")
                        .with_context("model", self.name())
                        .with_context("key", key)
                        .with_context("value", value),
                ));
            }
        }
        Ok(())
    }
}

impl fmt::Display for ComponentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Checks a domain clustering hyperparameter record.
pub fn check_cluster_hyperparams(hp: &HyperParams) -> Result<(), IrmError> {
    match (hp.len(), hp.get(CLUSTER_ALPHA)) {
        (1, Some(alpha)) if alpha.is_finite() && *alpha > 0.0 => Ok(()),
        _ => Err(IrmError::Config(
            ErrorInfo::new(
                "cluster-hyperparams",
                "clustering hyperparameters must be exactly a positive `alpha`",
            )
            .with_context("found", format!("{hp:?}")),
        )),
    }
}

/// Default clustering hyperparameters.
pub fn default_cluster_hyperparams() -> HyperParams {
    [(CLUSTER_ALPHA.to_string(), 1.0)].into_iter().collect()
}

/// One relation: the domains indexing its axes and its component model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDefinition {
    /// Domain id of each axis; ids may repeat.
    pub domains: Vec<usize>,
    /// Component model for the relation's cells.
    pub model: ComponentModel,
}

impl RelationDefinition {
    /// Creates a relation definition.
    pub fn new(domains: Vec<usize>, model: ComponentModel) -> Self {
        Self { domains, model }
    }

    /// Number of axes.
    pub fn arity(&self) -> usize {
        self.domains.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DefinitionRepr {
    domains: Vec<usize>,
    relations: Vec<RelationDefinition>,
    #[serde(default)]
    domain_hyperpriors: Vec<BTreeMap<String, Prior>>,
    #[serde(default)]
    relation_hyperpriors: Vec<BTreeMap<String, Prior>>,
}

/// Immutable model structure shared by every chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DefinitionRepr", into = "DefinitionRepr")]
pub struct Definition {
    domains: Vec<usize>,
    relations: Vec<RelationDefinition>,
    domain_hyperpriors: Vec<BTreeMap<String, Prior>>,
    relation_hyperpriors: Vec<BTreeMap<String, Prior>>,
}

impl Definition {
    /// Validates and creates a definition without hyperpriors.
    pub fn new(domains: Vec<usize>, relations: Vec<RelationDefinition>) -> Result<Self, IrmError> {
        if domains.is_empty() {
            return Err(IrmError::config("definition-domains", "no domains given"));
        }
        if let Some(position) = domains.iter().position(|&n| n == 0) {
            return Err(IrmError::Config(
                ErrorInfo::new("definition-domains", "empty domain given")
                    .with_context("domain", position),
            ));
        }
        if relations.is_empty() {
            return Err(IrmError::config("definition-relations", "no relations given"));
        }
        for (rid, relation) in relations.iter().enumerate() {
            if relation.domains.is_empty() {
                return Err(IrmError::Config(
                    ErrorInfo::new("definition-relations", "relation has no axes")
                        .with_context("relation", rid),
                ));
            }
            if let Some(&bad) = relation.domains.iter().find(|&&d| d >= domains.len()) {
                return Err(IrmError::Config(
                    ErrorInfo::new("definition-relations", "relation references an unknown domain")
                        .with_context("relation", rid)
                        .with_context("domain", bad)
                        .with_context("ndomains", domains.len()),
                ));
            }
        }
        let ndomains = domains.len();
        let nrelations = relations.len();
        Ok(Self {
            domains,
            relations,
            domain_hyperpriors: vec![BTreeMap::new(); ndomains],
            relation_hyperpriors: vec![BTreeMap::new(); nrelations],
        })
    }

    /// Attaches a prior over a domain's clustering hyperparameter.
    pub fn with_domain_hyperprior(
        mut self,
        domain: usize,
        name: &str,
        prior: Prior,
    ) -> Result<Self, IrmError> {
        self.check_domain(domain)?;
        if name != CLUSTER_ALPHA {
            return Err(IrmError::Config(
                ErrorInfo::new("hyperprior-key", "unknown clustering hyperparameter")
                    .with_context("domain", domain)
                    .with_context("key", name),
            ));
        }
        prior.validate()?;
        self.domain_hyperpriors[domain].insert(name.to_string(), prior);
        Ok(self)
    }

    /// Attaches a prior over one of a relation's hyperparameters.
    pub fn with_relation_hyperprior(
        mut self,
        relation: usize,
        name: &str,
        prior: Prior,
    ) -> Result<Self, IrmError> {
        self.check_relation(relation)?;
        let model = self.relations[relation].model;
        if !model.hyperparameter_names().contains(&name) {
            return Err(IrmError::Config(
                ErrorInfo::new("hyperprior-key", "unknown relation hyperparameter")
                    .with_context("relation", relation)
                    .with_context("model", model.name())
                    .with_context("key", name),
            ));
        }
        prior.validate()?;
        self.relation_hyperpriors[relation].insert(name.to_string(), prior);
        Ok(self)
    }

    /// Entity count of every domain.
    pub fn domains(&self) -> &[usize] {
        &self.domains
    }

    /// Relation definitions in id order.
    pub fn relations(&self) -> &[RelationDefinition] {
        &self.relations
    }

    /// Number of domains.
    pub fn ndomains(&self) -> usize {
        self.domains.len()
    }

    /// Number of relations.
    pub fn nrelations(&self) -> usize {
        self.relations.len()
    }

    /// Component model of every relation.
    pub fn relation_models(&self) -> Vec<ComponentModel> {
        self.relations.iter().map(|r| r.model).collect()
    }

    /// Expected dataview shape of `relation`.
    pub fn shape(&self, relation: usize) -> Vec<usize> {
        self.relations[relation]
            .domains
            .iter()
            .map(|&d| self.domains[d])
            .collect()
    }

    /// Clustering hyperpriors of `domain` (empty when not sampled).
    pub fn domain_hyperpriors(&self, domain: usize) -> &BTreeMap<String, Prior> {
        &self.domain_hyperpriors[domain]
    }

    /// Hyperpriors of `relation` (empty when not sampled).
    pub fn relation_hyperpriors(&self, relation: usize) -> &BTreeMap<String, Prior> {
        &self.relation_hyperpriors[relation]
    }

    /// `(relation, axis)` pairs for every axis indexed by `domain`.
    pub fn domain_relations(&self, domain: usize) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for (rid, relation) in self.relations.iter().enumerate() {
            for (axis, &d) in relation.domains.iter().enumerate() {
                if d == domain {
                    out.push((rid, axis));
                }
            }
        }
        out
    }

    /// Errors unless `domain` is a valid domain id.
    pub fn check_domain(&self, domain: usize) -> Result<(), IrmError> {
        if domain < self.domains.len() {
            Ok(())
        } else {
            Err(IrmError::Config(
                ErrorInfo::new("domain-out-of-range", "domain id out of range")
                    .with_context("domain", domain)
                    .with_context("ndomains", self.domains.len()),
            ))
        }
    }

    /// Errors unless `relation` is a valid relation id.
    pub fn check_relation(&self, relation: usize) -> Result<(), IrmError> {
        if relation < self.relations.len() {
            Ok(())
        } else {
            Err(IrmError::Config(
                ErrorInfo::new("relation-out-of-range", "relation id out of range")
                    .with_context("relation", relation)
                    .with_context("nrelations", self.relations.len()),
            ))
        }
    }
}

impl TryFrom<DefinitionRepr> for Definition {
    type Error = IrmError;

    fn try_from(repr: DefinitionRepr) -> Result<Self, Self::Error> {
        let mut defn = Definition::new(repr.domains, repr.relations)?;
        for (domain, priors) in repr.domain_hyperpriors.into_iter().enumerate() {
            for (name, prior) in priors {
                defn = defn.with_domain_hyperprior(domain, &name, prior)?;
            }
        }
        for (relation, priors) in repr.relation_hyperpriors.into_iter().enumerate() {
            for (name, prior) in priors {
                defn = defn.with_relation_hyperprior(relation, &name, prior)?;
            }
        }
        Ok(defn)
    }
}

impl From<Definition> for DefinitionRepr {
    fn from(defn: Definition) -> Self {
        Self {
            domains: defn.domains,
            relations: defn.relations,
            domain_hyperpriors: defn.domain_hyperpriors,
            relation_hyperpriors: defn.relation_hyperpriors,
        }
    }
}
