use std::collections::{BTreeMap, BTreeSet};

use irm_core::{
    validate_width, Definition, ErrorInfo, HyperParams, IrmError, JointPrior, SliceParam,
    CLUSTER_ALPHA,
};
use irm_model::State;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Parameters of an `assign_resample` kernel for one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResampleParams {
    /// Number of auxiliary groups offered per step.
    pub m: usize,
}

/// Parameters of a `slice_cluster_hp` kernel for one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterHpParams {
    /// Prior and step width per clustering hyperparameter.
    pub cparam: BTreeMap<String, SliceParam>,
}

/// Parameters of a `grid_relation_hp` kernel for one relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridParams {
    /// Joint prior weighting every candidate.
    pub hpdf: JointPrior,
    /// Candidate records. Partial records are completed from the initial
    /// state by [`KernelConfig::materialize_grids`].
    pub hgrid: Vec<HyperParams>,
}

/// Parameters of a `slice_relation_hp` kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SliceRelationParams {
    /// Prior and step width per hyperparameter, per relation.
    pub hparams: BTreeMap<usize, BTreeMap<String, SliceParam>>,
}

/// Parameters of a `theta` kernel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThetaParams {
    /// Slice width per latent parameter, per relation.
    pub tparams: BTreeMap<usize, BTreeMap<String, f64>>,
}

/// One sampling operation of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum Kernel {
    /// Collapsed Gibbs reassignment of every entity of each listed domain.
    Assign(BTreeSet<usize>),
    /// Auxiliary-group reassignment with `m` auxiliary groups per domain.
    AssignResample(BTreeMap<usize, ResampleParams>),
    /// Slice sampling of clustering hyperparameters per domain.
    SliceClusterHp(BTreeMap<usize, ClusterHpParams>),
    /// Griddy Gibbs over relation hyperparameter records.
    GridRelationHp(BTreeMap<usize, GridParams>),
    /// Slice sampling of relation hyperparameters.
    SliceRelationHp(SliceRelationParams),
    /// Slice sampling of per-group latent parameters.
    Theta(ThetaParams),
}

impl Kernel {
    /// Kind string of the kernel.
    pub fn kind(&self) -> &'static str {
        match self {
            Kernel::Assign(_) => "assign",
            Kernel::AssignResample(_) => "assign_resample",
            Kernel::SliceClusterHp(_) => "slice_cluster_hp",
            Kernel::GridRelationHp(_) => "grid_relation_hp",
            Kernel::SliceRelationHp(_) => "slice_relation_hp",
            Kernel::Theta(_) => "theta",
        }
    }

    fn validate(&self, defn: &Definition) -> Result<(), IrmError> {
        let kind = self.kind();
        let tag = |err: IrmError| IrmError::Config(err.info().clone().with_context("kind", kind));
        match self {
            Kernel::Assign(domains) => {
                for &domain in domains {
                    defn.check_domain(domain).map_err(tag)?;
                }
            }
            Kernel::AssignResample(domains) => {
                for (&domain, params) in domains {
                    defn.check_domain(domain).map_err(tag)?;
                    if params.m == 0 {
                        return Err(IrmError::Config(
                            ErrorInfo::new("invalid-m", "at least one auxiliary group is required")
                                .with_context("kind", kind)
                                .with_context("domain", domain),
                        ));
                    }
                }
            }
            Kernel::SliceClusterHp(domains) => {
                for (&domain, params) in domains {
                    defn.check_domain(domain).map_err(tag)?;
                    for (name, param) in &params.cparam {
                        check_name(kind, name, &[CLUSTER_ALPHA])?;
                        param.validate().map_err(tag)?;
                    }
                }
            }
            Kernel::GridRelationHp(relations) => {
                for (&relation, params) in relations {
                    defn.check_relation(relation).map_err(tag)?;
                    let names = defn.relations()[relation].model.hyperparameter_names();
                    if params.hgrid.is_empty() {
                        return Err(IrmError::Config(
                            ErrorInfo::new("empty-grid", "grid has no candidate records")
                                .with_context("kind", kind)
                                .with_context("relation", relation),
                        ));
                    }
                    for record in &params.hgrid {
                        for name in record.keys() {
                            check_name(kind, name, names)?;
                        }
                    }
                    for name in params.hpdf.0.keys() {
                        check_name(kind, name, names)?;
                    }
                    params.hpdf.validate().map_err(tag)?;
                }
            }
            Kernel::SliceRelationHp(params) => {
                for (&relation, hparams) in &params.hparams {
                    defn.check_relation(relation).map_err(tag)?;
                    let names = defn.relations()[relation].model.hyperparameter_names();
                    for (name, param) in hparams {
                        check_name(kind, name, names)?;
                        param.validate().map_err(tag)?;
                    }
                }
            }
            Kernel::Theta(params) => {
                for (&relation, widths) in &params.tparams {
                    defn.check_relation(relation).map_err(tag)?;
                    let names = defn.relations()[relation].model.theta_names();
                    for (name, &width) in widths {
                        check_name(kind, name, names)?;
                        validate_width(width).map_err(tag)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn check_name(kind: &str, name: &str, allowed: &[&str]) -> Result<(), IrmError> {
    if allowed.contains(&name) {
        return Ok(());
    }
    Err(IrmError::Config(
        ErrorInfo::new("unknown-parameter", "parameter name is not defined for this target")
            .with_context("kind", kind)
            .with_context("name", name)
            .with_hint(format!("expected one of {allowed:?}")),
    ))
}

/// Untyped kernel description as written in a run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KernelSpec {
    /// Kernel kind string.
    pub kind: String,
    /// Kind-specific parameters.
    #[serde(default)]
    pub params: serde_yaml::Value,
}

impl KernelSpec {
    /// Creates a spec from a kind string and raw parameters.
    pub fn new(kind: impl Into<String>, params: serde_yaml::Value) -> Self {
        Self {
            kind: kind.into(),
            params,
        }
    }

    /// Parses the raw parameters into a typed [`Kernel`]. Index ranges are
    /// checked later by [`KernelConfig::new`].
    pub fn parse(&self, defn: &Definition) -> Result<Kernel, IrmError> {
        match self.kind.as_str() {
            "assign" => parse_assign(&self.params, defn.ndomains()).map(Kernel::Assign),
            "assign_resample" => self.typed().map(Kernel::AssignResample),
            "slice_cluster_hp" => self.typed().map(Kernel::SliceClusterHp),
            "grid_relation_hp" => self.typed().map(Kernel::GridRelationHp),
            "slice_relation_hp" => self.typed().map(Kernel::SliceRelationHp),
            "theta" => self.typed().map(Kernel::Theta),
            other => Err(IrmError::Config(
                ErrorInfo::new("unknown-kernel", "unknown kernel kind")
                    .with_context("kind", other)
                    .with_hint(
                        "expected one of assign, assign_resample, slice_cluster_hp, \
                         grid_relation_hp, slice_relation_hp, theta",
                    ),
            )),
        }
    }

    fn typed<T: DeserializeOwned>(&self) -> Result<T, IrmError> {
        serde_yaml::from_value(self.params.clone()).map_err(|err| {
            IrmError::Config(
                ErrorInfo::new("kernel-params", err.to_string()).with_context("kind", &self.kind),
            )
        })
    }
}

fn parse_assign(params: &serde_yaml::Value, ndomains: usize) -> Result<BTreeSet<usize>, IrmError> {
    let malformed = |message: String| {
        IrmError::Config(ErrorInfo::new("kernel-params", message).with_context("kind", "assign"))
    };
    match params {
        serde_yaml::Value::Null => Ok((0..ndomains).collect()),
        serde_yaml::Value::Sequence(_) => serde_yaml::from_value::<Vec<usize>>(params.clone())
            .map(|domains| domains.into_iter().collect())
            .map_err(|err| malformed(err.to_string())),
        serde_yaml::Value::Mapping(entries) => {
            let mut domains = BTreeSet::new();
            for (key, value) in entries {
                let domain: usize = serde_yaml::from_value(key.clone())
                    .map_err(|err| malformed(err.to_string()))?;
                let empty = match value {
                    serde_yaml::Value::Null => true,
                    serde_yaml::Value::Mapping(inner) => inner.is_empty(),
                    _ => false,
                };
                if !empty {
                    return Err(IrmError::Config(
                        ErrorInfo::new("assign-params", "assign takes no per-domain parameters")
                            .with_context("kind", "assign")
                            .with_context("domain", domain),
                    ));
                }
                domains.insert(domain);
            }
            Ok(domains)
        }
        _ => Err(malformed(
            "assign expects a list of domain ids or a mapping of domain ids".to_string(),
        )),
    }
}

/// Validated, ordered list of kernels forming one sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelConfig {
    kernels: Vec<Kernel>,
}

impl KernelConfig {
    /// Validates every kernel against `defn`.
    pub fn new(defn: &Definition, kernels: Vec<Kernel>) -> Result<Self, IrmError> {
        let config = Self { kernels };
        config.validate(defn)?;
        Ok(config)
    }

    /// Parses and validates raw kernel specs.
    pub fn from_specs(defn: &Definition, specs: &[KernelSpec]) -> Result<Self, IrmError> {
        let kernels = specs
            .iter()
            .map(|spec| spec.parse(defn))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(defn, kernels)
    }

    /// Re-checks every index and parameter name against `defn`.
    pub fn validate(&self, defn: &Definition) -> Result<(), IrmError> {
        self.kernels.iter().try_for_each(|kernel| kernel.validate(defn))
    }

    /// Kernels in sweep order.
    pub fn kernels(&self) -> &[Kernel] {
        &self.kernels
    }

    /// Number of kernels per sweep.
    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    /// True when a sweep does nothing.
    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    /// Appends the kernels of `other`.
    pub fn extend(&mut self, other: KernelConfig) {
        self.kernels.extend(other.kernels);
    }

    /// Completes partial grid records with the current hyperparameters of
    /// `state` and checks that every resulting record is admissible. This is
    /// the one configuration step that depends on a latent state.
    pub fn materialize_grids(&mut self, state: &State) -> Result<(), IrmError> {
        for kernel in &mut self.kernels {
            let Kernel::GridRelationHp(relations) = kernel else {
                continue;
            };
            for (&relation, params) in relations.iter_mut() {
                let relation_state = state.relation(relation)?;
                for record in &mut params.hgrid {
                    let mut full = relation_state.hp().clone();
                    full.extend(record.iter().map(|(k, v)| (k.clone(), *v)));
                    relation_state.model().check_hyperparams(&full).map_err(|err| {
                        IrmError::Config(
                            err.info()
                                .clone()
                                .with_context("kind", "grid_relation_hp")
                                .with_context("relation", relation),
                        )
                    })?;
                    *record = full;
                }
            }
        }
        Ok(())
    }
}
