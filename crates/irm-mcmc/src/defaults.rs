use std::collections::{BTreeMap, BTreeSet};

use irm_core::{Definition, IrmError, JointPrior, SliceParam};

use crate::kernel_config::{
    ClusterHpParams, GridParams, Kernel, KernelConfig, ResampleParams, SliceRelationParams,
    ThetaParams,
};

/// Auxiliary groups used by the default `assign_resample` kernel.
pub const DEFAULT_AUX_GROUPS: usize = 10;
/// Step width attached to every default slice kernel.
pub const DEFAULT_SLICE_WIDTH: f64 = 0.1;

/// Domains touched by at least one non-conjugate relation.
pub fn nonconjugate_domains(defn: &Definition) -> BTreeSet<usize> {
    defn.relations()
        .iter()
        .filter(|relation| !relation.model.is_conjugate())
        .flat_map(|relation| relation.domains.iter().copied())
        .collect()
}

/// Assignment kernels: `assign` over conjugate-only domains, then
/// `assign_resample` and `theta` for domains touched by a non-conjugate
/// relation.
pub fn default_assign_kernels(defn: &Definition) -> Vec<Kernel> {
    let nonconj = nonconjugate_domains(defn);
    let conj: BTreeSet<usize> = (0..defn.ndomains()).filter(|d| !nonconj.contains(d)).collect();
    let mut kernels = Vec::new();
    if !conj.is_empty() {
        kernels.push(Kernel::Assign(conj));
    }
    if !nonconj.is_empty() {
        kernels.push(Kernel::AssignResample(
            nonconj
                .iter()
                .map(|&d| (d, ResampleParams { m: DEFAULT_AUX_GROUPS }))
                .collect(),
        ));
        let tparams = defn
            .relations()
            .iter()
            .enumerate()
            .filter(|(_, relation)| !relation.model.is_conjugate())
            .map(|(rid, relation)| {
                let widths = relation
                    .model
                    .theta_names()
                    .iter()
                    .map(|name| (name.to_string(), DEFAULT_SLICE_WIDTH))
                    .collect();
                (rid, widths)
            })
            .collect();
        kernels.push(Kernel::Theta(ThetaParams { tparams }));
    }
    kernels
}

/// One `slice_relation_hp` kernel covering every relation with a hyperprior.
pub fn default_relation_hp_kernels(defn: &Definition) -> Vec<Kernel> {
    let hparams: BTreeMap<usize, BTreeMap<String, SliceParam>> = (0..defn.nrelations())
        .filter_map(|rid| {
            let priors = defn.relation_hyperpriors(rid);
            (!priors.is_empty()).then(|| (rid, with_default_width(priors)))
        })
        .collect();
    if hparams.is_empty() {
        Vec::new()
    } else {
        vec![Kernel::SliceRelationHp(SliceRelationParams { hparams })]
    }
}

/// One `grid_relation_hp` kernel covering every relation whose model has a
/// finite default grid.
pub fn default_grid_relation_hp_kernels(defn: &Definition) -> Vec<Kernel> {
    let grids: BTreeMap<usize, GridParams> = defn
        .relations()
        .iter()
        .enumerate()
        .filter_map(|(rid, relation)| {
            let hgrid = relation.model.default_grid()?;
            let hpdf = JointPrior::new(defn.relation_hyperpriors(rid).clone());
            Some((rid, GridParams { hpdf, hgrid }))
        })
        .collect();
    if grids.is_empty() {
        Vec::new()
    } else {
        vec![Kernel::GridRelationHp(grids)]
    }
}

/// One `slice_cluster_hp` kernel covering every domain with a hyperprior.
pub fn default_cluster_hp_kernels(defn: &Definition) -> Vec<Kernel> {
    let domains: BTreeMap<usize, ClusterHpParams> = (0..defn.ndomains())
        .filter_map(|did| {
            let priors = defn.domain_hyperpriors(did);
            (!priors.is_empty()).then(|| {
                (
                    did,
                    ClusterHpParams {
                        cparam: with_default_width(priors),
                    },
                )
            })
        })
        .collect();
    if domains.is_empty() {
        Vec::new()
    } else {
        vec![Kernel::SliceClusterHp(domains)]
    }
}

/// Assignment kernels followed by relation hyperparameter kernels.
pub fn default_kernels(defn: &Definition) -> Vec<Kernel> {
    let mut kernels = default_assign_kernels(defn);
    kernels.extend(default_relation_hp_kernels(defn));
    kernels
}

impl KernelConfig {
    /// Validated general default for `defn`.
    pub fn default_for(defn: &Definition) -> Result<Self, IrmError> {
        Self::new(defn, default_kernels(defn))
    }
}

fn with_default_width(
    priors: &BTreeMap<String, irm_core::Prior>,
) -> BTreeMap<String, SliceParam> {
    priors
        .iter()
        .map(|(name, prior)| (name.clone(), SliceParam::new(*prior, DEFAULT_SLICE_WIDTH)))
        .collect()
}
