use std::sync::Arc;

use irm_core::{Definition, ErrorInfo, IrmError, SharedDataview};
use irm_model::kernels::{gibbs, grid, slice};
use irm_model::{BoundRelation, BoundState, State};
use rand::Rng;
use tracing::{debug, trace};

use crate::kernel_config::{Kernel, KernelConfig};

/// Single chain: one owned latent state driven through repeated sweeps of a
/// kernel configuration.
#[derive(Debug, Clone)]
pub struct Runner {
    defn: Arc<Definition>,
    views: Vec<SharedDataview>,
    state: State,
    kernels: KernelConfig,
}

impl Runner {
    /// Builds a runner over a private copy of `latent`. Grid kernels are
    /// materialized against `latent` here.
    pub fn new(
        defn: Arc<Definition>,
        views: Vec<SharedDataview>,
        latent: &State,
        kernels: KernelConfig,
    ) -> Result<Self, IrmError> {
        if views.len() != defn.nrelations() {
            return Err(IrmError::Config(
                ErrorInfo::new("dataview-count", "one dataview per relation is required")
                    .with_context("expected", defn.nrelations())
                    .with_context("found", views.len()),
            ));
        }
        latent.check_definition(&defn)?;
        latent.check_views(&views)?;
        kernels.validate(&defn)?;
        let mut kernels = kernels;
        kernels.materialize_grids(latent)?;
        Ok(Self {
            defn,
            views,
            state: latent.clone(),
            kernels,
        })
    }

    /// Runs `niters` sweeps. Kernels run in configuration order and each sees
    /// the state left by its predecessor.
    pub fn run<R: Rng + ?Sized>(&mut self, rng: &mut R, niters: usize) -> Result<(), IrmError> {
        if niters == 0 {
            return Ok(());
        }
        debug!(niters, nkernels = self.kernels.len(), "running sweeps");
        for sweep in 0..niters {
            for kernel in self.kernels.kernels() {
                trace!(sweep, kind = kernel.kind(), "applying kernel");
                apply_kernel(&mut self.state, &self.views, kernel, rng)?;
            }
        }
        Ok(())
    }

    /// Independent copy of the current latent state.
    pub fn get_latent(&self) -> State {
        self.state.clone()
    }

    /// Borrowed view of the current latent state.
    pub fn latent(&self) -> &State {
        &self.state
    }

    /// Replaces the latent state, e.g. when restoring a checkpoint.
    pub fn set_latent(&mut self, latent: State) -> Result<(), IrmError> {
        latent.check_definition(&self.defn)?;
        latent.check_views(&self.views)?;
        self.state = latent;
        Ok(())
    }

    /// Shared model definition.
    pub fn definition(&self) -> &Arc<Definition> {
        &self.defn
    }

    /// Shared dataviews, one per relation.
    pub fn views(&self) -> &[SharedDataview] {
        &self.views
    }

    /// Kernel configuration executed per sweep.
    pub fn kernel_config(&self) -> &KernelConfig {
        &self.kernels
    }
}

fn apply_kernel<R: Rng + ?Sized>(
    state: &mut State,
    views: &[SharedDataview],
    kernel: &Kernel,
    rng: &mut R,
) -> Result<(), IrmError> {
    match kernel {
        Kernel::Assign(domains) => {
            for &domain in domains {
                let mut bound = BoundState::bind(state, domain, views)?;
                gibbs::assign(&mut bound, rng)?;
            }
        }
        Kernel::AssignResample(domains) => {
            for (&domain, params) in domains {
                let mut bound = BoundState::bind(state, domain, views)?;
                gibbs::assign_resample(&mut bound, params.m, rng)?;
            }
        }
        Kernel::SliceClusterHp(domains) => {
            for (&domain, params) in domains {
                let mut bound = BoundState::bind(state, domain, views)?;
                slice::cluster_hp(&mut bound, &params.cparam, rng)?;
            }
        }
        Kernel::GridRelationHp(relations) => {
            for (&relation, params) in relations {
                let mut bound = BoundRelation::bind(state, relation)?;
                grid::relation_hp(&mut bound, &params.hpdf, &params.hgrid, rng)?;
            }
        }
        Kernel::SliceRelationHp(params) => {
            for (&relation, hparams) in &params.hparams {
                let mut bound = BoundRelation::bind(state, relation)?;
                slice::relation_hp(&mut bound, hparams, rng)?;
            }
        }
        Kernel::Theta(params) => {
            for (&relation, widths) in &params.tparams {
                let mut bound = BoundRelation::bind(state, relation)?;
                slice::theta(&mut bound, widths, rng)?;
            }
        }
    }
    Ok(())
}
