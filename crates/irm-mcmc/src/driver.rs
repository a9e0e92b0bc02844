use std::path::{Path, PathBuf};
use std::sync::Arc;

use irm_core::{hex_digest, Definition, IrmError, RngHandle, SharedDataview};
use irm_model::{InitOptions, State};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::checkpoint::{self, CheckpointPayload};
use crate::config::RunConfig;
use crate::determinism;
use crate::parallel::ParallelRunner;
use crate::runner::Runner;

/// Summary returned after a configured run completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of chains.
    pub chains: usize,
    /// Sweeps completed by every chain.
    pub sweeps: usize,
    /// Hex digest of the shared dataviews.
    pub data_digest: String,
    /// Joint log score (clustering prior plus likelihood) per chain.
    pub scores: Vec<f64>,
    /// Checkpoint files written during the run.
    pub checkpoints: Vec<PathBuf>,
    /// Final latent state per chain.
    pub latents: Vec<State>,
}

/// Builds an ensemble with one prior-initialized chain per configured chain.
pub fn build_ensemble(
    config: &RunConfig,
    defn: Arc<Definition>,
    views: Vec<SharedDataview>,
) -> Result<ParallelRunner, IrmError> {
    config.validate()?;
    let kernels = config.kernel_config(&defn)?;
    let master_seed = config.seed_policy.master_seed;
    let runners = (0..config.chains)
        .map(|chain| {
            let mut rng = RngHandle::from_seed(determinism::init_seed(master_seed, chain));
            let latent = State::initialize(&defn, &views, &mut rng, InitOptions::default())?;
            Runner::new(defn.clone(), views.clone(), &latent, kernels.clone())
        })
        .collect::<Result<Vec<_>, IrmError>>()?;
    Ok(ParallelRunner::new(runners)?
        .with_master_seed(master_seed)
        .with_threads(config.threads))
}

/// Runs a fresh ensemble for `config.sweeps` sweeps.
pub fn run(
    config: &RunConfig,
    defn: Arc<Definition>,
    views: Vec<SharedDataview>,
) -> Result<RunSummary, IrmError> {
    let mut ensemble = build_ensemble(config, defn, views)?;
    drive(config, &mut ensemble)
}

/// Restores an ensemble from `checkpoint` and runs it up to
/// `config.sweeps` sweeps.
pub fn resume(
    config: &RunConfig,
    defn: Arc<Definition>,
    views: Vec<SharedDataview>,
    checkpoint: &Path,
) -> Result<RunSummary, IrmError> {
    let payload = CheckpointPayload::load(checkpoint)?;
    let mut ensemble = build_ensemble(config, defn, views)?;
    if let Some(master_seed) = payload.master_seed {
        ensemble = ensemble.with_master_seed(master_seed);
    }
    checkpoint::restore_payload(&mut ensemble, &payload)?;
    info!(sweep = payload.sweep, path = %checkpoint.display(), "resuming from checkpoint");
    drive(config, &mut ensemble)
}

fn drive(config: &RunConfig, ensemble: &mut ParallelRunner) -> Result<RunSummary, IrmError> {
    let interval = config.checkpoint.interval;
    let mut checkpoints = Vec::new();
    // chain streams are seeded from the master seed, so this is never drawn from
    let mut unused = RngHandle::from_seed(config.seed_policy.master_seed);
    while ensemble.sweeps_completed() < config.sweeps {
        let remaining = config.sweeps - ensemble.sweeps_completed();
        let chunk = if interval > 0 { interval.min(remaining) } else { remaining };
        ensemble.run(&mut unused, chunk)?;
        if let Some(master_seed) = ensemble.master_seed() {
            ensemble.reseed(master_seed, ensemble.sweeps_completed());
        }
        if interval == 0 {
            continue;
        }
        if let Some(directory) = &config.checkpoint.directory {
            let payload = checkpoint::build_payload(ensemble, config.seed_policy.label.clone())?;
            let path = checkpoint::checkpoint_path(directory, payload.sweep);
            payload.store(&path)?;
            checkpoints.push(path);
        }
    }
    let latents = ensemble.get_latents();
    let scores = latents
        .iter()
        .map(|latent| latent.score_assignment_total() + latent.score_likelihood_total())
        .collect();
    let summary = RunSummary {
        chains: ensemble.nchains(),
        sweeps: ensemble.sweeps_completed(),
        data_digest: hex_digest(ensemble.digest(Sha256::new())),
        scores,
        checkpoints,
        latents,
    };
    info!(chains = summary.chains, sweeps = summary.sweeps, "run complete");
    Ok(summary)
}
