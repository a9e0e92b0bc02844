use irm_core::{digest_views, IrmError, RngHandle};
use irm_model::State;
use rand::RngCore;
use rayon::prelude::*;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::determinism;
use crate::runner::Runner;

/// Ensemble of independent chains sharing a definition and dataviews.
///
/// Every chain owns its latent state and its random stream. Both persist
/// across calls to [`ParallelRunner::run`], so repeated calls continue the
/// chains rather than restarting them.
#[derive(Debug)]
pub struct ParallelRunner {
    runners: Vec<Runner>,
    streams: Option<Vec<RngHandle>>,
    master_seed: Option<u64>,
    threads: usize,
    sweeps: usize,
}

impl ParallelRunner {
    /// Wraps a non-empty set of runners.
    pub fn new(runners: Vec<Runner>) -> Result<Self, IrmError> {
        if runners.is_empty() {
            return Err(IrmError::config(
                "empty-ensemble",
                "a parallel runner needs at least one chain",
            ));
        }
        Ok(Self {
            runners,
            streams: None,
            master_seed: None,
            threads: 0,
            sweeps: 0,
        })
    }

    /// Seeds every chain's stream from `master_seed` instead of from the
    /// caller's generator on the first run.
    pub fn with_master_seed(mut self, master_seed: u64) -> Self {
        self.reseed(master_seed, 0);
        self
    }

    /// Limits the worker pool to `threads` threads (0 keeps rayon's default).
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Number of chains.
    pub fn nchains(&self) -> usize {
        self.runners.len()
    }

    /// Total sweeps completed by every chain so far.
    pub fn sweeps_completed(&self) -> usize {
        self.sweeps
    }

    /// Master seed of the chain streams, if one was set.
    pub fn master_seed(&self) -> Option<u64> {
        self.master_seed
    }

    /// Chains in construction order.
    pub fn runners(&self) -> &[Runner] {
        &self.runners
    }

    /// Runs `niters` sweeps on every chain concurrently and returns once all
    /// chains are done. The first failing chain (lowest index) is reported
    /// as an ensemble failure; other chains keep the progress they made, and
    /// the sweep counter only advances when every chain completes.
    pub fn run<R: RngCore + ?Sized>(&mut self, rng: &mut R, niters: usize) -> Result<(), IrmError> {
        let nchains = self.runners.len();
        let streams = self
            .streams
            .get_or_insert_with(|| RngHandle::fork_chains(rng, nchains));
        if niters == 0 {
            return Ok(());
        }
        debug!(nchains, niters, threads = self.threads, "dispatching chains");
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads)
            .build()
            .map_err(|err| IrmError::config("thread-pool", err.to_string()))?;
        let results: Vec<Result<(), IrmError>> = pool.install(|| {
            self.runners
                .par_iter_mut()
                .zip_eq(streams.par_iter_mut())
                .map(|(runner, stream)| runner.run(stream, niters))
                .collect()
        });
        for (chain, result) in results.into_iter().enumerate() {
            if let Err(err) = result {
                warn!(chain, error = %err, "chain failed");
                return Err(IrmError::ensemble(chain, err));
            }
        }
        self.sweeps += niters;
        Ok(())
    }

    /// Independent copies of every chain's latent state, in chain order.
    pub fn get_latents(&self) -> Vec<State> {
        self.runners.iter().map(Runner::get_latent).collect()
    }

    /// Folds a fingerprint of the shared dataviews into `hasher`.
    pub fn digest(&self, hasher: Sha256) -> Sha256 {
        digest_views(self.runners[0].views(), hasher)
    }

    /// Replaces every chain's state and resets the sweep counter, reseeding
    /// the streams from the master seed when one is set.
    pub(crate) fn restore(&mut self, latents: Vec<State>, sweeps: usize) -> Result<(), IrmError> {
        if latents.len() != self.runners.len() {
            return Err(IrmError::config(
                "checkpoint-chains",
                format!(
                    "checkpoint holds {} chains, ensemble has {}",
                    latents.len(),
                    self.runners.len()
                ),
            ));
        }
        for (runner, latent) in self.runners.iter_mut().zip(latents) {
            runner.set_latent(latent)?;
        }
        self.sweeps = sweeps;
        match self.master_seed {
            Some(master_seed) => self.reseed(master_seed, sweeps),
            None => self.streams = None,
        }
        Ok(())
    }

    /// Reseeds every stream from `master_seed` at sweep offset `sweeps`.
    pub(crate) fn reseed(&mut self, master_seed: u64, sweeps: usize) {
        self.master_seed = Some(master_seed);
        self.streams = Some(
            (0..self.runners.len())
                .map(|chain| {
                    if sweeps == 0 {
                        RngHandle::for_chain(master_seed, chain)
                    } else {
                        RngHandle::from_seed(determinism::resume_seed(master_seed, chain, sweeps))
                    }
                })
                .collect(),
        );
    }
}
