#![deny(missing_docs)]

//! Kernel scheduling and chain runners for MCMC inference over the
//! Infinite Relational Model.

/// Checkpoint payloads with provenance.
pub mod checkpoint;
/// YAML run configuration.
pub mod config;
/// Default kernel configurations derived from a definition.
pub mod defaults;
/// Deterministic seed derivation for chains.
pub mod determinism;
/// Configured ensemble runs and resumption from checkpoints.
pub mod driver;
/// Typed kernels, raw kernel specs and validated kernel configurations.
pub mod kernel_config;
/// Ensemble of independent chains.
pub mod parallel;
/// Posterior summaries over sampled states.
pub mod query;
/// Single-chain runner.
pub mod runner;

pub use checkpoint::{build_payload, checkpoint_path, restore_payload, CheckpointPayload};
pub use config::{CheckpointConfig, RunConfig, SeedPolicy};
pub use defaults::{
    default_assign_kernels, default_cluster_hp_kernels, default_grid_relation_hp_kernels,
    default_kernels, default_relation_hp_kernels,
};
pub use driver::{build_ensemble, resume, run, RunSummary};
pub use kernel_config::{
    ClusterHpParams, GridParams, Kernel, KernelConfig, KernelSpec, ResampleParams,
    SliceRelationParams, ThetaParams,
};
pub use parallel::ParallelRunner;
pub use query::zmatrix;
pub use runner::Runner;
