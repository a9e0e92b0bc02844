use std::fs;
use std::path::{Path, PathBuf};

use irm_core::{Definition, ErrorInfo, IrmError};
use serde::{Deserialize, Serialize};

use crate::kernel_config::{KernelConfig, KernelSpec};

/// YAML-configurable parameters of an ensemble run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of independent chains.
    #[serde(default = "default_chains")]
    pub chains: usize,
    /// Number of sweeps each chain runs.
    #[serde(default = "default_sweeps")]
    pub sweeps: usize,
    /// Worker threads; 0 uses rayon's default.
    #[serde(default)]
    pub threads: usize,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Kernels of one sweep; absent means the general default.
    #[serde(default)]
    pub kernels: Option<Vec<KernelSpec>>,
    /// Checkpointing behaviour.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

fn default_chains() -> usize {
    4
}

fn default_sweeps() -> usize {
    100
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            chains: default_chains(),
            sweeps: default_sweeps(),
            threads: 0,
            seed_policy: SeedPolicy::default(),
            kernels: None,
            checkpoint: CheckpointConfig::default(),
        }
    }
}

impl RunConfig {
    /// Parses a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, IrmError> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|err| IrmError::Serde(ErrorInfo::new("config-parse", err.to_string())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a YAML file.
    pub fn from_path(path: &Path) -> Result<Self, IrmError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            IrmError::Serde(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Rejects settings that can never run.
    pub fn validate(&self) -> Result<(), IrmError> {
        if self.chains == 0 {
            return Err(IrmError::config("invalid-chains", "at least one chain is required"));
        }
        if self.checkpoint.interval > 0 && self.checkpoint.directory.is_none() {
            return Err(IrmError::Config(
                ErrorInfo::new("checkpoint-directory", "checkpoint interval set without a directory")
                    .with_context("interval", self.checkpoint.interval),
            ));
        }
        Ok(())
    }

    /// Kernel configuration for `defn`: the listed kernels, or the general
    /// default when none are listed.
    pub fn kernel_config(&self, defn: &Definition) -> Result<KernelConfig, IrmError> {
        match &self.kernels {
            Some(specs) => KernelConfig::from_specs(defn, specs),
            None => KernelConfig::default_for(defn),
        }
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed of the run.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded with checkpoints.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x1A2B_3C4D_5E6F_7081_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Checkpointing configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Directory receiving checkpoint files.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Sweeps between checkpoints (0 disables them).
    #[serde(default)]
    pub interval: usize,
}
