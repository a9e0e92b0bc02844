use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use irm_core::{hex_digest, ErrorInfo, IrmError};
use irm_model::{state_from_bytes, state_to_bytes, State};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::parallel::ParallelRunner;

/// Serialized latent state of one chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainCheckpoint {
    /// Chain index within the ensemble.
    pub chain: usize,
    /// Hex-encoded binary state.
    pub state: String,
}

/// Aggregated checkpoint payload with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointPayload {
    /// Sweeps completed when the checkpoint was written.
    pub sweep: usize,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// Master seed of the chain streams, if any.
    pub master_seed: Option<u64>,
    /// Optional seed label carried over from the run configuration.
    #[serde(default)]
    pub seed_label: Option<String>,
    /// Hex SHA-256 digest of the shared dataviews.
    pub data_digest: String,
    /// Chain states in chain order.
    pub chains: Vec<ChainCheckpoint>,
}

impl CheckpointPayload {
    /// Restores the payload from disk.
    pub fn load(path: &Path) -> Result<Self, IrmError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            IrmError::Serde(
                ErrorInfo::new("checkpoint-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            IrmError::Serde(
                ErrorInfo::new("checkpoint-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Writes the payload to disk.
    pub fn store(&self, path: &Path) -> Result<(), IrmError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                IrmError::Serde(
                    ErrorInfo::new("checkpoint-mkdir", err.to_string())
                        .with_context("path", parent.display().to_string()),
                )
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            IrmError::Serde(
                ErrorInfo::new("checkpoint-serialize", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        fs::write(path, json).map_err(|err| {
            IrmError::Serde(
                ErrorInfo::new("checkpoint-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Decodes every chain's state.
    pub fn states(&self) -> Result<Vec<State>, IrmError> {
        self.chains
            .iter()
            .map(|chain| {
                let bytes = hex::decode(&chain.state).map_err(|err| {
                    IrmError::Serde(
                        ErrorInfo::new("checkpoint-state", err.to_string())
                            .with_context("chain", chain.chain),
                    )
                })?;
                state_from_bytes(&bytes)
            })
            .collect()
    }
}

/// Captures every chain of `ensemble`.
pub fn build_payload(
    ensemble: &ParallelRunner,
    seed_label: Option<String>,
) -> Result<CheckpointPayload, IrmError> {
    let chains = ensemble
        .runners()
        .iter()
        .enumerate()
        .map(|(chain, runner)| {
            Ok(ChainCheckpoint {
                chain,
                state: hex::encode(state_to_bytes(runner.latent())?),
            })
        })
        .collect::<Result<Vec<_>, IrmError>>()?;
    Ok(CheckpointPayload {
        sweep: ensemble.sweeps_completed(),
        created_at: Utc::now().to_rfc3339(),
        master_seed: ensemble.master_seed(),
        seed_label,
        data_digest: hex_digest(ensemble.digest(Sha256::new())),
        chains,
    })
}

/// Loads the chain states of `payload` into `ensemble` after checking that
/// the checkpoint was taken over the same data.
pub fn restore_payload(ensemble: &mut ParallelRunner, payload: &CheckpointPayload) -> Result<(), IrmError> {
    let digest = hex_digest(ensemble.digest(Sha256::new()));
    if digest != payload.data_digest {
        return Err(IrmError::Config(
            ErrorInfo::new("checkpoint-data-mismatch", "checkpoint was taken over different data")
                .with_context("expected", &payload.data_digest)
                .with_context("found", digest),
        ));
    }
    ensemble.restore(payload.states()?, payload.sweep)
}

/// Path of the checkpoint written after `sweep` sweeps.
pub fn checkpoint_path(root: &Path, sweep: usize) -> PathBuf {
    root.join(format!("ckpt_{sweep:05}.json"))
}
