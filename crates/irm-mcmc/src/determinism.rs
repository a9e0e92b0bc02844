use irm_core::derive_substream_seed;

/// Derives the deterministic seed of one chain's stream.
pub fn chain_seed(master_seed: u64, chain: usize) -> u64 {
    derive_substream_seed(master_seed, chain as u64)
}

/// Derives the seed of one chain's stream when it is resumed after
/// `sweeps` completed sweeps.
pub fn resume_seed(master_seed: u64, chain: usize, sweeps: usize) -> u64 {
    derive_substream_seed(chain_seed(master_seed, chain), sweeps as u64)
}

/// Derives the seed used to draw a chain's initial latent state.
pub fn init_seed(master_seed: u64, chain: usize) -> u64 {
    derive_substream_seed(master_seed ^ 0xA5A5_A5A5_A5A5_A5A5, chain as u64)
}
