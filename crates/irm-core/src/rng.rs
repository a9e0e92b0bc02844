//! Per-chain entropy streams.
//!
//! Every chain of an ensemble draws from its own [`RngHandle`]. Streams are
//! either rooted at a master seed, where chain `i` reads substream `i`, or
//! forked from a caller-supplied generator.

use std::hash::Hasher;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use siphasher::sip::SipHasher13;

/// Seedable entropy stream owned by one chain.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Stream seeded directly with `seed`.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Stream of `chain` in the family rooted at `master_seed`.
    pub fn for_chain(master_seed: u64, chain: usize) -> Self {
        Self::from_seed(derive_substream_seed(master_seed, chain as u64))
    }

    /// Stream of `chain` forked from one draw of `source`. The draw is mixed
    /// with the chain index, so two chains never share a seed even when the
    /// source repeats a value.
    pub fn fork_chain<R: RngCore + ?Sized>(source: &mut R, chain: usize) -> Self {
        Self::for_chain(source.next_u64(), chain)
    }

    /// One stream per chain, forked from `source` in chain order.
    pub fn fork_chains<R: RngCore + ?Sized>(source: &mut R, nchains: usize) -> Vec<Self> {
        (0..nchains).map(|chain| Self::fork_chain(source, chain)).collect()
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// Seed of `substream` under `master_seed`: SipHash-1-3 with zero keys over
/// both words.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(substream);
    hasher.finish()
}
