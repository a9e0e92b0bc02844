#![deny(missing_docs)]

//! Latent state of the Infinite Relational Model together with the
//! component models and the sampling primitives that update it.

pub mod bind;
pub mod component;
pub mod group;
pub mod kernels;
pub mod partition;
pub mod serialization;
pub mod state;

pub use bind::{BoundRelation, BoundState};
pub use component::Suffstats;
pub use group::DomainState;
pub use partition::{canonical_assignment, canonicalize, exact_posterior, set_partitions};
pub use serialization::{state_from_bytes, state_from_json, state_to_bytes, state_to_json};
pub use state::{InitOptions, RelationState, State, SuffstatEntry};
