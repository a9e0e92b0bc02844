#![deny(missing_docs)]

//! Core definitions shared by the IRM model and sampler crates: the model
//! structure, relation dataviews, hyperprior densities, seeded randomness and
//! the canonical error type.

use std::collections::BTreeMap;

pub mod dataview;
pub mod definition;
pub mod errors;
pub mod prior;
pub mod rng;
pub mod special;

pub use dataview::{
    digest_views, hex_digest, DenseDataview, Entry, RelationDataview, SharedDataview,
    SparseDataview, Value, ValueKind,
};
pub use definition::{
    check_cluster_hyperparams, default_cluster_hyperparams, ComponentModel, Definition,
    RelationDefinition, CLUSTER_ALPHA,
};
pub use errors::{ErrorInfo, IrmError};
pub use prior::{validate_width, JointPrior, Prior, SliceParam};
pub use rng::{derive_substream_seed, RngHandle};

/// Named hyperparameter record (a domain's or a relation's).
pub type HyperParams = BTreeMap<String, f64>;
