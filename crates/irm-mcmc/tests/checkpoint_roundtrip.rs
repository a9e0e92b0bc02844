use std::sync::Arc;

use irm_core::{
    ComponentModel, Definition, DenseDataview, IrmError, RelationDefinition, RngHandle,
    SharedDataview, Value,
};
use irm_mcmc::{checkpoint_path, driver, CheckpointPayload, RunConfig};
use rand::Rng;
use tempfile::tempdir;

fn fixture(seed: u64) -> (Arc<Definition>, Vec<SharedDataview>) {
    let defn = Arc::new(
        Definition::new(
            vec![8, 4],
            vec![
                RelationDefinition::new(vec![0, 0], ComponentModel::BetaBernoulliNonConj),
                RelationDefinition::new(vec![0, 1], ComponentModel::GammaPoisson),
            ],
        )
        .unwrap(),
    );
    let mut rng = RngHandle::from_seed(seed);
    let bools: Vec<bool> = (0..64).map(|_| rng.gen_bool(0.5)).collect();
    let counts: Vec<Value> = (0..32).map(|_| Value::Count(rng.gen_range(0..4))).collect();
    let views: Vec<SharedDataview> = vec![
        Arc::new(DenseDataview::from_bools(vec![8, 8], &bools, &[false; 64]).unwrap()),
        Arc::new(DenseDataview::new(vec![8, 4], counts).unwrap()),
    ];
    (defn, views)
}

fn config(directory: &std::path::Path) -> RunConfig {
    let mut config = RunConfig {
        chains: 3,
        sweeps: 20,
        threads: 2,
        ..RunConfig::default()
    };
    config.checkpoint.directory = Some(directory.to_path_buf());
    config.checkpoint.interval = 5;
    config.seed_policy.label = Some("roundtrip".to_string());
    config
}

#[test]
fn resuming_from_a_checkpoint_reproduces_the_run() {
    let dir = tempdir().unwrap();
    let config = config(dir.path());
    let (defn, views) = fixture(1);

    let summary = driver::run(&config, defn.clone(), views.clone()).unwrap();
    assert_eq!(summary.sweeps, 20);
    assert_eq!(summary.chains, 3);
    assert_eq!(summary.checkpoints.len(), 4);
    assert_eq!(summary.scores.len(), 3);
    assert!(summary.scores.iter().all(|s| s.is_finite()));
    for latent in &summary.latents {
        latent.check_consistency(&views).unwrap();
    }

    let midpoint = checkpoint_path(dir.path(), 10);
    assert!(summary.checkpoints.contains(&midpoint));
    let payload = CheckpointPayload::load(&midpoint).unwrap();
    assert_eq!(payload.sweep, 10);
    assert_eq!(payload.chains.len(), 3);
    assert_eq!(payload.master_seed, Some(config.seed_policy.master_seed));
    assert_eq!(payload.seed_label.as_deref(), Some("roundtrip"));
    assert_eq!(payload.data_digest, summary.data_digest);
    assert!(chrono::DateTime::parse_from_rfc3339(&payload.created_at).is_ok());
    for state in payload.states().unwrap() {
        state.check_consistency(&views).unwrap();
    }

    let resumed = driver::resume(&config, defn, views, &midpoint).unwrap();
    assert_eq!(resumed.sweeps, 20);
    assert_eq!(resumed.latents, summary.latents);
    assert_eq!(resumed.scores, summary.scores);
}

#[test]
fn checkpoints_are_bound_to_their_data() {
    let dir = tempdir().unwrap();
    let config = config(dir.path());
    let (defn, views) = fixture(2);
    driver::run(&config, defn.clone(), views).unwrap();

    let (_, other_views) = fixture(3);
    let err = driver::resume(&config, defn, other_views, &checkpoint_path(dir.path(), 5)).unwrap_err();
    assert!(err.is_config());
    assert_eq!(err.info().code, "checkpoint-data-mismatch");
}

#[test]
fn missing_checkpoints_are_serde_errors() {
    let dir = tempdir().unwrap();
    let config = config(dir.path());
    let (defn, views) = fixture(4);
    let err = driver::resume(&config, defn, views, &dir.path().join("absent.json")).unwrap_err();
    match err {
        IrmError::Serde(info) => assert_eq!(info.code, "checkpoint-read"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn runs_without_an_interval_write_nothing() {
    let dir = tempdir().unwrap();
    let mut config = config(dir.path());
    config.checkpoint.interval = 0;
    config.sweeps = 4;
    let (defn, views) = fixture(5);
    let summary = driver::run(&config, defn, views).unwrap();
    assert!(summary.checkpoints.is_empty());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
