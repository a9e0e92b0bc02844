use std::collections::BTreeMap;
use std::sync::Arc;

use irm_core::{
    digest_views, hex_digest, ComponentModel, Definition, DenseDataview, IrmError, Prior,
    RelationDefinition, RngHandle, SharedDataview, SliceParam,
};
use irm_mcmc::{ClusterHpParams, Kernel, KernelConfig, ParallelRunner, Runner};
use irm_model::{InitOptions, State};
use rand::Rng;
use sha2::{Digest, Sha256};

fn fixture(n: usize, seed: u64) -> (Arc<Definition>, Vec<SharedDataview>) {
    let defn = Arc::new(
        Definition::new(
            vec![n],
            vec![RelationDefinition::new(vec![0, 0], ComponentModel::BetaBernoulli)],
        )
        .unwrap(),
    );
    let mut rng = RngHandle::from_seed(seed);
    let values: Vec<bool> = (0..n * n).map(|_| rng.gen_bool(0.3)).collect();
    let views: Vec<SharedDataview> =
        vec![Arc::new(DenseDataview::from_bools(vec![n, n], &values, &vec![false; n * n]).unwrap())];
    (defn, views)
}

fn ensemble(nchains: usize, seed: u64) -> (ParallelRunner, Vec<SharedDataview>) {
    let (defn, views) = fixture(10, seed);
    let kernels = KernelConfig::default_for(&defn).unwrap();
    let runners = (0..nchains)
        .map(|chain| {
            let mut rng = RngHandle::from_seed(seed + chain as u64);
            let latent = State::initialize(&defn, &views, &mut rng, InitOptions::default()).unwrap();
            Runner::new(defn.clone(), views.clone(), &latent, kernels.clone()).unwrap()
        })
        .collect();
    (ParallelRunner::new(runners).unwrap(), views)
}

#[test]
fn every_chain_advances_and_stays_consistent() {
    let (mut parallel, views) = ensemble(4, 10);
    let before = parallel.get_latents();
    let mut rng = RngHandle::from_seed(11);
    parallel.run(&mut rng, 100).unwrap();
    let latents = parallel.get_latents();
    assert_eq!(latents.len(), 4);
    assert_eq!(parallel.sweeps_completed(), 100);
    for latent in &latents {
        latent.check_consistency(&views).unwrap();
    }
    assert_ne!(before, latents);
}

#[test]
fn split_runs_continue_the_same_chains() {
    let (mut split, _) = ensemble(3, 20);
    let (mut whole, _) = ensemble(3, 20);
    let mut rng_split = RngHandle::from_seed(21);
    let mut rng_whole = RngHandle::from_seed(21);

    split.run(&mut rng_split, 10).unwrap();
    split.run(&mut rng_split, 10).unwrap();
    whole.run(&mut rng_whole, 20).unwrap();

    assert_eq!(split.get_latents(), whole.get_latents());
    assert_eq!(split.sweeps_completed(), 20);
}

#[test]
fn thread_count_does_not_change_the_result() {
    let (single, _) = ensemble(4, 30);
    let (many, _) = ensemble(4, 30);
    let mut single = single.with_master_seed(31).with_threads(1);
    let mut many = many.with_master_seed(31).with_threads(4);
    let mut unused = RngHandle::from_seed(0);
    single.run(&mut unused, 15).unwrap();
    many.run(&mut unused, 15).unwrap();
    assert_eq!(single.get_latents(), many.get_latents());
    assert_eq!(single.master_seed(), Some(31));
}

#[test]
fn digest_covers_the_shared_dataviews() {
    let (parallel, views) = ensemble(2, 40);
    let expected = hex_digest(digest_views(&views, Sha256::new()));
    assert_eq!(hex_digest(parallel.digest(Sha256::new())), expected);

    let (_, other_views) = fixture(10, 41);
    assert_ne!(hex_digest(digest_views(&other_views, Sha256::new())), expected);
}

#[test]
fn an_empty_ensemble_is_rejected() {
    let err = ParallelRunner::new(Vec::new()).unwrap_err();
    assert!(err.is_config());
    assert_eq!(err.info().code, "empty-ensemble");
}

#[test]
fn a_failing_chain_is_reported_by_index() {
    let (defn, views) = fixture(6, 50);
    let mut cparam = BTreeMap::new();
    cparam.insert(
        "alpha".to_string(),
        SliceParam::new(Prior::Uniform { low: 2.0, high: 3.0 }, 0.25),
    );
    let kernels = KernelConfig::new(
        &defn,
        vec![Kernel::SliceClusterHp(
            [(0, ClusterHpParams { cparam })].into_iter().collect(),
        )],
    )
    .unwrap();
    let failing = 2;
    let runners = (0..4)
        .map(|chain| {
            let alpha = if chain == failing { 1.0 } else { 2.5 };
            let options = InitOptions::default()
                .with_cluster_hp(0, [("alpha".to_string(), alpha)].into_iter().collect());
            let mut rng = RngHandle::from_seed(chain as u64);
            let latent = State::initialize(&defn, &views, &mut rng, options).unwrap();
            Runner::new(defn.clone(), views.clone(), &latent, kernels.clone()).unwrap()
        })
        .collect();
    let mut parallel = ParallelRunner::new(runners).unwrap();
    let mut rng = RngHandle::from_seed(51);
    let err = parallel.run(&mut rng, 3).unwrap_err();
    match &err {
        IrmError::Ensemble(info) => {
            assert_eq!(info.code, "slice-start");
            assert_eq!(info.context["chain"], failing.to_string());
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(parallel.sweeps_completed(), 0);

    let latents = parallel.get_latents();
    for (chain, latent) in latents.iter().enumerate() {
        if chain != failing {
            let alpha = latent.cluster_hp(0).unwrap()["alpha"];
            assert!((2.0..=3.0).contains(&alpha));
        }
    }
}
