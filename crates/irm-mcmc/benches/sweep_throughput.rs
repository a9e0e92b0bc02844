use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use irm_core::{
    ComponentModel, Definition, DenseDataview, RelationDefinition, RngHandle, SharedDataview,
};
use irm_mcmc::{KernelConfig, ParallelRunner, Runner};
use irm_model::{InitOptions, State};
use rand::Rng;

fn fixture(n: usize, model: ComponentModel) -> (Arc<Definition>, Vec<SharedDataview>) {
    let defn = Arc::new(
        Definition::new(vec![n], vec![RelationDefinition::new(vec![0, 0], model)])
            .expect("definition"),
    );
    let mut rng = RngHandle::from_seed(7);
    let values: Vec<bool> = (0..n * n).map(|_| rng.gen_bool(0.2)).collect();
    let view = DenseDataview::from_bools(vec![n, n], &values, &vec![false; n * n]).expect("view");
    (defn, vec![Arc::new(view) as SharedDataview])
}

fn runner(n: usize, model: ComponentModel, seed: u64) -> Runner {
    let (defn, views) = fixture(n, model);
    let mut rng = RngHandle::from_seed(seed);
    let latent = State::initialize(&defn, &views, &mut rng, InitOptions::default()).expect("state");
    let kernels = KernelConfig::default_for(&defn).expect("kernels");
    Runner::new(defn, views, &latent, kernels).expect("runner")
}

fn bench_single_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_chain_sweep");
    for &(label, model) in &[
        ("beta_bernoulli", ComponentModel::BetaBernoulli),
        ("beta_bernoulli_nonconj", ComponentModel::BetaBernoulliNonConj),
    ] {
        for &n in &[20usize, 60] {
            group.bench_with_input(BenchmarkId::new(label, n), &n, |b, &n| {
                let mut chain = runner(n, model, 11);
                let mut rng = RngHandle::from_seed(12);
                b.iter(|| {
                    chain.run(&mut rng, 1).expect("sweep");
                    black_box(chain.latent().ngroups(0).expect("groups"));
                });
            });
        }
    }
    group.finish();
}

fn bench_ensemble(c: &mut Criterion) {
    let runners: Vec<Runner> = (0..4)
        .map(|chain| runner(40, ComponentModel::BetaBernoulli, chain))
        .collect();
    let mut ensemble = ParallelRunner::new(runners)
        .expect("ensemble")
        .with_master_seed(3);
    let mut rng = RngHandle::from_seed(0);
    c.bench_function("ensemble_4x40_sweep", |b| {
        b.iter(|| ensemble.run(&mut rng, 1).expect("sweeps"));
    });
}

criterion_group!(benches, bench_single_chain, bench_ensemble);
criterion_main!(benches);
