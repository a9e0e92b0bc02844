use std::collections::BTreeMap;
use std::sync::Arc;

use irm_core::{
    ComponentModel, Definition, DenseDataview, Prior, RelationDefinition, RngHandle,
    SharedDataview, SliceParam,
};
use irm_mcmc::{GridParams, Kernel, KernelConfig, KernelSpec, Runner};
use irm_model::{InitOptions, State};

fn two_domain_definition() -> Definition {
    Definition::new(
        vec![4, 3],
        vec![
            RelationDefinition::new(vec![0, 1], ComponentModel::BetaBernoulli),
            RelationDefinition::new(vec![1, 1], ComponentModel::BetaBernoulliNonConj),
        ],
    )
    .unwrap()
}

fn spec(kind: &str, yaml: &str) -> KernelSpec {
    KernelSpec::new(kind, serde_yaml::from_str(yaml).unwrap())
}

#[test]
fn out_of_range_domain_is_a_configuration_error() {
    let defn = two_domain_definition();
    let err = KernelConfig::new(&defn, vec![Kernel::Assign([5].into_iter().collect())]).unwrap_err();
    assert!(err.is_config());
    assert_eq!(err.info().code, "domain-out-of-range");
    assert_eq!(err.info().context["kind"], "assign");

    let err = KernelConfig::from_specs(&defn, &[spec("assign_resample", "{5: {m: 3}}")]).unwrap_err();
    assert!(err.is_config());
    let err = KernelConfig::from_specs(&defn, &[spec("theta", "{tparams: {2: {p: 0.1}}}")]).unwrap_err();
    assert_eq!(err.info().code, "relation-out-of-range");
}

#[test]
fn unknown_kind_is_rejected_without_touching_runners() {
    let defn = Arc::new(two_domain_definition());
    let views: Vec<SharedDataview> = vec![
        Arc::new(DenseDataview::from_bools(vec![4, 3], &[true; 12], &[false; 12]).unwrap()),
        Arc::new(DenseDataview::from_bools(vec![3, 3], &[false; 9], &[false; 9]).unwrap()),
    ];
    let mut rng = RngHandle::from_seed(1);
    let latent = State::initialize(&defn, &views, &mut rng, InitOptions::default()).unwrap();
    let runner = Runner::new(defn.clone(), views, &latent, KernelConfig::default_for(&defn).unwrap())
        .unwrap();
    let before = runner.get_latent();

    let err = KernelConfig::from_specs(&defn, &[spec("assign", "[0]"), spec("bogus", "{}")]).unwrap_err();
    assert!(err.is_config());
    assert_eq!(err.info().code, "unknown-kernel");
    assert_eq!(runner.get_latent(), before);
}

#[test]
fn extra_and_missing_keys_are_rejected() {
    let defn = two_domain_definition();
    let extra = KernelConfig::from_specs(&defn, &[spec("assign_resample", "{1: {m: 3, n: 4}}")]);
    assert_eq!(extra.unwrap_err().info().code, "kernel-params");
    let missing = KernelConfig::from_specs(&defn, &[spec("assign_resample", "{1: {}}")]);
    assert_eq!(missing.unwrap_err().info().code, "kernel-params");
    let stray = KernelConfig::from_specs(&defn, &[spec("theta", "{tparams: {1: {p: 0.1}}, other: 1}")]);
    assert_eq!(stray.unwrap_err().info().code, "kernel-params");
    let zero = KernelConfig::from_specs(&defn, &[spec("assign_resample", "{1: {m: 0}}")]);
    assert_eq!(zero.unwrap_err().info().code, "invalid-m");
}

#[test]
fn assign_accepts_lists_mappings_and_nothing() {
    let defn = two_domain_definition();
    let forms = [
        spec("assign", "[0, 1]"),
        spec("assign", "{0: {}, 1: {}}"),
        KernelSpec::new("assign", serde_yaml::Value::Null),
    ];
    for form in &forms {
        let config = KernelConfig::from_specs(&defn, std::slice::from_ref(form)).unwrap();
        assert_eq!(config.kernels(), &[Kernel::Assign([0, 1].into_iter().collect())]);
    }
    let err = KernelConfig::from_specs(&defn, &[spec("assign", "{0: {m: 2}}")]).unwrap_err();
    assert_eq!(err.info().code, "assign-params");
}

#[test]
fn parameter_names_are_checked_against_the_models() {
    let defn = two_domain_definition();
    let theta_on_conjugate = spec("theta", "{tparams: {0: {p: 0.1}}}");
    let err = KernelConfig::from_specs(&defn, &[theta_on_conjugate]).unwrap_err();
    assert_eq!(err.info().code, "unknown-parameter");

    let slice = spec(
        "slice_relation_hp",
        "{hparams: {0: {alpha: {prior: {type: gamma, shape: 1.0, scale: 1.0}, width: 0.5}}}}",
    );
    KernelConfig::from_specs(&defn, &[slice]).unwrap();
    let bad_name = spec(
        "slice_relation_hp",
        "{hparams: {0: {kappa: {prior: {type: gamma, shape: 1.0, scale: 1.0}, width: 0.5}}}}",
    );
    let err = KernelConfig::from_specs(&defn, &[bad_name]).unwrap_err();
    assert_eq!(err.info().code, "unknown-parameter");

    let mut cparam = BTreeMap::new();
    cparam.insert(
        "alpha".to_string(),
        SliceParam::new(Prior::Exponential { rate: 1.0 }, -1.0),
    );
    let err = KernelConfig::new(
        &defn,
        vec![Kernel::SliceClusterHp(
            [(0, irm_mcmc::ClusterHpParams { cparam })].into_iter().collect(),
        )],
    )
    .unwrap_err();
    assert_eq!(err.info().code, "invalid-width");
}

#[test]
fn grids_are_materialized_against_the_initial_state() {
    let defn = Arc::new(two_domain_definition());
    let views: Vec<SharedDataview> = vec![
        Arc::new(DenseDataview::from_bools(vec![4, 3], &[true; 12], &[false; 12]).unwrap()),
        Arc::new(DenseDataview::from_bools(vec![3, 3], &[false; 9], &[false; 9]).unwrap()),
    ];
    let mut rng = RngHandle::from_seed(2);
    let latent = State::initialize(&defn, &views, &mut rng, InitOptions::default()).unwrap();

    let partial: irm_core::HyperParams = [("alpha".to_string(), 3.0)].into_iter().collect();
    let grid = GridParams {
        hpdf: Default::default(),
        hgrid: vec![partial],
    };
    let kernels = KernelConfig::new(&defn, vec![Kernel::GridRelationHp([(0, grid)].into_iter().collect())])
        .unwrap();
    let runner = Runner::new(defn.clone(), views.clone(), &latent, kernels).unwrap();
    match &runner.kernel_config().kernels()[0] {
        Kernel::GridRelationHp(grids) => {
            let record = &grids[&0].hgrid[0];
            assert_eq!(record["alpha"], 3.0);
            assert_eq!(record["beta"], 1.0);
        }
        other => panic!("unexpected kernel {other:?}"),
    }

    let negative: irm_core::HyperParams = [("beta".to_string(), -2.0)].into_iter().collect();
    let grid = GridParams {
        hpdf: Default::default(),
        hgrid: vec![negative],
    };
    let kernels = KernelConfig::new(&defn, vec![Kernel::GridRelationHp([(0, grid)].into_iter().collect())])
        .unwrap();
    let err = Runner::new(defn, views, &latent, kernels).unwrap_err();
    assert!(err.is_config());
}
