use std::sync::Arc;

use irm_core::{
    ComponentModel, Definition, DenseDataview, RelationDefinition, RngHandle, SharedDataview,
    SparseDataview, Value,
};
use irm_model::{state_from_bytes, state_from_json, state_to_bytes, state_to_json, InitOptions, State};
use proptest::prelude::*;
use rand::Rng;

fn random_bool_view(shape: Vec<usize>, rng: &mut RngHandle) -> SharedDataview {
    let cells: usize = shape.iter().product();
    let values: Vec<bool> = (0..cells).map(|_| rng.gen_bool(0.5)).collect();
    let mask: Vec<bool> = (0..cells).map(|_| rng.gen_bool(0.2)).collect();
    Arc::new(DenseDataview::from_bools(shape, &values, &mask).unwrap())
}

fn self_and_cross_model(rng: &mut RngHandle) -> (Definition, Vec<SharedDataview>) {
    let defn = Definition::new(
        vec![6, 4],
        vec![
            RelationDefinition::new(vec![0, 0], ComponentModel::BetaBernoulli),
            RelationDefinition::new(vec![0, 1], ComponentModel::BetaBernoulli),
        ],
    )
    .unwrap();
    let views = vec![random_bool_view(vec![6, 6], rng), random_bool_view(vec![6, 4], rng)];
    (defn, views)
}

fn joint_score(state: &State) -> f64 {
    state.score_assignment_total() + state.score_likelihood_total()
}

#[test]
fn initialization_accounts_for_every_observation() {
    let mut rng = RngHandle::from_seed(1);
    let (defn, views) = self_and_cross_model(&mut rng);
    let state = State::initialize(&defn, &views, &mut rng, InitOptions::default()).unwrap();
    state.check_consistency(&views).unwrap();
    for d in 0..defn.ndomains() {
        assert!(state.assignments(d).unwrap().iter().all(Option::is_some));
    }
}

#[test]
fn explicit_assignments_are_honoured() {
    let mut rng = RngHandle::from_seed(2);
    let (defn, views) = self_and_cross_model(&mut rng);
    let options = InitOptions::default()
        .with_assignment(0, vec![0, 0, 1, 1, 2, 2])
        .with_assignment(1, vec![0, 1, 0, 1]);
    let state = State::initialize(&defn, &views, &mut rng, options).unwrap();
    assert_eq!(state.groups(0).unwrap(), vec![0, 1, 2]);
    assert_eq!(state.groupsize(0, 2).unwrap(), 2);
    assert_eq!(state.assignments(1).unwrap(), &[Some(0), Some(1), Some(0), Some(1)]);

    let short = InitOptions::default().with_assignment(1, vec![0, 0]);
    let err = State::initialize(&defn, &views, &mut rng, short).unwrap_err();
    assert_eq!(err.info().code, "assignment-length");
}

#[test]
fn diagonal_cells_of_self_relations_count_once() {
    let defn = Definition::new(
        vec![3],
        vec![RelationDefinition::new(vec![0, 0], ComponentModel::BetaBernoulli)],
    )
    .unwrap();
    let views: Vec<SharedDataview> =
        vec![Arc::new(DenseDataview::from_bools(vec![3, 3], &[true; 9], &[false; 9]).unwrap())];
    let mut rng = RngHandle::from_seed(3);
    let state = State::initialize(&defn, &views, &mut rng, InitOptions::default()).unwrap();
    let positions = state.entity_data_positions(0, 1, &views).unwrap();
    // row 1 plus column 1, sharing the diagonal cell
    assert_eq!(positions.len(), 5);
    assert_eq!(positions.iter().filter(|(_, c)| c == &vec![1, 1]).count(), 1);
}

#[test]
fn score_value_matches_the_change_in_joint_score() {
    let mut rng = RngHandle::from_seed(4);
    let (defn, views) = self_and_cross_model(&mut rng);
    let mut state = State::initialize(&defn, &views, &mut rng, InitOptions::default()).unwrap();

    let eid = 2;
    let old = state.remove_value(0, eid, &views).unwrap();
    if state.groupsize(0, old).unwrap() > 0 {
        state.create_group(0).unwrap();
    }
    assert_eq!(state.empty_groups(0).unwrap().len(), 1);
    let before = joint_score(&state);
    let (gids, scores) = state.score_value(0, eid, &views, &mut rng).unwrap();
    for (gid, score) in gids.into_iter().zip(scores) {
        let mut probe = state.clone();
        probe.add_value(0, gid, eid, &views, &mut rng).unwrap();
        let delta = joint_score(&probe) - before;
        assert!((delta - score).abs() < 1e-9, "group {gid}: {delta} vs {score}");
    }
}

#[test]
fn delete_group_drops_its_statistics() {
    let mut rng = RngHandle::from_seed(5);
    let (defn, views) = self_and_cross_model(&mut rng);
    let options = InitOptions::default()
        .with_assignment(0, vec![0, 0, 0, 0, 0, 1])
        .with_assignment(1, vec![0, 0, 0, 0]);
    let mut state = State::initialize(&defn, &views, &mut rng, options).unwrap();
    assert!(state.delete_group(0, 1).is_err());

    state.remove_value(0, 5, &views).unwrap();
    state.delete_group(0, 1).unwrap();
    let self_keys = state.suffstat_keys(0).unwrap();
    assert!(self_keys.iter().all(|key| !key.contains(&1)), "{self_keys:?}");
    let cross_keys = state.suffstat_keys(1).unwrap();
    assert!(cross_keys.iter().all(|key| key[0] != 1), "{cross_keys:?}");
    state.add_value(0, 0, 5, &views, &mut rng).unwrap();
    state.check_consistency(&views).unwrap();
}

#[test]
fn copies_are_independent() {
    let mut rng = RngHandle::from_seed(6);
    let (defn, views) = self_and_cross_model(&mut rng);
    let state = State::initialize(&defn, &views, &mut rng, InitOptions::default()).unwrap();
    let mut copy = state.clone();
    let gid = copy.remove_value(0, 0, &views).unwrap();
    assert_ne!(copy, state);
    copy.add_value(0, gid, 0, &views, &mut rng).unwrap();
    assert_eq!(copy.assignments(0).unwrap(), state.assignments(0).unwrap());
}

#[test]
fn binary_and_json_encodings_restore_the_state() {
    let mut rng = RngHandle::from_seed(7);
    let (defn, views) = self_and_cross_model(&mut rng);
    let state = State::initialize(&defn, &views, &mut rng, InitOptions::default()).unwrap();

    let restored = state_from_bytes(&state_to_bytes(&state).unwrap()).unwrap();
    assert_eq!(restored, state);
    restored.check_consistency(&views).unwrap();

    let from_json = state_from_json(&state_to_json(&state).unwrap()).unwrap();
    assert_eq!(from_json.assignments(0).unwrap(), state.assignments(0).unwrap());
    assert_eq!(from_json.suffstat_keys(1).unwrap(), state.suffstat_keys(1).unwrap());
    assert!(state_from_bytes(&[1, 2, 3]).is_err());
}

#[test]
fn mismatched_views_are_rejected() {
    let mut rng = RngHandle::from_seed(8);
    let (defn, views) = self_and_cross_model(&mut rng);
    let wrong = vec![views[0].clone(), random_bool_view(vec![4, 6], &mut rng)];
    let err = State::initialize(&defn, &wrong, &mut rng, InitOptions::default()).unwrap_err();
    assert_eq!(err.info().code, "dataview-shape");

    let counts: SharedDataview = Arc::new(
        SparseDataview::from_entries(vec![6, 4], vec![(vec![0, 0], Value::Count(3))]).unwrap(),
    );
    let err = State::initialize(&defn, &[views[0].clone(), counts], &mut rng, InitOptions::default())
        .unwrap_err();
    assert_eq!(err.info().code, "value-kind");
}

proptest! {
    #[test]
    fn random_moves_preserve_consistency(seed in any::<u64>(), moves in 1usize..40) {
        let mut rng = RngHandle::from_seed(seed);
        let (defn, views) = self_and_cross_model(&mut rng);
        let mut state = State::initialize(&defn, &views, &mut rng, InitOptions::default()).unwrap();
        for _ in 0..moves {
            let domain = rng.gen_range(0..2);
            let eid = rng.gen_range(0..state.nentities(domain).unwrap());
            state.remove_value(domain, eid, &views).unwrap();
            let gid = if rng.gen_bool(0.3) {
                state.create_group(domain).unwrap()
            } else {
                let groups = state.groups(domain).unwrap();
                groups[rng.gen_range(0..groups.len())]
            };
            state.add_value(domain, gid, eid, &views, &mut rng).unwrap();
            for empty in state.empty_groups(domain).unwrap() {
                state.delete_group(domain, empty).unwrap();
            }
        }
        prop_assert!(state.check_consistency(&views).is_ok());
    }
}
