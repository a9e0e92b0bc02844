use irm_core::{DenseDataview, RelationDataview, SparseDataview, Value};
use proptest::prelude::*;
use sha2::{Digest, Sha256};

proptest! {
    #[test]
    fn dense_and_sparse_layouts_agree(
        rows in 1usize..6,
        cols in 1usize..6,
        cells in proptest::collection::vec((any::<bool>(), any::<bool>()), 36),
    ) {
        let n = rows * cols;
        let values: Vec<bool> = cells.iter().take(n).map(|c| c.0).collect();
        let mask: Vec<bool> = cells.iter().take(n).map(|c| c.1).collect();
        let dense = DenseDataview::from_bools(vec![rows, cols], &values, &mask).unwrap();
        let sparse = SparseDataview::from_entries(vec![rows, cols], dense.observed()).unwrap();

        prop_assert_eq!(sparse.nnz(), mask.iter().filter(|m| !**m).count());
        for r in 0..rows {
            prop_assert_eq!(dense.slice(0, r), sparse.slice(0, r));
        }
        for c in 0..cols {
            prop_assert_eq!(dense.slice(1, c), sparse.slice(1, c));
            for r in 0..rows {
                prop_assert_eq!(dense.get(&[r, c]), sparse.get(&[r, c]));
            }
        }

        let mut a = Sha256::new();
        dense.update_digest(&mut a);
        let mut b = Sha256::new();
        sparse.update_digest(&mut b);
        prop_assert_eq!(a.finalize(), b.finalize());
    }
}

#[test]
fn content_changes_change_the_digest() {
    let a = DenseDataview::new(vec![2], vec![Value::Count(1), Value::Count(2)]).unwrap();
    let b = DenseDataview::new(vec![2], vec![Value::Count(1), Value::Count(3)]).unwrap();
    let mut ha = Sha256::new();
    a.update_digest(&mut ha);
    let mut hb = Sha256::new();
    b.update_digest(&mut hb);
    assert_ne!(ha.finalize(), hb.finalize());
}

#[test]
fn duplicate_sparse_entries_are_rejected() {
    let err = SparseDataview::from_entries(
        vec![2, 2],
        vec![
            (vec![0, 1], Value::Bool(true)),
            (vec![0, 1], Value::Bool(false)),
        ],
    )
    .unwrap_err();
    assert_eq!(err.info().code, "dataview-duplicate");
}
