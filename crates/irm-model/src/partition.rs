//! Set-partition helpers: canonical labels, exhaustive enumeration and the
//! exact posterior of small conjugate models.

use std::collections::BTreeMap;

use irm_core::special::scores_to_probs;
use irm_core::{Definition, ErrorInfo, IrmError, RngHandle, SharedDataview};

use crate::state::{InitOptions, State};

/// Relabels groups in order of first appearance, so equal partitions have
/// equal label vectors.
pub fn canonicalize(labels: &[usize]) -> Vec<usize> {
    let mut relabel: BTreeMap<usize, usize> = BTreeMap::new();
    labels
        .iter()
        .map(|label| {
            let next = relabel.len();
            *relabel.entry(*label).or_insert(next)
        })
        .collect()
}

/// Canonical labels of a fully assigned domain, `None` if any entity is
/// unassigned.
pub fn canonical_assignment(assignments: &[Option<usize>]) -> Option<Vec<usize>> {
    let labels: Option<Vec<usize>> = assignments.iter().copied().collect();
    labels.map(|labels| canonicalize(&labels))
}

/// Every partition of `n` items as a restricted growth string.
pub fn set_partitions(n: usize) -> Vec<Vec<usize>> {
    if n == 0 {
        return vec![Vec::new()];
    }
    let mut out = Vec::new();
    let mut current = vec![0usize; n];
    let mut maxima = vec![0usize; n];
    loop {
        out.push(current.clone());
        // rightmost position that can still grow
        let mut pos = n - 1;
        loop {
            if pos == 0 {
                return out;
            }
            if current[pos] <= maxima[pos - 1] {
                break;
            }
            pos -= 1;
        }
        current[pos] += 1;
        maxima[pos] = maxima[pos - 1].max(current[pos]);
        for idx in pos + 1..n {
            current[idx] = 0;
            maxima[idx] = maxima[pos];
        }
    }
}

/// Exact joint posterior over the partitions of every domain, for models
/// whose relations are all conjugate. Hyperparameters come from `options`;
/// any fixed assignments in it are ignored.
pub fn exact_posterior(
    defn: &Definition,
    views: &[SharedDataview],
    options: &InitOptions,
) -> Result<Vec<(Vec<Vec<usize>>, f64)>, IrmError> {
    if let Some(model) = defn.relation_models().into_iter().find(|m| !m.is_conjugate()) {
        return Err(IrmError::Config(
            ErrorInfo::new("non-conjugate", "exact posterior needs collapsed component models")
                .with_context("model", model.name()),
        ));
    }
    let per_domain: Vec<Vec<Vec<usize>>> = defn.domains().iter().map(|&n| set_partitions(n)).collect();
    let mut cursor = vec![0usize; per_domain.len()];
    let mut rng = RngHandle::from_seed(0);
    let mut outcomes = Vec::new();
    let mut scores = Vec::new();
    loop {
        let mut init = InitOptions {
            cluster_hps: options.cluster_hps.clone(),
            relation_hps: options.relation_hps.clone(),
            assignments: BTreeMap::new(),
        };
        let labels: Vec<Vec<usize>> = cursor
            .iter()
            .zip(&per_domain)
            .map(|(&idx, partitions)| partitions[idx].clone())
            .collect();
        for (did, domain_labels) in labels.iter().enumerate() {
            init = init.with_assignment(did, domain_labels.clone());
        }
        let state = State::initialize(defn, views, &mut rng, init)?;
        scores.push(state.score_assignment_total() + state.score_likelihood_total());
        outcomes.push(labels);

        let mut axis = 0;
        loop {
            if axis == cursor.len() {
                let probs = scores_to_probs(&scores);
                return Ok(outcomes.into_iter().zip(probs).collect());
            }
            cursor[axis] += 1;
            if cursor[axis] < per_domain[axis].len() {
                break;
            }
            cursor[axis] = 0;
            axis += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bell_numbers() {
        let counts: Vec<usize> = (0..7).map(|n| set_partitions(n).len()).collect();
        assert_eq!(counts, vec![1, 1, 2, 5, 15, 52, 203]);
    }

    #[test]
    fn enumerated_partitions_are_canonical_and_distinct() {
        let parts = set_partitions(5);
        for p in &parts {
            assert_eq!(&canonicalize(p), p);
        }
        let mut sorted = parts.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), parts.len());
    }

    #[test]
    fn canonical_form_ignores_label_names() {
        assert_eq!(canonicalize(&[7, 7, 2, 9, 2]), vec![0, 0, 1, 2, 1]);
        assert_eq!(canonical_assignment(&[Some(4), None]), None);
    }
}
