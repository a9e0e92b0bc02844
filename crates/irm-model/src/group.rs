//! Chinese-restaurant-process clustering of one domain.

use std::collections::BTreeMap;

use irm_core::special::ln_gamma;
use irm_core::{check_cluster_hyperparams, ErrorInfo, HyperParams, IrmError, CLUSTER_ALPHA};
use serde::{Deserialize, Serialize};

/// Group bookkeeping for a single domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainState {
    assignments: Vec<Option<usize>>,
    groups: BTreeMap<usize, usize>,
    next_gid: usize,
    hp: HyperParams,
}

impl DomainState {
    /// Domain of `nentities` unassigned entities and no groups.
    pub fn new(nentities: usize, hp: HyperParams) -> Result<Self, IrmError> {
        check_cluster_hyperparams(&hp)?;
        Ok(Self {
            assignments: vec![None; nentities],
            groups: BTreeMap::new(),
            next_gid: 0,
            hp,
        })
    }

    /// Number of entities.
    pub fn nentities(&self) -> usize {
        self.assignments.len()
    }

    /// Number of live groups, empty ones included.
    pub fn ngroups(&self) -> usize {
        self.groups.len()
    }

    /// Group of every entity, `None` when unassigned.
    pub fn assignments(&self) -> &[Option<usize>] {
        &self.assignments
    }

    /// Group of `eid`.
    pub fn assignment(&self, eid: usize) -> Result<Option<usize>, IrmError> {
        self.assignments
            .get(eid)
            .copied()
            .ok_or_else(|| self.entity_out_of_range(eid))
    }

    /// Live group ids in increasing order.
    pub fn groups(&self) -> Vec<usize> {
        self.groups.keys().copied().collect()
    }

    /// Live groups without members.
    pub fn empty_groups(&self) -> Vec<usize> {
        self.groups
            .iter()
            .filter(|(_, size)| **size == 0)
            .map(|(&gid, _)| gid)
            .collect()
    }

    /// Number of members of `gid`.
    pub fn groupsize(&self, gid: usize) -> Result<usize, IrmError> {
        self.groups
            .get(&gid)
            .copied()
            .ok_or_else(|| self.unknown_group(gid))
    }

    /// Whether `gid` is a live group.
    pub fn contains_group(&self, gid: usize) -> bool {
        self.groups.contains_key(&gid)
    }

    /// Clustering hyperparameters.
    pub fn hp(&self) -> &HyperParams {
        &self.hp
    }

    /// Replaces the clustering hyperparameters.
    pub fn set_hp(&mut self, hp: HyperParams) -> Result<(), IrmError> {
        check_cluster_hyperparams(&hp)?;
        self.hp = hp;
        Ok(())
    }

    /// Concentration of the clustering prior.
    pub fn alpha(&self) -> f64 {
        self.hp.get(CLUSTER_ALPHA).copied().unwrap_or(f64::NAN)
    }

    /// Opens a new empty group; ids are never reused.
    pub fn create_group(&mut self) -> usize {
        let gid = self.next_gid;
        self.next_gid += 1;
        self.groups.insert(gid, 0);
        gid
    }

    /// Ensures groups `0..=gid` exist, for explicit initial assignments.
    pub(crate) fn ensure_group(&mut self, gid: usize) {
        while self.next_gid <= gid {
            self.create_group();
        }
    }

    /// Removes an empty group.
    pub fn delete_group(&mut self, gid: usize) -> Result<(), IrmError> {
        match self.groups.get(&gid) {
            None => Err(self.unknown_group(gid)),
            Some(&size) if size > 0 => Err(IrmError::Model(
                ErrorInfo::new("group-not-empty", "only empty groups can be deleted")
                    .with_context("group", gid)
                    .with_context("size", size),
            )),
            Some(_) => {
                self.groups.remove(&gid);
                Ok(())
            }
        }
    }

    /// Assigns the unassigned entity `eid` to `gid`.
    pub fn add_value(&mut self, gid: usize, eid: usize) -> Result<(), IrmError> {
        match self.assignment(eid)? {
            Some(current) => Err(IrmError::Model(
                ErrorInfo::new("entity-assigned", "entity is already assigned")
                    .with_context("entity", eid)
                    .with_context("group", current),
            )),
            None => {
                let size = self
                    .groups
                    .get_mut(&gid)
                    .ok_or_else(|| IrmError::Model(unknown_group_info(gid)))?;
                *size += 1;
                self.assignments[eid] = Some(gid);
                Ok(())
            }
        }
    }

    /// Unassigns `eid`, returning its former group.
    pub fn remove_value(&mut self, eid: usize) -> Result<usize, IrmError> {
        let gid = self.assignment(eid)?.ok_or_else(|| {
            IrmError::Model(
                ErrorInfo::new("entity-unassigned", "entity is not assigned")
                    .with_context("entity", eid),
            )
        })?;
        if let Some(size) = self.groups.get_mut(&gid) {
            *size = size.saturating_sub(1);
        }
        self.assignments[eid] = None;
        Ok(gid)
    }

    /// Prior weight of joining `gid`: its size, or an equal share of the
    /// concentration when empty.
    pub fn pseudocount(&self, gid: usize) -> Result<f64, IrmError> {
        let size = self.groupsize(gid)?;
        if size > 0 {
            return Ok(size as f64);
        }
        let empties = self.groups.values().filter(|&&s| s == 0).count();
        Ok(self.alpha() / empties as f64)
    }

    /// Log probability of the current partition under the clustering prior.
    pub fn score_assignment(&self) -> f64 {
        self.score_assignment_with(self.alpha())
    }

    /// Partition log probability under concentration `alpha`.
    pub fn score_assignment_with(&self, alpha: f64) -> f64 {
        let assigned: usize = self.groups.values().sum();
        if assigned == 0 {
            return 0.0;
        }
        let mut score = 0.0;
        for &size in self.groups.values().filter(|&&s| s > 0) {
            score += alpha.ln() + ln_gamma(size as f64);
        }
        score + ln_gamma(alpha) - ln_gamma(alpha + assigned as f64)
    }

    /// Checks that group sizes agree with the assignment vector.
    pub fn check_consistency(&self) -> Result<(), IrmError> {
        let mut counts: BTreeMap<usize, usize> = self.groups.keys().map(|&g| (g, 0)).collect();
        for (eid, assignment) in self.assignments.iter().enumerate() {
            if let Some(gid) = assignment {
                let count = counts.get_mut(gid).ok_or_else(|| {
                    IrmError::Model(unknown_group_info(*gid).with_context("entity", eid))
                })?;
                *count += 1;
            }
        }
        if counts != self.groups {
            return Err(IrmError::model(
                "group-size-mismatch",
                "group sizes disagree with the assignment vector",
            ));
        }
        if self.groups.keys().any(|&gid| gid >= self.next_gid) {
            return Err(IrmError::model("group-id", "group id beyond the id counter"));
        }
        Ok(())
    }

    fn unknown_group(&self, gid: usize) -> IrmError {
        IrmError::Model(unknown_group_info(gid).with_context("ngroups", self.groups.len()))
    }

    fn entity_out_of_range(&self, eid: usize) -> IrmError {
        IrmError::Model(
            ErrorInfo::new("entity-out-of-range", "entity id out of range")
                .with_context("entity", eid)
                .with_context("nentities", self.assignments.len()),
        )
    }
}

fn unknown_group_info(gid: usize) -> ErrorInfo {
    ErrorInfo::new("unknown-group", "group id is not live").with_context("group", gid)
}
