//! Views of a [`State`] restricted to one domain or one relation, which is
//! what the sampling primitives operate on.

use irm_core::{ComponentModel, HyperParams, IrmError, SharedDataview};
use rand::Rng;

use crate::state::State;

/// A state bound to one domain and the dataviews it was built from.
#[derive(Debug)]
pub struct BoundState<'a> {
    state: &'a mut State,
    domain: usize,
    views: &'a [SharedDataview],
}

impl<'a> BoundState<'a> {
    /// Binds `state` to `domain`, checking the dataviews once up front.
    pub fn bind(
        state: &'a mut State,
        domain: usize,
        views: &'a [SharedDataview],
    ) -> Result<Self, IrmError> {
        state.domain(domain)?;
        state.check_views(views)?;
        Ok(Self {
            state,
            domain,
            views,
        })
    }

    /// Bound domain id.
    pub fn domain(&self) -> usize {
        self.domain
    }

    /// Underlying state.
    pub fn state(&self) -> &State {
        &*self.state
    }

    /// Number of entities of the bound domain.
    pub fn nentities(&self) -> Result<usize, IrmError> {
        self.state.nentities(self.domain)
    }

    /// Live groups of the bound domain.
    pub fn groups(&self) -> Result<Vec<usize>, IrmError> {
        self.state.groups(self.domain)
    }

    /// Empty live groups of the bound domain.
    pub fn empty_groups(&self) -> Result<Vec<usize>, IrmError> {
        self.state.empty_groups(self.domain)
    }

    /// Group of `eid`, if assigned.
    pub fn assignment(&self, eid: usize) -> Result<Option<usize>, IrmError> {
        self.state.domain(self.domain)?.assignment(eid)
    }

    /// Opens an empty group.
    pub fn create_group(&mut self) -> Result<usize, IrmError> {
        self.state.create_group(self.domain)
    }

    /// Deletes an empty group.
    pub fn delete_group(&mut self, gid: usize) -> Result<(), IrmError> {
        self.state.delete_group(self.domain, gid)
    }

    /// Assigns `eid` to `gid`.
    pub fn add_value<R: Rng + ?Sized>(
        &mut self,
        gid: usize,
        eid: usize,
        rng: &mut R,
    ) -> Result<(), IrmError> {
        self.state.add_value(self.domain, gid, eid, self.views, rng)
    }

    /// Unassigns `eid`.
    pub fn remove_value(&mut self, eid: usize) -> Result<usize, IrmError> {
        self.state.remove_value(self.domain, eid, self.views)
    }

    /// Scores every live group for the unassigned `eid`.
    pub fn score_value<R: Rng + ?Sized>(
        &mut self,
        eid: usize,
        rng: &mut R,
    ) -> Result<(Vec<usize>, Vec<f64>), IrmError> {
        self.state.score_value(self.domain, eid, self.views, rng)
    }

    /// Clustering hyperparameters.
    pub fn hp(&self) -> Result<&HyperParams, IrmError> {
        self.state.cluster_hp(self.domain)
    }

    /// Replaces the clustering hyperparameters.
    pub fn set_hp(&mut self, hp: HyperParams) -> Result<(), IrmError> {
        self.state.set_cluster_hp(self.domain, hp)
    }

    /// Clustering log prior under concentration `alpha`.
    pub fn score_assignment_with(&self, alpha: f64) -> Result<f64, IrmError> {
        Ok(self.state.domain(self.domain)?.score_assignment_with(alpha))
    }
}

/// A state bound to one relation.
#[derive(Debug)]
pub struct BoundRelation<'a> {
    state: &'a mut State,
    relation: usize,
}

impl<'a> BoundRelation<'a> {
    /// Binds `state` to `relation`.
    pub fn bind(state: &'a mut State, relation: usize) -> Result<Self, IrmError> {
        state.relation(relation)?;
        Ok(Self { state, relation })
    }

    /// Bound relation id.
    pub fn relation(&self) -> usize {
        self.relation
    }

    /// Component model of the relation.
    pub fn model(&self) -> Result<ComponentModel, IrmError> {
        Ok(self.state.relation(self.relation)?.model())
    }

    /// Component hyperparameters.
    pub fn hp(&self) -> Result<&HyperParams, IrmError> {
        self.state.relation_hp(self.relation)
    }

    /// Replaces the component hyperparameters.
    pub fn set_hp(&mut self, hp: HyperParams) -> Result<(), IrmError> {
        self.state.set_relation_hp(self.relation, hp)
    }

    /// Log likelihood of the relation's data under `hp`.
    pub fn score_likelihood_with(&self, hp: &HyperParams) -> Result<f64, IrmError> {
        self.state.score_likelihood_with(self.relation, hp)
    }

    /// Group tuples holding statistics.
    pub fn keys(&self) -> Result<Vec<Vec<usize>>, IrmError> {
        self.state.suffstat_keys(self.relation)
    }

    /// Log density of the data and latent parameters of tuple `key` with
    /// `name` set to `value`.
    pub fn score_theta(&self, key: &[usize], name: &str, value: f64) -> Result<f64, IrmError> {
        let relation = self.state.relation(self.relation)?;
        let mut stats = match self.state.suffstats(self.relation, key)? {
            Some(entry) => entry.stats.clone(),
            None => return Ok(f64::NEG_INFINITY),
        };
        stats.set_theta(name, value)?;
        Ok(stats.score_data(relation.hp()))
    }

    /// Latent parameter `name` of tuple `key`.
    pub fn theta(&self, key: &[usize], name: &str) -> Result<f64, IrmError> {
        self.state.theta(self.relation, key, name)
    }

    /// Overwrites latent parameter `name` of tuple `key`.
    pub fn set_theta(&mut self, key: &[usize], name: &str, value: f64) -> Result<(), IrmError> {
        self.state.set_theta(self.relation, key, name, value)
    }
}
