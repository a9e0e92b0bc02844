//! Latent state of an IRM: one clustering per domain plus, per relation, the
//! sufficient statistics of every group tuple that has been touched.

use std::collections::btree_map::Entry as MapEntry;
use std::collections::BTreeMap;

use irm_core::{
    default_cluster_hyperparams, ComponentModel, Definition, ErrorInfo, HyperParams, IrmError,
    SharedDataview, Value,
};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::component::Suffstats;
use crate::group::DomainState;

/// Statistics of one group tuple together with its bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuffstatEntry {
    /// Stable identifier assigned at creation.
    pub ident: u64,
    /// Number of observations summarised.
    pub count: usize,
    /// The statistics themselves.
    pub stats: Suffstats,
}

/// Per-relation part of the state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationState {
    domains: Vec<usize>,
    model: ComponentModel,
    hp: HyperParams,
    #[serde(with = "table_entries")]
    table: BTreeMap<Vec<usize>, SuffstatEntry>,
    next_ident: u64,
}

// Tuple-keyed maps are written as entry lists so text formats can carry them.
mod table_entries {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};

    use super::SuffstatEntry;

    pub fn serialize<S: Serializer>(
        table: &BTreeMap<Vec<usize>, SuffstatEntry>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(table.iter())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<Vec<usize>, SuffstatEntry>, D::Error> {
        let entries: Vec<(Vec<usize>, SuffstatEntry)> = Vec::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

impl RelationState {
    /// Domain of each axis.
    pub fn domains(&self) -> &[usize] {
        &self.domains
    }

    /// Component model.
    pub fn model(&self) -> ComponentModel {
        self.model
    }

    /// Component hyperparameters.
    pub fn hp(&self) -> &HyperParams {
        &self.hp
    }

    /// Live group tuples and their statistics, ordered by tuple.
    pub fn entries(&self) -> impl Iterator<Item = (&Vec<usize>, &SuffstatEntry)> {
        self.table.iter()
    }

    fn entry_mut<R: Rng + ?Sized>(
        &mut self,
        key: Vec<usize>,
        rng: &mut R,
    ) -> Result<&mut SuffstatEntry, IrmError> {
        match self.table.entry(key) {
            MapEntry::Occupied(slot) => Ok(slot.into_mut()),
            MapEntry::Vacant(slot) => {
                let stats = Suffstats::create(self.model, &self.hp, rng)?;
                let ident = self.next_ident;
                self.next_ident += 1;
                Ok(slot.insert(SuffstatEntry {
                    ident,
                    count: 0,
                    stats,
                }))
            }
        }
    }

    fn score_with(&self, hp: &HyperParams) -> f64 {
        self.table.values().map(|entry| entry.stats.score_data(hp)).sum()
    }
}

/// Optional overrides for [`State::initialize`].
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Clustering hyperparameters per domain; defaults to `alpha = 1`.
    pub cluster_hps: BTreeMap<usize, HyperParams>,
    /// Component hyperparameters per relation; defaults per model.
    pub relation_hps: BTreeMap<usize, HyperParams>,
    /// Explicit group labels per domain; other domains are drawn from the
    /// clustering prior.
    pub assignments: BTreeMap<usize, Vec<usize>>,
}

impl InitOptions {
    /// Fixes the initial partition of `domain`.
    pub fn with_assignment(mut self, domain: usize, labels: Vec<usize>) -> Self {
        self.assignments.insert(domain, labels);
        self
    }

    /// Sets the clustering hyperparameters of `domain`.
    pub fn with_cluster_hp(mut self, domain: usize, hp: HyperParams) -> Self {
        self.cluster_hps.insert(domain, hp);
        self
    }

    /// Sets the component hyperparameters of `relation`.
    pub fn with_relation_hp(mut self, relation: usize, hp: HyperParams) -> Self {
        self.relation_hps.insert(relation, hp);
        self
    }
}

/// Complete latent state of an IRM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    domains: Vec<DomainState>,
    relations: Vec<RelationState>,
}

type EntityEntry = (usize, Vec<usize>, Value);

impl State {
    /// Builds a fully assigned state for `defn` and adds every observed entry
    /// of `views`.
    pub fn initialize<R: Rng + ?Sized>(
        defn: &Definition,
        views: &[SharedDataview],
        rng: &mut R,
        options: InitOptions,
    ) -> Result<Self, IrmError> {
        for &domain in options.cluster_hps.keys().chain(options.assignments.keys()) {
            defn.check_domain(domain)?;
        }
        for &relation in options.relation_hps.keys() {
            defn.check_relation(relation)?;
        }

        let mut domains = Vec::with_capacity(defn.ndomains());
        for (did, &size) in defn.domains().iter().enumerate() {
            let hp = options
                .cluster_hps
                .get(&did)
                .cloned()
                .unwrap_or_else(default_cluster_hyperparams);
            let mut domain = DomainState::new(size, hp)
                .map_err(|err| IrmError::Config(err.info().clone().with_context("domain", did)))?;
            match options.assignments.get(&did) {
                Some(labels) => assign_labels(&mut domain, did, labels)?,
                None => draw_from_prior(&mut domain, rng)?,
            }
            domains.push(domain);
        }

        let mut relations = Vec::with_capacity(defn.nrelations());
        for (rid, relation) in defn.relations().iter().enumerate() {
            let hp = options
                .relation_hps
                .get(&rid)
                .cloned()
                .unwrap_or_else(|| relation.model.default_hyperparams());
            relation
                .model
                .check_hyperparams(&hp)
                .map_err(|err| IrmError::Config(err.info().clone().with_context("relation", rid)))?;
            relations.push(RelationState {
                domains: relation.domains.clone(),
                model: relation.model,
                hp,
                table: BTreeMap::new(),
                next_ident: 0,
            });
        }

        let mut state = Self { domains, relations };
        state.check_views(views)?;
        for (rid, view) in views.iter().enumerate() {
            let expected = state.relations[rid].model.value_kind();
            for (coords, value) in view.observed() {
                if value.kind() != expected {
                    return Err(IrmError::Config(
                        ErrorInfo::new("value-kind", "dataview value type does not match the model")
                            .with_context("relation", rid)
                            .with_context("coords", format!("{coords:?}")),
                    ));
                }
                let key = state.group_key(rid, &coords, None)?;
                let entry = state.relations[rid].entry_mut(key, rng)?;
                entry.stats.add_value(value)?;
                entry.count += 1;
            }
        }
        debug!(
            ndomains = state.domains.len(),
            nrelations = state.relations.len(),
            "initialized latent state"
        );
        Ok(state)
    }

    /// Errors unless `views` matches the relations in number and shape.
    pub fn check_views(&self, views: &[SharedDataview]) -> Result<(), IrmError> {
        if views.len() != self.relations.len() {
            return Err(IrmError::Config(
                ErrorInfo::new("dataview-count", "one dataview per relation is required")
                    .with_context("expected", self.relations.len())
                    .with_context("found", views.len()),
            ));
        }
        for (rid, (view, relation)) in views.iter().zip(&self.relations).enumerate() {
            let expected: Vec<usize> = relation
                .domains
                .iter()
                .map(|&d| self.domains[d].nentities())
                .collect();
            if view.shape() != expected.as_slice() {
                return Err(IrmError::Config(
                    ErrorInfo::new("dataview-shape", "dataview shape does not match the relation")
                        .with_context("relation", rid)
                        .with_context("expected", format!("{expected:?}"))
                        .with_context("found", format!("{:?}", view.shape())),
                ));
            }
        }
        Ok(())
    }

    /// Errors unless the state was built for a structurally identical
    /// definition.
    pub fn check_definition(&self, defn: &Definition) -> Result<(), IrmError> {
        let sizes: Vec<usize> = self.domains.iter().map(DomainState::nentities).collect();
        let same_relations = self.relations.len() == defn.nrelations()
            && self
                .relations
                .iter()
                .zip(defn.relations())
                .all(|(state, def)| state.domains == def.domains && state.model == def.model);
        if sizes != defn.domains() || !same_relations {
            return Err(IrmError::Config(
                ErrorInfo::new("state-definition-mismatch", "state does not match the definition")
                    .with_context("state_domains", format!("{sizes:?}"))
                    .with_context("definition_domains", format!("{:?}", defn.domains())),
            ));
        }
        Ok(())
    }

    /// Number of domains.
    pub fn ndomains(&self) -> usize {
        self.domains.len()
    }

    /// Number of relations.
    pub fn nrelations(&self) -> usize {
        self.relations.len()
    }

    /// Clustering of `domain`.
    pub fn domain(&self, domain: usize) -> Result<&DomainState, IrmError> {
        self.domains.get(domain).ok_or_else(|| domain_out_of_range(domain, self.domains.len()))
    }

    /// Per-relation state of `relation`.
    pub fn relation(&self, relation: usize) -> Result<&RelationState, IrmError> {
        self.relations
            .get(relation)
            .ok_or_else(|| relation_out_of_range(relation, self.relations.len()))
    }

    fn domain_mut(&mut self, domain: usize) -> Result<&mut DomainState, IrmError> {
        let ndomains = self.domains.len();
        self.domains
            .get_mut(domain)
            .ok_or_else(|| domain_out_of_range(domain, ndomains))
    }

    fn relation_mut(&mut self, relation: usize) -> Result<&mut RelationState, IrmError> {
        let nrelations = self.relations.len();
        self.relations
            .get_mut(relation)
            .ok_or_else(|| relation_out_of_range(relation, nrelations))
    }

    /// Number of entities in `domain`.
    pub fn nentities(&self, domain: usize) -> Result<usize, IrmError> {
        Ok(self.domain(domain)?.nentities())
    }

    /// Number of live groups in `domain`.
    pub fn ngroups(&self, domain: usize) -> Result<usize, IrmError> {
        Ok(self.domain(domain)?.ngroups())
    }

    /// Live group ids of `domain`.
    pub fn groups(&self, domain: usize) -> Result<Vec<usize>, IrmError> {
        Ok(self.domain(domain)?.groups())
    }

    /// Live groups of `domain` without members.
    pub fn empty_groups(&self, domain: usize) -> Result<Vec<usize>, IrmError> {
        Ok(self.domain(domain)?.empty_groups())
    }

    /// Members of group `gid` in `domain`.
    pub fn groupsize(&self, domain: usize, gid: usize) -> Result<usize, IrmError> {
        self.domain(domain)?.groupsize(gid)
    }

    /// Assignment vector of `domain`.
    pub fn assignments(&self, domain: usize) -> Result<&[Option<usize>], IrmError> {
        Ok(self.domain(domain)?.assignments())
    }

    /// Clustering hyperparameters of `domain`.
    pub fn cluster_hp(&self, domain: usize) -> Result<&HyperParams, IrmError> {
        Ok(self.domain(domain)?.hp())
    }

    /// Replaces the clustering hyperparameters of `domain`.
    pub fn set_cluster_hp(&mut self, domain: usize, hp: HyperParams) -> Result<(), IrmError> {
        self.domain_mut(domain)?.set_hp(hp)
    }

    /// Component hyperparameters of `relation`.
    pub fn relation_hp(&self, relation: usize) -> Result<&HyperParams, IrmError> {
        Ok(self.relation(relation)?.hp())
    }

    /// Replaces the component hyperparameters of `relation`.
    pub fn set_relation_hp(&mut self, relation: usize, hp: HyperParams) -> Result<(), IrmError> {
        let state = self.relation_mut(relation)?;
        state.model.check_hyperparams(&hp)?;
        state.hp = hp;
        Ok(())
    }

    /// Opens a new empty group in `domain`.
    pub fn create_group(&mut self, domain: usize) -> Result<usize, IrmError> {
        Ok(self.domain_mut(domain)?.create_group())
    }

    /// Deletes the empty group `gid` together with every group tuple that
    /// references it.
    pub fn delete_group(&mut self, domain: usize, gid: usize) -> Result<(), IrmError> {
        self.domain_mut(domain)?.delete_group(gid)?;
        for relation in &mut self.relations {
            let axes: Vec<usize> = relation
                .domains
                .iter()
                .enumerate()
                .filter(|(_, &d)| d == domain)
                .map(|(axis, _)| axis)
                .collect();
            if axes.is_empty() {
                continue;
            }
            relation
                .table
                .retain(|key, _| !axes.iter().any(|&axis| key[axis] == gid));
        }
        Ok(())
    }

    /// Assigns the unassigned entity `eid` of `domain` to `gid` and adds its
    /// observations to the affected statistics.
    pub fn add_value<R: Rng + ?Sized>(
        &mut self,
        domain: usize,
        gid: usize,
        eid: usize,
        views: &[SharedDataview],
        rng: &mut R,
    ) -> Result<(), IrmError> {
        self.check_views(views)?;
        self.domain_mut(domain)?.add_value(gid, eid)?;
        for (rid, coords, value) in self.entity_entries(domain, eid, views) {
            let key = self.group_key(rid, &coords, None)?;
            let entry = self.relations[rid].entry_mut(key, rng)?;
            entry.stats.add_value(value)?;
            entry.count += 1;
        }
        Ok(())
    }

    /// Removes the observations of `eid` and unassigns it, returning its
    /// former group.
    pub fn remove_value(
        &mut self,
        domain: usize,
        eid: usize,
        views: &[SharedDataview],
    ) -> Result<usize, IrmError> {
        self.check_views(views)?;
        self.domain(domain)?.assignment(eid)?;
        for (rid, coords, value) in self.entity_entries(domain, eid, views) {
            let key = self.group_key(rid, &coords, None)?;
            let entry = self.relations[rid].table.get_mut(&key).ok_or_else(|| {
                IrmError::Model(
                    ErrorInfo::new("missing-suffstats", "no statistics for the group tuple")
                        .with_context("relation", rid)
                        .with_context("key", format!("{key:?}")),
                )
            })?;
            entry.stats.remove_value(value)?;
            entry.count = entry.count.saturating_sub(1);
        }
        self.domain_mut(domain)?.remove_value(eid)
    }

    /// Scores placing the unassigned entity `eid` into every live group of
    /// `domain`. Returns the group ids with their unnormalised log
    /// probabilities. Missing group tuples are materialised, which draws
    /// latent parameters for non-conjugate models.
    pub fn score_value<R: Rng + ?Sized>(
        &mut self,
        domain: usize,
        eid: usize,
        views: &[SharedDataview],
        rng: &mut R,
    ) -> Result<(Vec<usize>, Vec<f64>), IrmError> {
        self.check_views(views)?;
        if let Some(gid) = self.domain(domain)?.assignment(eid)? {
            return Err(IrmError::Model(
                ErrorInfo::new("entity-assigned", "only unassigned entities can be scored")
                    .with_context("entity", eid)
                    .with_context("group", gid),
            ));
        }
        let entries = self.entity_entries(domain, eid, views);
        let gids = self.domains[domain].groups();
        let pseudocounts = gids
            .iter()
            .map(|&gid| self.domains[domain].pseudocount(gid))
            .collect::<Result<Vec<_>, _>>()?;
        let norm = pseudocounts.iter().sum::<f64>().ln();

        let mut scores = Vec::with_capacity(gids.len());
        for (&gid, pseudocount) in gids.iter().zip(pseudocounts) {
            let keyed = entries
                .iter()
                .map(|(rid, coords, value)| {
                    Ok((*rid, self.group_key(*rid, coords, Some((domain, eid, gid)))?, *value))
                })
                .collect::<Result<Vec<_>, IrmError>>()?;
            let mut local: BTreeMap<(usize, Vec<usize>), Suffstats> = BTreeMap::new();
            let mut score = pseudocount.ln() - norm;
            for (rid, key, value) in keyed {
                let relation = &mut self.relations[rid];
                let stats = match local.entry((rid, key)) {
                    MapEntry::Occupied(slot) => slot.into_mut(),
                    MapEntry::Vacant(slot) => {
                        let key = slot.key().1.clone();
                        let stats = relation.entry_mut(key, rng)?.stats.clone();
                        slot.insert(stats)
                    }
                };
                score += stats.score_value(&relation.hp, value)?;
                stats.add_value(value)?;
            }
            scores.push(score);
        }
        Ok((gids, scores))
    }

    /// Clustering log prior of `domain`.
    pub fn score_assignment(&self, domain: usize) -> Result<f64, IrmError> {
        Ok(self.domain(domain)?.score_assignment())
    }

    /// Sum of the clustering log priors of every domain.
    pub fn score_assignment_total(&self) -> f64 {
        self.domains.iter().map(DomainState::score_assignment).sum()
    }

    /// Log likelihood of the data of `relation`.
    pub fn score_likelihood(&self, relation: usize) -> Result<f64, IrmError> {
        let state = self.relation(relation)?;
        Ok(state.score_with(&state.hp))
    }

    /// Log likelihood of the data of `relation` under alternative
    /// hyperparameters.
    pub fn score_likelihood_with(&self, relation: usize, hp: &HyperParams) -> Result<f64, IrmError> {
        Ok(self.relation(relation)?.score_with(hp))
    }

    /// Sum of the log likelihoods of every relation.
    pub fn score_likelihood_total(&self) -> f64 {
        self.relations.iter().map(|r| r.score_with(&r.hp)).sum()
    }

    /// Group tuples of `relation` that currently hold statistics.
    pub fn suffstat_keys(&self, relation: usize) -> Result<Vec<Vec<usize>>, IrmError> {
        Ok(self.relation(relation)?.table.keys().cloned().collect())
    }

    /// Identifiers of the statistics of `relation`, ordered by group tuple.
    pub fn suffstats_identifiers(&self, relation: usize) -> Result<Vec<u64>, IrmError> {
        Ok(self
            .relation(relation)?
            .table
            .values()
            .map(|entry| entry.ident)
            .collect())
    }

    /// Statistics of the group tuple `key`, if present.
    pub fn suffstats(&self, relation: usize, key: &[usize]) -> Result<Option<&SuffstatEntry>, IrmError> {
        Ok(self.relation(relation)?.table.get(key))
    }

    /// Latent parameter `name` of the group tuple `key`.
    pub fn theta(&self, relation: usize, key: &[usize], name: &str) -> Result<f64, IrmError> {
        let entry = self
            .suffstats(relation, key)?
            .ok_or_else(|| missing_key(relation, key))?;
        entry.stats.theta(name).ok_or_else(|| {
            IrmError::Model(
                ErrorInfo::new("unknown-theta", "component model has no such latent parameter")
                    .with_context("relation", relation)
                    .with_context("name", name),
            )
        })
    }

    /// Overwrites the latent parameter `name` of the group tuple `key`.
    pub fn set_theta(
        &mut self,
        relation: usize,
        key: &[usize],
        name: &str,
        value: f64,
    ) -> Result<(), IrmError> {
        let entry = self
            .relation_mut(relation)?
            .table
            .get_mut(key)
            .ok_or_else(|| missing_key(relation, key))?;
        entry.stats.set_theta(name, value)
    }

    /// Relation id and coordinates of every observation involving `eid`,
    /// each counted once.
    pub fn entity_data_positions(
        &self,
        domain: usize,
        eid: usize,
        views: &[SharedDataview],
    ) -> Result<Vec<(usize, Vec<usize>)>, IrmError> {
        self.check_views(views)?;
        self.domain(domain)?.assignment(eid)?;
        Ok(self
            .entity_entries(domain, eid, views)
            .into_iter()
            .map(|(rid, coords, _)| (rid, coords))
            .collect())
    }

    /// Verifies that every entity is assigned and that the statistics agree
    /// with a recount of `views`.
    pub fn check_consistency(&self, views: &[SharedDataview]) -> Result<(), IrmError> {
        self.check_structure()?;
        self.check_views(views)?;
        for (did, domain) in self.domains.iter().enumerate() {
            if let Some(eid) = domain.assignments().iter().position(Option::is_none) {
                return Err(IrmError::Model(
                    ErrorInfo::new("entity-unassigned", "entity is not assigned")
                        .with_context("domain", did)
                        .with_context("entity", eid),
                ));
            }
        }
        for (rid, view) in views.iter().enumerate() {
            let mut counts: BTreeMap<Vec<usize>, usize> = BTreeMap::new();
            for (coords, _) in view.observed() {
                *counts.entry(self.group_key(rid, &coords, None)?).or_default() += 1;
            }
            for (key, entry) in &self.relations[rid].table {
                let expected = counts.remove(key).unwrap_or(0);
                if entry.count != expected || entry.stats.len() != expected as u64 {
                    return Err(IrmError::Model(
                        ErrorInfo::new("suffstats-mismatch", "statistics disagree with the data")
                            .with_context("relation", rid)
                            .with_context("key", format!("{key:?}"))
                            .with_context("expected", expected)
                            .with_context("found", entry.count),
                    ));
                }
            }
            if let Some(key) = counts.keys().next() {
                return Err(missing_key(rid, key));
            }
        }
        Ok(())
    }

    /// Checks internal invariants that hold without the data: group sizes
    /// match assignments and every group tuple references live groups.
    pub fn check_structure(&self) -> Result<(), IrmError> {
        for domain in &self.domains {
            domain.check_consistency()?;
        }
        for (rid, relation) in self.relations.iter().enumerate() {
            for &d in &relation.domains {
                if d >= self.domains.len() {
                    return Err(domain_out_of_range(d, self.domains.len()));
                }
            }
            for key in relation.table.keys() {
                let live = key.len() == relation.domains.len()
                    && key
                        .iter()
                        .zip(&relation.domains)
                        .all(|(&gid, &d)| self.domains[d].contains_group(gid));
                if !live {
                    return Err(IrmError::Model(
                        ErrorInfo::new("stale-suffstats", "group tuple references a dead group")
                            .with_context("relation", rid)
                            .with_context("key", format!("{key:?}")),
                    ));
                }
            }
        }
        Ok(())
    }

    fn entity_entries(&self, domain: usize, eid: usize, views: &[SharedDataview]) -> Vec<EntityEntry> {
        let mut out = Vec::new();
        for (rid, relation) in self.relations.iter().enumerate() {
            for (axis, &d) in relation.domains.iter().enumerate() {
                if d != domain {
                    continue;
                }
                for (coords, value) in views[rid].slice(axis, eid) {
                    // an earlier axis of the same domain already yielded this cell
                    let seen = relation.domains[..axis]
                        .iter()
                        .zip(&coords)
                        .any(|(&other, &coord)| other == domain && coord == eid);
                    if !seen {
                        out.push((rid, coords, value));
                    }
                }
            }
        }
        out
    }

    fn group_key(
        &self,
        relation: usize,
        coords: &[usize],
        candidate: Option<(usize, usize, usize)>,
    ) -> Result<Vec<usize>, IrmError> {
        self.relations[relation]
            .domains
            .iter()
            .zip(coords)
            .map(|(&d, &coord)| {
                if let Some((domain, eid, gid)) = candidate {
                    if d == domain && coord == eid {
                        return Ok(gid);
                    }
                }
                self.domains[d].assignment(coord)?.ok_or_else(|| {
                    IrmError::Model(
                        ErrorInfo::new("entity-unassigned", "observation touches an unassigned entity")
                            .with_context("domain", d)
                            .with_context("entity", coord),
                    )
                })
            })
            .collect()
    }
}

fn assign_labels(domain: &mut DomainState, did: usize, labels: &[usize]) -> Result<(), IrmError> {
    if labels.len() != domain.nentities() {
        return Err(IrmError::Config(
            ErrorInfo::new("assignment-length", "one label per entity is required")
                .with_context("domain", did)
                .with_context("expected", domain.nentities())
                .with_context("found", labels.len()),
        ));
    }
    if let Some(&max) = labels.iter().max() {
        domain.ensure_group(max);
    }
    for (eid, &gid) in labels.iter().enumerate() {
        domain.add_value(gid, eid)?;
    }
    Ok(())
}

fn draw_from_prior<R: Rng + ?Sized>(domain: &mut DomainState, rng: &mut R) -> Result<(), IrmError> {
    let alpha = domain.alpha();
    for eid in 0..domain.nentities() {
        let gids = domain.groups();
        let mut weights = gids
            .iter()
            .map(|&gid| domain.groupsize(gid).map(|size| size as f64))
            .collect::<Result<Vec<_>, _>>()?;
        weights.push(alpha);
        let choice = WeightedIndex::new(&weights)
            .map_err(|err| IrmError::primitive("crp-weights", err.to_string()))?
            .sample(rng);
        let gid = match gids.get(choice) {
            Some(&gid) => gid,
            None => domain.create_group(),
        };
        domain.add_value(gid, eid)?;
    }
    Ok(())
}

fn domain_out_of_range(domain: usize, ndomains: usize) -> IrmError {
    IrmError::Config(
        ErrorInfo::new("domain-out-of-range", "domain id out of range")
            .with_context("domain", domain)
            .with_context("ndomains", ndomains),
    )
}

fn relation_out_of_range(relation: usize, nrelations: usize) -> IrmError {
    IrmError::Config(
        ErrorInfo::new("relation-out-of-range", "relation id out of range")
            .with_context("relation", relation)
            .with_context("nrelations", nrelations),
    )
}

fn missing_key(relation: usize, key: &[usize]) -> IrmError {
    IrmError::Model(
        ErrorInfo::new("missing-suffstats", "no statistics for the group tuple")
            .with_context("relation", relation)
            .with_context("key", format!("{key:?}")),
    )
}
