//! Read-only views over observed relation data.
//!
//! A relation of arity `k` is a `k`-dimensional array indexed by entity ids,
//! with some cells possibly unobserved (masked). Samplers only ever read a
//! dataview; views are shared between chains as [`SharedDataview`] handles.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{ErrorInfo, IrmError};

/// A single observed cell of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Binary observation.
    Bool(bool),
    /// Non-negative count observation.
    Count(u64),
    /// Real-valued observation.
    Real(f64),
}

/// Type tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// Binary observations.
    Bool,
    /// Count observations.
    Count,
    /// Real-valued observations.
    Real,
}

impl Value {
    /// Returns the type tag of the value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Count(_) => ValueKind::Count,
            Value::Real(_) => ValueKind::Real,
        }
    }

    fn digest_into(&self, hasher: &mut Sha256) {
        match self {
            Value::Bool(v) => {
                hasher.update([0u8]);
                hasher.update([*v as u8]);
            }
            Value::Count(v) => {
                hasher.update([1u8]);
                hasher.update(v.to_le_bytes());
            }
            Value::Real(v) => {
                hasher.update([2u8]);
                hasher.update(v.to_bits().to_le_bytes());
            }
        }
    }
}

/// One observed entry: its coordinate tuple and value.
pub type Entry = (Vec<usize>, Value);

/// Masked random access to the entries of one relation.
pub trait RelationDataview: Send + Sync + fmt::Debug {
    /// Extent of each axis.
    fn shape(&self) -> &[usize];

    /// Value at `coords`, or `None` when the cell is masked or out of range.
    fn get(&self, coords: &[usize]) -> Option<Value>;

    /// Observed entries whose coordinate along `axis` equals `index`, in
    /// row-major order.
    fn slice(&self, axis: usize, index: usize) -> Vec<Entry>;

    /// Number of dimensions.
    fn dims(&self) -> usize {
        self.shape().len()
    }

    /// All observed entries in row-major order.
    fn observed(&self) -> Vec<Entry> {
        match self.shape().first() {
            Some(&rows) => (0..rows).flat_map(|row| self.slice(0, row)).collect(),
            None => Vec::new(),
        }
    }

    /// Folds a layout-independent fingerprint of the content into `hasher`.
    fn update_digest(&self, hasher: &mut Sha256) {
        hasher.update((self.dims() as u64).to_le_bytes());
        for extent in self.shape() {
            hasher.update((*extent as u64).to_le_bytes());
        }
        for (coords, value) in self.observed() {
            for coord in coords {
                hasher.update((coord as u64).to_le_bytes());
            }
            value.digest_into(hasher);
        }
    }
}

/// Shared, immutable handle to a dataview.
pub type SharedDataview = Arc<dyn RelationDataview>;

fn validate_shape(shape: &[usize]) -> Result<(), IrmError> {
    if shape.is_empty() || shape.iter().any(|&extent| extent == 0) {
        return Err(IrmError::Config(
            ErrorInfo::new("dataview-shape", "every axis must have a positive extent")
                .with_context("shape", format!("{shape:?}")),
        ));
    }
    Ok(())
}

fn in_bounds(shape: &[usize], coords: &[usize]) -> bool {
    coords.len() == shape.len() && coords.iter().zip(shape).all(|(c, n)| c < n)
}

#[derive(Deserialize)]
struct DenseDataviewRepr {
    shape: Vec<usize>,
    values: Vec<Value>,
    mask: Vec<bool>,
}

/// Dense row-major relation with an optional mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DenseDataviewRepr")]
pub struct DenseDataview {
    shape: Vec<usize>,
    values: Vec<Value>,
    /// `true` marks an unobserved cell.
    mask: Vec<bool>,
}

impl DenseDataview {
    /// Builds a fully observed dense view.
    pub fn new(shape: Vec<usize>, values: Vec<Value>) -> Result<Self, IrmError> {
        let mask = vec![false; values.len()];
        Self::masked(shape, values, mask)
    }

    /// Builds a dense view where `mask[i] == true` hides cell `i`.
    pub fn masked(shape: Vec<usize>, values: Vec<Value>, mask: Vec<bool>) -> Result<Self, IrmError> {
        validate_shape(&shape)?;
        let cells: usize = shape.iter().product();
        if values.len() != cells || mask.len() != cells {
            return Err(IrmError::Config(
                ErrorInfo::new("dataview-size", "value and mask lengths must match the shape")
                    .with_context("cells", cells)
                    .with_context("values", values.len())
                    .with_context("mask", mask.len()),
            ));
        }
        Ok(Self {
            shape,
            values,
            mask,
        })
    }

    /// Convenience constructor for boolean relations.
    pub fn from_bools(shape: Vec<usize>, values: &[bool], mask: &[bool]) -> Result<Self, IrmError> {
        Self::masked(
            shape,
            values.iter().map(|&v| Value::Bool(v)).collect(),
            mask.to_vec(),
        )
    }

    fn offset(&self, coords: &[usize]) -> usize {
        coords
            .iter()
            .zip(&self.shape)
            .fold(0, |acc, (coord, extent)| acc * extent + coord)
    }
}

impl TryFrom<DenseDataviewRepr> for DenseDataview {
    type Error = IrmError;

    fn try_from(repr: DenseDataviewRepr) -> Result<Self, Self::Error> {
        Self::masked(repr.shape, repr.values, repr.mask)
    }
}

impl RelationDataview for DenseDataview {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn get(&self, coords: &[usize]) -> Option<Value> {
        if !in_bounds(&self.shape, coords) {
            return None;
        }
        let offset = self.offset(coords);
        if self.mask[offset] {
            None
        } else {
            Some(self.values[offset])
        }
    }

    fn slice(&self, axis: usize, index: usize) -> Vec<Entry> {
        if axis >= self.shape.len() || index >= self.shape[axis] {
            return Vec::new();
        }
        let mut free_shape = self.shape.clone();
        free_shape[axis] = 1;
        let mut out = Vec::new();
        let mut coords = vec![0usize; self.shape.len()];
        coords[axis] = index;
        loop {
            if let Some(value) = self.get(&coords) {
                out.push((coords.clone(), value));
            }
            // odometer over every axis except `axis`
            let mut dim = self.shape.len();
            loop {
                if dim == 0 {
                    return out;
                }
                dim -= 1;
                if dim == axis {
                    continue;
                }
                coords[dim] += 1;
                if coords[dim] < free_shape[dim] {
                    break;
                }
                coords[dim] = 0;
            }
        }
    }
}

/// Sparse relation storing only observed cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SparseDataview {
    shape: Vec<usize>,
    entries: BTreeMap<Vec<usize>, Value>,
    #[serde(skip)]
    by_axis: Vec<Vec<Vec<Vec<usize>>>>,
}

impl SparseDataview {
    /// Builds a sparse view from observed entries; duplicates are rejected.
    pub fn from_entries(
        shape: Vec<usize>,
        entries: impl IntoIterator<Item = Entry>,
    ) -> Result<Self, IrmError> {
        validate_shape(&shape)?;
        let mut table = BTreeMap::new();
        for (coords, value) in entries {
            if !in_bounds(&shape, &coords) {
                return Err(IrmError::Config(
                    ErrorInfo::new("dataview-coords", "entry lies outside the relation shape")
                        .with_context("coords", format!("{coords:?}"))
                        .with_context("shape", format!("{shape:?}")),
                ));
            }
            if table.insert(coords.clone(), value).is_some() {
                return Err(IrmError::Config(
                    ErrorInfo::new("dataview-duplicate", "entry supplied twice")
                        .with_context("coords", format!("{coords:?}")),
                ));
            }
        }
        let mut view = Self {
            shape,
            entries: table,
            by_axis: Vec::new(),
        };
        view.build_index();
        Ok(view)
    }

    /// Number of observed cells.
    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    fn build_index(&mut self) {
        self.by_axis = self
            .shape
            .iter()
            .map(|&extent| vec![Vec::new(); extent])
            .collect();
        for coords in self.entries.keys() {
            for (axis, &coord) in coords.iter().enumerate() {
                self.by_axis[axis][coord].push(coords.clone());
            }
        }
    }
}

impl RelationDataview for SparseDataview {
    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn get(&self, coords: &[usize]) -> Option<Value> {
        self.entries.get(coords).copied()
    }

    fn slice(&self, axis: usize, index: usize) -> Vec<Entry> {
        if self.by_axis.is_empty() && !self.entries.is_empty() {
            // deserialized without its index
            return self
                .entries
                .iter()
                .filter(|(coords, _)| coords.get(axis) == Some(&index))
                .map(|(coords, value)| (coords.clone(), *value))
                .collect();
        }
        self.by_axis
            .get(axis)
            .and_then(|axis_index| axis_index.get(index))
            .map(|keys| {
                keys.iter()
                    .map(|coords| (coords.clone(), self.entries[coords]))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn observed(&self) -> Vec<Entry> {
        self.entries
            .iter()
            .map(|(coords, value)| (coords.clone(), *value))
            .collect()
    }
}

/// SHA-256 digest over a list of dataviews, in order.
pub fn digest_views(views: &[SharedDataview], mut hasher: Sha256) -> Sha256 {
    for view in views {
        view.update_digest(&mut hasher);
    }
    hasher
}

/// Hex encoding of a finished digest.
pub fn hex_digest(hasher: Sha256) -> String {
    hex::encode(hasher.finalize())
}
