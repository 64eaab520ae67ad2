//! # Column-oriented analytical feature store
//!
//! Every feature is a column of one scalar type with exactly one entry per
//! observation of the owning track. Text features are a sparse side table keyed by
//! observation index, so a missing string costs nothing.
//!
//! The store never knows the observation count by itself: the owning [`Track`](crate::track::Track)
//! passes it in on creation and keeps every column in sync through the structural
//! methods (`push_missing`, `remove_indices`, `slice`, ...).
use std::collections::{BTreeMap, HashMap};

use ahash::RandomState;

use crate::constants::{NAN, NO_DATA_INT};
use crate::tracklib_errors::TrackError;

/// Scalar type of a feature column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Float,
    Int,
    Bool,
    Text,
}

/// One value read from, or written to, a feature column.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Float(f64),
    Int(i64),
    Bool(bool),
    Text(String),
    Missing,
}

impl FeatureValue {
    /// Numeric view: ints widen, bools map to 0/1, text parses or is NaN.
    pub fn as_f64(&self) -> f64 {
        match self {
            FeatureValue::Float(v) => *v,
            FeatureValue::Int(v) if *v == NO_DATA_INT => NAN,
            FeatureValue::Int(v) => *v as f64,
            FeatureValue::Bool(b) => f64::from(u8::from(*b)),
            FeatureValue::Text(s) => s.trim().parse().unwrap_or(NAN),
            FeatureValue::Missing => NAN,
        }
    }
}

/// Storage of one feature.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureColumn {
    Float(Vec<f64>),
    Int(Vec<i64>),
    Bool(Vec<bool>),
    Text {
        len: usize,
        values: BTreeMap<usize, String>,
    },
}

impl FeatureColumn {
    /// Column of `n` no-data entries.
    pub fn missing(kind: FeatureKind, n: usize) -> Self {
        match kind {
            FeatureKind::Float => FeatureColumn::Float(vec![NAN; n]),
            FeatureKind::Int => FeatureColumn::Int(vec![NO_DATA_INT; n]),
            FeatureKind::Bool => FeatureColumn::Bool(vec![false; n]),
            FeatureKind::Text => FeatureColumn::Text {
                len: n,
                values: BTreeMap::new(),
            },
        }
    }

    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureColumn::Float(_) => FeatureKind::Float,
            FeatureColumn::Int(_) => FeatureKind::Int,
            FeatureColumn::Bool(_) => FeatureKind::Bool,
            FeatureColumn::Text { .. } => FeatureKind::Text,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FeatureColumn::Float(v) => v.len(),
            FeatureColumn::Int(v) => v.len(),
            FeatureColumn::Bool(v) => v.len(),
            FeatureColumn::Text { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> FeatureValue {
        match self {
            FeatureColumn::Float(v) => FeatureValue::Float(v[i]),
            FeatureColumn::Int(v) => FeatureValue::Int(v[i]),
            FeatureColumn::Bool(v) => FeatureValue::Bool(v[i]),
            FeatureColumn::Text { values, .. } => values
                .get(&i)
                .map(|s| FeatureValue::Text(s.clone()))
                .unwrap_or(FeatureValue::Missing),
        }
    }

    /// Write `value` at `i`, converting it to the column type.
    pub fn set(&mut self, i: usize, value: FeatureValue) {
        match self {
            FeatureColumn::Float(v) => v[i] = value.as_f64(),
            FeatureColumn::Int(v) => {
                let x = value.as_f64();
                v[i] = if x.is_finite() {
                    x.round() as i64
                } else {
                    NO_DATA_INT
                };
            }
            FeatureColumn::Bool(v) => {
                let x = value.as_f64();
                v[i] = x.is_finite() && x != 0.0;
            }
            FeatureColumn::Text { values, .. } => match value {
                FeatureValue::Missing => {
                    values.remove(&i);
                }
                FeatureValue::Text(s) => {
                    values.insert(i, s);
                }
                other => {
                    values.insert(i, other.as_f64().to_string());
                }
            },
        }
    }

    /// Numeric copy of the whole column.
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            FeatureColumn::Float(v) => v.clone(),
            _ => (0..self.len()).map(|i| self.get(i).as_f64()).collect(),
        }
    }

    fn push_missing(&mut self) {
        match self {
            FeatureColumn::Float(v) => v.push(NAN),
            FeatureColumn::Int(v) => v.push(NO_DATA_INT),
            FeatureColumn::Bool(v) => v.push(false),
            FeatureColumn::Text { len, .. } => *len += 1,
        }
    }

    /// Build a new column picking `indices` in order (indices may repeat).
    fn select(&self, indices: &[usize]) -> FeatureColumn {
        match self {
            FeatureColumn::Float(v) => FeatureColumn::Float(indices.iter().map(|&i| v[i]).collect()),
            FeatureColumn::Int(v) => FeatureColumn::Int(indices.iter().map(|&i| v[i]).collect()),
            FeatureColumn::Bool(v) => FeatureColumn::Bool(indices.iter().map(|&i| v[i]).collect()),
            FeatureColumn::Text { values, .. } => FeatureColumn::Text {
                len: indices.len(),
                values: indices
                    .iter()
                    .enumerate()
                    .filter_map(|(new, old)| values.get(old).map(|s| (new, s.clone())))
                    .collect(),
            },
        }
    }

    fn append(&mut self, other: &FeatureColumn) {
        let offset = self.len();
        match (self, other) {
            (FeatureColumn::Float(a), FeatureColumn::Float(b)) => a.extend_from_slice(b),
            (FeatureColumn::Int(a), FeatureColumn::Int(b)) => a.extend_from_slice(b),
            (FeatureColumn::Bool(a), FeatureColumn::Bool(b)) => a.extend_from_slice(b),
            (
                FeatureColumn::Text { len, values },
                FeatureColumn::Text {
                    len: other_len,
                    values: other_values,
                },
            ) => {
                values.extend(other_values.iter().map(|(i, s)| (i + offset, s.clone())));
                *len += other_len;
            }
            (this, other) => {
                for i in 0..other.len() {
                    this.push_missing();
                    this.set(offset + i, other.get(i));
                }
            }
        }
    }
}

/// Named feature columns of one track.
#[derive(Debug, Clone, Default)]
pub struct FeatureStore {
    names: Vec<String>,
    index: HashMap<String, usize, RandomState>,
    columns: Vec<FeatureColumn>,
}

impl PartialEq for FeatureStore {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names && self.columns == other.columns
    }
}

impl FeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Result<&FeatureColumn, TrackError> {
        self.index
            .get(name)
            .map(|&k| &self.columns[k])
            .ok_or_else(|| TrackError::missing(name))
    }

    pub fn column_mut(&mut self, name: &str) -> Result<&mut FeatureColumn, TrackError> {
        match self.index.get(name) {
            Some(&k) => Ok(&mut self.columns[k]),
            None => Err(TrackError::missing(name)),
        }
    }

    /// Insert or replace a column, checking its length against `n_obs`.
    pub fn insert(
        &mut self,
        name: &str,
        column: FeatureColumn,
        n_obs: usize,
    ) -> Result<(), TrackError> {
        if column.len() != n_obs {
            return Err(TrackError::Structural(format!(
                "feature '{name}' has {} values for {n_obs} observations",
                column.len()
            )));
        }
        match self.index.get(name) {
            Some(&k) => self.columns[k] = column,
            None => {
                self.index.insert(name.to_string(), self.columns.len());
                self.names.push(name.to_string());
                self.columns.push(column);
            }
        }
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<FeatureColumn, TrackError> {
        let k = self.index.remove(name).ok_or_else(|| TrackError::missing(name))?;
        self.names.remove(k);
        let column = self.columns.remove(k);
        for slot in self.index.values_mut() {
            if *slot > k {
                *slot -= 1;
            }
        }
        Ok(column)
    }

    pub(crate) fn push_missing(&mut self) {
        self.columns.iter_mut().for_each(FeatureColumn::push_missing);
    }

    /// Keep only `indices` (in that order) in every column.
    pub(crate) fn select(&self, indices: &[usize]) -> FeatureStore {
        FeatureStore {
            names: self.names.clone(),
            index: self.index.clone(),
            columns: self.columns.iter().map(|c| c.select(indices)).collect(),
        }
    }

    /// Columns present in both stores, concatenated; the others are dropped.
    pub(crate) fn concatenate(&self, other: &FeatureStore) -> Result<FeatureStore, TrackError> {
        let mut out = FeatureStore::new();
        for (name, column) in self.names.iter().zip(&self.columns) {
            if let Ok(tail) = other.column(name) {
                let mut merged = column.clone();
                merged.append(tail);
                let n = merged.len();
                out.insert(name, merged, n)?;
            }
        }
        Ok(out)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &FeatureColumn)> {
        self.names.iter().zip(self.columns.iter())
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut FeatureColumn)> {
        self.names.iter().zip(self.columns.iter_mut())
    }
}
