// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Name → value lookup tables.
//!
//! Inference consults two of these: the filter-name → default-placeholder
//! table and the hosting application's global configuration. Both sit behind
//! the [`NameLookup`] trait so callers can back them with whatever store
//! they have.

use crate::value::Value;

use std::collections::BTreeMap;

pub trait NameLookup {
    /// The value registered under `name`, if any.
    fn lookup(&self, name: &str) -> Option<&Value>;

    fn get(&self, name: &str, default: Value) -> Value {
        match self.lookup(name) {
            Some(v) => v.clone(),
            None => default,
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

/// A [`NameLookup`] backed by a sorted map.
#[derive(Debug, Default, Clone)]
pub struct MapLookup {
    entries: BTreeMap<String, Value>,
}

impl MapLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.entries.insert(name.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl NameLookup for MapLookup {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }
}

impl From<BTreeMap<String, Value>> for MapLookup {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Self { entries }
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for MapLookup {
    fn from_iter<T: IntoIterator<Item = (S, Value)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
