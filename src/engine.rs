// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::filters;
use crate::infer::{infer_context, Error};
use crate::lookup::MapLookup;
use crate::value::Value;

use anyhow::{bail, Result};

/// The inference engine: owns the global-configuration and filter-default
/// tables and infers context shapes for template sources.
#[derive(Debug, Clone)]
pub struct Engine {
    globals: MapLookup,
    filter_defaults: MapLookup,
}

/// Create an engine with empty tables.
impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            globals: MapLookup::new(),
            filter_defaults: MapLookup::new(),
        }
    }

    /// An engine preloaded with the standard formatting-filter defaults.
    pub fn with_default_filters() -> Self {
        Self {
            globals: MapLookup::new(),
            filter_defaults: filters::standard_defaults(),
        }
    }

    /// Register an application-level global. Inferred placeholders for this
    /// name are replaced with `value` verbatim.
    pub fn add_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.insert(name, value);
    }

    /// Register every entry of an object as a global, e.g. loaded from a
    /// JSON configuration document.
    pub fn add_globals(&mut self, config: Value) -> Result<()> {
        let Value::Object(fields) = config else {
            bail!("globals must be an object");
        };
        for (name, value) in fields.iter() {
            self.globals.insert(name.as_ref(), value.clone());
        }
        Ok(())
    }

    /// Register the default placeholder value for a named filter.
    pub fn set_filter_default(&mut self, name: impl Into<String>, value: Value) {
        self.filter_defaults.insert(name, value);
    }

    /// Infer the context shape required to render `source`.
    pub fn infer(&self, source: &str) -> Result<Value, Error> {
        infer_context(source, &self.globals, &self.filter_defaults)
    }
}
