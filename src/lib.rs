// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod analysis;
mod ast;
mod engine;
mod filters;
mod infer;
mod lexer;
mod lookup;
mod number;
mod parser;
mod value;

pub use engine::Engine;
pub use filters::standard_defaults;
pub use infer::{infer_context, infer_template, Error};
pub use lookup::{MapLookup, NameLookup};
pub use number::Number;
pub use value::Value;

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::analysis::*;
    pub use crate::ast::*;
    pub use crate::lexer::*;
    pub use crate::parser::*;
}
