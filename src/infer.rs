// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The context inferencer.
//!
//! Six passes over one parse tree, each refining a shared mutable mapping:
//!
//! 1. attribute accesses seed one-level record shapes,
//! 2. undeclared variables seed empty-string scalars,
//! 3. filter applications override scalars with filter defaults,
//! 4. comparisons against literals override placeholders with the literal,
//! 5. for-loops rewrite the loop target's shape into a one-element list
//!    under the loop source's name,
//! 6. names present in the global configuration take its value verbatim.
//!
//! Later passes depend on state seeded by earlier ones: the comparison pass
//! only overrides existing keys, and the loop pass only rewrites shapes the
//! earlier passes built for the loop target.

use crate::analysis;
use crate::ast::*;
use crate::lexer::Source;
use crate::lookup::NameLookup;
use crate::parser::Parser;
use crate::value::Value;

use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::warn;

/// Failure modes of [`infer_context`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The template source was rejected by the parser.
    #[error("{0}")]
    Syntax(anyhow::Error),
    /// An attribute chain more than one level deep, e.g. `user.name.first`.
    /// Deep chains are a documented limitation, reported rather than
    /// silently truncated.
    #[error("{message}")]
    AttributeTooDeep { path: String, message: String },
}

/// Infer the context shape required to render `source`.
///
/// Returns a mapping with one key per free variable the template references.
/// Values are empty-string scalars, literal constants, one-level records, or
/// single-element lists of records. The result owns all of its data and
/// aliases nothing from the parse tree.
pub fn infer_context(
    source: &str,
    global_config: &dyn NameLookup,
    filter_defaults: &dyn NameLookup,
) -> Result<Value, Error> {
    let source =
        Source::from_contents("<template>".to_string(), source.to_string()).map_err(Error::Syntax)?;
    let mut parser = Parser::new(&source).map_err(Error::Syntax)?;
    let template = parser.parse().map_err(Error::Syntax)?;
    infer_template(&template, global_config, filter_defaults)
}

/// Run the inference passes over an already parsed template.
pub fn infer_template(
    template: &Template,
    global_config: &dyn NameLookup,
    filter_defaults: &dyn NameLookup,
) -> Result<Value, Error> {
    check_attribute_depth(template)?;

    let mut data = BTreeMap::new();
    seed_attributes(template, &mut data);
    seed_bare_names(template, &mut data);
    apply_filter_defaults(template, filter_defaults, &mut data);
    apply_comparison_constants(template, &mut data);
    rewrite_loops(template, &mut data);
    apply_global_overrides(global_config, &mut data);
    Ok(Value::from(data))
}

fn check_attribute_depth(template: &Template) -> Result<(), Error> {
    for node in template.find_all(ExprKind::Getattr) {
        if let Expr::Getattr { span, expr, .. } = node.as_ref() {
            if matches!(expr.as_ref(), Expr::Getattr { .. }) {
                let path = span.text().to_string();
                let message = span.message(
                    "error",
                    &format!("attribute access deeper than one level: `{path}`"),
                );
                return Err(Error::AttributeTooDeep { path, message });
            }
        }
    }
    Ok(())
}

/// Pass 1: seed one-level record shapes from `base.attr` accesses.
fn seed_attributes(template: &Template, data: &mut BTreeMap<Rc<str>, Value>) {
    for node in template.find_all(ExprKind::Getattr) {
        let Expr::Getattr { expr, attr, .. } = node.as_ref() else {
            continue;
        };
        let Expr::Name { span } = expr.as_ref() else {
            warn!(
                "{}",
                node.span()
                    .message("warning", "attribute base is not a bare name; skipping")
            );
            continue;
        };
        let entry = data
            .entry(Rc::from(span.text()))
            .or_insert_with(Value::new_object);
        if !entry.is_object() {
            // Attribute evidence wins over a previously seeded scalar.
            *entry = Value::new_object();
        }
        if let Value::Object(fields) = entry {
            Rc::make_mut(fields)
                .entry(Rc::from(attr.text()))
                .or_insert_with(|| Value::from(""));
        }
    }
}

/// Pass 2: seed scalar placeholders for free variables not already present.
fn seed_bare_names(template: &Template, data: &mut BTreeMap<Rc<str>, Value>) {
    for name in analysis::undeclared_variables(template) {
        data.entry(Rc::from(name.as_str()))
            .or_insert_with(|| Value::from(""));
    }
}

/// Pass 3: override scalar placeholders with filter default values.
fn apply_filter_defaults(
    template: &Template,
    filter_defaults: &dyn NameLookup,
    data: &mut BTreeMap<Rc<str>, Value>,
) {
    for node in template.find_all(ExprKind::Filter) {
        let Expr::Filter { expr, name, .. } = node.as_ref() else {
            continue;
        };
        let default = filter_defaults.get(name.text(), Value::from(""));
        match expr.as_ref() {
            Expr::Getattr {
                expr: base, attr, ..
            } => {
                let Expr::Name { span } = base.as_ref() else {
                    continue;
                };
                let Some(Value::Object(fields)) = data.get_mut(span.text()) else {
                    continue;
                };
                // A nested record takes precedence over a filter scalar;
                // filters never apply to whole records.
                let fields = Rc::make_mut(fields);
                if !matches!(fields.get(attr.text()), Some(Value::Object(_))) {
                    fields.insert(Rc::from(attr.text()), default);
                }
            }
            Expr::Name { span } => {
                if !matches!(data.get(span.text()), Some(Value::Object(_))) {
                    data.insert(Rc::from(span.text()), default);
                }
            }
            _ => {
                warn!(
                    "{}",
                    node.span().message(
                        "warning",
                        "filter target is not a name or attribute; skipping"
                    )
                );
            }
        }
    }
}

/// Pass 4: override placeholders with constants the template compares
/// against. Runs after the filter pass, so a comparison constant wins when
/// both target the same key.
fn apply_comparison_constants(template: &Template, data: &mut BTreeMap<Rc<str>, Value>) {
    for node in template.find_all(ExprKind::Compare) {
        let Expr::Compare { lhs, .. } = node.as_ref() else {
            continue;
        };
        let Some(constant) = find_constant(&node) else {
            // A data gap, not an error: the comparison tells us nothing.
            warn!(
                "{}",
                node.span()
                    .message("warning", "no constant in comparison; skipping")
            );
            continue;
        };
        match lhs.as_ref() {
            Expr::Name { span } => {
                // Only overrides keys the earlier passes created.
                if data.contains_key(span.text()) {
                    data.insert(Rc::from(span.text()), constant);
                }
            }
            Expr::Getattr {
                expr: base, attr, ..
            } => {
                let Expr::Name { span } = base.as_ref() else {
                    continue;
                };
                if let Some(Value::Object(fields)) = data.get_mut(span.text()) {
                    Rc::make_mut(fields).insert(Rc::from(attr.text()), constant);
                }
            }
            _ => {
                warn!(
                    "{}",
                    node.span()
                        .message("warning", "unable to infer a type from comparison")
                );
            }
        }
    }
}

/// The first literal constant within `expr`, in document order.
fn find_constant(expr: &Ref<Expr>) -> Option<Value> {
    let mut found = None;
    walk_expr(expr, &mut |node| {
        if found.is_none() {
            if let Expr::Const { value, .. } = node.as_ref() {
                found = Some(value.clone());
            }
        }
    });
    found
}

/// Pass 5: rewrite each loop target's shape into a one-element list keyed by
/// the loop source, and discard the implicit `loop` binding.
fn rewrite_loops(template: &Template, data: &mut BTreeMap<Rc<str>, Value>) {
    for ForLoop { target, iter } in template.for_loops() {
        let target_name = target.text();
        let Some(shape) = data.remove(target_name) else {
            // The loop body referenced nothing on the target, so this loop
            // produced no usable shape for its source.
            warn!(
                "{}",
                target.message(
                    "warning",
                    &format!("loop target `{target_name}` was never seeded; skipping")
                )
            );
            continue;
        };
        match iter.as_ref() {
            Expr::Name { span } => {
                data.insert(Rc::from(span.text()), Value::from(vec![shape]));
            }
            _ => {
                warn!(
                    "{}",
                    iter.span()
                        .message("warning", "loop source is not a bare name; skipping")
                );
            }
        }
    }
    // The implicit loop-metadata binding never belongs in the context.
    data.remove("loop");
}

/// Pass 6: configured globals replace inferred placeholders verbatim.
fn apply_global_overrides(global_config: &dyn NameLookup, data: &mut BTreeMap<Rc<str>, Value>) {
    for (name, value) in data.iter_mut() {
        if let Some(configured) = global_config.lookup(name) {
            *value = configured.clone();
        }
    }
}
