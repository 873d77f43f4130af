// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use anyhow::Result;
use contemplate::{infer_context, Error, MapLookup, NameLookup, Value};

fn infer(source: &str) -> Result<Value, Error> {
    let empty = MapLookup::new();
    infer_context(source, &empty, &empty)
}

fn infer_with(
    source: &str,
    globals: &[(&str, Value)],
    filters: &[(&str, Value)],
) -> Result<Value, Error> {
    let globals: MapLookup = globals.iter().cloned().collect();
    let filters: MapLookup = filters.iter().cloned().collect();
    infer_context(source, &globals, &filters)
}

fn json(s: &str) -> Value {
    Value::from_json_str(s).unwrap()
}

#[test]
fn bare_references() -> Result<(), Error> {
    let ctx = infer("{{ x }} {{ y }} {{ x }}")?;
    assert_eq!(ctx, json(r#"{"x": "", "y": ""}"#));
    Ok(())
}

#[test]
fn attribute_evidence_merges() -> Result<(), Error> {
    let ctx = infer("{{ x.a }} ... {{ x.b }}")?;
    assert_eq!(ctx, json(r#"{"x": {"a": "", "b": ""}}"#));
    Ok(())
}

#[test]
fn attribute_wins_over_bare_reference() -> Result<(), Error> {
    let ctx = infer("{{ user }} {{ user.first }}")?;
    assert_eq!(ctx, json(r#"{"user": {"first": ""}}"#));
    Ok(())
}

#[test]
fn filter_default_applies_to_name() -> Result<(), Error> {
    let ctx = infer_with(
        "<p>{{ user }} {{ total|currency }}</p>",
        &[],
        &[("currency", Value::from("$0.00"))],
    )?;
    assert_eq!(ctx, json(r#"{"total": "$0.00", "user": ""}"#));
    Ok(())
}

#[test]
fn filter_default_applies_to_attribute() -> Result<(), Error> {
    let ctx = infer_with(
        "{{ user.a }} {{ user.b|currency }}",
        &[],
        &[("currency", Value::from("$0.00"))],
    )?;
    assert_eq!(ctx, json(r#"{"user": {"a": "", "b": "$0.00"}}"#));
    Ok(())
}

#[test]
fn unknown_filter_defaults_to_empty_string() -> Result<(), Error> {
    let ctx = infer("{{ total|currency }}")?;
    assert_eq!(ctx, json(r#"{"total": ""}"#));
    Ok(())
}

#[test]
fn filter_never_downgrades_a_record() -> Result<(), Error> {
    // `user` has record evidence; the filter on the whole record is ignored.
    let ctx = infer_with(
        "{{ user.first }} {{ user|to_json }}",
        &[],
        &[("to_json", Value::from("{}"))],
    )?;
    assert_eq!(ctx, json(r#"{"user": {"first": ""}}"#));
    Ok(())
}

#[test]
fn comparison_constant_overrides_placeholder() -> Result<(), Error> {
    let ctx = infer(r#"{% if status == "open" %}{{ status }}{% endif %}"#)?;
    assert_eq!(ctx, json(r#"{"status": "open"}"#));
    Ok(())
}

#[test]
fn comparison_constant_on_attribute() -> Result<(), Error> {
    let ctx = infer("{{ order.id }}{% if order.id == 5 %}!{% endif %}")?;
    assert_eq!(ctx, json(r#"{"order": {"id": 5}}"#));
    Ok(())
}

#[test]
fn comparison_wins_over_filter_default() -> Result<(), Error> {
    // The comparison pass runs after the filter pass on purpose.
    let ctx = infer_with(
        "{{ total|currency }}{% if total == 100 %}!{% endif %}",
        &[],
        &[("currency", Value::from("$0.00"))],
    )?;
    assert_eq!(ctx, json(r#"{"total": 100}"#));
    Ok(())
}

#[test]
fn comparison_does_not_create_keys() -> Result<(), Error> {
    // `z` is bound by `set`, so no pass seeds it; the comparison must not
    // resurrect it.
    let ctx = infer("{% set z = 1 %}{% if z == 2 %}a{% endif %}")?;
    assert_eq!(ctx, json("{}"));
    Ok(())
}

#[test]
fn comparison_without_constant_is_skipped() -> Result<(), Error> {
    let ctx = infer("{% if a == b %}x{% endif %}")?;
    assert_eq!(ctx, json(r#"{"a": "", "b": ""}"#));
    Ok(())
}

#[test]
fn truth_test_without_comparison_is_untouched() -> Result<(), Error> {
    // No comparison node at all: the comparison pass is a no-op.
    let ctx = infer("{% if order %}{{ order.id }}{% endif %}")?;
    assert_eq!(ctx, json(r#"{"order": {"id": ""}}"#));
    Ok(())
}

#[test]
fn loop_rewrites_target_into_list() -> Result<(), Error> {
    let ctx = infer("{% for a in items %}{{ a.x }}{% endfor %}")?;
    assert_eq!(ctx, json(r#"{"items": [{"x": ""}]}"#));
    assert_eq!(ctx["a"], Value::Null);
    assert_eq!(ctx["loop"], Value::Null);
    Ok(())
}

#[test]
fn loop_metadata_binding_is_discarded() -> Result<(), Error> {
    let ctx = infer("{% for a in items %}{{ loop.index }}: {{ a.x }}{% endfor %}")?;
    assert_eq!(ctx, json(r#"{"items": [{"x": ""}]}"#));
    Ok(())
}

#[test]
fn loop_with_unseeded_target_is_skipped() -> Result<(), Error> {
    // The body never references the target, so the loop contributes no
    // shape; `items` keeps its scalar placeholder from name seeding.
    let ctx = infer("{% for a in items %}static{% endfor %}")?;
    assert_eq!(ctx, json(r#"{"items": ""}"#));
    Ok(())
}

#[test]
fn loop_source_must_be_a_bare_name() -> Result<(), Error> {
    let ctx = infer("{% for a in items|to_list %}{{ a.x }}{% endfor %}")?;
    // The target's shape is dropped; no list is built.
    assert_eq!(ctx, json(r#"{"items": ""}"#));
    Ok(())
}

#[test]
fn global_override_replaces_inferred_value() -> Result<(), Error> {
    let ctx = infer_with(
        "{{ SITE_URL }} {{ user }}",
        &[("SITE_URL", Value::from("myapp.example.com"))],
        &[],
    )?;
    assert_eq!(ctx, json(r#"{"SITE_URL": "myapp.example.com", "user": ""}"#));
    Ok(())
}

#[test]
fn global_override_beats_any_inferred_shape() -> Result<(), Error> {
    let ctx = infer_with(
        "{{ cfg.a }}{% if cfg == 1 %}{% endif %}",
        &[("cfg", json(r#"{"host": "h", "port": 80}"#))],
        &[],
    )?;
    assert_eq!(ctx, json(r#"{"cfg": {"host": "h", "port": 80}}"#));
    Ok(())
}

#[test]
fn attribute_too_deep_in_output() {
    let err = infer("{{ user.name.first }}").unwrap_err();
    assert!(matches!(
        &err,
        Error::AttributeTooDeep { path, .. } if path == "user.name.first"
    ));
}

#[test]
fn attribute_too_deep_in_filter() {
    let err = infer("{{ user.name.first|currency }}").unwrap_err();
    assert!(matches!(err, Error::AttributeTooDeep { .. }));
}

#[test]
fn attribute_too_deep_in_comparison() {
    let err = infer(r#"{% if user.name.first == "x" %}hi{% endif %}"#).unwrap_err();
    assert!(matches!(err, Error::AttributeTooDeep { .. }));
}

#[test]
fn attribute_too_deep_in_loop_source() {
    let err = infer("{% for a in user.orders.recent %}{{ a.x }}{% endfor %}").unwrap_err();
    assert!(matches!(err, Error::AttributeTooDeep { .. }));
}

#[test]
fn syntax_error_is_fatal() {
    let err = infer("{{ user").unwrap_err();
    assert!(matches!(err, Error::Syntax(_)));
    assert!(err.to_string().contains("expecting `}}`"));
}

#[test]
fn result_is_fully_owned() -> Result<(), Error> {
    // The inferred context outlives the parse tree and source.
    let ctx = {
        let source = String::from("{{ x.a }}");
        infer(&source)?
    };
    assert_eq!(ctx, json(r#"{"x": {"a": ""}}"#));
    Ok(())
}

#[test]
fn lookup_defaults() {
    let table: MapLookup = [("currency", Value::from("$0.00"))].into_iter().collect();
    assert!(table.contains("currency"));
    assert!(!table.contains("mask"));
    assert_eq!(table.get("currency", Value::from("")), Value::from("$0.00"));
    assert_eq!(table.get("mask", Value::from("x")), Value::from("x"));
    assert_eq!(table.len(), 1);
    assert!(!table.is_empty());
    assert!(MapLookup::new().is_empty());
}
