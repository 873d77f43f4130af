// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use anyhow::Result;
use contemplate::unstable::*;

use std::collections::BTreeSet;

fn undeclared(contents: &str) -> Result<BTreeSet<String>> {
    let source = Source::from_contents("test.html".to_string(), contents.to_string())?;
    let template = Parser::new(&source)?.parse()?;
    Ok(undeclared_variables(&template))
}

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn bare_references() -> Result<()> {
    assert_eq!(undeclared("{{ x }} {{ y }} {{ x }}")?, names(&["x", "y"]));
    Ok(())
}

#[test]
fn loop_target_is_declared() -> Result<()> {
    let free = undeclared("{% for a in items %}{{ a.x }}{{ b }}{% endfor %}")?;
    assert_eq!(free, names(&["b", "items"]));
    Ok(())
}

#[test]
fn implicit_loop_binding_is_declared() -> Result<()> {
    let free = undeclared("{% for a in items %}{{ loop.index }}{% endfor %}")?;
    assert_eq!(free, names(&["items"]));
    Ok(())
}

#[test]
fn loop_target_stays_bound_after_the_loop() -> Result<()> {
    // Bindings count from their point of appearance to the end of the
    // document, not just the loop body.
    let free = undeclared("{% for a in items %}{% endfor %}{{ a }}")?;
    assert_eq!(free, names(&["items"]));
    Ok(())
}

#[test]
fn set_binds_its_target() -> Result<()> {
    let free = undeclared("{% set total = price %}{{ total }}")?;
    assert_eq!(free, names(&["price"]));
    Ok(())
}

#[test]
fn condition_and_filter_arguments_are_references() -> Result<()> {
    let free = undeclared("{% if a == 1 %}{{ b | mask(show_last=n) }}{% endif %}")?;
    assert_eq!(free, names(&["a", "b", "n"]));
    Ok(())
}
