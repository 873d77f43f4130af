// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Free-variable analysis over a parsed template.
//!
//! An identifier is *undeclared* if it is referenced but never bound by a
//! local construct: a `for` loop target, a `set` assignment, or the implicit
//! `loop` binding inside a loop body. The analysis is conservative in the
//! same direction Jinja's `meta.find_undeclared_variables` is: a name bound
//! anywhere earlier in document order counts as declared from that point on.

use crate::ast::*;

use std::collections::BTreeSet;

/// Names referenced by the template but not bound within it, sorted.
pub fn undeclared_variables(template: &Template) -> BTreeSet<String> {
    let mut declared = BTreeSet::new();
    let mut free = BTreeSet::new();
    visit_stmts(&template.body, &mut declared, &mut free);
    free
}

fn visit_stmts(stmts: &[Stmt], declared: &mut BTreeSet<String>, free: &mut BTreeSet<String>) {
    for stmt in stmts {
        match stmt {
            Stmt::Text { .. } => (),
            Stmt::Output { expr, .. } => visit_expr(expr, declared, free),
            Stmt::If {
                cond,
                then,
                elifs,
                els,
                ..
            } => {
                visit_expr(cond, declared, free);
                visit_stmts(then, declared, free);
                for (cond, body) in elifs {
                    visit_expr(cond, declared, free);
                    visit_stmts(body, declared, free);
                }
                visit_stmts(els, declared, free);
            }
            Stmt::For {
                target, iter, body, ..
            } => {
                // The iterable is evaluated outside the loop scope.
                visit_expr(iter, declared, free);
                declared.insert(target.text().to_string());
                declared.insert("loop".to_string());
                visit_stmts(body, declared, free);
            }
            Stmt::Set { name, value, .. } => {
                visit_expr(value, declared, free);
                declared.insert(name.text().to_string());
            }
        }
    }
}

fn visit_expr(expr: &Ref<Expr>, declared: &BTreeSet<String>, free: &mut BTreeSet<String>) {
    walk_expr(expr, &mut |node| {
        if let Expr::Name { span } = node.as_ref() {
            let name = span.text();
            if !declared.contains(name) {
                free.insert(name.to_string());
            }
        }
    });
}
