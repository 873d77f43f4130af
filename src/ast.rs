// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::{Source, Span};
use crate::value::Value;

use core::fmt;
use core::ops::Deref;
use std::rc::Rc;

/// Shared handle to an AST node.
pub struct NodeRef<T> {
    r: Rc<T>,
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        Self { r: self.r.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.r.as_ref().fmt(f)
    }
}

impl<T> Deref for NodeRef<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.r
    }
}

impl<T> AsRef<T> for NodeRef<T> {
    fn as_ref(&self) -> &T {
        self.deref()
    }
}

impl<T> NodeRef<T> {
    pub fn new(t: T) -> Self {
        Self { r: Rc::new(t) }
    }
}

pub type Ref<T> = NodeRef<T>;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CmpOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug)]
pub enum Expr {
    /// A literal constant: string, number, bool or none.
    Const { span: Span, value: Value },

    /// A bare identifier reference.
    Name { span: Span },

    /// A list literal, e.g. `[3, 5]` in a filter argument.
    List { span: Span, items: Vec<Ref<Expr>> },

    /// One level of attribute access, `expr.attr`.
    Getattr {
        span: Span,
        expr: Ref<Expr>,
        attr: Span,
    },

    /// A value piped through a named filter, `expr | name(args...)`.
    Filter {
        span: Span,
        expr: Ref<Expr>,
        name: Span,
        args: Vec<Ref<Expr>>,
    },

    /// A comparison whose operands may contain a literal constant.
    Compare {
        span: Span,
        op: CmpOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },

    Not { span: Span, expr: Ref<Expr> },

    BoolExpr {
        span: Span,
        op: BoolOp,
        lhs: Ref<Expr>,
        rhs: Ref<Expr>,
    },
}

impl Expr {
    pub const fn span(&self) -> &Span {
        match *self {
            Self::Const { ref span, .. }
            | Self::Name { ref span, .. }
            | Self::List { ref span, .. }
            | Self::Getattr { ref span, .. }
            | Self::Filter { ref span, .. }
            | Self::Compare { ref span, .. }
            | Self::Not { ref span, .. }
            | Self::BoolExpr { ref span, .. } => span,
        }
    }

    pub const fn kind(&self) -> ExprKind {
        match *self {
            Self::Const { .. } => ExprKind::Const,
            Self::Name { .. } => ExprKind::Name,
            Self::List { .. } => ExprKind::List,
            Self::Getattr { .. } => ExprKind::Getattr,
            Self::Filter { .. } => ExprKind::Filter,
            Self::Compare { .. } => ExprKind::Compare,
            Self::Not { .. } => ExprKind::Not,
            Self::BoolExpr { .. } => ExprKind::BoolExpr,
        }
    }
}

/// Tag identifying an [`Expr`] variant, for tree queries.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ExprKind {
    Const,
    Name,
    List,
    Getattr,
    Filter,
    Compare,
    Not,
    BoolExpr,
}

#[derive(Debug)]
pub enum Stmt {
    /// Raw template text.
    Text { span: Span },

    /// `{{ expr }}`
    Output { span: Span, expr: Ref<Expr> },

    /// `{% if %}` / `{% elif %}` / `{% else %}` / `{% endif %}`
    If {
        span: Span,
        cond: Ref<Expr>,
        then: Vec<Stmt>,
        elifs: Vec<(Ref<Expr>, Vec<Stmt>)>,
        els: Vec<Stmt>,
    },

    /// `{% for target in iter %}` ... `{% endfor %}`
    For {
        span: Span,
        target: Span,
        iter: Ref<Expr>,
        body: Vec<Stmt>,
    },

    /// `{% set name = value %}`
    Set {
        span: Span,
        name: Span,
        value: Ref<Expr>,
    },
}

/// A parsed template: the root of the tree the inference passes walk.
#[derive(Debug)]
pub struct Template {
    pub source: Source,
    pub body: Vec<Stmt>,
}

/// A for-loop binding, as reported by [`Template::for_loops`].
#[derive(Debug, Clone)]
pub struct ForLoop {
    pub target: Span,
    pub iter: Ref<Expr>,
}

impl Template {
    /// All expression nodes of the given kind, in document (depth-first,
    /// pre-order) order.
    pub fn find_all(&self, kind: ExprKind) -> Vec<Ref<Expr>> {
        let mut found = vec![];
        self.walk_exprs(&mut |e| {
            if e.kind() == kind {
                found.push(e.clone());
            }
        });
        found
    }

    /// All for-loop statements, in document order.
    pub fn for_loops(&self) -> Vec<ForLoop> {
        let mut loops = vec![];
        collect_for_loops(&self.body, &mut loops);
        loops
    }

    /// Visit every expression node in document order.
    pub fn walk_exprs(&self, f: &mut dyn FnMut(&Ref<Expr>)) {
        walk_stmts(&self.body, f);
    }
}

fn walk_stmts(stmts: &[Stmt], f: &mut dyn FnMut(&Ref<Expr>)) {
    for stmt in stmts {
        match stmt {
            Stmt::Text { .. } => (),
            Stmt::Output { expr, .. } => walk_expr(expr, f),
            Stmt::If {
                cond,
                then,
                elifs,
                els,
                ..
            } => {
                walk_expr(cond, f);
                walk_stmts(then, f);
                for (cond, body) in elifs {
                    walk_expr(cond, f);
                    walk_stmts(body, f);
                }
                walk_stmts(els, f);
            }
            Stmt::For { iter, body, .. } => {
                walk_expr(iter, f);
                walk_stmts(body, f);
            }
            Stmt::Set { value, .. } => walk_expr(value, f),
        }
    }
}

/// Visit `expr` and its descendants, pre-order.
pub fn walk_expr(expr: &Ref<Expr>, f: &mut dyn FnMut(&Ref<Expr>)) {
    f(expr);
    match expr.as_ref() {
        Expr::Const { .. } | Expr::Name { .. } => (),
        Expr::List { items, .. } => {
            for item in items {
                walk_expr(item, f);
            }
        }
        Expr::Getattr { expr, .. } => walk_expr(expr, f),
        Expr::Filter { expr, args, .. } => {
            walk_expr(expr, f);
            for arg in args {
                walk_expr(arg, f);
            }
        }
        Expr::Compare { lhs, rhs, .. } | Expr::BoolExpr { lhs, rhs, .. } => {
            walk_expr(lhs, f);
            walk_expr(rhs, f);
        }
        Expr::Not { expr, .. } => walk_expr(expr, f),
    }
}

fn collect_for_loops(stmts: &[Stmt], loops: &mut Vec<ForLoop>) {
    for stmt in stmts {
        match stmt {
            Stmt::Text { .. } | Stmt::Output { .. } | Stmt::Set { .. } => (),
            Stmt::If {
                then, elifs, els, ..
            } => {
                collect_for_loops(then, loops);
                for (_, body) in elifs {
                    collect_for_loops(body, loops);
                }
                collect_for_loops(els, loops);
            }
            Stmt::For {
                target, iter, body, ..
            } => {
                loops.push(ForLoop {
                    target: target.clone(),
                    iter: iter.clone(),
                });
                collect_for_loops(body, loops);
            }
        }
    }
}
