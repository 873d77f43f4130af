// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::lexer::*;
use crate::number::Number;
use crate::value::Value;

use core::str::FromStr;

use anyhow::Result;

/// Recursive-descent parser for Jinja-style templates.
#[derive(Clone)]
pub struct Parser<'source> {
    source: Source,
    lexer: Lexer<'source>,
    tok: Token,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source Source) -> Result<Self> {
        let mut lexer = Lexer::new(source);
        let tok = lexer.next_token()?;
        Ok(Self {
            source: source.clone(),
            lexer,
            tok,
        })
    }

    fn token_text(&self) -> &str {
        match self.tok.0 {
            TokenKind::String => "",
            _ => self.tok.1.text(),
        }
    }

    fn next_token(&mut self) -> Result<()> {
        self.tok = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, text: &str, context: &str) -> Result<()> {
        if self.token_text() == text {
            self.next_token()
        } else {
            let msg = format!("expecting `{text}` {context}");
            Err(self.source.error(self.tok.1.line, self.tok.1.col, &msg))
        }
    }

    fn parse_ident(&mut self) -> Result<Span> {
        if self.tok.0 == TokenKind::Ident {
            let span = self.tok.1.clone();
            self.next_token()?;
            Ok(span)
        } else {
            Err(self.tok.1.error("expecting identifier"))
        }
    }

    /// Parse a complete template, until end of input.
    pub fn parse(&mut self) -> Result<Template> {
        let (body, terminator) = self.parse_body(&[])?;
        if let Some((kw, span)) = terminator {
            return Err(span.error(&format!("unexpected `{kw}`")));
        }
        Ok(Template {
            source: self.source.clone(),
            body,
        })
    }

    /// Parse statements until end of input or one of `terminators` appears as
    /// a block keyword. The terminating keyword (with its `{%` already
    /// consumed, but not its `%}`) is returned alongside the statements.
    #[allow(clippy::type_complexity)]
    fn parse_body(
        &mut self,
        terminators: &[&str],
    ) -> Result<(Vec<Stmt>, Option<(String, Span)>)> {
        let mut stmts = vec![];
        loop {
            match self.tok.0 {
                TokenKind::Eof => {
                    if !terminators.is_empty() {
                        return Err(self
                            .tok
                            .1
                            .error(&format!("expecting `{}`", terminators.join("` or `"))));
                    }
                    return Ok((stmts, None));
                }
                TokenKind::Text => {
                    stmts.push(Stmt::Text {
                        span: self.tok.1.clone(),
                    });
                    self.next_token()?;
                }
                TokenKind::VarStart => {
                    let span = self.tok.1.clone();
                    self.next_token()?;
                    let expr = self.parse_expr()?;
                    self.expect("}}", "to close expression")?;
                    stmts.push(Stmt::Output { span, expr });
                }
                TokenKind::BlockStart => {
                    let span = self.tok.1.clone();
                    self.next_token()?;
                    let kw = self.parse_ident()?;
                    let kw_text = kw.text().to_string();
                    match kw_text.as_str() {
                        "if" => stmts.push(self.parse_if_stmt(span)?),
                        "for" => stmts.push(self.parse_for_stmt(span)?),
                        "set" => stmts.push(self.parse_set_stmt(span)?),
                        t if terminators.contains(&t) => {
                            return Ok((stmts, Some((kw_text, kw))));
                        }
                        t => {
                            return Err(kw.error(&format!("unexpected `{t}`")));
                        }
                    }
                }
                _ => {
                    return Err(self.tok.1.error("unexpected token"));
                }
            }
        }
    }

    /// `if` has been consumed; parses through the matching `{% endif %}`.
    fn parse_if_stmt(&mut self, span: Span) -> Result<Stmt> {
        let cond = self.parse_expr()?;
        self.expect("%}", "to close `if` block")?;

        let (then, mut terminator) = self.parse_body(&["elif", "else", "endif"])?;

        let mut elifs = vec![];
        while let Some(("elif", _)) = terminator.as_ref().map(|(kw, s)| (kw.as_str(), s)) {
            let cond = self.parse_expr()?;
            self.expect("%}", "to close `elif` block")?;
            let (body, t) = self.parse_body(&["elif", "else", "endif"])?;
            elifs.push((cond, body));
            terminator = t;
        }

        let mut els = vec![];
        if let Some(("else", _)) = terminator.as_ref().map(|(kw, s)| (kw.as_str(), s)) {
            self.expect("%}", "to close `else` block")?;
            let (body, t) = self.parse_body(&["endif"])?;
            els = body;
            terminator = t;
        }

        // parse_body only returns listed terminators; this must be endif.
        debug_assert!(matches!(terminator.as_ref(), Some((kw, _)) if kw == "endif"));
        self.expect("%}", "to close `endif` block")?;

        Ok(Stmt::If {
            span,
            cond,
            then,
            elifs,
            els,
        })
    }

    /// `for` has been consumed; parses through the matching `{% endfor %}`.
    fn parse_for_stmt(&mut self, span: Span) -> Result<Stmt> {
        let target = self.parse_ident()?;
        self.expect("in", "after loop target")?;
        let iter = self.parse_expr()?;
        self.expect("%}", "to close `for` block")?;
        let (body, _) = self.parse_body(&["endfor"])?;
        self.expect("%}", "to close `endfor` block")?;
        Ok(Stmt::For {
            span,
            target,
            iter,
            body,
        })
    }

    /// `set` has been consumed.
    fn parse_set_stmt(&mut self, span: Span) -> Result<Stmt> {
        let name = self.parse_ident()?;
        self.expect("=", "after `set` target")?;
        let value = self.parse_expr()?;
        self.expect("%}", "to close `set` block")?;
        Ok(Stmt::Set { span, name, value })
    }

    pub fn parse_expr(&mut self) -> Result<Ref<Expr>> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> Result<Ref<Expr>> {
        let mut expr = self.parse_and_expr()?;
        while self.token_text() == "or" {
            self.next_token()?;
            let rhs = self.parse_and_expr()?;
            let span = span_between(expr.span(), rhs.span());
            expr = Ref::new(Expr::BoolExpr {
                span,
                op: BoolOp::Or,
                lhs: expr,
                rhs,
            });
        }
        Ok(expr)
    }

    fn parse_and_expr(&mut self) -> Result<Ref<Expr>> {
        let mut expr = self.parse_not_expr()?;
        while self.token_text() == "and" {
            self.next_token()?;
            let rhs = self.parse_not_expr()?;
            let span = span_between(expr.span(), rhs.span());
            expr = Ref::new(Expr::BoolExpr {
                span,
                op: BoolOp::And,
                lhs: expr,
                rhs,
            });
        }
        Ok(expr)
    }

    fn parse_not_expr(&mut self) -> Result<Ref<Expr>> {
        if self.token_text() == "not" {
            let span = self.tok.1.clone();
            self.next_token()?;
            let expr = self.parse_not_expr()?;
            let span = span_between(&span, expr.span());
            return Ok(Ref::new(Expr::Not { span, expr }));
        }
        self.parse_cmp_expr()
    }

    fn parse_cmp_expr(&mut self) -> Result<Ref<Expr>> {
        let lhs = self.parse_filter_expr()?;
        let op = match self.token_text() {
            "==" => CmpOp::Eq,
            "!=" => CmpOp::Ne,
            "<" => CmpOp::Lt,
            "<=" => CmpOp::Le,
            ">" => CmpOp::Gt,
            ">=" => CmpOp::Ge,
            _ => return Ok(lhs),
        };
        self.next_token()?;
        let rhs = self.parse_filter_expr()?;
        let span = span_between(lhs.span(), rhs.span());
        Ok(Ref::new(Expr::Compare { span, op, lhs, rhs }))
    }

    fn parse_filter_expr(&mut self) -> Result<Ref<Expr>> {
        let mut expr = self.parse_postfix_expr()?;
        while self.token_text() == "|" {
            self.next_token()?;
            let name = self.parse_ident()?;
            let args = if self.token_text() == "(" {
                self.parse_filter_args()?
            } else {
                vec![]
            };
            let span = span_between(expr.span(), &name);
            expr = Ref::new(Expr::Filter {
                span,
                expr,
                name,
                args,
            });
        }
        Ok(expr)
    }

    /// Argument list of a filter call. Keyword-argument names are not
    /// variable references, so only the argument values are retained.
    fn parse_filter_args(&mut self) -> Result<Vec<Ref<Expr>>> {
        self.expect("(", "to open filter arguments")?;
        let mut args = vec![];
        if self.token_text() != ")" {
            loop {
                // Look ahead for `ident =` marking a keyword argument.
                if self.tok.0 == TokenKind::Ident {
                    let state = (self.lexer.clone(), self.tok.clone());
                    self.next_token()?;
                    if self.token_text() == "=" {
                        self.next_token()?;
                    } else {
                        (self.lexer, self.tok) = state;
                    }
                }
                args.push(self.parse_expr()?);
                if self.token_text() != "," {
                    break;
                }
                self.next_token()?;
            }
        }
        self.expect(")", "to close filter arguments")?;
        Ok(args)
    }

    fn parse_postfix_expr(&mut self) -> Result<Ref<Expr>> {
        let mut expr = self.parse_primary_expr()?;
        while self.token_text() == "." {
            self.next_token()?;
            let attr = self.parse_ident()?;
            let span = span_between(expr.span(), &attr);
            expr = Ref::new(Expr::Getattr { span, expr, attr });
        }
        Ok(expr)
    }

    fn parse_primary_expr(&mut self) -> Result<Ref<Expr>> {
        let span = self.tok.1.clone();
        match &self.tok.0 {
            TokenKind::Ident => {
                self.next_token()?;
                let expr = match span.text() {
                    "true" | "True" => Expr::Const {
                        span,
                        value: Value::Bool(true),
                    },
                    "false" | "False" => Expr::Const {
                        span,
                        value: Value::Bool(false),
                    },
                    "none" | "None" => Expr::Const {
                        span,
                        value: Value::Null,
                    },
                    _ => Expr::Name { span },
                };
                Ok(Ref::new(expr))
            }
            TokenKind::Number => {
                self.next_token()?;
                let number = Number::from_str(span.text()).map_err(|_| {
                    // The lexer has already validated the literal.
                    span.error("invalid number")
                })?;
                Ok(Ref::new(Expr::Const {
                    span,
                    value: Value::Number(number),
                }))
            }
            TokenKind::String => {
                self.next_token()?;
                let value = Value::String(unescape(span.text()).into());
                Ok(Ref::new(Expr::Const { span, value }))
            }
            TokenKind::Symbol if span.text() == "(" => {
                self.next_token()?;
                let expr = self.parse_expr()?;
                self.expect(")", "to close parenthesized expression")?;
                Ok(expr)
            }
            TokenKind::Symbol if span.text() == "[" => {
                self.next_token()?;
                let mut items = vec![];
                if self.token_text() != "]" {
                    loop {
                        items.push(self.parse_expr()?);
                        if self.token_text() != "," {
                            break;
                        }
                        self.next_token()?;
                    }
                }
                let end = self.tok.1.clone();
                self.expect("]", "to close list literal")?;
                Ok(Ref::new(Expr::List {
                    span: span_between(&span, &end),
                    items,
                }))
            }
            _ => Err(self.tok.1.error("expecting expression")),
        }
    }
}

/// Resolve backslash escapes in a string literal's contents. The lexer has
/// already rejected invalid escape sequences.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some(c) => out.push(c),
            None => (),
        }
    }
    out
}

fn span_between(start: &Span, end: &Span) -> Span {
    Span {
        source: start.source.clone(),
        line: start.line,
        col: start.col,
        start: start.start,
        end: end.end,
    }
}
