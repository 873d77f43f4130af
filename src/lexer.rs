// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::number::Number;

use core::fmt::{self, Debug, Formatter};
use core::iter::Peekable;
use core::str::CharIndices;
use std::rc::Rc;

use anyhow::{anyhow, bail, Result};

#[derive(Clone)]
struct SourceInternal {
    pub file: String,
    pub contents: String,
    pub lines: Vec<(u32, u32)>,
}

/// A template source string, shared by all spans produced from it.
#[derive(Clone)]
pub struct Source {
    src: Rc<SourceInternal>,
}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        self.src.file.fmt(f)
    }
}

impl Source {
    pub fn from_contents(file: String, contents: String) -> Result<Source> {
        let max_size = u32::MAX as usize - 2; // Account for rows, cols possibly starting at 1, EOF etc.
        if contents.len() > max_size {
            bail!("{file} exceeds maximum allowed template size {max_size}");
        }
        let mut lines = vec![];
        let mut prev_ch = ' ';
        let mut prev_pos = 0u32;
        let mut start = 0u32;
        for (i, ch) in contents.char_indices() {
            if ch == '\n' {
                let end = match prev_ch {
                    '\r' => prev_pos,
                    _ => i as u32,
                };
                lines.push((start, end));
                start = i as u32 + 1;
            }
            prev_ch = ch;
            prev_pos = i as u32;
        }

        if (start as usize) < contents.len() {
            lines.push((start, contents.len() as u32));
        } else if contents.is_empty() {
            lines.push((0, 0));
        } else {
            let s = (contents.len() - 1) as u32;
            lines.push((s, s));
        }
        Ok(Self {
            src: Rc::new(SourceInternal {
                file,
                contents,
                lines,
            }),
        })
    }

    pub fn contents(&self) -> &String {
        &self.src.contents
    }
    pub fn line(&self, idx: u32) -> &str {
        let idx = idx as usize;
        if idx < self.src.lines.len() {
            let (start, end) = self.src.lines[idx];
            &self.src.contents[start as usize..end as usize]
        } else {
            ""
        }
    }

    pub fn message(&self, line: u32, col: u32, kind: &str, msg: &str) -> String {
        if line as usize > self.src.lines.len() {
            return format!("{}: invalid line {} specified", self.src.file, line);
        }

        let line_str = format!("{line}");
        let line_num_width = line_str.len() + 1;
        let col_spaces = col as usize - 1;

        format!(
            "\n--> {}:{}:{}\n{:<line_num_width$}|\n\
		{:<line_num_width$}| {}\n\
		{:<line_num_width$}| {:<col_spaces$}^\n\
		{}: {}",
            self.src.file,
            line,
            col,
            "",
            line,
            self.line(line - 1),
            "",
            "",
            kind,
            msg
        )
    }

    pub fn error(&self, line: u32, col: u32, msg: &str) -> anyhow::Error {
        anyhow!(self.message(line, col, "error", msg))
    }
}

/// A location range within a [`Source`].
#[derive(Clone)]
pub struct Span {
    pub source: Source,
    pub line: u32,
    pub col: u32,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn text(&self) -> &str {
        &self.source.contents()[self.start as usize..self.end as usize]
    }

    pub fn message(&self, kind: &str, msg: &str) -> String {
        self.source.message(self.line, self.col, kind, msg)
    }

    pub fn error(&self, msg: &str) -> anyhow::Error {
        self.source.error(self.line, self.col, msg)
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let t = self.text().escape_debug().to_string();
        let max = 32;
        // Truncate on a char boundary; the text may not be ASCII.
        let (txt, trailer) = match t.char_indices().nth(max) {
            Some((pos, _)) => (&t[..pos], "..."),
            None => (t.as_str(), ""),
        };

        f.write_fmt(format_args!(
            "{}:{}:{}:{}, \"{}{}\"",
            self.line, self.col, self.start, self.end, txt, trailer
        ))
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenKind {
    /// Raw template text outside any delimiter.
    Text,
    /// `{{`
    VarStart,
    /// `}}`
    VarEnd,
    /// `{%`
    BlockStart,
    /// `%}`
    BlockEnd,
    Symbol,
    String,
    Number,
    Ident,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token(pub TokenKind, pub Span);

/// Tokenizer for Jinja-style templates.
///
/// Operates in two modes: text mode, which emits raw text runs and the
/// opening delimiters (`{{`, `{%`) and silently skips `{# ... #}` comments,
/// and expression mode (between an opening delimiter and its matching
/// `}}`/`%}`), which emits identifiers, literals and symbols.
#[derive(Clone)]
pub struct Lexer<'source> {
    source: Source,
    iter: Peekable<CharIndices<'source>>,
    line: u32,
    col: u32,
    in_expr: bool,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source Source) -> Self {
        Self {
            source: source.clone(),
            iter: source.contents().char_indices().peekable(),
            line: 1,
            col: 1,
            in_expr: false,
        }
    }

    fn peek(&mut self) -> (usize, char) {
        match self.iter.peek() {
            Some((index, chr)) => (*index, *chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn peekahead(&mut self, n: usize) -> (usize, char) {
        match self.iter.clone().nth(n) {
            Some((index, chr)) => (index, chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn token(&self, kind: TokenKind, line: u32, col: u32, start: usize, end: usize) -> Token {
        Token(
            kind,
            Span {
                source: self.source.clone(),
                line,
                col,
                start: start as u32,
                end: end as u32,
            },
        )
    }

    pub fn next_token(&mut self) -> Result<Token> {
        if self.in_expr {
            self.next_expr_token()
        } else {
            self.next_text_token()
        }
    }

    fn next_text_token(&mut self) -> Result<Token> {
        let mut start = self.peek().0;
        let (mut line, mut col) = (self.line, self.col);
        loop {
            let (pos, ch) = self.peek();
            match ch {
                '\x00' => {
                    if pos > start {
                        return Ok(self.token(TokenKind::Text, line, col, start, pos));
                    }
                    return Ok(self.token(TokenKind::Eof, self.line, self.col, pos, pos));
                }
                '{' if matches!(self.peekahead(1).1, '{' | '%' | '#') => {
                    if pos > start {
                        return Ok(self.token(TokenKind::Text, line, col, start, pos));
                    }
                    if self.peekahead(1).1 == '#' {
                        self.skip_comment()?;
                        start = self.peek().0;
                        (line, col) = (self.line, self.col);
                        continue;
                    }
                    let kind = match self.peekahead(1).1 {
                        '{' => TokenKind::VarStart,
                        _ => TokenKind::BlockStart,
                    };
                    self.iter.next();
                    self.iter.next();
                    self.col += 2;
                    self.in_expr = true;
                    return Ok(self.token(kind, line, col, pos, pos + 2));
                }
                '\n' => {
                    self.line += 1;
                    self.col = 1;
                    self.iter.next();
                }
                '\t' => {
                    self.col += 4;
                    self.iter.next();
                }
                _ => {
                    self.col += 1;
                    self.iter.next();
                }
            }
        }
    }

    fn skip_comment(&mut self) -> Result<()> {
        let (line, col) = (self.line, self.col);
        self.iter.next();
        self.iter.next();
        self.col += 2;
        loop {
            match self.peek().1 {
                '\x00' => return Err(self.source.error(line, col, "unterminated comment `{#`")),
                '#' if self.peekahead(1).1 == '}' => {
                    self.iter.next();
                    self.iter.next();
                    self.col += 2;
                    return Ok(());
                }
                '\n' => {
                    self.line += 1;
                    self.col = 1;
                    self.iter.next();
                }
                '\t' => {
                    self.col += 4;
                    self.iter.next();
                }
                _ => {
                    self.col += 1;
                    self.iter.next();
                }
            }
        }
    }

    fn skip_ws(&mut self) {
        loop {
            match self.peek().1 {
                ' ' | '\r' => self.col += 1,
                '\t' => self.col += 4,
                '\n' => {
                    self.col = 1;
                    self.line += 1;
                }
                _ => break,
            }
            self.iter.next();
        }
    }

    fn read_ident(&mut self) -> Token {
        let start = self.peek().0;
        let col = self.col;
        loop {
            let ch = self.peek().1;
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.iter.next();
            } else {
                break;
            }
        }
        let end = self.peek().0;
        self.col += (end - start) as u32;
        self.token(TokenKind::Ident, self.line, col, start, end)
    }

    fn read_digits(&mut self) {
        while self.peek().1.is_ascii_digit() {
            self.iter.next();
        }
    }

    fn read_number(&mut self) -> Result<Token> {
        let (start, chr) = self.peek();
        let col = self.col;

        if chr == '-' {
            self.iter.next();
        }

        // Integer part.
        self.read_digits();

        // Fraction part. `.` must be followed by at least one digit.
        if self.peek().1 == '.' && self.peekahead(1).1.is_ascii_digit() {
            self.iter.next();
            self.read_digits();
        }

        // Exponent part.
        let ch = self.peek().1;
        if ch == 'e' || ch == 'E' {
            self.iter.next();
            if matches!(self.peek().1, '+' | '-') {
                self.iter.next();
            }
            self.read_digits();
        }

        let end = self.peek().0;
        self.col += (end - start) as u32;

        // A valid number cannot be followed by these characters.
        let ch = self.peek().1;
        if ch == '_' || ch == '.' || ch.is_ascii_alphanumeric() {
            return Err(self.source.error(self.line, self.col, "invalid number"));
        }

        if self.source.contents()[start..end].parse::<Number>().is_err() {
            return Err(self.source.error(self.line, col, "invalid number"));
        }

        Ok(self.token(TokenKind::Number, self.line, col, start, end))
    }

    fn read_string(&mut self, quote: char) -> Result<Token> {
        let (line, col) = (self.line, self.col);
        self.iter.next();
        self.col += 1;
        let (start, _) = self.peek();
        loop {
            let (offset, ch) = self.peek();
            match ch {
                c if c == quote => break,
                '\x00' | '\n' => {
                    return Err(self.source.error(line, col, "unmatched string quote"));
                }
                '\\' => {
                    self.iter.next();
                    let (_, ch) = self.peek();
                    self.iter.next();
                    match ch {
                        '"' | '\'' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' => (),
                        _ => {
                            let col = self.col + (offset - start) as u32 + 1;
                            return Err(self.source.error(line, col, "invalid escape sequence"));
                        }
                    }
                }
                _ => {
                    self.iter.next();
                }
            }
        }

        self.iter.next();
        let end = self.peek().0;
        self.col += (end - start) as u32;

        // The span covers the string contents, without the quotes.
        Ok(self.token(TokenKind::String, line, col + 1, start, end - 1))
    }

    fn next_expr_token(&mut self) -> Result<Token> {
        self.skip_ws();

        let (start, chr) = self.peek();
        let col = self.col;

        match chr {
            '}' if self.peekahead(1).1 == '}' => {
                self.iter.next();
                self.iter.next();
                self.col += 2;
                self.in_expr = false;
                Ok(self.token(TokenKind::VarEnd, self.line, col, start, start + 2))
            }
            '%' if self.peekahead(1).1 == '}' => {
                self.iter.next();
                self.iter.next();
                self.col += 2;
                self.in_expr = false;
                Ok(self.token(TokenKind::BlockEnd, self.line, col, start, start + 2))
            }
            '-' if self.peekahead(1).1.is_ascii_digit() => self.read_number(),
            '|' | '.' | '(' | ')' | '[' | ']' | ',' => {
                self.col += 1;
                self.iter.next();
                Ok(self.token(TokenKind::Symbol, self.line, col, start, start + 1))
            }
            // < <= > >= = ==
            '<' | '>' | '=' => {
                self.col += 1;
                self.iter.next();
                if self.peek().1 == '=' {
                    self.col += 1;
                    self.iter.next();
                }
                let end = self.peek().0;
                Ok(self.token(TokenKind::Symbol, self.line, col, start, end))
            }
            '!' if self.peekahead(1).1 == '=' => {
                self.col += 2;
                self.iter.next();
                self.iter.next();
                Ok(self.token(TokenKind::Symbol, self.line, col, start, start + 2))
            }
            '"' | '\'' => self.read_string(chr),
            '\x00' => Ok(self.token(TokenKind::Eof, self.line, col, start, start)),
            _ if chr.is_ascii_digit() => self.read_number(),
            _ if chr.is_ascii_alphabetic() || chr == '_' => Ok(self.read_ident()),
            _ => Err(self.source.error(self.line, self.col, "invalid character")),
        }
    }
}
