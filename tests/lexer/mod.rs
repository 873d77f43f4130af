// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use anyhow::Result;
use contemplate::unstable::*;

fn get_tokens(source: &Source) -> Result<Vec<Token>> {
    let mut tokens = vec![];
    let mut lex = Lexer::new(source);
    loop {
        let tok = lex.next_token()?;
        let eof = tok.0 == TokenKind::Eof;
        tokens.push(tok);
        if eof {
            break;
        }
    }
    Ok(tokens)
}

fn source(contents: &str) -> Result<Source> {
    Source::from_contents("test.html".to_string(), contents.to_string())
}

fn kinds_and_texts(tokens: &[Token]) -> Vec<(TokenKind, String)> {
    tokens
        .iter()
        .map(|t| (t.0.clone(), t.1.text().to_string()))
        .collect()
}

#[test]
fn text_and_output() -> Result<()> {
    let src = source("Hello {{ name }}!")?;
    let tokens = kinds_and_texts(&get_tokens(&src)?);
    assert_eq!(
        tokens,
        vec![
            (TokenKind::Text, "Hello ".to_string()),
            (TokenKind::VarStart, "{{".to_string()),
            (TokenKind::Ident, "name".to_string()),
            (TokenKind::VarEnd, "}}".to_string()),
            (TokenKind::Text, "!".to_string()),
            (TokenKind::Eof, "".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn block_tokens() -> Result<()> {
    let src = source("{% for a in items %}x{% endfor %}")?;
    let tokens = kinds_and_texts(&get_tokens(&src)?);
    assert_eq!(
        tokens,
        vec![
            (TokenKind::BlockStart, "{%".to_string()),
            (TokenKind::Ident, "for".to_string()),
            (TokenKind::Ident, "a".to_string()),
            (TokenKind::Ident, "in".to_string()),
            (TokenKind::Ident, "items".to_string()),
            (TokenKind::BlockEnd, "%}".to_string()),
            (TokenKind::Text, "x".to_string()),
            (TokenKind::BlockStart, "{%".to_string()),
            (TokenKind::Ident, "endfor".to_string()),
            (TokenKind::BlockEnd, "%}".to_string()),
            (TokenKind::Eof, "".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn comments_are_skipped() -> Result<()> {
    let src = source("a{# note #}b{{ x }}")?;
    let tokens = kinds_and_texts(&get_tokens(&src)?);
    assert_eq!(tokens[0], (TokenKind::Text, "a".to_string()));
    assert_eq!(tokens[1], (TokenKind::Text, "b".to_string()));
    assert_eq!(tokens[2], (TokenKind::VarStart, "{{".to_string()));
    Ok(())
}

#[test]
fn symbols_and_literals() -> Result<()> {
    let src = source("{{ a.b | f == 'hi' != \"yo\" <= 2.5 >= -3 }}")?;
    let tokens = kinds_and_texts(&get_tokens(&src)?);
    assert_eq!(
        tokens,
        vec![
            (TokenKind::VarStart, "{{".to_string()),
            (TokenKind::Ident, "a".to_string()),
            (TokenKind::Symbol, ".".to_string()),
            (TokenKind::Ident, "b".to_string()),
            (TokenKind::Symbol, "|".to_string()),
            (TokenKind::Ident, "f".to_string()),
            (TokenKind::Symbol, "==".to_string()),
            (TokenKind::String, "hi".to_string()),
            (TokenKind::Symbol, "!=".to_string()),
            (TokenKind::String, "yo".to_string()),
            (TokenKind::Symbol, "<=".to_string()),
            (TokenKind::Number, "2.5".to_string()),
            (TokenKind::Symbol, ">=".to_string()),
            (TokenKind::Number, "-3".to_string()),
            (TokenKind::VarEnd, "}}".to_string()),
            (TokenKind::Eof, "".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn string_escapes() -> Result<()> {
    let src = source(r#"{{ 'it\'s' }}"#)?;
    let tokens = get_tokens(&src)?;
    assert_eq!(tokens[1].0, TokenKind::String);
    assert_eq!(tokens[1].1.text(), r"it\'s");
    Ok(())
}

#[test]
fn unterminated_comment() -> Result<()> {
    let src = source("a{# never closed")?;
    let mut lex = Lexer::new(&src);
    lex.next_token()?; // "a"
    let err = lex.next_token().unwrap_err();
    assert!(err.to_string().contains("unterminated comment"));
    Ok(())
}

#[test]
fn unmatched_string_quote() -> Result<()> {
    let src = source("{{ 'oops }}")?;
    let tokens = get_tokens(&src);
    assert!(tokens.unwrap_err().to_string().contains("unmatched string quote"));
    Ok(())
}

#[test]
fn invalid_character() -> Result<()> {
    let src = source("{{ a @ b }}")?;
    let err = get_tokens(&src).unwrap_err();
    assert!(err.to_string().contains("invalid character"));
    Ok(())
}

#[test]
fn debug_rendering_truncates_long_multibyte_text() -> Result<()> {
    let src = source(&"é".repeat(40))?;
    let tokens = get_tokens(&src)?;
    let rendered = format!("{:?}", tokens[0].1);
    assert!(rendered.ends_with(r#"...""#));
    assert_eq!(rendered.matches('é').count(), 32);
    Ok(())
}

#[test]
fn error_location() -> Result<()> {
    let src = source("line one\n{{ a ? }}")?;
    let err = get_tokens(&src).unwrap_err();
    // The caret rendering names the file, line and column.
    assert!(err.to_string().contains("--> test.html:2:6"));
    Ok(())
}
