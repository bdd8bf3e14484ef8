//! Unit tests for the lexer module.
//!
//! This module contains tests for tokenization including:
//! - Keywords, type names and identifiers
//! - Numeric literals (integers, floats and hexadecimal)
//! - Operators and punctuation
//! - Comments and preprocessor lines
//! - Error cases

use std::rc::Rc;

use pretty_assertions::assert_eq;

use super::{lexer::tokenize, tokens::TokenKind};
use crate::errors::errors::ErrorImpl;

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source, Rc::new("test.glsl".to_string()))
        .unwrap()
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

fn values(source: &str) -> Vec<String> {
    tokenize(source, Rc::new("test.glsl".to_string()))
        .unwrap()
        .into_iter()
        .map(|token| token.value)
        .collect()
}

#[test]
fn test_tokenize_keywords() {
    assert_eq!(
        kinds("const if else while do for break continue return discard true false struct precision"),
        vec![
            TokenKind::Const,
            TokenKind::If,
            TokenKind::Else,
            TokenKind::While,
            TokenKind::Do,
            TokenKind::For,
            TokenKind::Break,
            TokenKind::Continue,
            TokenKind::Return,
            TokenKind::Discard,
            TokenKind::True,
            TokenKind::False,
            TokenKind::Struct,
            TokenKind::Precision,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_type_names_and_qualifiers() {
    assert_eq!(
        kinds("void float vec3 bvec2 mat4 highp uniform inout sampler2D"),
        vec![
            TokenKind::Type,
            TokenKind::Type,
            TokenKind::Type,
            TokenKind::Type,
            TokenKind::Type,
            TokenKind::PrecisionQualifier,
            TokenKind::StorageQualifier,
            TokenKind::ParameterQualifier,
            TokenKind::Sampler,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_identifiers() {
    let tokens = tokenize("foo _bar vec5 mainly", Rc::new("test.glsl".to_string())).unwrap();

    assert!(tokens[..4].iter().all(|token| token.kind == TokenKind::Identifier));
    assert_eq!(tokens[2].value, "vec5");
    assert_eq!(tokens[4].kind, TokenKind::EOF);
}

#[test]
fn test_tokenize_numbers() {
    assert_eq!(
        values("42 1. .5 3.25 1e3 2.5E-2 0x1F"),
        vec!["42", "1.", ".5", "3.25", "1e3", "2.5E-2", "0x1F", "EOF"]
    );
    assert!(kinds("42 1. .5").iter().take(3).all(|kind| *kind == TokenKind::Number));
}

#[test]
fn test_tokenize_operators() {
    assert_eq!(
        kinds("a += b++ == c-- && !d || e <= f ? g : h;"),
        vec![
            TokenKind::Identifier,
            TokenKind::PlusEquals,
            TokenKind::Identifier,
            TokenKind::PlusPlus,
            TokenKind::Equals,
            TokenKind::Identifier,
            TokenKind::MinusMinus,
            TokenKind::And,
            TokenKind::Not,
            TokenKind::Identifier,
            TokenKind::Or,
            TokenKind::Identifier,
            TokenKind::LessEquals,
            TokenKind::Identifier,
            TokenKind::Question,
            TokenKind::Identifier,
            TokenKind::Colon,
            TokenKind::Identifier,
            TokenKind::Semicolon,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_member_access_after_number() {
    assert_eq!(
        kinds("v.xy[1]"),
        vec![
            TokenKind::Identifier,
            TokenKind::Dot,
            TokenKind::Identifier,
            TokenKind::OpenBracket,
            TokenKind::Number,
            TokenKind::CloseBracket,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_comments_and_directives_are_skipped() {
    let source = "#version 100\n// line comment\nint /* block\ncomment */ x;";
    assert_eq!(
        kinds(source),
        vec![TokenKind::Type, TokenKind::Identifier, TokenKind::Semicolon, TokenKind::EOF]
    );
}

#[test]
fn test_line_tracking() {
    let tokens = tokenize("int a;\n\nfloat b;", Rc::new("test.glsl".to_string())).unwrap();

    assert_eq!(tokens[0].span.start.line, 1);
    assert_eq!(tokens[3].value, "float");
    assert_eq!(tokens[3].span.start.line, 3);
    assert_eq!(tokens[3].span.start.offset, 8);
}

#[test]
fn test_unrecognised_character() {
    let error = tokenize("int a = 1;\nint b @ 2;", Rc::new("test.glsl".to_string())).unwrap_err();

    assert_eq!(
        error.get_internal(),
        &ErrorImpl::UnrecognisedToken {
            token: "@".to_string()
        }
    );
    assert_eq!(error.get_line(), 2);
}

#[test]
fn test_empty_source() {
    assert_eq!(kinds(""), vec![TokenKind::EOF]);
}
