//! Lexical analysis module for the compiler.
//!
//! This module contains the lexer (tokenizer) that converts GLSL source
//! into a stream of tokens for parsing. It handles:
//!
//! - Tokenization of source code using regex patterns
//! - Recognition of keywords, type names, identifiers and numbers
//! - Token position tracking for error reporting
//! - Comments, whitespace and preprocessor lines

pub mod lexer;
pub mod tokens;

#[cfg(test)]
mod tests;
