//! Parser module driving the type checker.
//!
//! This module contains the parser that reads a stream of tokens and hands
//! every construct it recognises to the type checker as soon as it is
//! complete. It uses a Pratt parser for expressions with proper operator
//! precedence and handles:
//!
//! - Statement parsing (declarations, functions, control flow)
//! - Expression parsing (operators, calls, constructors, field selection)
//! - Type specifiers
//!
//! The parser uses NUD (null denotation) and LED (left denotation) functions
//! for expression parsing with binding power for precedence handling.

pub mod expr;
pub mod lookups;
pub mod parser;
pub mod stmt;
pub mod types;
