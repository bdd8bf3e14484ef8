//! Code generation module for the compiler.
//!
//! This module renders a finished program tree as asm.js-flavoured
//! JavaScript text. It handles:
//!
//! - The module wrapper, heap views and host imports
//! - Statements, with block bodies unwrapped into braces
//! - Expressions, parenthesised by target operator precedence
//! - Float literals that must keep a visible fractional part

pub mod compiler;
pub mod expr;
pub mod stmt;

#[cfg(test)]
mod tests;
