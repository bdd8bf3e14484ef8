//! Semantic analysis and lowering.
//!
//! The parser drives a [`type_checker::TypeChecker`] in source order. It
//! resolves every name against the symbol table, validates operand types as
//! each node is built and rewrites vector and matrix operations into scalar
//! code over the heap views:
//!
//! - `symbol_table`: scopes, overloads and name mangling
//! - `lowering`: component-wise expansion of composite operations
//! - `stack`: static and transient composite storage in the heap
//! - `builtins`: host math functions
//!
//! Any violation aborts the compilation with the first error found.

pub mod builtins;
pub mod lowering;
pub mod stack;
pub mod symbol_table;
pub mod type_checker;

#[cfg(test)]
mod tests;
