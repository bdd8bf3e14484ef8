/// AST (Abstract Syntax Tree) module
/// Contains the typed tree handed from the type checker to the compiler
///
/// Submodules:
/// - ast: `Program` root and the shared `Typed` trait
/// - expressions: Expression nodes and their validating constructors
/// - statements: Statement nodes and their validating constructors
/// - types: The closed type model
pub mod ast;
pub mod expressions;
pub mod statements;
pub mod types;

#[cfg(test)]
mod tests;
