//! Scope stack, declaration registration and name mangling.
//!
//! The target has a single flat namespace per function, so names that are
//! legal in the source can collide once flattened:
//!
//! - overloads of one function share a name
//! - a local variable can shadow one in an enclosing block, the function
//!   scope or the global scope, and target `var` declarations are hoisted
//!   to the top of the function
//! - a local variable can shadow a global function
//! - a source name can be a reserved word of the target
//!
//! Every declaration is given a mangled name once, when it is registered,
//! and that name is reused by every later reference.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use serde::Serialize;

use crate::{
    ast::{ast::Typed, types::Type},
    errors::errors::{Error, ErrorImpl},
    Position,
};

lazy_static! {
    static ref TARGET_RESERVED: HashSet<&'static str> = HashSet::from([
        "arguments", "break", "case", "catch", "class", "const", "continue", "debugger",
        "default", "delete", "do", "else", "enum", "eval", "export", "extends", "false",
        "finally", "for", "foreign", "function", "heap", "if", "implements", "import", "in",
        "instanceof", "interface", "let", "new", "null", "package", "private", "protected",
        "public", "return", "static", "stdlib", "super", "switch", "this", "throw", "true",
        "try", "typeof", "undefined", "var", "void", "while", "with", "yield", "Infinity",
        "NaN",
    ]);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Symbol {
    Variable {
        name: String,
        mangled: String,
        ty: Type,
        /// Folded value of an integer `const`.
        constant: Option<i64>,
    },
    Function {
        name: String,
        mangled: String,
        parameters: Vec<Type>,
        return_type: Type,
        has_body: bool,
    },
}

impl Symbol {
    pub fn variable(name: &str, ty: Type) -> Self {
        Symbol::Variable {
            name: name.to_string(),
            mangled: name.to_string(),
            ty,
            constant: None,
        }
    }

    pub fn constant(name: &str, value: i64) -> Self {
        Symbol::Variable {
            name: name.to_string(),
            mangled: name.to_string(),
            ty: Type::Int,
            constant: Some(value),
        }
    }

    pub fn function(name: &str, parameters: Vec<Type>, return_type: Type, has_body: bool) -> Self {
        Symbol::Function {
            name: name.to_string(),
            mangled: name.to_string(),
            parameters,
            return_type,
            has_body,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Symbol::Variable { name, .. } | Symbol::Function { name, .. } => name,
        }
    }

    pub fn mangled(&self) -> &str {
        match self {
            Symbol::Variable { mangled, .. } | Symbol::Function { mangled, .. } => mangled,
        }
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Symbol::Function { .. })
    }

    fn set_mangled(&mut self, value: String) {
        match self {
            Symbol::Variable { mangled, .. } | Symbol::Function { mangled, .. } => *mangled = value,
        }
    }
}

impl Typed for Symbol {
    /// Variables report their type, functions their return type.
    fn get_type(&self) -> &Type {
        match self {
            Symbol::Variable { ty, .. } => ty,
            Symbol::Function { return_type, .. } => return_type,
        }
    }
}

/// The global scope sits at the bottom of the stack. A function scope holds
/// parameters and the top level of a body; block scopes nest inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeEvent {
    Enter(ScopeKind),
    Exit,
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    names: HashMap<String, Vec<usize>>,
}

impl Scope {
    fn new(kind: ScopeKind) -> Self {
        Scope {
            kind,
            names: HashMap::new(),
        }
    }
}

/// Derives the target name of a declaration.
///
/// `overload` is the index of the overload among same-named functions,
/// `shadowed` the number of enclosing scopes, globals included, already
/// declaring a variable of that name, and `escape` requests a trailing `$` for names that
/// would collide with a global function or a reserved word.
pub fn mangle(name: &str, overload: usize, shadowed: usize, escape: bool) -> String {
    let mut mangled = name.to_string();
    if overload > 0 {
        mangled.push_str(&format!("${}", overload));
    }
    if shadowed > 0 {
        mangled.push_str(&format!("${}", shadowed));
    }
    if escape {
        mangled.push('$');
    }
    mangled
}

/// Owns every symbol registered during one compilation.
#[derive(Debug)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    scopes: Vec<Scope>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        SymbolTable::new()
    }
}

impl SymbolTable {
    /// Creates a table holding only the global scope.
    pub fn new() -> Self {
        SymbolTable {
            symbols: Vec::new(),
            scopes: vec![Scope::new(ScopeKind::Global)],
        }
    }

    pub fn enter(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope::new(kind));
    }

    /// Leaves the innermost scope. The global scope is never popped.
    pub fn exit(&mut self) {
        if !self.is_global() {
            self.scopes.pop();
        }
    }

    pub fn is_global(&self) -> bool {
        self.scopes
            .last()
            .is_some_and(|scope| scope.kind == ScopeKind::Global)
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Registers `symbol` in the innermost scope and returns the stored
    /// symbol, with its mangled name filled in.
    pub fn declare(&mut self, symbol: Symbol, position: &Position) -> Result<Symbol, Error> {
        match symbol {
            Symbol::Function {
                name,
                parameters,
                return_type,
                has_body,
                ..
            } => self.declare_function(name, parameters, return_type, has_body, position),
            variable => self.declare_variable(variable, position),
        }
    }

    fn declare_function(
        &mut self,
        name: String,
        parameters: Vec<Type>,
        return_type: Type,
        has_body: bool,
        position: &Position,
    ) -> Result<Symbol, Error> {
        if !self.is_global() {
            return Err(Error::new(
                ErrorImpl::GlobalScopeOnly {
                    construct: String::from("function declaration"),
                },
                position.clone(),
            ));
        }
        let existing = self.current_scope_ids(&name);
        let mut overloads = 0;
        for id in existing {
            match &self.symbols[id] {
                Symbol::Variable { .. } => {
                    return Err(Error::new(
                        ErrorImpl::Redeclaration { name: name.clone() },
                        position.clone(),
                    ));
                }
                Symbol::Function {
                    parameters: prior_parameters,
                    return_type: prior_return,
                    has_body: prior_body,
                    ..
                } => {
                    overloads += 1;
                    if *prior_parameters != parameters {
                        continue;
                    }
                    if *prior_return != return_type {
                        return Err(Error::new(
                            ErrorImpl::ConflictingReturnType {
                                function: name.clone(),
                            },
                            position.clone(),
                        ));
                    }
                    if *prior_body && has_body {
                        return Err(Error::new(
                            ErrorImpl::FunctionAlreadyHasBody {
                                function: name.clone(),
                            },
                            position.clone(),
                        ));
                    }
                    if !has_body {
                        return Err(Error::new(
                            ErrorImpl::FunctionAlreadyDeclared {
                                function: name.clone(),
                            },
                            position.clone(),
                        ));
                    }

                    // A definition for an earlier prototype.
                    if let Symbol::Function { has_body, .. } = &mut self.symbols[id] {
                        *has_body = true;
                    }
                    tracing::debug!(function = %name, mangled = %self.symbols[id].mangled(), "merged prototype with definition");
                    return Ok(self.symbols[id].clone());
                }
            }
        }

        let mangled = mangle(&name, overloads, 0, TARGET_RESERVED.contains(name.as_str()));
        tracing::debug!(function = %name, mangled = %mangled, overload = overloads, "declared function");
        Ok(self.insert(Symbol::Function {
            name,
            mangled,
            parameters,
            return_type,
            has_body,
        }))
    }

    fn declare_variable(&mut self, mut symbol: Symbol, position: &Position) -> Result<Symbol, Error> {
        let name = symbol.name().to_string();
        if !self.current_scope_ids(&name).is_empty() {
            return Err(Error::new(
                ErrorImpl::Redeclaration { name },
                position.clone(),
            ));
        }

        let shadowed = self.shadow_count(&name);
        let escape = TARGET_RESERVED.contains(name.as_str())
            || (!self.is_global() && self.global_function_exists(&name));
        symbol.set_mangled(mangle(&name, 0, shadowed, escape));

        tracing::trace!(variable = %name, mangled = %symbol.mangled(), "declared variable");
        Ok(self.insert(symbol))
    }

    fn insert(&mut self, symbol: Symbol) -> Symbol {
        let id = self.symbols.len();
        self.symbols.push(symbol.clone());
        if let Some(scope) = self.scopes.last_mut() {
            scope
                .names
                .entry(symbol.name().to_string())
                .or_default()
                .push(id);
        }
        symbol
    }

    fn current_scope_ids(&self, name: &str) -> Vec<usize> {
        self.scopes
            .last()
            .and_then(|scope| scope.names.get(name))
            .cloned()
            .unwrap_or_default()
    }

    /// Counts enclosing scopes, the global one included, that declare a
    /// variable called `name`. A hoisted local keeping an outer variable's
    /// name would hide it for the whole function.
    fn shadow_count(&self, name: &str) -> usize {
        self.scopes
            .iter()
            .rev()
            .skip(1)
            .filter(|scope| {
                scope.names.get(name).is_some_and(|ids| {
                    ids.iter().any(|id| !self.symbols[*id].is_function())
                })
            })
            .count()
    }

    fn global_function_exists(&self, name: &str) -> bool {
        self.scopes[0]
            .names
            .get(name)
            .is_some_and(|ids| ids.iter().any(|id| self.symbols[*id].is_function()))
    }

    /// Resolves a name from the innermost scope outwards.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|scope| {
            scope
                .names
                .get(name)
                .and_then(|ids| ids.first())
                .map(|id| &self.symbols[*id])
        })
    }

    /// Finds the overload of `name` whose parameter types match exactly.
    pub fn find_function(&self, name: &str, arguments: &[Type]) -> Option<&Symbol> {
        self.scopes[0].names.get(name)?.iter().find_map(|id| {
            match &self.symbols[*id] {
                symbol @ Symbol::Function { parameters, .. } if parameters == arguments => {
                    Some(symbol)
                }
                _ => None,
            }
        })
    }

    /// Every function declared under `name`.
    pub fn functions_named(&self, name: &str) -> Vec<&Symbol> {
        self.scopes[0]
            .names
            .get(name)
            .map(|ids| {
                ids.iter()
                    .map(|id| &self.symbols[*id])
                    .filter(|symbol| symbol.is_function())
                    .collect()
            })
            .unwrap_or_default()
    }
}
