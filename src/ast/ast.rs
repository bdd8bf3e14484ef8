use serde::Serialize;

use super::{
    expressions::Expr,
    statements::Stmt,
    types::{BufferKind, Type},
};

/// Shared classification helpers for anything carrying a resolved type.
pub trait Typed {
    /// Returns the resolved type.
    fn get_type(&self) -> &Type;

    fn is_scalar(&self) -> bool {
        self.get_type().is_scalar()
    }
    fn is_vector(&self) -> bool {
        self.get_type().is_vector()
    }
    fn is_matrix(&self) -> bool {
        self.get_type().is_matrix()
    }
    fn is_array(&self) -> bool {
        self.get_type().is_array()
    }
    /// A vector or matrix value, stored as flat scalar slots.
    fn is_composite(&self) -> bool {
        self.get_type().is_composite()
    }
    fn element_count(&self) -> usize {
        self.get_type().element_count()
    }
}

/// A typed view over the shared heap, e.g. `var $F32 = new stdlib.Float32Array(heap)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeapView {
    pub name: String,
    pub buffer: BufferKind,
}

/// A host math function pulled in from `stdlib.Math`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Import {
    pub name: String,
    pub path: String,
}

/// The root of a finished compilation.
///
/// Renders as a module-style wrapper function taking the host environment
/// and a flat heap, declaring the typed views and the stack pointer, then
/// the program body, and returning an object exporting only `main`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Program {
    pub module_name: String,
    pub directive: Expr,
    pub stdlib: String,
    pub foreign: String,
    pub heap: String,
    pub views: Vec<HeapView>,
    pub stack_pointer: String,
    pub imports: Vec<Import>,
    pub body: Vec<Stmt>,
    /// `(exported name, local name)` pairs.
    pub exports: Vec<(String, String)>,
    pub heap_size: usize,
    /// Peak number of transient stack slots any expression needs.
    pub stack_slots: usize,
    /// Slots reserved at the top of the heap for named composites.
    pub static_slots: usize,
}
