//! Type model for the shading language.
//!
//! This module defines the closed set of types an expression can carry:
//!
//! - Scalars (`bool`, `int`, `float`)
//! - Vectors of 2 to 4 components over one scalar kind
//! - Square matrices of floats, stored as N² flat scalar slots
//! - Fixed-size arrays of any of the above
//!
//! Matrices are never addressed by row or column here. For lowering purposes
//! every non-scalar type is a flat sequence of `element_count()` components.

use std::fmt::Display;

use serde::Serialize;

/// The scalar base of every type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScalarKind {
    Bool,
    Int,
    Float,
}

impl ScalarKind {
    /// Returns the scalar type for this kind.
    pub fn as_type(self) -> Type {
        match self {
            ScalarKind::Bool => Type::Bool,
            ScalarKind::Int => Type::Int,
            ScalarKind::Float => Type::Float,
        }
    }

    /// Which typed view over the heap stores values of this kind.
    /// Booleans share the integer view.
    pub fn buffer(self) -> BufferKind {
        match self {
            ScalarKind::Bool | ScalarKind::Int => BufferKind::Int,
            ScalarKind::Float => BufferKind::Float,
        }
    }

    fn vector_prefix(self) -> &'static str {
        match self {
            ScalarKind::Bool => "b",
            ScalarKind::Int => "i",
            ScalarKind::Float => "",
        }
    }
}

/// The two flat buffer kinds of the target runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BufferKind {
    Int,
    Float,
}

impl BufferKind {
    /// Name of the typed array constructor in the host environment.
    pub fn constructor_name(self) -> &'static str {
        match self {
            BufferKind::Int => "Int32Array",
            BufferKind::Float => "Float32Array",
        }
    }

    /// Scalar kind read back from a slot of this buffer.
    pub fn scalar(self) -> ScalarKind {
        match self {
            BufferKind::Int => ScalarKind::Int,
            BufferKind::Float => ScalarKind::Float,
        }
    }
}

/// A resolved type.
///
/// `Array` with a size of zero denotes an unsized view over the whole heap;
/// declared arrays always have a positive size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Type {
    Void,
    Bool,
    Int,
    Float,
    Vector(ScalarKind, u8),
    Matrix(u8),
    Array(Box<Type>, usize),
}

impl Type {
    /// Builds a vector type, or `None` when the width is not 2, 3 or 4.
    pub fn vector(kind: ScalarKind, width: usize) -> Option<Type> {
        match width {
            2..=4 => Some(Type::Vector(kind, width as u8)),
            _ => None,
        }
    }

    /// Builds a matrix type, or `None` when the dimension is not 2, 3 or 4.
    pub fn matrix(dimension: usize) -> Option<Type> {
        match dimension {
            2..=4 => Some(Type::Matrix(dimension as u8)),
            _ => None,
        }
    }

    pub fn array(element: Type, size: usize) -> Type {
        Type::Array(Box::new(element), size)
    }

    /// Resolves a type keyword of the source language.
    pub fn from_name(name: &str) -> Option<Type> {
        let ty = match name {
            "void" => Type::Void,
            "bool" => Type::Bool,
            "int" => Type::Int,
            "float" => Type::Float,
            "vec2" => Type::Vector(ScalarKind::Float, 2),
            "vec3" => Type::Vector(ScalarKind::Float, 3),
            "vec4" => Type::Vector(ScalarKind::Float, 4),
            "ivec2" => Type::Vector(ScalarKind::Int, 2),
            "ivec3" => Type::Vector(ScalarKind::Int, 3),
            "ivec4" => Type::Vector(ScalarKind::Int, 4),
            "bvec2" => Type::Vector(ScalarKind::Bool, 2),
            "bvec3" => Type::Vector(ScalarKind::Bool, 3),
            "bvec4" => Type::Vector(ScalarKind::Bool, 4),
            "mat2" => Type::Matrix(2),
            "mat3" => Type::Matrix(3),
            "mat4" => Type::Matrix(4),
            _ => return None,
        };
        Some(ty)
    }

    /// The type with any array wrapper removed.
    pub fn element(&self) -> &Type {
        match self {
            Type::Array(element, _) => element,
            other => other,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(..))
    }

    /// Scalar classification looks through arrays, so an array of floats is
    /// both `is_array` and `is_scalar`.
    pub fn is_scalar(&self) -> bool {
        matches!(self.element(), Type::Bool | Type::Int | Type::Float)
    }

    pub fn is_vector(&self) -> bool {
        matches!(self.element(), Type::Vector(..))
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self.element(), Type::Matrix(_))
    }

    /// A vector or matrix outside of any array.
    pub fn is_composite(&self) -> bool {
        matches!(self, Type::Vector(..) | Type::Matrix(_))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Bool)
    }

    /// Number of scalar slots: 1 for scalars, N for vecN, N² for matN and the
    /// declared size for arrays.
    pub fn element_count(&self) -> usize {
        match self {
            Type::Void => 0,
            Type::Bool | Type::Int | Type::Float => 1,
            Type::Vector(_, width) => *width as usize,
            Type::Matrix(dimension) => (*dimension as usize) * (*dimension as usize),
            Type::Array(_, size) => *size,
        }
    }

    /// Scalar base of a vector or matrix, the element type of an array, or
    /// the type itself for scalars.
    pub fn component_type(&self) -> Type {
        match self {
            Type::Vector(kind, _) => kind.as_type(),
            Type::Matrix(_) => Type::Float,
            Type::Array(element, _) => (**element).clone(),
            other => other.clone(),
        }
    }

    /// The scalar kind every slot of this type holds.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self.element() {
            Type::Bool => Some(ScalarKind::Bool),
            Type::Int => Some(ScalarKind::Int),
            Type::Float => Some(ScalarKind::Float),
            Type::Vector(kind, _) => Some(*kind),
            Type::Matrix(_) => Some(ScalarKind::Float),
            Type::Void | Type::Array(..) => None,
        }
    }

    /// Whether a numeric (`int` or `float`) value lives in every slot.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self.scalar_kind(),
            Some(ScalarKind::Int) | Some(ScalarKind::Float)
        )
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Vector(kind, width) => write!(f, "{}vec{}", kind.vector_prefix(), width),
            Type::Matrix(dimension) => write!(f, "mat{}", dimension),
            Type::Array(element, size) => write!(f, "{}[{}]", element, size),
        }
    }
}
