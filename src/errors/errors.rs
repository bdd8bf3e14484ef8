use std::fmt::Display;

use thiserror::Error;

use crate::Position;

/// A fatal compilation error anchored at a source position.
#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    /// 1-based source line of the offending construct.
    pub fn get_line(&self) -> u32 {
        self.position.line
    }

    pub fn get_internal(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn get_kind(&self) -> ErrorKind {
        self.internal_error.kind()
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => "UnrecognisedToken",
            ErrorImpl::UnexpectedToken { .. } => "UnexpectedToken",
            ErrorImpl::UnexpectedTokenDetailed { .. } => "UnexpectedTokenDetailed",
            ErrorImpl::NumberParseError { .. } => "NumberParseError",
            ErrorImpl::UnknownType { .. } => "UnknownType",
            ErrorImpl::DifferingTypes { .. } => "DifferingTypes",
            ErrorImpl::BooleanExpected { .. } => "BooleanExpected",
            ErrorImpl::LogicalOperands { .. } => "LogicalOperands",
            ErrorImpl::BranchTypeMismatch { .. } => "BranchTypeMismatch",
            ErrorImpl::InvalidOperandType { .. } => "InvalidOperandType",
            ErrorImpl::IndexNotInteger { .. } => "IndexNotInteger",
            ErrorImpl::ReturnTypeMismatch { .. } => "ReturnTypeMismatch",
            ErrorImpl::ArrayOperand { .. } => "ArrayOperand",
            ErrorImpl::NonScalarOperand { .. } => "NonScalarOperand",
            ErrorImpl::CompositeTypeMismatch { .. } => "CompositeTypeMismatch",
            ErrorImpl::InvalidSwizzle { .. } => "InvalidSwizzle",
            ErrorImpl::ConstructorArity { .. } => "ConstructorArity",
            ErrorImpl::NotIndexable { .. } => "NotIndexable",
            ErrorImpl::NotAssignable => "NotAssignable",
            ErrorImpl::NotUpdatable => "NotUpdatable",
            ErrorImpl::DuplicateSwizzleComponent => "DuplicateSwizzleComponent",
            ErrorImpl::BooleanUpdate { .. } => "BooleanUpdate",
            ErrorImpl::Redeclaration { .. } => "Redeclaration",
            ErrorImpl::ConflictingReturnType { .. } => "ConflictingReturnType",
            ErrorImpl::FunctionAlreadyHasBody { .. } => "FunctionAlreadyHasBody",
            ErrorImpl::FunctionAlreadyDeclared { .. } => "FunctionAlreadyDeclared",
            ErrorImpl::VariableNotDeclared { .. } => "VariableNotDeclared",
            ErrorImpl::FunctionNotDeclared { .. } => "FunctionNotDeclared",
            ErrorImpl::NotAVariable { .. } => "NotAVariable",
            ErrorImpl::GlobalScopeOnly { .. } => "GlobalScopeOnly",
            ErrorImpl::OutsideLoop { .. } => "OutsideLoop",
            ErrorImpl::ReturnOutsideFunction => "ReturnOutsideFunction",
            ErrorImpl::NoMainFunction => "NoMainFunction",
            ErrorImpl::MainReturnType => "MainReturnType",
            ErrorImpl::MainHasParameters => "MainHasParameters",
            ErrorImpl::UnimplementedArrayDeclaration { .. } => "UnimplementedArrayDeclaration",
            ErrorImpl::UnsupportedConversion { .. } => "UnsupportedConversion",
            ErrorImpl::InvalidArraySize => "InvalidArraySize",
            ErrorImpl::HeapExhausted { .. } => "HeapExhausted",
            ErrorImpl::RecursiveCall { .. } => "RecursiveCall",
            ErrorImpl::NotImplemented { .. } => "NotImplemented",
            ErrorImpl::UnloweredNode { .. } => "UnloweredNode",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => ErrorTip::None,
            ErrorImpl::UnexpectedToken { token } => ErrorTip::Suggestion(format!(
                "Unexpected token: `{}`, did you miss a semicolon?",
                token
            )),
            ErrorImpl::UnexpectedTokenDetailed { token, message } => {
                ErrorTip::Suggestion(format!("Unexpected token: `{}`, {}", token, message))
            }
            ErrorImpl::NumberParseError { token } => ErrorTip::Suggestion(format!(
                "Invalid number: `{}`, is it above the integer limit?",
                token
            )),
            ErrorImpl::DifferingTypes { left, right } => ErrorTip::Suggestion(format!(
                "Use a constructor such as `{}(..)` to convert `{}` explicitly",
                left, right
            )),
            ErrorImpl::NonScalarOperand { operator } if is_relational(operator) => {
                ErrorTip::Suggestion(String::from(
                    "Compare vectors component by component, or use `==` to compare them as a whole",
                ))
            }
            ErrorImpl::DuplicateSwizzleComponent => ErrorTip::Suggestion(String::from(
                "Each component may appear only once when a swizzle is written to",
            )),
            ErrorImpl::NoMainFunction => ErrorTip::Suggestion(String::from(
                "Declare `void main() { ... }` with no parameters",
            )),
            ErrorImpl::FunctionAlreadyHasBody { function } => ErrorTip::Suggestion(format!(
                "Remove one of the definitions of `{}`",
                function
            )),
            ErrorImpl::HeapExhausted { .. } => ErrorTip::Suggestion(String::from(
                "Pass a larger heap size",
            )),
            ErrorImpl::NotImplemented { .. } | ErrorImpl::UnloweredNode { .. } => {
                ErrorTip::Suggestion(String::from(
                    "This feature is expected to be handled, but has not yet been implemented",
                ))
            }
            _ => ErrorTip::None,
        }
    }
}

fn is_relational(operator: &str) -> bool {
    matches!(operator, "<" | "<=" | ">" | ">=")
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} on line {}", self.internal_error, self.position.line)
    }
}

impl std::error::Error for Error {}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

/// Broad fault categories a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    TypeMismatch,
    CompositeMisuse,
    Assignability,
    Scoping,
    EntryPoint,
    Unsupported,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    #[error("unrecognised token: {token:?}")]
    UnrecognisedToken { token: String },
    #[error("unexpected token: {token:?}")]
    UnexpectedToken { token: String },
    #[error("unexpected token ({message}): {token:?}")]
    UnexpectedTokenDetailed { token: String, message: String },
    #[error("error parsing number: {token:?}")]
    NumberParseError { token: String },
    #[error("unknown type {type_}")]
    UnknownType { type_: String },

    #[error("left and right arguments are of differing types ({left} and {right})")]
    DifferingTypes { left: String, right: String },
    #[error("boolean expression expected, found {received}")]
    BooleanExpected { received: String },
    #[error("logical expression {operator} requires boolean arguments")]
    LogicalOperands { operator: String },
    #[error("consequent and alternate must return the same types ({consequent} and {alternate})")]
    BranchTypeMismatch { consequent: String, alternate: String },
    #[error("cannot apply operation {operator} to argument of type {type_}")]
    InvalidOperandType { operator: String, type_: String },
    #[error("array index must be an int, found {received}")]
    IndexNotInteger { received: String },
    #[error("return type does not match: expected {expected}, received {received}")]
    ReturnTypeMismatch { expected: String, received: String },

    #[error("cannot apply operation {operator} to an array")]
    ArrayOperand { operator: String },
    #[error("cannot apply operation {operator} to a non-scalar")]
    NonScalarOperand { operator: String },
    #[error("vector types do not match ({left} and {right})")]
    CompositeTypeMismatch { left: String, right: String },
    #[error("invalid swizzle .{selector} on {type_}")]
    InvalidSwizzle { selector: String, type_: String },
    #[error("wrong number of components for {type_}: expected {expected}, received {received}")]
    ConstructorArity {
        type_: String,
        expected: usize,
        received: usize,
    },
    #[error("cannot index a value of type {type_}")]
    NotIndexable { type_: String },

    #[error("cannot assign to a non-identifier")]
    NotAssignable,
    #[error("cannot update a non-identifier")]
    NotUpdatable,
    #[error("cannot assign to swizzle with duplicate components")]
    DuplicateSwizzleComponent,
    #[error("cannot update argument of type {type_}")]
    BooleanUpdate { type_: String },

    #[error("redeclaration of identifier {name}")]
    Redeclaration { name: String },
    #[error("overloaded functions must have the same return type ({function})")]
    ConflictingReturnType { function: String },
    #[error("function {function} already has a body")]
    FunctionAlreadyHasBody { function: String },
    #[error("function {function} already declared")]
    FunctionAlreadyDeclared { function: String },
    #[error("variable {variable:?} not declared")]
    VariableNotDeclared { variable: String },
    #[error("no matching function {function}({arguments})")]
    FunctionNotDeclared { function: String, arguments: String },
    #[error("{name} is not a variable")]
    NotAVariable { name: String },
    #[error("{construct} only allowed in global scope")]
    GlobalScopeOnly { construct: String },
    #[error("{statement} statement outside of a loop")]
    OutsideLoop { statement: String },
    #[error("return statement outside of a function")]
    ReturnOutsideFunction,

    #[error("no main function found")]
    NoMainFunction,
    #[error("main function must return void")]
    MainReturnType,
    #[error("main function cannot accept any arguments")]
    MainHasParameters,

    #[error("unimplemented array declaration of type {type_}")]
    UnimplementedArrayDeclaration { type_: String },
    #[error("unsupported implicit-conversion target type {type_}")]
    UnsupportedConversion { type_: String },
    #[error("array size must be a positive integer constant")]
    InvalidArraySize,
    #[error("composite storage needs {needed} slots but the heap holds {available}")]
    HeapExhausted { needed: usize, available: usize },
    #[error("recursive call to function {function}")]
    RecursiveCall { function: String },
    #[error("not implemented: {feature}")]
    NotImplemented { feature: String },
    #[error("{node} node reached the emitter without being lowered")]
    UnloweredNode { node: String },
}

impl ErrorImpl {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorImpl::UnrecognisedToken { .. }
            | ErrorImpl::UnexpectedToken { .. }
            | ErrorImpl::UnexpectedTokenDetailed { .. }
            | ErrorImpl::NumberParseError { .. }
            | ErrorImpl::UnknownType { .. } => ErrorKind::Syntax,
            ErrorImpl::DifferingTypes { .. }
            | ErrorImpl::BooleanExpected { .. }
            | ErrorImpl::LogicalOperands { .. }
            | ErrorImpl::BranchTypeMismatch { .. }
            | ErrorImpl::InvalidOperandType { .. }
            | ErrorImpl::IndexNotInteger { .. }
            | ErrorImpl::ReturnTypeMismatch { .. } => ErrorKind::TypeMismatch,
            ErrorImpl::ArrayOperand { .. }
            | ErrorImpl::NonScalarOperand { .. }
            | ErrorImpl::CompositeTypeMismatch { .. }
            | ErrorImpl::InvalidSwizzle { .. }
            | ErrorImpl::ConstructorArity { .. }
            | ErrorImpl::NotIndexable { .. } => ErrorKind::CompositeMisuse,
            ErrorImpl::NotAssignable
            | ErrorImpl::NotUpdatable
            | ErrorImpl::DuplicateSwizzleComponent
            | ErrorImpl::BooleanUpdate { .. } => ErrorKind::Assignability,
            ErrorImpl::Redeclaration { .. }
            | ErrorImpl::ConflictingReturnType { .. }
            | ErrorImpl::FunctionAlreadyHasBody { .. }
            | ErrorImpl::FunctionAlreadyDeclared { .. }
            | ErrorImpl::VariableNotDeclared { .. }
            | ErrorImpl::FunctionNotDeclared { .. }
            | ErrorImpl::NotAVariable { .. }
            | ErrorImpl::GlobalScopeOnly { .. }
            | ErrorImpl::OutsideLoop { .. }
            | ErrorImpl::ReturnOutsideFunction => ErrorKind::Scoping,
            ErrorImpl::NoMainFunction | ErrorImpl::MainReturnType | ErrorImpl::MainHasParameters => {
                ErrorKind::EntryPoint
            }
            ErrorImpl::UnimplementedArrayDeclaration { .. }
            | ErrorImpl::UnsupportedConversion { .. }
            | ErrorImpl::InvalidArraySize
            | ErrorImpl::HeapExhausted { .. }
            | ErrorImpl::RecursiveCall { .. }
            | ErrorImpl::NotImplemented { .. }
            | ErrorImpl::UnloweredNode { .. } => ErrorKind::Unsupported,
        }
    }
}
