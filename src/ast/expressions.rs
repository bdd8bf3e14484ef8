//! Expression nodes.
//!
//! Every node carries exactly one resolved [`Type`] and is immutable once
//! built. The constructors on [`Expr`] are the only way to build a node and
//! each one validates its own operand types, failing immediately instead of
//! deferring to a later pass.
//!
//! The constructors here are the *base* constructors: they only ever accept
//! scalar operands. Vector and matrix operands are handled by the broadcasting
//! layer in `type_checker::lowering`, which rewrites them into scalar nodes
//! before calling down into this module.

use std::rc::Rc;

use serde::Serialize;

use crate::{
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::{
    ast::Typed,
    types::{BufferKind, ScalarKind, Type},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOperator {
    Minus,
    Plus,
    Not,
    BitNot,
}

impl UnaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOperator::Minus => "-",
            UnaryOperator::Plus => "+",
            UnaryOperator::Not => "!",
            UnaryOperator::BitNot => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    BitOr,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Equal => "===",
            BinaryOperator::NotEqual => "!==",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::BitOr => "|",
        }
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, BinaryOperator::Equal | BinaryOperator::NotEqual)
    }

    pub fn is_relational(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Less
                | BinaryOperator::LessEqual
                | BinaryOperator::Greater
                | BinaryOperator::GreaterEqual
        )
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "&&",
            LogicalOperator::Or => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpdateOperator {
    Increment,
    Decrement,
}

impl UpdateOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateOperator::Increment => "++",
            UpdateOperator::Decrement => "--",
        }
    }

    /// The arithmetic operator a compound form of this update applies.
    pub fn arithmetic(&self) -> BinaryOperator {
        match self {
            UpdateOperator::Increment => BinaryOperator::Add,
            UpdateOperator::Decrement => BinaryOperator::Subtract,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LiteralValue {
    Int(i64),
    /// `force_fraction` is set when the rendered number would otherwise read
    /// as an integer in the target.
    Float {
        value: f64,
        force_fraction: bool,
    },
    Str(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExprKind {
    Literal(LiteralValue),
    Identifier(String),
    Unary {
        operator: UnaryOperator,
        argument: Rc<Expr>,
    },
    Binary {
        operator: BinaryOperator,
        left: Rc<Expr>,
        right: Rc<Expr>,
    },
    Logical {
        operator: LogicalOperator,
        left: Rc<Expr>,
        right: Rc<Expr>,
    },
    Assignment {
        target: Rc<Expr>,
        value: Rc<Expr>,
    },
    Update {
        operator: UpdateOperator,
        prefix: bool,
        argument: Rc<Expr>,
    },
    Conditional {
        test: Rc<Expr>,
        consequent: Rc<Expr>,
        alternate: Rc<Expr>,
    },
    /// `intrinsic` calls go to pure host math functions.
    Call {
        callee: String,
        arguments: Vec<Rc<Expr>>,
        intrinsic: bool,
    },
    Member {
        object: Rc<Expr>,
        property: Rc<Expr>,
    },
    Sequence(Vec<Rc<Expr>>),
    ArrayLiteral(Vec<Rc<Expr>>),
    NewComposite {
        buffer: BufferKind,
        size: usize,
    },
    /// Multi-component selection over a vector or matrix. Internal only: it is
    /// always resolved into reads or writes before the tree is finished.
    Swizzle {
        vector: Rc<Expr>,
        offsets: Vec<usize>,
    },
}

impl ExprKind {
    pub fn name(&self) -> &'static str {
        match self {
            ExprKind::Literal(_) => "Literal",
            ExprKind::Identifier(_) => "Identifier",
            ExprKind::Unary { .. } => "Unary",
            ExprKind::Binary { .. } => "Binary",
            ExprKind::Logical { .. } => "Logical",
            ExprKind::Assignment { .. } => "Assignment",
            ExprKind::Update { .. } => "Update",
            ExprKind::Conditional { .. } => "Conditional",
            ExprKind::Call { .. } => "Call",
            ExprKind::Member { .. } => "Member",
            ExprKind::Sequence(_) => "Sequence",
            ExprKind::ArrayLiteral(_) => "ArrayLiteral",
            ExprKind::NewComposite { .. } => "NewComposite",
            ExprKind::Swizzle { .. } => "Swizzle",
        }
    }

    pub fn children(&self) -> Vec<&Rc<Expr>> {
        match self {
            ExprKind::Literal(_) | ExprKind::Identifier(_) | ExprKind::NewComposite { .. } => {
                Vec::new()
            }
            ExprKind::Unary { argument, .. } | ExprKind::Update { argument, .. } => vec![argument],
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                vec![left, right]
            }
            ExprKind::Assignment { target, value } => vec![target, value],
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            } => vec![test, consequent, alternate],
            ExprKind::Call { arguments, .. } => arguments.iter().collect(),
            ExprKind::Member { object, property } => vec![object, property],
            ExprKind::Sequence(items) | ExprKind::ArrayLiteral(items) => items.iter().collect(),
            ExprKind::Swizzle { vector, .. } => vec![vector],
        }
    }
}

/// A typed expression node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expr {
    kind: ExprKind,
    ty: Type,
    /// Composite stack slots needed while this expression evaluates.
    stack_demand: usize,
    effects: bool,
}

impl Typed for Expr {
    fn get_type(&self) -> &Type {
        &self.ty
    }
}

impl Expr {
    fn new(kind: ExprKind, ty: Type) -> Expr {
        let (stack_demand, children_effects) = kind
            .children()
            .iter()
            .fold((0, false), |(demand, effects), child| {
                (demand.max(child.stack_demand), effects || child.effects)
            });
        let effects = children_effects
            || matches!(
                kind,
                ExprKind::Assignment { .. }
                    | ExprKind::Update { .. }
                    | ExprKind::Call {
                        intrinsic: false,
                        ..
                    }
            );

        Expr {
            kind,
            ty,
            stack_demand,
            effects,
        }
    }

    pub fn kind(&self) -> &ExprKind {
        &self.kind
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn children(&self) -> Vec<&Rc<Expr>> {
        self.kind.children()
    }

    pub fn stack_demand(&self) -> usize {
        self.stack_demand
    }

    /// Whether evaluating this expression can write state or call user code.
    pub fn has_effects(&self) -> bool {
        self.effects
    }

    pub(crate) fn with_stack_demand(mut self, demand: usize) -> Expr {
        self.stack_demand = self.stack_demand.max(demand);
        self
    }

    // LITERALS

    pub fn literal_int(value: i64) -> Expr {
        Expr::new(ExprKind::Literal(LiteralValue::Int(value)), Type::Int)
    }

    pub fn literal_float(value: f64) -> Expr {
        Expr::new(
            ExprKind::Literal(LiteralValue::Float {
                value,
                force_fraction: value.fract() == 0.0,
            }),
            Type::Float,
        )
    }

    /// Booleans are integers `1`/`0` in the target, typed `bool` here.
    pub fn literal_bool(value: bool) -> Expr {
        Expr::new(
            ExprKind::Literal(LiteralValue::Int(value as i64)),
            Type::Bool,
        )
    }

    pub fn literal_str(value: &str) -> Expr {
        Expr::new(
            ExprKind::Literal(LiteralValue::Str(value.to_string())),
            Type::Void,
        )
    }

    /// The zero value of a scalar type.
    pub fn zero(ty: &Type) -> Expr {
        match ty {
            Type::Float => Expr::literal_float(0.0),
            Type::Bool => Expr::literal_bool(false),
            _ => Expr::literal_int(0),
        }
    }

    pub fn identifier(name: &str, ty: Type) -> Expr {
        Expr::new(ExprKind::Identifier(name.to_string()), ty)
    }

    // OPERATORS

    pub fn unary(
        operator: UnaryOperator,
        argument: impl Into<Rc<Expr>>,
        position: &Position,
    ) -> Result<Expr, Error> {
        let argument = argument.into();
        reject_array(&argument, operator.as_str(), position)?;
        reject_non_scalar(&argument, operator.as_str(), position)?;

        let valid = match operator {
            UnaryOperator::Not => argument.ty.is_bool(),
            UnaryOperator::Minus | UnaryOperator::Plus | UnaryOperator::BitNot => {
                argument.ty.is_numeric()
            }
        };
        if !valid {
            return Err(invalid_operand(operator.as_str(), &argument.ty, position));
        }

        let ty = match operator {
            UnaryOperator::BitNot => Type::Int,
            _ => argument.ty.clone(),
        };
        Ok(Expr::new(ExprKind::Unary { operator, argument }, ty))
    }

    pub fn binary(
        operator: BinaryOperator,
        left: impl Into<Rc<Expr>>,
        right: impl Into<Rc<Expr>>,
        position: &Position,
    ) -> Result<Expr, Error> {
        let (left, right) = (left.into(), right.into());
        reject_array(&left, operator.as_str(), position)?;
        reject_array(&right, operator.as_str(), position)?;
        reject_non_scalar(&left, operator.as_str(), position)?;
        reject_non_scalar(&right, operator.as_str(), position)?;
        require_same_type(&left, &right, position)?;

        if (operator.is_arithmetic() || operator.is_relational()) && !left.ty.is_numeric() {
            return Err(invalid_operand(operator.as_str(), &left.ty, position));
        }

        let ty = if operator.is_equality() || operator.is_relational() {
            Type::Bool
        } else if operator == BinaryOperator::BitOr {
            Type::Int
        } else {
            left.ty.clone()
        };
        Ok(Expr::new(
            ExprKind::Binary {
                operator,
                left,
                right,
            },
            ty,
        ))
    }

    pub fn logical(
        operator: LogicalOperator,
        left: impl Into<Rc<Expr>>,
        right: impl Into<Rc<Expr>>,
        position: &Position,
    ) -> Result<Expr, Error> {
        let (left, right) = (left.into(), right.into());
        if !left.ty.is_bool() || !right.ty.is_bool() {
            return Err(Error::new(
                ErrorImpl::LogicalOperands {
                    operator: operator.as_str().to_string(),
                },
                position.clone(),
            ));
        }
        Ok(Expr::new(
            ExprKind::Logical {
                operator,
                left,
                right,
            },
            Type::Bool,
        ))
    }

    /// Scalar assignment. The target must be an identifier or a member access.
    pub fn assignment(
        target: impl Into<Rc<Expr>>,
        value: impl Into<Rc<Expr>>,
        position: &Position,
    ) -> Result<Expr, Error> {
        let (target, value) = (target.into(), value.into());
        if !target.is_addressable() {
            return Err(Error::new(ErrorImpl::NotAssignable, position.clone()));
        }
        reject_array(&target, "=", position)?;
        reject_array(&value, "=", position)?;
        reject_non_scalar(&target, "=", position)?;
        require_same_type(&target, &value, position)?;

        let ty = target.ty.clone();
        Ok(Expr::new(ExprKind::Assignment { target, value }, ty))
    }

    pub fn update(
        operator: UpdateOperator,
        prefix: bool,
        argument: impl Into<Rc<Expr>>,
        position: &Position,
    ) -> Result<Expr, Error> {
        let argument = argument.into();
        reject_array(&argument, operator.as_str(), position)?;
        if argument.ty.scalar_kind() == Some(ScalarKind::Bool) {
            return Err(Error::new(
                ErrorImpl::BooleanUpdate {
                    type_: argument.ty.to_string(),
                },
                position.clone(),
            ));
        }
        if !argument.is_addressable() {
            return Err(Error::new(ErrorImpl::NotUpdatable, position.clone()));
        }
        reject_non_scalar(&argument, operator.as_str(), position)?;

        let ty = argument.ty.clone();
        Ok(Expr::new(
            ExprKind::Update {
                operator,
                prefix,
                argument,
            },
            ty,
        ))
    }

    pub fn conditional(
        test: impl Into<Rc<Expr>>,
        consequent: impl Into<Rc<Expr>>,
        alternate: impl Into<Rc<Expr>>,
        position: &Position,
    ) -> Result<Expr, Error> {
        let (test, consequent, alternate) = (test.into(), consequent.into(), alternate.into());
        require_condition(&test, position)?;
        reject_array(&consequent, "?:", position)?;
        if consequent.ty != alternate.ty {
            return Err(Error::new(
                ErrorImpl::BranchTypeMismatch {
                    consequent: consequent.ty.to_string(),
                    alternate: alternate.ty.to_string(),
                },
                position.clone(),
            ));
        }

        let ty = consequent.ty.clone();
        Ok(Expr::new(
            ExprKind::Conditional {
                test,
                consequent,
                alternate,
            },
            ty,
        ))
    }

    /// A call to an already resolved function.
    pub fn call(callee: &str, arguments: Vec<Rc<Expr>>, return_type: Type) -> Expr {
        Expr::new(
            ExprKind::Call {
                callee: callee.to_string(),
                arguments,
                intrinsic: false,
            },
            return_type,
        )
    }

    pub fn intrinsic_call(callee: &str, arguments: Vec<Rc<Expr>>, return_type: Type) -> Expr {
        Expr::new(
            ExprKind::Call {
                callee: callee.to_string(),
                arguments,
                intrinsic: true,
            },
            return_type,
        )
    }

    /// Element access into an array. The index must be an `int`.
    pub fn member(
        object: impl Into<Rc<Expr>>,
        property: impl Into<Rc<Expr>>,
        position: &Position,
    ) -> Result<Expr, Error> {
        let (object, property) = (object.into(), property.into());
        if !object.ty.is_array() {
            return Err(Error::new(
                ErrorImpl::NotIndexable {
                    type_: object.ty.to_string(),
                },
                position.clone(),
            ));
        }
        if property.ty != Type::Int {
            return Err(Error::new(
                ErrorImpl::IndexNotInteger {
                    received: property.ty.to_string(),
                },
                position.clone(),
            ));
        }

        let ty = object.ty.component_type();
        Ok(Expr::new(ExprKind::Member { object, property }, ty))
    }

    /// Element access with an explicit result type. Used for heap views, where
    /// one buffer stores more than one scalar kind.
    pub(crate) fn member_as(object: Rc<Expr>, property: Rc<Expr>, ty: Type) -> Expr {
        Expr::new(ExprKind::Member { object, property }, ty)
    }

    /// Binary node with an explicit result type and no operand checks. Used
    /// for address arithmetic, where the base is a composite's address.
    pub(crate) fn raw_binary(
        operator: BinaryOperator,
        left: Rc<Expr>,
        right: Rc<Expr>,
        ty: Type,
    ) -> Expr {
        Expr::new(
            ExprKind::Binary {
                operator,
                left,
                right,
            },
            ty,
        )
    }

    /// Comma sequence; its type is the type of the last item.
    pub fn sequence(items: Vec<Rc<Expr>>) -> Expr {
        let ty = items
            .last()
            .map(|item| item.ty.clone())
            .unwrap_or(Type::Void);
        Expr::new(ExprKind::Sequence(items), ty)
    }

    /// Comma sequence carrying a composite type whose trailing value is the
    /// composite's address.
    pub(crate) fn sequence_as(items: Vec<Rc<Expr>>, ty: Type) -> Expr {
        Expr::new(ExprKind::Sequence(items), ty)
    }

    /// Ordered scalar components of a composite value.
    pub(crate) fn array_literal(elements: Vec<Rc<Expr>>, ty: Type) -> Expr {
        Expr::new(ExprKind::ArrayLiteral(elements), ty)
    }

    pub fn new_composite(buffer: BufferKind, size: usize, element: Type) -> Expr {
        Expr::new(
            ExprKind::NewComposite { buffer, size },
            Type::array(element, size),
        )
    }

    pub(crate) fn swizzle(vector: Rc<Expr>, offsets: Vec<usize>, ty: Type) -> Expr {
        Expr::new(ExprKind::Swizzle { vector, offsets }, ty)
    }

    /// Identifier reassignment that bypasses type equality. Used to point a
    /// composite parameter at its own storage.
    pub(crate) fn rebind(target: Rc<Expr>, value: Rc<Expr>) -> Expr {
        let ty = target.ty.clone();
        Expr::new(ExprKind::Assignment { target, value }, ty)
    }

    /// Converts a scalar argument to another scalar type:
    /// `+x` for float, `x | 0` or `~~x` for int and `x !== 0` for bool.
    pub fn convert(argument: impl Into<Rc<Expr>>, to: &Type, position: &Position) -> Result<Expr, Error> {
        let argument = argument.into();
        if !matches!(to, Type::Bool | Type::Int | Type::Float) {
            return Err(Error::new(
                ErrorImpl::UnsupportedConversion {
                    type_: to.to_string(),
                },
                position.clone(),
            ));
        }
        reject_array(&argument, "conversion", position)?;
        reject_non_scalar(&argument, "conversion", position)?;
        if &argument.ty == to {
            return Ok((*argument).clone());
        }

        let converted = match (&argument.ty, to) {
            (_, Type::Float) => Expr::new(
                ExprKind::Unary {
                    operator: UnaryOperator::Plus,
                    argument,
                },
                Type::Float,
            ),
            (Type::Float, Type::Int) => {
                let inner = Expr::new(
                    ExprKind::Unary {
                        operator: UnaryOperator::BitNot,
                        argument,
                    },
                    Type::Int,
                );
                Expr::new(
                    ExprKind::Unary {
                        operator: UnaryOperator::BitNot,
                        argument: Rc::new(inner),
                    },
                    Type::Int,
                )
            }
            (_, Type::Int) => Expr::new(
                ExprKind::Binary {
                    operator: BinaryOperator::BitOr,
                    left: argument,
                    right: Rc::new(Expr::literal_int(0)),
                },
                Type::Int,
            ),
            (from, _) => {
                let zero = Expr::zero(from);
                Expr::new(
                    ExprKind::Binary {
                        operator: BinaryOperator::NotEqual,
                        left: argument,
                        right: Rc::new(zero),
                    },
                    Type::Bool,
                )
            }
        };
        Ok(converted)
    }

    // QUERIES

    pub fn is_addressable(&self) -> bool {
        matches!(self.kind, ExprKind::Identifier(_) | ExprKind::Member { .. })
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Literal(_))
    }

    pub fn as_identifier(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Identifier(name) => Some(name),
            _ => None,
        }
    }

    /// Folds an integer constant expression.
    pub fn as_int_constant(&self) -> Option<i64> {
        if self.ty != Type::Int {
            return None;
        }
        match &self.kind {
            ExprKind::Literal(LiteralValue::Int(value)) => Some(*value),
            ExprKind::Unary {
                operator: UnaryOperator::Minus,
                argument,
            } => argument.as_int_constant().and_then(i64::checked_neg),
            ExprKind::Binary {
                operator,
                left,
                right,
            } => {
                let (left, right) = (left.as_int_constant()?, right.as_int_constant()?);
                match operator {
                    BinaryOperator::Add => left.checked_add(right),
                    BinaryOperator::Subtract => left.checked_sub(right),
                    BinaryOperator::Multiply => left.checked_mul(right),
                    BinaryOperator::Divide => left.checked_div(right),
                    _ => None,
                }
            }
            ExprKind::Sequence(items) if items.len() == 1 => items[0].as_int_constant(),
            _ => None,
        }
    }
}

fn reject_array(expr: &Expr, operator: &str, position: &Position) -> Result<(), Error> {
    if expr.ty.is_array() {
        return Err(Error::new(
            ErrorImpl::ArrayOperand {
                operator: operator.to_string(),
            },
            position.clone(),
        ));
    }
    Ok(())
}

fn reject_non_scalar(expr: &Expr, operator: &str, position: &Position) -> Result<(), Error> {
    if !expr.ty.is_scalar() {
        return Err(Error::new(
            ErrorImpl::NonScalarOperand {
                operator: operator.to_string(),
            },
            position.clone(),
        ));
    }
    Ok(())
}

fn require_same_type(left: &Expr, right: &Expr, position: &Position) -> Result<(), Error> {
    if left.ty != right.ty {
        return Err(Error::new(
            ErrorImpl::DifferingTypes {
                left: left.ty.to_string(),
                right: right.ty.to_string(),
            },
            position.clone(),
        ));
    }
    Ok(())
}

/// Conditions must be `bool` and not an array.
pub(crate) fn require_condition(test: &Expr, position: &Position) -> Result<(), Error> {
    if !test.ty.is_bool() {
        return Err(Error::new(
            ErrorImpl::BooleanExpected {
                received: test.ty.to_string(),
            },
            position.clone(),
        ));
    }
    Ok(())
}

fn invalid_operand(operator: &str, ty: &Type, position: &Position) -> Error {
    Error::new(
        ErrorImpl::InvalidOperandType {
            operator: operator.to_string(),
            type_: ty.to_string(),
        },
        position.clone(),
    )
}
