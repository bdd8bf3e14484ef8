use std::rc::Rc;

use crate::{
    ast::{
        expressions::{BinaryOperator, Expr, ExprKind, LiteralValue, UnaryOperator, UpdateOperator},
        types::Type,
    },
    errors::errors::{Error, ErrorImpl},
    Position,
};

use super::compiler::Compiler;

/// Operator precedence levels of the target language, loosest first.
pub mod precedence {
    pub const SEQUENCE: u8 = 1;
    pub const ASSIGNMENT: u8 = 2;
    pub const CONDITIONAL: u8 = 3;
    pub const LOGICAL_OR: u8 = 4;
    pub const LOGICAL_AND: u8 = 5;
    pub const BITWISE_OR: u8 = 6;
    pub const EQUALITY: u8 = 9;
    pub const RELATIONAL: u8 = 10;
    pub const ADDITIVE: u8 = 12;
    pub const MULTIPLICATIVE: u8 = 13;
    pub const UNARY: u8 = 15;
    pub const POSTFIX: u8 = 16;
    pub const MEMBER: u8 = 18;
    pub const PRIMARY: u8 = 20;
}

fn binary_precedence(operator: BinaryOperator) -> u8 {
    match operator {
        BinaryOperator::Add | BinaryOperator::Subtract => precedence::ADDITIVE,
        BinaryOperator::Multiply | BinaryOperator::Divide => precedence::MULTIPLICATIVE,
        BinaryOperator::Equal | BinaryOperator::NotEqual => precedence::EQUALITY,
        BinaryOperator::Less
        | BinaryOperator::LessEqual
        | BinaryOperator::Greater
        | BinaryOperator::GreaterEqual => precedence::RELATIONAL,
        BinaryOperator::BitOr => precedence::BITWISE_OR,
    }
}

/// Renders a float so the target reads it back as a double. Flagged values
/// always show a fractional part.
pub fn format_float(value: f64, force_fraction: bool) -> String {
    if force_fraction && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

fn format_literal(value: &LiteralValue) -> (String, u8) {
    let text = match value {
        LiteralValue::Int(value) => value.to_string(),
        LiteralValue::Float {
            value,
            force_fraction,
        } => format_float(*value, *force_fraction),
        LiteralValue::Str(value) => format!("{:?}", value),
    };
    // A leading minus binds like a unary operator.
    let level = if text.starts_with('-') {
        precedence::UNARY
    } else {
        precedence::PRIMARY
    };
    (text, level)
}

/// Renders `expression`, parenthesised when it binds looser than `required`.
pub fn gen_expression(compiler: &Compiler, expression: &Expr, required: u8) -> Result<String, Error> {
    let (text, level) = gen_unparenthesised(compiler, expression)?;
    if level < required {
        Ok(format!("({})", text))
    } else {
        Ok(text)
    }
}

/// Renders a comma-separated argument list.
pub fn gen_arguments(compiler: &Compiler, arguments: &[Rc<Expr>]) -> Result<String, Error> {
    Ok(arguments
        .iter()
        .map(|argument| gen_expression(compiler, argument, precedence::ASSIGNMENT))
        .collect::<Result<Vec<_>, Error>>()?
        .join(", "))
}

fn gen_unparenthesised(compiler: &Compiler, expression: &Expr) -> Result<(String, u8), Error> {
    match expression.kind() {
        ExprKind::Literal(value) => Ok(format_literal(value)),
        ExprKind::Identifier(name) => Ok((name.clone(), precedence::PRIMARY)),
        ExprKind::Unary { operator, argument } => {
            let argument = gen_expression(compiler, argument, precedence::UNARY)?;
            let operator = operator.as_str();
            // `- -x` must not become a decrement.
            let separator = match operator {
                "-" | "+" if argument.starts_with(operator) => " ",
                _ => "",
            };
            Ok((format!("{}{}{}", operator, separator, argument), precedence::UNARY))
        }
        ExprKind::Binary {
            operator,
            left,
            right,
        } => {
            let level = binary_precedence(*operator);
            let left = gen_expression(compiler, left, level)?;
            let right = gen_expression(compiler, right, level + 1)?;
            Ok((format!("{} {} {}", left, operator.as_str(), right), level))
        }
        ExprKind::Logical {
            operator,
            left,
            right,
        } => {
            let level = match operator.as_str() {
                "&&" => precedence::LOGICAL_AND,
                _ => precedence::LOGICAL_OR,
            };
            let left = gen_expression(compiler, left, level)?;
            let right = gen_expression(compiler, right, level + 1)?;
            Ok((format!("{} {} {}", left, operator.as_str(), right), level))
        }
        ExprKind::Assignment { target, value } => {
            let target = gen_expression(compiler, target, precedence::POSTFIX)?;
            let value = gen_expression(compiler, value, precedence::ASSIGNMENT)?;
            Ok((format!("{} = {}", target, value), precedence::ASSIGNMENT))
        }
        ExprKind::Update {
            operator,
            prefix,
            argument,
        } => {
            let argument = gen_expression(compiler, argument, precedence::POSTFIX)?;
            let operator = match operator {
                UpdateOperator::Increment => "++",
                UpdateOperator::Decrement => "--",
            };
            if *prefix {
                Ok((format!("{}{}", operator, argument), precedence::UNARY))
            } else {
                Ok((format!("{}{}", argument, operator), precedence::POSTFIX))
            }
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            let test = gen_expression(compiler, test, precedence::LOGICAL_OR)?;
            let consequent = gen_expression(compiler, consequent, precedence::ASSIGNMENT)?;
            let alternate = gen_expression(compiler, alternate, precedence::ASSIGNMENT)?;
            Ok((
                format!("{} ? {} : {}", test, consequent, alternate),
                precedence::CONDITIONAL,
            ))
        }
        ExprKind::Call {
            callee, arguments, ..
        } => Ok((
            format!("{}({})", callee, gen_arguments(compiler, arguments)?),
            precedence::MEMBER,
        )),
        ExprKind::Member { object, property } => {
            let object = gen_expression(compiler, object, precedence::MEMBER)?;
            let property = gen_expression(compiler, property, precedence::SEQUENCE)?;
            Ok((format!("{}[{}]", object, property), precedence::MEMBER))
        }
        ExprKind::Sequence(items) => {
            let items = items
                .iter()
                .map(|item| gen_expression(compiler, item, precedence::ASSIGNMENT))
                .collect::<Result<Vec<_>, Error>>()?;
            Ok((items.join(", "), precedence::SEQUENCE))
        }
        ExprKind::NewComposite { buffer, size } => Ok((
            format!(
                "new {}.{}({})",
                compiler.program.stdlib,
                buffer.constructor_name(),
                size
            ),
            precedence::MEMBER,
        )),
        kind @ (ExprKind::ArrayLiteral(_) | ExprKind::Swizzle { .. }) => Err(Error::new(
            ErrorImpl::UnloweredNode {
                node: kind.name().to_string(),
            },
            Position::null(),
        )),
    }
}

/// Renders `value` with the annotation asm.js expects on a returned value of
/// its type.
pub fn gen_annotated(compiler: &Compiler, value: &Expr) -> Result<String, Error> {
    if *value.ty() == Type::Float {
        let argument = gen_expression(compiler, value, precedence::UNARY)?;
        let separator = if argument.starts_with('+') { " " } else { "" };
        return Ok(format!("{}{}{}", UnaryOperator::Plus.as_str(), separator, argument));
    }
    Ok(format!(
        "{} | 0",
        gen_expression(compiler, value, precedence::BITWISE_OR)?
    ))
}
