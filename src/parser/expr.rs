use crate::{
    ast::expressions::{BinaryOperator, Expr, LogicalOperator, UnaryOperator, UpdateOperator},
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
};

use super::{lookups::BindingPower, parser::Parser};

pub fn parse_expr(parser: &mut Parser, bp: BindingPower) -> Result<Expr, Error> {
    // First parse NUD
    let token_kind = parser.current_token_kind();
    let Some(nud) = parser.get_nud_handler(token_kind) else {
        return Err(Error::new(
            ErrorImpl::UnexpectedToken {
                token: parser.current_token().value.clone(),
            },
            parser.get_position(),
        ));
    };

    let mut left = nud(parser)?;

    // While LED and current BP is less than BP of current token, continue parsing lhs
    while parser.current_binding_power() > bp {
        let token_kind = parser.current_token_kind();
        let Some(led) = parser.get_led_handler(token_kind) else {
            return Err(Error::new(
                ErrorImpl::UnexpectedToken {
                    token: parser.current_token().value.clone(),
                },
                parser.get_position(),
            ));
        };

        let power = parser.current_binding_power();
        left = led(parser, left, power)?;
    }

    Ok(left)
}

enum Number {
    Int(i64),
    Float(f64),
}

/// Decides between `int` and `float` from the spelling: a fraction or an
/// exponent makes a float, except in hexadecimal.
///
/// Integers must fit the target's 32-bit literals and floats must be finite.
fn parse_number(value: &str) -> Option<Number> {
    let int = if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else if value.contains(['.', 'e', 'E']) {
        return value
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(Number::Float);
    } else {
        value.parse::<u32>().ok()
    };
    int.map(|value| Number::Int(i64::from(value)))
}

pub fn parse_primary_expr(parser: &mut Parser) -> Result<Expr, Error> {
    match parser.current_token_kind() {
        TokenKind::Number => {
            let position = parser.get_position();
            let value = parser.advance().value.clone();
            match parse_number(&value) {
                Some(Number::Int(value)) => Ok(parser.checker.literal_int(value)),
                Some(Number::Float(value)) => Ok(parser.checker.literal_float(value)),
                None => Err(Error::new(ErrorImpl::NumberParseError { token: value }, position)),
            }
        }
        TokenKind::True => {
            parser.advance();
            Ok(parser.checker.literal_bool(true))
        }
        TokenKind::False => {
            parser.advance();
            Ok(parser.checker.literal_bool(false))
        }
        _ => Err(Error::new(
            ErrorImpl::UnexpectedToken {
                token: parser.current_token().value.clone(),
            },
            parser.get_position(),
        )),
    }
}

/// An identifier, a function call or a constructor call.
pub fn parse_name_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let position = parser.get_position();
    let name = parser.advance().clone();

    if parser.current_token_kind() != TokenKind::OpenParen {
        if name.kind == TokenKind::Type {
            return Err(parser.unexpected("expected '(' after type name"));
        }
        return parser.checker.identifier(&name.value, &position);
    }

    parser.advance();
    let mut arguments = vec![];
    // `f(void)` is an empty argument list.
    if parser.current_token().value == "void" && parser.peek_kind(1) == TokenKind::CloseParen {
        parser.advance();
    }
    while parser.current_token_kind() != TokenKind::CloseParen {
        arguments.push(parse_expr(parser, BindingPower::Comma)?);
        if parser.current_token_kind() != TokenKind::CloseParen {
            parser.expect(TokenKind::Comma)?;
        }
    }
    parser.expect(TokenKind::CloseParen)?;

    parser.checker.call(&name.value, arguments, &position)
}

pub fn parse_grouping_expr(parser: &mut Parser) -> Result<Expr, Error> {
    parser.advance();
    let expr = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::CloseParen)?;

    Ok(expr)
}

pub fn parse_prefix_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let position = parser.get_position();
    let operator = parser.advance().kind;
    let argument = parse_expr(parser, BindingPower::Unary)?;

    match operator {
        TokenKind::PlusPlus => parser
            .checker
            .update(UpdateOperator::Increment, true, argument, &position),
        TokenKind::MinusMinus => parser
            .checker
            .update(UpdateOperator::Decrement, true, argument, &position),
        TokenKind::Plus => parser.checker.unary(UnaryOperator::Plus, argument, &position),
        TokenKind::Not => parser.checker.unary(UnaryOperator::Not, argument, &position),
        _ => parser.checker.unary(UnaryOperator::Minus, argument, &position),
    }
}

pub fn parse_postfix_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    let position = parser.get_position();
    let operator = match parser.advance().kind {
        TokenKind::PlusPlus => UpdateOperator::Increment,
        _ => UpdateOperator::Decrement,
    };

    parser.checker.update(operator, false, left, &position)
}

fn binary_operator(kind: TokenKind) -> Option<BinaryOperator> {
    Some(match kind {
        TokenKind::Plus | TokenKind::PlusEquals => BinaryOperator::Add,
        TokenKind::Dash | TokenKind::MinusEquals => BinaryOperator::Subtract,
        TokenKind::Star | TokenKind::StarEquals => BinaryOperator::Multiply,
        TokenKind::Slash | TokenKind::SlashEquals => BinaryOperator::Divide,
        TokenKind::Equals => BinaryOperator::Equal,
        TokenKind::NotEquals => BinaryOperator::NotEqual,
        TokenKind::Less => BinaryOperator::Less,
        TokenKind::LessEquals => BinaryOperator::LessEqual,
        TokenKind::Greater => BinaryOperator::Greater,
        TokenKind::GreaterEquals => BinaryOperator::GreaterEqual,
        _ => return None,
    })
}

pub fn parse_binary_expr(parser: &mut Parser, left: Expr, bp: BindingPower) -> Result<Expr, Error> {
    let position = parser.get_position();
    let operator_token = parser.advance().clone();
    let operator = binary_operator(operator_token.kind).ok_or_else(|| {
        Error::new(
            ErrorImpl::UnexpectedToken {
                token: operator_token.value.clone(),
            },
            position.clone(),
        )
    })?;

    let right = parse_expr(parser, bp)?;

    parser.checker.binary(operator, left, right, &position)
}

pub fn parse_logical_expr(parser: &mut Parser, left: Expr, bp: BindingPower) -> Result<Expr, Error> {
    let position = parser.get_position();
    let operator = match parser.advance().kind {
        TokenKind::And => LogicalOperator::And,
        _ => LogicalOperator::Or,
    };

    let right = parse_expr(parser, bp)?;

    parser.checker.logical(operator, left, right, &position)
}

/// Assignment is right associative: the value is parsed one level below
/// assignment so a chained `a = b = c` nests to the right.
pub fn parse_assignment_expr(parser: &mut Parser, left: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    let position = parser.get_position();
    let operator_token = parser.advance().clone();
    let compound = match operator_token.kind {
        TokenKind::Assignment => None,
        kind => binary_operator(kind),
    };

    let value = parse_expr(parser, BindingPower::Comma)?;

    parser.checker.assign(left, value, compound, &position)
}

pub fn parse_conditional_expr(parser: &mut Parser, test: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    let position = parser.get_position();
    parser.advance();

    let consequent = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::Colon)?;
    let alternate = parse_expr(parser, BindingPower::Comma)?;

    parser.checker.conditional(test, consequent, alternate, &position)
}

pub fn parse_comma_expr(parser: &mut Parser, left: Expr, bp: BindingPower) -> Result<Expr, Error> {
    parser.advance();
    let right = parse_expr(parser, bp)?;

    Ok(parser.checker.sequence(vec![left, right]))
}

pub fn parse_member_expr(parser: &mut Parser, object: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    let position = parser.get_position();
    parser.advance();

    let error = parser.unexpected("expected field selection after '.'");
    let field = parser.expect_error(TokenKind::Identifier, Some(error))?;

    parser.checker.member(object, &field.value, &position)
}

pub fn parse_index_expr(parser: &mut Parser, object: Expr, _bp: BindingPower) -> Result<Expr, Error> {
    let position = parser.get_position();
    parser.advance();

    let index = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::CloseBracket)?;

    parser.checker.index(object, index, &position)
}
