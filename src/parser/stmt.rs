use crate::{
    ast::{
        expressions::Expr,
        statements::{Parameter, Stmt},
        types::Type,
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::{Token, TokenKind},
    parser::{expr::parse_expr, lookups::BindingPower},
    type_checker::symbol_table::{ScopeEvent, ScopeKind},
    Position,
};

use super::{parser::Parser, types::parse_type};

pub fn parse_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    // A statement starting with a constructor call is an expression.
    let constructor =
        parser.current_token_kind() == TokenKind::Type && parser.peek_kind(1) == TokenKind::OpenParen;
    if !constructor {
        if let Some(handler) = parser.get_stmt_handler(parser.current_token_kind()) {
            return handler(parser);
        }
    }

    let expr = parse_expr(parser, BindingPower::Default)?;

    parser.expect(TokenKind::Semicolon)?;

    Ok(parser.checker.expression_stmt(expr))
}

/// Only declarations may appear outside a function.
pub fn parse_global_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let declaration = parser.current_token().is_one_of(&[
        TokenKind::Const,
        TokenKind::Type,
        TokenKind::PrecisionQualifier,
        TokenKind::Precision,
        TokenKind::StorageQualifier,
        TokenKind::Struct,
        TokenKind::Sampler,
        TokenKind::Semicolon,
    ]);
    if !declaration {
        return Err(parser.unexpected("expected a declaration"));
    }

    parse_stmt(parser)
}

pub fn parse_empty_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    parser.advance();
    Ok(parser.checker.block_stmt(vec![]))
}

/// `precision mediump float;` is accepted and dropped.
pub fn parse_precision_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    parser.advance();
    parser.expect(TokenKind::PrecisionQualifier)?;
    parse_type(parser)?;
    parser.expect(TokenKind::Semicolon)?;

    Ok(parser.checker.block_stmt(vec![]))
}

pub fn parse_unsupported_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let token = parser.current_token();
    let feature = match token.kind {
        TokenKind::StorageQualifier => format!("{} variables", token.value),
        TokenKind::Discard => String::from("discard"),
        _ => format!("{} types", token.value),
    };

    Err(Error::new(
        ErrorImpl::NotImplemented { feature },
        parser.get_position(),
    ))
}

/// A variable declaration or a function prototype/definition. Both start
/// with a type specifier and a name.
pub fn parse_declaration_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.get_position();
    let is_constant = parser.current_token_kind() == TokenKind::Const;
    if is_constant {
        parser.advance();
    }

    let ty = parse_type(parser)?;

    let error = parser.unexpected("expected identifier during declaration");
    let name = parser.expect_error(TokenKind::Identifier, Some(error))?;

    if parser.current_token_kind() == TokenKind::OpenParen && !is_constant {
        return parse_function_decl(parser, ty, name, start);
    }

    parse_var_decl(parser, ty, name, is_constant)
}

fn parse_var_decl(parser: &mut Parser, ty: Type, first: Token, is_constant: bool) -> Result<Stmt, Error> {
    let mut declarators = vec![];
    let mut name = first;

    loop {
        let position = name.span.start.clone();

        let size = if parser.current_token_kind() == TokenKind::OpenBracket {
            parser.advance();
            let size = parse_expr(parser, BindingPower::Default)?;
            parser.expect(TokenKind::CloseBracket)?;
            Some(size)
        } else {
            None
        };

        let init = if parser.current_token_kind() == TokenKind::Assignment {
            parser.advance();
            Some(parse_expr(parser, BindingPower::Comma)?)
        } else {
            None
        };

        if is_constant && init.is_none() {
            return Err(parser.unexpected("expected initializer in constant declaration"));
        }

        // The initializer is built before the name is declared.
        declarators.push(parser.checker.declarator(&ty, &name.value, size, init, is_constant, &position)?);

        if parser.current_token_kind() != TokenKind::Comma {
            break;
        }
        parser.advance();
        let error = parser.unexpected("expected identifier during declaration");
        name = parser.expect_error(TokenKind::Identifier, Some(error))?;
    }

    parser.expect(TokenKind::Semicolon)?;

    Ok(parser.checker.variable_declaration(ty, declarators))
}

fn parse_parameters(parser: &mut Parser) -> Result<Vec<Parameter>, Error> {
    parser.expect(TokenKind::OpenParen)?;

    let mut parameters = vec![];
    if parser.current_token().value == "void" && parser.peek_kind(1) == TokenKind::CloseParen {
        parser.advance();
    }

    while parser.current_token_kind() != TokenKind::CloseParen {
        if parser.current_token().is_one_of(&[TokenKind::ParameterQualifier, TokenKind::Const]) {
            return Err(Error::new(
                ErrorImpl::NotImplemented {
                    feature: format!("'{}' parameters", parser.current_token().value),
                },
                parser.get_position(),
            ));
        }

        let ty = parse_type(parser)?;
        let name = if parser.current_token_kind() == TokenKind::Identifier {
            parser.advance().value.clone()
        } else {
            // Unnamed parameters still occupy an argument slot.
            format!("$p{}", parameters.len())
        };
        if parser.current_token_kind() == TokenKind::OpenBracket {
            return Err(Error::new(
                ErrorImpl::NotImplemented {
                    feature: String::from("array parameters"),
                },
                parser.get_position(),
            ));
        }
        parameters.push(Parameter { name, ty });

        if parser.current_token_kind() != TokenKind::CloseParen {
            parser.expect(TokenKind::Comma)?;
        }
    }

    parser.expect(TokenKind::CloseParen)?;
    Ok(parameters)
}

fn parse_function_decl(parser: &mut Parser, return_type: Type, name: Token, start: Position) -> Result<Stmt, Error> {
    if !parser.checker.is_global_scope() {
        return Err(Error::new(
            ErrorImpl::GlobalScopeOnly {
                construct: String::from("function declaration"),
            },
            start,
        ));
    }

    let parameters = parse_parameters(parser)?;

    if parser.current_token_kind() == TokenKind::Semicolon {
        parser.advance();
        parser
            .checker
            .begin_function(&name.value, return_type, parameters, false, &start)?;
        return parser.checker.function_declaration(None, &start);
    }

    parser
        .checker
        .begin_function(&name.value, return_type, parameters, true, &start)?;

    // The body shares the scope the parameters were declared in.
    parser.expect(TokenKind::OpenCurly)?;
    let mut body = vec![];
    while parser.has_tokens() && parser.current_token_kind() != TokenKind::CloseCurly {
        body.push(parse_stmt(parser)?);
    }
    parser.expect(TokenKind::CloseCurly)?;

    parser.checker.function_declaration(Some(body), &start)
}

pub fn parse_block_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    parser.expect(TokenKind::OpenCurly)?;
    parser.checker.declare_scope(ScopeEvent::Enter(ScopeKind::Block));

    let mut body = vec![];
    while parser.has_tokens() && parser.current_token_kind() != TokenKind::CloseCurly {
        body.push(parse_stmt(parser)?);
    }

    parser.expect(TokenKind::CloseCurly)?;
    parser.checker.declare_scope(ScopeEvent::Exit);

    Ok(parser.checker.block_stmt(body))
}

fn parse_condition(parser: &mut Parser) -> Result<Expr, Error> {
    parser.expect(TokenKind::OpenParen)?;
    let test = parse_expr(parser, BindingPower::Default)?;
    parser.expect(TokenKind::CloseParen)?;
    Ok(test)
}

pub fn parse_if_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let test = parse_condition(parser)?;
    let consequent = parse_stmt(parser)?;

    let alternate = if parser.current_token_kind() == TokenKind::Else {
        parser.advance();
        Some(parse_stmt(parser)?)
    } else {
        None
    };

    parser.checker.if_stmt(test, consequent, alternate, &start)
}

/// Parses a loop body with `break` and `continue` allowed.
fn parse_loop_body(parser: &mut Parser) -> Result<Stmt, Error> {
    parser.checker.begin_loop();
    let body = parse_stmt(parser);
    parser.checker.end_loop();
    body
}

pub fn parse_while_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let test = parse_condition(parser)?;
    let body = parse_loop_body(parser)?;

    parser.checker.while_stmt(test, body, &start)
}

pub fn parse_do_while_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let body = parse_loop_body(parser)?;
    parser.expect(TokenKind::While)?;
    let test = parse_condition(parser)?;
    parser.expect(TokenKind::Semicolon)?;

    parser.checker.do_while_stmt(body, test, &start)
}

/// `for (init; test; update) body`. Variables declared in `init` are scoped
/// to the loop.
pub fn parse_for_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();
    parser.expect(TokenKind::OpenParen)?;
    parser.checker.declare_scope(ScopeEvent::Enter(ScopeKind::Block));

    let init = if parser.current_token_kind() == TokenKind::Semicolon {
        parser.advance();
        None
    } else {
        Some(parse_stmt(parser)?)
    };

    let test = if parser.current_token_kind() == TokenKind::Semicolon {
        None
    } else {
        Some(parse_expr(parser, BindingPower::Default)?)
    };
    parser.expect(TokenKind::Semicolon)?;

    let update = if parser.current_token_kind() == TokenKind::CloseParen {
        None
    } else {
        Some(parse_expr(parser, BindingPower::Default)?)
    };
    parser.expect(TokenKind::CloseParen)?;

    let body = parse_loop_body(parser)?;
    parser.checker.declare_scope(ScopeEvent::Exit);

    parser.checker.for_stmt(init, test, update, body, &start)
}

pub fn parse_break_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();
    parser.expect(TokenKind::Semicolon)?;

    parser.checker.break_stmt(&start)
}

pub fn parse_continue_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();
    parser.expect(TokenKind::Semicolon)?;

    parser.checker.continue_stmt(&start)
}

pub fn parse_return_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let value = if parser.current_token_kind() == TokenKind::Semicolon {
        None
    } else {
        Some(parse_expr(parser, BindingPower::Default)?)
    };
    parser.expect(TokenKind::Semicolon)?;

    parser.checker.return_stmt(value, &start)
}
