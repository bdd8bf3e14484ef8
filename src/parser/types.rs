//! Type specifier parsing.
//!
//! A type specifier is an optional precision qualifier followed by one
//! built-in type name. Struct types and samplers are recognised only to be
//! rejected.

use crate::{
    ast::types::Type,
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
};

use super::parser::Parser;

pub fn parse_type(parser: &mut Parser) -> Result<Type, Error> {
    // Precision has no effect on the output.
    if parser.current_token_kind() == TokenKind::PrecisionQualifier {
        parser.advance();
    }

    let position = parser.get_position();
    match parser.current_token_kind() {
        TokenKind::Type => {
            let name = parser.advance().value.clone();
            Type::from_name(&name)
                .ok_or_else(|| Error::new(ErrorImpl::UnknownType { type_: name }, position))
        }
        TokenKind::Identifier => Err(Error::new(
            ErrorImpl::UnknownType {
                type_: parser.current_token().value.clone(),
            },
            position,
        )),
        TokenKind::Struct | TokenKind::Sampler => Err(Error::new(
            ErrorImpl::NotImplemented {
                feature: format!("{} types", parser.current_token().value),
            },
            position,
        )),
        _ => Err(parser.unexpected("expected a type")),
    }
}
