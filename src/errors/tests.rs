//! Unit tests for error handling.
//!
//! This module contains tests for error types and error reporting.

use std::rc::Rc;

use pretty_assertions::assert_eq;

use crate::errors::errors::{Error, ErrorImpl, ErrorKind, ErrorTip};
use crate::Position;

fn position(offset: u32, line: u32) -> Position {
    Position::new(offset, line, Rc::new("test.glsl".to_string()))
}

#[test]
fn test_error_creation() {
    let error = Error::new(
        ErrorImpl::UnrecognisedToken {
            token: "@".to_string(),
        },
        position(10, 1),
    );

    assert_eq!(error.get_error_name(), "UnrecognisedToken");
    assert_eq!(error.get_kind(), ErrorKind::Syntax);
}

#[test]
fn test_error_position_and_line() {
    let error = Error::new(ErrorImpl::NotAssignable, position(42, 3));

    assert_eq!(error.get_position().offset, 42);
    assert_eq!(error.get_line(), 3);
    assert_eq!(error.to_string(), "cannot assign to a non-identifier on line 3");
}

#[test]
fn test_unexpected_token_tip() {
    let error = Error::new(
        ErrorImpl::UnexpectedToken {
            token: "}".to_string(),
        },
        position(0, 1),
    );

    match error.get_tip() {
        ErrorTip::Suggestion(message) => assert!(message.contains("semicolon")),
        ErrorTip::None => panic!("expected a suggestion"),
    }
}

#[test]
fn test_messages_name_the_offending_types() {
    let error = ErrorImpl::DifferingTypes {
        left: "float".to_string(),
        right: "int".to_string(),
    };
    assert_eq!(
        error.to_string(),
        "left and right arguments are of differing types (float and int)"
    );

    let error = ErrorImpl::ConstructorArity {
        type_: "vec3".to_string(),
        expected: 3,
        received: 2,
    };
    assert_eq!(
        error.to_string(),
        "wrong number of components for vec3: expected 3, received 2"
    );
}

#[test]
fn test_error_kinds() {
    let cases = [
        (ErrorImpl::NumberParseError { token: "1x".into() }, ErrorKind::Syntax),
        (ErrorImpl::BooleanExpected { received: "int".into() }, ErrorKind::TypeMismatch),
        (
            ErrorImpl::InvalidSwizzle {
                selector: "xq".into(),
                type_: "vec2".into(),
            },
            ErrorKind::CompositeMisuse,
        ),
        (ErrorImpl::DuplicateSwizzleComponent, ErrorKind::Assignability),
        (ErrorImpl::Redeclaration { name: "x".into() }, ErrorKind::Scoping),
        (ErrorImpl::MainHasParameters, ErrorKind::EntryPoint),
        (ErrorImpl::RecursiveCall { function: "f".into() }, ErrorKind::Unsupported),
    ];

    for (error, kind) in cases {
        assert_eq!(error.kind(), kind, "{}", error);
    }
}

#[test]
fn test_tip_display() {
    let error = Error::new(ErrorImpl::NoMainFunction, position(0, 1));
    assert!(error.get_tip().to_string().contains("void main()"));

    let error = Error::new(ErrorImpl::ReturnOutsideFunction, position(0, 1));
    assert_eq!(error.get_tip().to_string(), "");
}
