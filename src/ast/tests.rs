use std::rc::Rc;

use pretty_assertions::assert_eq;

use crate::{
    ast::{
        ast::Typed,
        expressions::{
            BinaryOperator, Expr, ExprKind, LiteralValue, LogicalOperator, UnaryOperator,
            UpdateOperator,
        },
        statements::{FunctionDeclaration, Stmt},
        types::{BufferKind, ScalarKind, Type},
    },
    errors::errors::ErrorImpl,
    Position,
};

fn position() -> Position {
    Position::null()
}

fn float_var(name: &str) -> Expr {
    Expr::identifier(name, Type::Float)
}

fn int_var(name: &str) -> Expr {
    Expr::identifier(name, Type::Int)
}

#[test]
fn test_type_names() {
    assert_eq!(Type::from_name("vec3"), Some(Type::Vector(ScalarKind::Float, 3)));
    assert_eq!(Type::from_name("ivec2"), Some(Type::Vector(ScalarKind::Int, 2)));
    assert_eq!(Type::from_name("mat4"), Some(Type::Matrix(4)));
    assert_eq!(Type::from_name("sampler2D"), None);

    assert_eq!(Type::Vector(ScalarKind::Bool, 4).to_string(), "bvec4");
    assert_eq!(Type::Vector(ScalarKind::Float, 2).to_string(), "vec2");
    assert_eq!(Type::Matrix(3).to_string(), "mat3");
    assert_eq!(Type::array(Type::Int, 8).to_string(), "int[8]");
}

#[test]
fn test_type_shapes() {
    assert_eq!(Type::Float.element_count(), 1);
    assert_eq!(Type::Vector(ScalarKind::Int, 3).element_count(), 3);
    assert_eq!(Type::Matrix(3).element_count(), 9);
    assert_eq!(Type::array(Type::Float, 5).element_count(), 5);
    assert_eq!(Type::Void.element_count(), 0);

    assert_eq!(Type::Matrix(2).component_type(), Type::Float);
    assert_eq!(Type::Vector(ScalarKind::Bool, 2).component_type(), Type::Bool);
    assert_eq!(Type::array(Type::Int, 2).component_type(), Type::Int);

    assert!(Type::vector(ScalarKind::Float, 5).is_none());
    assert!(Type::matrix(1).is_none());
    assert_eq!(Type::matrix(2), Some(Type::Matrix(2)));
}

#[test]
fn test_type_classification() {
    let floats = Type::array(Type::Float, 4);
    assert!(floats.is_array());
    assert!(floats.is_scalar());
    assert!(!floats.is_composite());

    let vector = Type::Vector(ScalarKind::Int, 2);
    assert!(vector.is_vector());
    assert!(vector.is_composite());
    assert!(vector.is_numeric());

    assert!(Type::Matrix(2).is_matrix());
    assert!(!Type::Vector(ScalarKind::Bool, 3).is_numeric());
    assert_eq!(Type::Void.scalar_kind(), None);
}

#[test]
fn test_booleans_share_the_integer_buffer() {
    assert_eq!(ScalarKind::Bool.buffer(), BufferKind::Int);
    assert_eq!(ScalarKind::Int.buffer(), BufferKind::Int);
    assert_eq!(ScalarKind::Float.buffer(), BufferKind::Float);
    assert_eq!(BufferKind::Float.constructor_name(), "Float32Array");
}

#[test]
fn test_bool_literal_is_typed_int_value() {
    let literal = Expr::literal_bool(true);
    assert_eq!(literal.kind(), &ExprKind::Literal(LiteralValue::Int(1)));
    assert_eq!(literal.ty(), &Type::Bool);
}

#[test]
fn test_float_literal_forces_fraction() {
    assert_eq!(
        Expr::literal_float(2.0).kind(),
        &ExprKind::Literal(LiteralValue::Float {
            value: 2.0,
            force_fraction: true
        })
    );
    assert_eq!(
        Expr::literal_float(0.5).kind(),
        &ExprKind::Literal(LiteralValue::Float {
            value: 0.5,
            force_fraction: false
        })
    );
}

#[test]
fn test_binary_result_types() {
    let sum = Expr::binary(BinaryOperator::Add, float_var("a"), float_var("b"), &position()).unwrap();
    assert_eq!(sum.ty(), &Type::Float);

    let less = Expr::binary(BinaryOperator::Less, int_var("i"), int_var("j"), &position()).unwrap();
    assert_eq!(less.ty(), &Type::Bool);

    let equal = Expr::binary(
        BinaryOperator::Equal,
        Expr::literal_bool(true),
        Expr::literal_bool(false),
        &position(),
    )
    .unwrap();
    assert_eq!(equal.ty(), &Type::Bool);
}

#[test]
fn test_binary_rejects_mixed_types() {
    let error = Expr::binary(BinaryOperator::Add, int_var("i"), float_var("f"), &position()).unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::DifferingTypes {
            left: String::from("int"),
            right: String::from("float")
        }
    );
}

#[test]
fn test_binary_rejects_arrays_and_composites() {
    let array = Expr::identifier("a", Type::array(Type::Float, 2));
    let error = Expr::binary(BinaryOperator::Add, array.clone(), array, &position()).unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::ArrayOperand {
            operator: String::from("+")
        }
    );

    let vector = Expr::identifier("v", Type::Vector(ScalarKind::Float, 2));
    let error = Expr::binary(BinaryOperator::Add, vector.clone(), vector, &position()).unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::NonScalarOperand {
            operator: String::from("+")
        }
    );
}

#[test]
fn test_arithmetic_on_bool_is_rejected() {
    let error = Expr::binary(
        BinaryOperator::Multiply,
        Expr::literal_bool(true),
        Expr::literal_bool(true),
        &position(),
    )
    .unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::InvalidOperandType {
            operator: String::from("*"),
            type_: String::from("bool")
        }
    );
}

#[test]
fn test_unary_operand_checks() {
    let not = Expr::unary(UnaryOperator::Not, Expr::literal_bool(false), &position()).unwrap();
    assert_eq!(not.ty(), &Type::Bool);

    let error = Expr::unary(UnaryOperator::Not, int_var("i"), &position()).unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::InvalidOperandType {
            operator: String::from("!"),
            type_: String::from("int")
        }
    );
}

#[test]
fn test_logical_requires_bool() {
    let error = Expr::logical(LogicalOperator::And, int_var("i"), Expr::literal_bool(true), &position())
        .unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::LogicalOperands {
            operator: String::from("&&")
        }
    );
}

#[test]
fn test_assignment_targets() {
    let assignment = Expr::assignment(float_var("x"), Expr::literal_float(1.0), &position()).unwrap();
    assert!(assignment.has_effects());

    let error = Expr::assignment(Expr::literal_int(1), Expr::literal_int(2), &position()).unwrap_err();
    assert_eq!(error.get_internal(), &ErrorImpl::NotAssignable);
}

#[test]
fn test_update_checks() {
    let error = Expr::update(UpdateOperator::Increment, false, Expr::literal_int(1), &position())
        .unwrap_err();
    assert_eq!(error.get_internal(), &ErrorImpl::NotUpdatable);

    let error = Expr::update(
        UpdateOperator::Decrement,
        true,
        Expr::identifier("b", Type::Bool),
        &position(),
    )
    .unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::BooleanUpdate {
            type_: String::from("bool")
        }
    );
}

#[test]
fn test_conditional_branches_must_agree() {
    let error = Expr::conditional(
        Expr::literal_bool(true),
        Expr::literal_int(1),
        Expr::literal_float(1.0),
        &position(),
    )
    .unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::BranchTypeMismatch {
            consequent: String::from("int"),
            alternate: String::from("float")
        }
    );

    let error = Expr::conditional(
        Expr::literal_int(1),
        Expr::literal_int(1),
        Expr::literal_int(2),
        &position(),
    )
    .unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::BooleanExpected {
            received: String::from("int")
        }
    );
}

#[test]
fn test_array_member_access() {
    let array = Expr::identifier("values", Type::array(Type::Float, 4));
    let element = Expr::member(array.clone(), Expr::literal_int(2), &position()).unwrap();
    assert_eq!(element.ty(), &Type::Float);

    let error = Expr::member(array, Expr::literal_float(2.0), &position()).unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::IndexNotInteger {
            received: String::from("float")
        }
    );

    let error = Expr::member(float_var("x"), Expr::literal_int(0), &position()).unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::NotIndexable {
            type_: String::from("float")
        }
    );
}

#[test]
fn test_conversions() {
    let to_float = Expr::convert(int_var("i"), &Type::Float, &position()).unwrap();
    assert!(matches!(
        to_float.kind(),
        ExprKind::Unary {
            operator: UnaryOperator::Plus,
            ..
        }
    ));

    // float -> int truncates with a double bitwise not
    let to_int = Expr::convert(float_var("f"), &Type::Int, &position()).unwrap();
    let ExprKind::Unary {
        operator: UnaryOperator::BitNot,
        argument,
    } = to_int.kind()
    else {
        panic!("expected ~~f, got {:?}", to_int.kind());
    };
    assert!(matches!(
        argument.kind(),
        ExprKind::Unary {
            operator: UnaryOperator::BitNot,
            ..
        }
    ));
    assert_eq!(to_int.ty(), &Type::Int);

    let bool_to_int = Expr::convert(Expr::literal_bool(true), &Type::Int, &position()).unwrap();
    assert!(matches!(
        bool_to_int.kind(),
        ExprKind::Binary {
            operator: BinaryOperator::BitOr,
            ..
        }
    ));

    let to_bool = Expr::convert(float_var("f"), &Type::Bool, &position()).unwrap();
    assert_eq!(
        to_bool,
        Expr::binary(
            BinaryOperator::NotEqual,
            float_var("f"),
            Expr::literal_float(0.0),
            &position()
        )
        .unwrap()
    );

    let same = Expr::convert(int_var("i"), &Type::Int, &position()).unwrap();
    assert_eq!(same, int_var("i"));
}

#[test]
fn test_conversion_to_composite_is_unsupported() {
    let error = Expr::convert(
        float_var("f"),
        &Type::Vector(ScalarKind::Float, 2),
        &position(),
    )
    .unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::UnsupportedConversion {
            type_: String::from("vec2")
        }
    );
}

#[test]
fn test_effects_tracking() {
    let call = Expr::call("f", Vec::new(), Type::Float);
    let intrinsic = Expr::intrinsic_call("$sqrt", vec![Rc::new(Expr::literal_float(4.0))], Type::Float);
    assert!(call.has_effects());
    assert!(!intrinsic.has_effects());

    let sum = Expr::binary(BinaryOperator::Add, call, intrinsic, &position()).unwrap();
    assert!(sum.has_effects());
    assert!(!Expr::binary(BinaryOperator::Add, float_var("a"), float_var("b"), &position())
        .unwrap()
        .has_effects());
}

#[test]
fn test_int_constant_folding() {
    let expr = Expr::binary(
        BinaryOperator::Multiply,
        Expr::binary(
            BinaryOperator::Add,
            Expr::literal_int(2),
            Expr::literal_int(3),
            &position(),
        )
        .unwrap(),
        Expr::literal_int(4),
        &position(),
    )
    .unwrap();
    assert_eq!(expr.as_int_constant(), Some(20));
    assert_eq!(int_var("n").as_int_constant(), None);
    assert_eq!(Expr::literal_float(1.0).as_int_constant(), None);
}

#[test]
fn test_int_constant_folding_stops_on_overflow() {
    let minimum = Expr::literal_int(i64::MIN);
    let negated = Expr::unary(UnaryOperator::Minus, minimum, &position()).unwrap();
    assert_eq!(negated.as_int_constant(), None);

    let sum = Expr::binary(
        BinaryOperator::Add,
        Expr::literal_int(i64::MAX),
        Expr::literal_int(1),
        &position(),
    )
    .unwrap();
    assert_eq!(sum.as_int_constant(), None);

    let negative = Expr::unary(UnaryOperator::Minus, Expr::literal_int(7), &position()).unwrap();
    assert_eq!(negative.as_int_constant(), Some(-7));
}

#[test]
fn test_new_composite_type() {
    let array = Expr::new_composite(BufferKind::Float, 3, Type::Float);
    assert_eq!(array.ty(), &Type::array(Type::Float, 3));
    assert_eq!(array.element_count(), 3);
}

#[test]
fn test_statement_conditions() {
    let error = Stmt::while_stmt(Expr::literal_int(1), Stmt::Break, &position()).unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::BooleanExpected {
            received: String::from("int")
        }
    );

    let forever = Stmt::for_stmt(None, None, None, Stmt::Break, &position()).unwrap();
    assert_eq!(forever.name(), "ForStatement");
}

#[test]
fn test_main_must_return_void() {
    let error = FunctionDeclaration::new("main", "main", Vec::new(), Type::Int, None, &position())
        .unwrap_err();
    assert_eq!(error.get_internal(), &ErrorImpl::MainReturnType);

    let function = FunctionDeclaration::new("f", "f$1", Vec::new(), Type::Int, None, &position()).unwrap();
    assert_eq!(function.name, "f$1");
    assert!(function.parameters.is_empty());
}
