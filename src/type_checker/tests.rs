use std::rc::Rc;

use pretty_assertions::assert_eq;

use crate::{
    ast::{
        ast::Program,
        expressions::{BinaryOperator, Expr, ExprKind, LiteralValue, LogicalOperator},
        types::{ScalarKind, Type},
    },
    compile, compile_to_program,
    errors::errors::{Error, ErrorImpl, ErrorKind},
    CompileOptions, Position,
};

use super::{
    lowering::parse_swizzle,
    stack::CompositeStack,
    symbol_table::{mangle, ScopeKind, Symbol, SymbolTable},
    type_checker::TypeChecker,
};

const VEC2: Type = Type::Vector(ScalarKind::Float, 2);
const VEC3: Type = Type::Vector(ScalarKind::Float, 3);

fn position() -> Position {
    Position::null()
}

fn checker() -> TypeChecker {
    TypeChecker::new(&CompileOptions::default())
}

/// Declares a global variable of type `ty` and returns a reference to it.
fn declare(checker: &mut TypeChecker, name: &str, ty: Type) -> Expr {
    checker
        .declarator(&ty, name, None, None, false, &position())
        .unwrap();
    checker.identifier(name, &position()).unwrap()
}

fn program(source: &str) -> Program {
    compile_to_program(source, &CompileOptions::default()).unwrap()
}

fn error(source: &str) -> Error {
    compile_to_program(source, &CompileOptions::default()).unwrap_err()
}

fn output(source: &str) -> String {
    compile(source, &CompileOptions::default()).unwrap()
}

// SYMBOL TABLE

#[test]
fn test_mangle() {
    assert_eq!(mangle("x", 0, 0, false), "x");
    assert_eq!(mangle("x", 0, 1, false), "x$1");
    assert_eq!(mangle("f", 2, 0, false), "f$2");
    assert_eq!(mangle("var", 0, 0, true), "var$");
}

#[test]
fn test_block_shadowing_counts_enclosing_blocks() {
    let mut table = SymbolTable::new();
    table.enter(ScopeKind::Function);
    let outer = table.declare(Symbol::variable("x", Type::Int), &position()).unwrap();
    table.enter(ScopeKind::Block);
    let inner = table.declare(Symbol::variable("x", Type::Float), &position()).unwrap();
    table.enter(ScopeKind::Block);
    let innermost = table.declare(Symbol::variable("x", Type::Bool), &position()).unwrap();

    assert_eq!(outer.mangled(), "x");
    assert_eq!(inner.mangled(), "x$1");
    assert_eq!(innermost.mangled(), "x$2");
    assert_eq!(table.lookup("x").map(Symbol::mangled), Some("x$2"));

    table.exit();
    table.exit();
    assert_eq!(table.lookup("x").map(Symbol::mangled), Some("x"));
}

#[test]
fn test_locals_never_reuse_a_global_variable_name() {
    let mut table = SymbolTable::new();
    table.declare(Symbol::variable("g", Type::Float), &position()).unwrap();
    table.declare(Symbol::function("f", Vec::new(), Type::Float, true), &position()).unwrap();
    table.enter(ScopeKind::Function);
    let local = table.declare(Symbol::variable("g", Type::Float), &position()).unwrap();
    let escaped = table.declare(Symbol::variable("f", Type::Float), &position()).unwrap();
    table.enter(ScopeKind::Block);
    let inner = table.declare(Symbol::variable("g", Type::Float), &position()).unwrap();

    assert_eq!(local.mangled(), "g$1");
    assert_eq!(escaped.mangled(), "f$");
    assert_eq!(inner.mangled(), "g$2");

    table.exit();
    table.exit();
    assert!(table.is_global());
    assert_eq!(table.lookup("g").map(Symbol::mangled), Some("g"));
}

#[test]
fn test_redeclaration_in_one_scope() {
    let mut table = SymbolTable::new();
    table.declare(Symbol::variable("a", Type::Int), &position()).unwrap();
    let error = table
        .declare(Symbol::variable("a", Type::Float), &position())
        .unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::Redeclaration {
            name: String::from("a")
        }
    );
}

#[test]
fn test_function_overloads_and_prototypes() {
    let mut table = SymbolTable::new();
    let first = table
        .declare(Symbol::function("f", vec![Type::Float], Type::Float, false), &position())
        .unwrap();
    let second = table
        .declare(Symbol::function("f", vec![Type::Int], Type::Float, true), &position())
        .unwrap();
    let merged = table
        .declare(Symbol::function("f", vec![Type::Float], Type::Float, true), &position())
        .unwrap();

    assert_eq!(first.mangled(), "f");
    assert_eq!(second.mangled(), "f$1");
    assert_eq!(merged.mangled(), "f");
    assert_eq!(table.functions_named("f").len(), 2);
    assert_eq!(
        table.find_function("f", &[Type::Int]).map(Symbol::mangled),
        Some("f$1")
    );
}

#[test]
fn test_function_declaration_conflicts() {
    let mut table = SymbolTable::new();
    table
        .declare(Symbol::function("f", vec![Type::Float], Type::Float, true), &position())
        .unwrap();

    let body = table
        .declare(Symbol::function("f", vec![Type::Float], Type::Float, true), &position())
        .unwrap_err();
    assert_eq!(
        body.get_internal(),
        &ErrorImpl::FunctionAlreadyHasBody {
            function: String::from("f")
        }
    );

    let prototype = table
        .declare(Symbol::function("f", vec![Type::Float], Type::Float, false), &position())
        .unwrap_err();
    assert_eq!(
        prototype.get_internal(),
        &ErrorImpl::FunctionAlreadyDeclared {
            function: String::from("f")
        }
    );

    let returns = table
        .declare(Symbol::function("f", vec![Type::Float], Type::Int, true), &position())
        .unwrap_err();
    assert_eq!(
        returns.get_internal(),
        &ErrorImpl::ConflictingReturnType {
            function: String::from("f")
        }
    );
}

#[test]
fn test_functions_only_at_global_scope() {
    let mut table = SymbolTable::new();
    table.enter(ScopeKind::Function);
    let error = table
        .declare(Symbol::function("g", Vec::new(), Type::Void, true), &position())
        .unwrap_err();
    assert_eq!(error.get_kind(), ErrorKind::Scoping);
}

#[test]
fn test_reserved_and_function_names_are_escaped() {
    let output = output("float f() { return 1.0; }\nvoid main() { float f = f(); int var = 1; }");
    assert!(output.contains("var f$ = f();"));
    assert!(output.contains("var var$ = 1;"));
}

// EXPRESSIONS

#[test]
fn test_int_constants_are_inlined() {
    let mut checker = checker();
    checker
        .declarator(&Type::Int, "N", None, Some(Expr::literal_int(4)), true, &position())
        .unwrap();
    assert_eq!(checker.identifier("N", &position()).unwrap(), Expr::literal_int(4));

    let output = output("const int N = 4;\nvoid main() { float a[N]; int b = N + 1; }");
    assert!(output.contains("var a = new stdlib.Float32Array(4);"));
    assert!(output.contains("var b = 4 + 1;"));
}

#[test]
fn test_scalar_default_initializers() {
    let mut checker = checker();
    let float = checker
        .declarator(&Type::Float, "f", None, None, false, &position())
        .unwrap();
    let boolean = checker
        .declarator(&Type::Bool, "b", None, None, false, &position())
        .unwrap();

    assert_eq!(float.init, Expr::literal_float(0.0));
    assert_eq!(boolean.init.kind(), &ExprKind::Literal(LiteralValue::Int(0)));
    assert_eq!(boolean.init.ty(), &Type::Bool);
}

#[test]
fn test_composite_default_is_zero_filled() {
    let mut checker = checker();
    let declarator = checker.declarator(&VEC2, "v", None, None, false, &position()).unwrap();

    let ExprKind::Sequence(items) = declarator.init.kind() else {
        panic!("expected a sequence, got {:?}", declarator.init.kind());
    };
    assert_eq!(items.len(), 3);
    assert_eq!(*items[2], Expr::literal_int(16382));
    assert_eq!(declarator.init.ty(), &VEC2);
    assert_eq!(checker.stack.static_slots(), 2);
}

#[test]
fn test_initializer_type_must_match() {
    let error = error("void main() { int a = 1; float b = a; }");
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::DifferingTypes {
            left: String::from("float"),
            right: String::from("int")
        }
    );
}

#[test]
fn test_undeclared_and_function_identifiers() {
    let error = error("void main() { x = 1; }");
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::VariableNotDeclared {
            variable: String::from("x")
        }
    );

    let error = self::error("float f() { return 1.0; }\nvoid main() { float a = f; }");
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::NotAVariable {
            name: String::from("f")
        }
    );
}

// COMPOSITE LOWERING

#[test]
fn test_vector_scalar_broadcast() {
    let mut checker = checker();
    let v = declare(&mut checker, "v", VEC3);
    let product = checker
        .binary(BinaryOperator::Multiply, v.clone(), Expr::literal_float(2.0), &position())
        .unwrap();

    let ExprKind::ArrayLiteral(components) = product.kind() else {
        panic!("expected components, got {:?}", product.kind());
    };
    assert_eq!(product.ty(), &VEC3);
    assert_eq!(components.len(), 3);

    let base = Rc::new(v);
    let expected = Expr::binary(
        BinaryOperator::Multiply,
        CompositeStack::slot(ScalarKind::Float, CompositeStack::offset(&base, 2)),
        Expr::literal_float(2.0),
        &position(),
    )
    .unwrap();
    assert_eq!(*components[2], expected);
}

#[test]
fn test_vector_equality_folds() {
    let mut checker = checker();
    let a = declare(&mut checker, "a", VEC3);
    let b = declare(&mut checker, "b", VEC3);

    let equal = checker
        .binary(BinaryOperator::Equal, a.clone(), b.clone(), &position())
        .unwrap();
    assert_eq!(equal.ty(), &Type::Bool);
    assert!(matches!(
        equal.kind(),
        ExprKind::Logical {
            operator: LogicalOperator::And,
            ..
        }
    ));

    let not_equal = checker
        .binary(BinaryOperator::NotEqual, a, b, &position())
        .unwrap();
    assert_eq!(not_equal.ty(), &Type::Bool);
    let ExprKind::Logical {
        operator: LogicalOperator::And,
        right,
        ..
    } = not_equal.kind()
    else {
        panic!("expected a folded comparison, got {:?}", not_equal.kind());
    };
    assert!(matches!(
        right.kind(),
        ExprKind::Binary {
            operator: BinaryOperator::NotEqual,
            ..
        }
    ));
}

#[test]
fn test_relational_vectors_are_rejected() {
    let mut checker = checker();
    let a = declare(&mut checker, "a", VEC2);
    let b = declare(&mut checker, "b", VEC2);

    let error = checker
        .binary(BinaryOperator::Less, a, b, &position())
        .unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::NonScalarOperand {
            operator: String::from("<")
        }
    );
    assert_eq!(error.get_kind(), ErrorKind::CompositeMisuse);
}

#[test]
fn test_mismatched_vectors_are_rejected() {
    let mut checker = checker();
    let a = declare(&mut checker, "a", VEC2);
    let b = declare(&mut checker, "b", VEC3);

    let error = checker
        .binary(BinaryOperator::Add, a, b, &position())
        .unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::CompositeTypeMismatch {
            left: String::from("vec2"),
            right: String::from("vec3")
        }
    );
}

#[test]
fn test_parse_swizzle() {
    assert_eq!(parse_swizzle("x", 2), Some(vec![0]));
    assert_eq!(parse_swizzle("bgr", 3), Some(vec![2, 1, 0]));
    assert_eq!(parse_swizzle("stp", 4), Some(vec![0, 1, 2]));
    assert_eq!(parse_swizzle("z", 2), None);
    assert_eq!(parse_swizzle("xg", 4), None);
    assert_eq!(parse_swizzle("xyzwx", 4), None);
    assert_eq!(parse_swizzle("", 4), None);
}

#[test]
fn test_member_selection() {
    let mut checker = checker();
    let v = declare(&mut checker, "v", VEC3);

    let single = checker.member(v.clone(), "y", &position()).unwrap();
    assert_eq!(single.ty(), &Type::Float);
    assert!(matches!(single.kind(), ExprKind::Member { .. }));

    let pair = checker.member(v.clone(), "zx", &position()).unwrap();
    assert_eq!(pair.ty(), &VEC2);

    let error = checker.member(v, "xw", &position()).unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::InvalidSwizzle {
            selector: String::from("xw"),
            type_: String::from("vec3")
        }
    );
}

#[test]
fn test_vector_indexing() {
    let mut checker = checker();
    let v = declare(&mut checker, "v", VEC3);
    let i = declare(&mut checker, "i", Type::Int);

    let constant = checker.index(v.clone(), Expr::literal_int(1), &position()).unwrap();
    let base = Rc::new(v.clone());
    assert_eq!(
        constant,
        CompositeStack::slot(ScalarKind::Float, CompositeStack::offset(&base, 1))
    );

    let dynamic = checker.index(v.clone(), i.clone(), &position()).unwrap();
    assert_eq!(dynamic.ty(), &Type::Float);
    let address = Expr::raw_binary(BinaryOperator::Add, base, Rc::new(i), Type::Int);
    assert_eq!(dynamic, CompositeStack::slot(ScalarKind::Float, Rc::new(address)));

    let error = checker.index(v, Expr::literal_int(3), &position()).unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::InvalidSwizzle {
            selector: String::from("[3]"),
            type_: String::from("vec3")
        }
    );

    let m = declare(&mut checker, "m", Type::Matrix(2));
    let error = checker.index(m, Expr::literal_int(0), &position()).unwrap_err();
    assert_eq!(error.get_kind(), ErrorKind::Unsupported);
}

#[test]
fn test_duplicate_swizzle_write_is_rejected() {
    let sources = [
        "void main() { vec3 v; vec2 w; v.xx = w; }",
        "void main() { vec2 v; vec3 w; v.yxy = w; }",
        "void main() { vec4 v; vec3 w; v.wxw = w; }",
        "void main() { vec4 v; vec2 w; v.aa += w; }",
        "void main() { ivec4 v; ivec3 w; v.xyx = w; }",
        "void main() { ivec2 v; v.ss++; }",
        "void main() { bvec3 v; bvec2 w; v.zz = w; }",
        "void main() { bvec4 v; bvec4 w; v.xyzx = w; }",
    ];
    for source in sources {
        assert_eq!(
            error(source).get_internal(),
            &ErrorImpl::DuplicateSwizzleComponent,
            "{}",
            source
        );
    }

    // Reading the same component twice is fine.
    program("void main() { vec3 v; vec2 w = v.xx; }");
}

#[test]
fn test_self_assignment_needs_no_copy() {
    let program = program("void main() { vec3 v = vec3(1.0, 2.0, 3.0); v = v; }");
    assert_eq!(program.static_slots, 3);
}

#[test]
fn test_permuting_assignment_copies_first() {
    let program = program("void main() { vec3 v = vec3(1.0, 2.0, 3.0); v = v.zyx; }");
    assert_eq!(program.static_slots, 6);
}

#[test]
fn test_effects_keep_source_order() {
    let source = r#"
        vec2 f() { return vec2(1.0, 2.0); }
        void main() { vec2 a; vec2 b = a + f(); }
    "#;
    // a: 2, the call result address: 1, its copy: 2, a copied ahead of the
    // call: 2, b: 2
    assert_eq!(program(source).static_slots, 9);
}

#[test]
fn test_composite_conditional_shares_one_region() {
    let source = "void main() { bool c = true; vec2 a = vec2(1.0); vec2 b = c ? a : vec2(2.0); }";
    assert_eq!(program(source).static_slots, 6);
}

#[test]
fn test_constructors() {
    let mut checker = checker();
    let diagonal = checker
        .construct(Type::Matrix(2), vec![Expr::literal_float(2.0)], &position())
        .unwrap();
    let two = Rc::new(Expr::literal_float(2.0));
    let zero = Rc::new(Expr::literal_float(0.0));
    assert_eq!(
        diagonal,
        Expr::array_literal(vec![two.clone(), zero.clone(), zero, two], Type::Matrix(2))
    );

    let error = checker
        .construct(
            VEC3,
            vec![Expr::literal_float(1.0), Expr::literal_float(2.0)],
            &position(),
        )
        .unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::ConstructorArity {
            type_: String::from("vec3"),
            expected: 3,
            received: 2
        }
    );

    let wide = checker
        .construct(VEC3, vec![Expr::literal_float(1.0)], &position())
        .unwrap();
    let truncated = checker.construct(VEC2, vec![wide], &position()).unwrap();
    assert_eq!(truncated.ty(), &VEC2);
}

#[test]
fn test_scalar_constructor_converts() {
    let mut checker = checker();
    let converted = checker
        .construct(Type::Float, vec![Expr::literal_int(3)], &position())
        .unwrap();
    assert_eq!(converted.ty(), &Type::Float);
}

#[test]
fn test_compound_assignment_expands_per_component() {
    let source = r#"
        void main() {
            vec2 v = vec2(1.0, 2.0);
            vec2 w = vec2(3.0, 4.0);
            vec3 u;
            v += w;
            v *= 2.0;
            u.xy -= w;
        }
    "#;
    let output = output(source);
    assert!(output.contains("$F32[v] = $F32[v] + $F32[w], $F32[v + 1] = $F32[v + 1] + $F32[w + 1]"));
    assert!(output.contains("$F32[v] = $F32[v] * 2.0, $F32[v + 1] = $F32[v + 1] * 2.0"));
    assert!(output.contains("$F32[u] = $F32[u] - $F32[w], $F32[u + 1] = $F32[u + 1] - $F32[w + 1]"));
    // Each component only reads its own slot, so nothing is copied.
    assert_eq!(program(source).static_slots, 7);

    let error = error("void main() { vec2 v; vec3 w; v += w; }");
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::CompositeTypeMismatch {
            left: String::from("vec2"),
            right: String::from("vec3")
        }
    );
}

#[test]
fn test_vector_updates() {
    let output = output("void main() { vec3 v; ++v; v--; ivec2 i; i++; --i.y; }");
    assert!(output.contains("++$F32[v], ++$F32[v + 1], ++$F32[v + 2];"));
    assert!(output.contains("$F32[v]--, $F32[v + 1]--, $F32[v + 2]--;"));
    assert!(output.contains("$I32[i]++, $I32[i + 1]++;"));
    assert!(output.contains("--$I32[i + 1];"));
}

#[test]
fn test_postfix_vector_update_yields_old_values() {
    let source = "void main() { vec3 v = vec3(1.0, 2.0, 3.0); vec3 w = v++; }";
    let output = output(source);
    // v: 16381, the old values: 16378, w: 16375
    assert!(output.contains(
        "$F32[16378] = $F32[v]++, $F32[16379] = $F32[v + 1]++, $F32[16380] = $F32[v + 2]++"
    ));
    assert!(output.contains("$F32[16375] = $F32[16378], $F32[16376] = $F32[16379]"));
    assert_eq!(program(source).static_slots, 9);
}

#[test]
fn test_update_needs_an_addressable_composite() {
    for source in [
        "void main() { vec2(1.0)++; }",
        "void main() { --vec3(1.0); }",
        "void main() { vec2 a; vec2 b; (a + b).xy++; }",
    ] {
        assert_eq!(error(source).get_internal(), &ErrorImpl::NotUpdatable, "{}", source);
    }
}

#[test]
fn test_boolean_update_is_rejected() {
    let error = error("void main() { bool b; b++; }");
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::BooleanUpdate {
            type_: String::from("bool")
        }
    );
}

#[test]
fn test_pure_statements_vanish() {
    let output = output("void main() { float a; a + 1.0; }");
    assert!(!output.contains("a + 1.0"));
}

// CALLS AND FUNCTIONS

#[test]
fn test_overload_resolution() {
    let output = output(
        "float f(float x) { return x; }\nint f(int x) { return x; }\nvoid main() { f(1); f(1.0); }",
    );
    assert!(output.contains("function f$1(x) {"));
    assert!(output.contains("f$1(1);"));
    assert!(output.contains("f(1.0);"));
}

#[test]
fn test_unique_scalar_conversion_is_applied() {
    let output = output("float f(float x) { return x; }\nvoid main() { f(1); }");
    assert!(output.contains("f(+1);"));
}

#[test]
fn test_calling_a_variable() {
    let error = error("void main() { float f = 1.0; f(2.0); }");
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::FunctionNotDeclared {
            function: String::from("f"),
            arguments: String::from("float")
        }
    );
}

#[test]
fn test_prototype_without_definition() {
    let error = error("float f(float x);\nvoid main() { f(1.0); }");
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::FunctionNotDeclared {
            function: String::from("f"),
            arguments: String::from("float")
        }
    );
}

#[test]
fn test_recursion_is_rejected() {
    let error = error("void f() { f(); }\nvoid main() { f(); }");
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::RecursiveCall {
            function: String::from("f")
        }
    );

    let error = self::error("void g();\nvoid f() { g(); }\nvoid g() { f(); }\nvoid main() { f(); }");
    assert!(matches!(error.get_internal(), ErrorImpl::RecursiveCall { .. }));
}

#[test]
fn test_return_checks() {
    let error = error("float f() { return 1; }\nvoid main() {}");
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::ReturnTypeMismatch {
            expected: String::from("float"),
            received: String::from("int")
        }
    );

    let error = self::error("void main() { break; }");
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::OutsideLoop {
            statement: String::from("break")
        }
    );
}

#[test]
fn test_builtin_broadcast() {
    let output = output("void main() { vec2 a = sqrt(vec2(4.0, 9.0)); }");
    assert!(output.contains("$F32[16382] = $sqrt(4.0)"));
    assert!(output.contains("$F32[16383] = $sqrt(9.0)"));

    program("void main() { vec3 a = min(vec3(1.0), 0.5); }");

    let error = error("void main() { vec2 a = pow(vec2(1.0), 2.0); }");
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::DifferingTypes {
            left: String::from("vec2"),
            right: String::from("float")
        }
    );
}

// STORAGE

#[test]
fn test_stack_demand_of_composite_arguments() {
    let source = "float first(vec3 v) { return v.x; }\nvoid main() { float a = first(vec3(1.0, 2.0, 3.0)); }";
    assert_eq!(program(source).stack_slots, 3);
}

#[test]
fn test_stack_demand_of_composite_returns() {
    let source = "vec2 f() { return vec2(1.0, 2.0); }\nvoid main() { vec2 a = f(); }";
    assert_eq!(program(source).stack_slots, 2);
}

#[test]
fn test_heap_exhaustion() {
    let options = CompileOptions {
        heap_size: 16,
        ..CompileOptions::default()
    };
    let error = compile_to_program("void main() { vec4 a; vec2 b; }", &options).unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::HeapExhausted {
            needed: 6,
            available: 4
        }
    );
}

#[test]
fn test_static_reservation_grows_down() {
    let mut stack = CompositeStack::new(64);
    assert_eq!(stack.reserve(4), 12);
    assert_eq!(stack.reserve(2), 10);
    assert_eq!(stack.static_slots(), 6);
    assert!(stack.check_capacity(&position()).is_ok());
}

#[test]
fn test_offset_folds_literal_bases() {
    let base = Rc::new(Expr::literal_int(10));
    assert_eq!(*CompositeStack::offset(&base, 3), Expr::literal_int(13));
    assert!(Rc::ptr_eq(&CompositeStack::offset(&base, 0), &base));
}
