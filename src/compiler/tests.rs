//! Unit tests for the emitter.

use std::rc::Rc;

use pretty_assertions::assert_eq;

use super::{compiler::compile, expr::format_float};
use crate::{
    ast::{
        expressions::Expr,
        statements::Stmt,
        types::{ScalarKind, Type},
    },
    compile_to_program,
    errors::errors::ErrorImpl,
    CompileOptions,
};

fn emit(source: &str) -> String {
    let options = CompileOptions::default();
    let program = compile_to_program(source, &options).unwrap();
    compile(&program, &options).unwrap()
}

/// The lines of the emitted `main` body, without indentation.
fn main_body(source: &str) -> Vec<String> {
    let output = emit(source);
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("function main("))
        .skip(1)
        .take_while(|line| line.trim() != "}")
        .map(|line| line.trim().to_string())
        .collect()
}

#[test]
fn test_empty_main_wrapper() {
    let expected = r#"var gl = (function (stdlib, foreign, heap) {
    "use asm";
    var $I32 = new stdlib.Int32Array(heap);
    var $F32 = new stdlib.Float32Array(heap);
    var $sp = 0;
    function main() {
    }
    return { main: main };
})({ Math: Math, Int32Array: Int32Array, Float32Array: Float32Array }, {}, new ArrayBuffer(65536));
"#;
    assert_eq!(emit("void main() {}"), expected);
}

#[test]
fn test_module_name_and_indent_options() {
    let options = CompileOptions {
        module_name: String::from("shader"),
        indent: 2,
        heap_size: 4096,
        ..CompileOptions::default()
    };
    let program = compile_to_program("void main() {}", &options).unwrap();
    let output = compile(&program, &options).unwrap();

    assert!(output.starts_with("var shader = (function (stdlib, foreign, heap) {\n  \"use asm\";"));
    assert!(output.ends_with("new ArrayBuffer(4096));\n"));
}

#[test]
fn test_float_formatting() {
    assert_eq!(format_float(1.0, true), "1.0");
    assert_eq!(format_float(0.0, true), "0.0");
    assert_eq!(format_float(0.25, false), "0.25");
    assert_eq!(format_float(-3.0, true), "-3.0");
}

#[test]
fn test_default_initializers() {
    assert_eq!(
        main_body("void main() { int i; float f; bool b; }"),
        vec!["var i = 0;", "var f = 0.0;", "var b = 0;"]
    );
}

#[test]
fn test_precedence_parentheses() {
    assert_eq!(
        main_body("void main() { float a = 1.0; float b = (a + 2.0) * a; float c = a - (a - a); }"),
        vec![
            "var a = 1.0;",
            "var b = (a + 2.0) * a;",
            "var c = a - (a - a);",
        ]
    );
}

#[test]
fn test_unary_minus_spacing() {
    assert_eq!(
        main_body("void main() { int a = 1; int b = - -a; int c = -(--a); }"),
        vec!["var a = 1;", "var b = - -a;", "var c = - --a;"]
    );
}

#[test]
fn test_control_flow_rendering() {
    let source = r#"
        void main() {
            int n = 0;
            for (int i = 0; i < 3; i++) {
                if (i == 1) { continue; } else if (i == 2) break; else n += i;
            }
            while (n > 0) n--;
        }
    "#;
    assert_eq!(
        main_body(source),
        vec![
            "var n = 0;",
            "for (var i = 0; i < 3; i++) {",
            "if (i === 1) {",
            "continue;",
            "} else if (i === 2) {",
            "break;",
            "} else {",
            "n = n + i;",
        ]
    );
}

#[test]
fn test_parameter_annotations_and_returns() {
    let output = emit("float half(float x, int n) { return x / 2.0; }\nint one() { return 1; }\nvoid main() { half(1.0, one()); }");

    assert!(output.contains("    function half(x, n) {\n        x = +x;\n        n = n | 0;\n        return +(x / 2.0);\n    }\n"));
    assert!(output.contains("        return 1 | 0;\n"));
}

#[test]
fn test_prototypes_are_not_emitted() {
    let output = emit("float f(float x);\nvoid main() { f(1.0); }\nfloat f(float x) { return x; }");

    assert_eq!(output.matches("function f(").count(), 1);
}

#[test]
fn test_builtin_import_is_declared() {
    let output = emit("void main() { float r = sqrt(4.0); }");

    assert!(output.contains("    var $sqrt = stdlib.Math.sqrt;\n"));
    assert!(output.contains("var r = $sqrt(4.0);"));
}

#[test]
fn test_array_declaration() {
    assert_eq!(
        main_body("void main() { float values[4]; values[1] = 2.0; }"),
        vec!["var values = new stdlib.Float32Array(4);", "values[1] = 2.0;"]
    );
}

#[test]
fn test_unlowered_node_is_rejected() {
    let options = CompileOptions::default();
    let mut program = compile_to_program("void main() {}", &options).unwrap();
    let component = Rc::new(Expr::literal_float(1.0));
    program.body.push(Stmt::Expression(Expr::array_literal(
        vec![component.clone(), component],
        Type::Vector(ScalarKind::Float, 2),
    )));

    let error = compile(&program, &options).unwrap_err();
    assert_eq!(
        error.get_internal(),
        &ErrorImpl::UnloweredNode {
            node: "ArrayLiteral".to_string()
        }
    );
}
