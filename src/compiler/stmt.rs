use crate::{
    ast::{
        expressions::Expr,
        statements::{Declarator, FunctionDeclaration, Stmt},
    },
    errors::errors::Error,
};

use super::{
    compiler::Compiler,
    expr::{gen_annotated, gen_expression, precedence},
};

/// Writes `statement` as one or more lines.
pub fn gen_statement(compiler: &mut Compiler, statement: &Stmt) -> Result<(), Error> {
    match statement {
        Stmt::Expression(expression) => {
            let text = gen_expression(compiler, expression, precedence::SEQUENCE)?;
            compiler.line(&format!("{};", text));
        }
        Stmt::If {
            test,
            consequent,
            alternate,
        } => gen_if(compiler, "if", test, consequent, alternate.as_deref())?,
        Stmt::While { test, body } => {
            let test = gen_expression(compiler, test, precedence::SEQUENCE)?;
            compiler.line(&format!("while ({}) {{", test));
            gen_body(compiler, body)?;
            compiler.line("}");
        }
        Stmt::DoWhile { body, test } => {
            compiler.line("do {");
            gen_body(compiler, body)?;
            let test = gen_expression(compiler, test, precedence::SEQUENCE)?;
            compiler.line(&format!("}} while ({});", test));
        }
        Stmt::For {
            init,
            test,
            update,
            body,
        } => {
            let init = match init.as_deref() {
                Some(init) => gen_for_init(compiler, init)?,
                None => String::new(),
            };
            let test = gen_optional(compiler, test.as_ref())?;
            let update = gen_optional(compiler, update.as_ref())?;
            compiler.line(&format!("for ({}; {}; {}) {{", init, test, update));
            gen_body(compiler, body)?;
            compiler.line("}");
        }
        Stmt::Break => compiler.line("break;"),
        Stmt::Continue => compiler.line("continue;"),
        Stmt::Return(None) => compiler.line("return;"),
        Stmt::Return(Some(value)) => {
            let value = gen_annotated(compiler, value)?;
            compiler.line(&format!("return {};", value));
        }
        // Empty blocks stand in for statements with nothing to emit.
        Stmt::Block(body) if body.is_empty() => {}
        Stmt::Block(_) => {
            compiler.line("{");
            gen_body(compiler, statement)?;
            compiler.line("}");
        }
        Stmt::VariableDeclaration { declarators, .. } => {
            let declarators = gen_declarators(compiler, declarators)?;
            compiler.line(&format!("var {};", declarators));
        }
        Stmt::FunctionDeclaration(function) => gen_function(compiler, function)?,
    }
    Ok(())
}

/// Writes the statements of a loop or branch body one level deeper. A block
/// body is unwrapped so it does not get a second pair of braces.
fn gen_body(compiler: &mut Compiler, body: &Stmt) -> Result<(), Error> {
    compiler.indent();
    match body {
        Stmt::Block(statements) => {
            for statement in statements {
                gen_statement(compiler, statement)?;
            }
        }
        statement => gen_statement(compiler, statement)?,
    }
    compiler.dedent();
    Ok(())
}

fn gen_if(
    compiler: &mut Compiler,
    keyword: &str,
    test: &Expr,
    consequent: &Stmt,
    alternate: Option<&Stmt>,
) -> Result<(), Error> {
    let test = gen_expression(compiler, test, precedence::SEQUENCE)?;
    compiler.line(&format!("{} ({}) {{", keyword, test));
    gen_body(compiler, consequent)?;

    match alternate {
        None => compiler.line("}"),
        Some(Stmt::If {
            test,
            consequent,
            alternate,
        }) => gen_if(compiler, "} else if", test, consequent, alternate.as_deref())?,
        Some(alternate) => {
            compiler.line("} else {");
            gen_body(compiler, alternate)?;
            compiler.line("}");
        }
    }
    Ok(())
}

fn gen_optional(compiler: &Compiler, expression: Option<&Expr>) -> Result<String, Error> {
    match expression {
        Some(expression) => gen_expression(compiler, expression, precedence::SEQUENCE),
        None => Ok(String::new()),
    }
}

fn gen_for_init(compiler: &Compiler, init: &Stmt) -> Result<String, Error> {
    match init {
        Stmt::VariableDeclaration { declarators, .. } => {
            Ok(format!("var {}", gen_declarators(compiler, declarators)?))
        }
        Stmt::Expression(expression) => gen_expression(compiler, expression, precedence::SEQUENCE),
        _ => Ok(String::new()),
    }
}

fn gen_declarators(compiler: &Compiler, declarators: &[Declarator]) -> Result<String, Error> {
    Ok(declarators
        .iter()
        .map(|declarator| {
            let init = gen_expression(compiler, &declarator.init, precedence::ASSIGNMENT)?;
            Ok(format!("{} = {}", declarator.name, init))
        })
        .collect::<Result<Vec<_>, Error>>()?
        .join(", "))
}

/// Prototypes produce no output.
fn gen_function(compiler: &mut Compiler, function: &FunctionDeclaration) -> Result<(), Error> {
    let Some(body) = &function.body else {
        return Ok(());
    };

    let parameters = function
        .parameters
        .iter()
        .map(|parameter| parameter.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    compiler.line(&format!("function {}({}) {{", function.name, parameters));
    compiler.indent();
    for statement in body {
        gen_statement(compiler, statement)?;
    }
    compiler.dedent();
    compiler.line("}");
    Ok(())
}
