//! Main emitter module.
//!
//! This module contains the core Compiler structure that renders a finished
//! [`Program`] as asm.js-flavoured JavaScript. The program is wrapped in a
//! module function taking the host standard library, a foreign object and the
//! heap, and the wrapper is immediately applied to fresh host values.

use crate::{ast::ast::Program, errors::errors::Error, CompileOptions};

use super::{
    expr::{gen_expression, precedence},
    stmt::gen_statement,
};

/// The state of one rendering pass.
pub struct Compiler<'a> {
    /// The program being rendered
    pub program: &'a Program,
    /// Text produced so far
    output: String,
    /// One level of indentation
    indent_unit: String,
    /// Current indentation depth
    level: usize,
}

impl<'a> Compiler<'a> {
    pub fn new(program: &'a Program, options: &CompileOptions) -> Self {
        Compiler {
            program,
            output: String::new(),
            indent_unit: " ".repeat(options.indent),
            level: 0,
        }
    }

    /// Appends one line at the current indentation.
    pub fn line(&mut self, text: &str) {
        if text.is_empty() {
            self.output.push('\n');
            return;
        }
        for _ in 0..self.level {
            self.output.push_str(&self.indent_unit);
        }
        self.output.push_str(text);
        self.output.push('\n');
    }

    pub fn indent(&mut self) {
        self.level += 1;
    }

    pub fn dedent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn gen_wrapper(&mut self) -> Result<(), Error> {
        let program = self.program;
        self.line(&format!(
            "var {} = (function ({}, {}, {}) {{",
            program.module_name, program.stdlib, program.foreign, program.heap
        ));
        self.indent();

        let directive = gen_expression(self, &program.directive, precedence::SEQUENCE)?;
        self.line(&format!("{};", directive));

        for import in &program.imports {
            self.line(&format!(
                "var {} = {}.{};",
                import.name, program.stdlib, import.path
            ));
        }
        for view in &program.views {
            self.line(&format!(
                "var {} = new {}.{}({});",
                view.name,
                program.stdlib,
                view.buffer.constructor_name(),
                program.heap
            ));
        }
        self.line(&format!("var {} = 0;", program.stack_pointer));

        for statement in &program.body {
            gen_statement(self, statement)?;
        }

        let exports = program
            .exports
            .iter()
            .map(|(exported, local)| format!("{}: {}", exported, local))
            .collect::<Vec<_>>()
            .join(", ");
        self.line(&format!("return {{ {} }};", exports));

        self.dedent();
        let constructors = program
            .views
            .iter()
            .map(|view| {
                let name = view.buffer.constructor_name();
                format!("{}: {}", name, name)
            })
            .collect::<Vec<_>>()
            .join(", ");
        self.line(&format!(
            "}})({{ Math: Math, {} }}, {{}}, new ArrayBuffer({}));",
            constructors, program.heap_size
        ));
        Ok(())
    }
}

/// Renders `program` as JavaScript source text.
#[tracing::instrument(level = "debug", skip_all, fields(module = %program.module_name))]
pub fn compile(program: &Program, options: &CompileOptions) -> Result<String, Error> {
    let mut compiler = Compiler::new(program, options);
    compiler.gen_wrapper()?;

    let output = compiler.finish();
    tracing::debug!(bytes = output.len(), "emitted module");
    Ok(output)
}
