#![allow(clippy::module_inception)]

use std::{rc::Rc, sync::Once};

use serde::Serialize;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{
    ast::ast::Program,
    errors::errors::{Error, ErrorTip},
    lexer::lexer::tokenize,
    parser::parser::parse,
    type_checker::type_checker::TypeChecker,
};

pub mod ast;
pub mod compiler;
pub mod errors;
pub mod lexer;
pub mod macros;
pub mod parser;
pub mod type_checker;

extern crate regex;

/// A point in the source: byte offset, 1-based line and file name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub offset: u32,
    pub line: u32,
    pub file: Rc<String>,
}

impl Position {
    pub fn new(offset: u32, line: u32, file: Rc<String>) -> Self {
        Position { offset, line, file }
    }

    pub fn null() -> Self {
        Position::new(0, 1, Rc::new(String::from("<null>")))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

/// Settings for one compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    /// Name used in positions and diagnostics.
    pub file_name: String,
    /// Name of the variable the generated module is bound to.
    pub module_name: String,
    /// Size in bytes of the heap handed to the module.
    pub heap_size: usize,
    /// Spaces per indentation level in the output.
    pub indent: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            file_name: String::from("<input>"),
            module_name: String::from("gl"),
            heap_size: 65536,
            indent: 4,
        }
    }
}

static TRACING: Once = Once::new();

/// Installs a `tracing` subscriber filtered by `RUST_LOG`. Does nothing when
/// the variable is unset, and only ever runs once per process.
pub fn init_tracing() {
    TRACING.call_once(|| {
        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true))
            .with(EnvFilter::from_default_env())
            .init();
    });
}

/// Parses and lowers `source` into a finished program tree.
#[tracing::instrument(level = "debug", skip_all, fields(file = %options.file_name))]
pub fn compile_to_program(source: &str, options: &CompileOptions) -> Result<Program, Error> {
    let file = Rc::new(options.file_name.clone());
    let tokens = tokenize(source, file.clone())?;
    tracing::debug!(tokens = tokens.len(), "tokenized");

    let type_checker = TypeChecker::new(options);
    let program = parse(tokens, file, type_checker)?;
    tracing::debug!(
        stack_slots = program.stack_slots,
        static_slots = program.static_slots,
        "lowered"
    );
    Ok(program)
}

/// Compiles `source` all the way to target text.
#[tracing::instrument(level = "debug", skip_all, fields(file = %options.file_name))]
pub fn compile(source: &str, options: &CompileOptions) -> Result<String, Error> {
    let program = compile_to_program(source, options)?;
    compiler::compiler::compile(&program, options)
}

/// Finds the line containing byte `position`.
///
/// Returns the 1-based line number, the line text and the column of the
/// position within that line. Positions past the end map onto the last line.
pub fn get_line_at_position(content: &str, position: u32) -> (usize, String, usize) {
    let pos = position as usize;
    let mut start = 0;
    let mut line_number = 1;
    let mut last = (1, String::new(), 0);

    for line in content.split_inclusive('\n') {
        let end = start + line.len();

        if (start..end).contains(&pos) {
            return (line_number, line.to_string(), pos - start);
        }

        last = (line_number, line.to_string(), line.trim_end().len());
        start = end;
        line_number += 1;
    }

    last
}

pub fn format_error(error: &Error, source: &str) -> String {
    /*
        error: message
        -> shader.frag
           |
        20 | float a = #;
           | ----------^
    */

    let position = error.get_position();
    let (line, line_text, line_pos) = get_line_at_position(source, position.offset);

    let line_string = line.to_string();
    let padding = line_string.len() + 2;

    let mut output = String::new();
    if let ErrorTip::None = error.get_tip() {
        output.push_str(&format!("Error: {}\n", error));
    } else {
        output.push_str(&format!("Error: {} ({})\n", error, error.get_tip()));
    }
    output.push_str(&format!("-> {}\n", position.file));
    output.push_str(&format!("{:>padding$}\n", "|"));

    let (line_text_removed, removed_whitespace) = remove_starting_whitespace(&line_text);
    output.push_str(&format!("{} | {}\n", line_string, line_text_removed.trim_end()));

    let arrows = line_pos.saturating_sub(removed_whitespace) + 1;
    output.push_str(&format!("{:>padding$} {:->arrows$}\n", "|", "^"));
    output
}

fn remove_starting_whitespace(string: &str) -> (String, usize) {
    let start = string
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .count();

    (String::from(&string[start..]), start)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "void main() {\n    float a;\n    a = 1.0;\n}\n";

    #[test]
    fn test_get_line_at_position() {
        let (line_number, line, line_pos) = get_line_at_position(SOURCE, 5);
        assert_eq!(line_number, 1);
        assert_eq!(line, "void main() {\n");
        assert_eq!(line_pos, 5);

        let (line_number, line, line_pos) = get_line_at_position(SOURCE, 33);
        assert_eq!(line_number, 3);
        assert_eq!(line, "    a = 1.0;\n");
        assert_eq!(line_pos, 6);
    }

    #[test]
    fn test_get_line_past_end() {
        let (line_number, _, _) = get_line_at_position(SOURCE, 500);
        assert_eq!(line_number, 4);
    }

    #[test]
    fn test_format_error_points_at_column() {
        let error = compile("void main() {\n    float a = @;\n}\n", &CompileOptions::default())
            .unwrap_err();
        let rendered = format_error(&error, "void main() {\n    float a = @;\n}\n");

        assert!(rendered.starts_with("Error: unrecognised token"));
        assert!(rendered.contains("2 | float a = @;"));
        assert!(rendered.ends_with("  | ----------^\n"));
    }

    #[test]
    fn test_default_options() {
        let options = CompileOptions::default();
        assert_eq!(options.module_name, "gl");
        assert_eq!(options.heap_size, 65536);
    }
}
