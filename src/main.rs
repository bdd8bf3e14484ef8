//! Compile a GLSL ES shader into an asm.js module.
//!
//! Usage: `glslasm <INPUT> [-o OUT] [--module-name NAME] [--heap-size BYTES] [--emit js|tree]`

use std::{fs, path::PathBuf, process, time::Instant};

use clap::{Parser, ValueEnum};

use glslasm::{compiler::compiler::compile, compile_to_program, format_error, init_tracing, CompileOptions};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// JavaScript module text
    Js,
    /// The lowered program tree as JSON
    Tree,
}

#[derive(Parser, Debug)]
#[command(name = "glslasm")]
#[command(about = "Lower a GLSL ES shader into a scalar-only asm.js module")]
struct Args {
    /// Shader source file
    input: PathBuf,

    /// Write the output here instead of stdout
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Variable the generated module is bound to
    #[arg(long = "module-name", default_value = "gl")]
    module_name: String,

    /// Heap size in bytes handed to the module
    #[arg(long = "heap-size", default_value_t = 65536)]
    heap_size: usize,

    /// What to write
    #[arg(long = "emit", value_enum, default_value_t = Emit::Js)]
    emit: Emit,
}

fn main() {
    init_tracing();

    let args = Args::parse();
    let start = Instant::now();

    let source = match fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("Failed to read {}: {}", args.input.display(), error);
            process::exit(1);
        }
    };

    let file_name = args
        .input
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| String::from("<input>"));
    let options = CompileOptions {
        file_name,
        module_name: args.module_name.clone(),
        heap_size: args.heap_size,
        ..CompileOptions::default()
    };

    let program = match compile_to_program(&source, &options) {
        Ok(program) => program,
        Err(error) => {
            eprintln!("{}", format_error(&error, &source));
            process::exit(1);
        }
    };

    let output = match args.emit {
        Emit::Js => match compile(&program, &options) {
            Ok(output) => output,
            Err(error) => {
                eprintln!("{}", format_error(&error, &source));
                process::exit(1);
            }
        },
        Emit::Tree => match serde_json::to_string_pretty(&program) {
            Ok(json) => json + "\n",
            Err(error) => {
                eprintln!("Failed to serialize the program tree: {}", error);
                process::exit(1);
            }
        },
    };

    tracing::info!(elapsed = ?start.elapsed(), "compiled {}", args.input.display());

    match &args.output {
        Some(path) => {
            if let Err(error) = fs::write(path, output) {
                eprintln!("Failed to write {}: {}", path.display(), error);
                process::exit(1);
            }
        }
        None => print!("{}", output),
    }
}
