//! detype: The command-line driver.
//!
//! Usage:
//!   detype <input> [output] [--skip-type-check|-s] [-o <file>]
//!
//! Reads the input file, runs the compiler, writes the output next to the
//! input (`.ts` becomes `.js`) unless a path was given. Exit code 0 on
//! success, 1 otherwise.

use clap::Parser;
use detype_compiler::{compile, format_errors, CompileOptions};
use std::path::Path;
use std::process;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(
    name = "detype",
    about = "detype - compiles the typed dialect to plain script",
    disable_version_flag = true
)]
struct Cli {
    /// Input file to compile.
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output file (defaults to the input with `.ts` replaced by `.js`).
    #[arg(value_name = "OUTPUT")]
    output: Option<String>,

    /// Skip type checking; any program that parses is emitted.
    #[arg(short = 's', long = "skip-type-check")]
    skip_type_check: bool,

    /// Write the output to this path instead.
    #[arg(short = 'o', value_name = "FILE")]
    out_file: Option<String>,
}

// ANSI color codes
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const GRAY: &str = "\x1b[90m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn main() {
    let cli = Cli::parse();
    process::exit(run(&cli));
}

fn run(cli: &Cli) -> i32 {
    let start = Instant::now();

    let source = match std::fs::read_to_string(&cli.input) {
        Ok(source) => source,
        Err(error) => {
            print_error(&format!("Failed to read '{}': {}", cli.input, error));
            return 1;
        }
    };

    let options = CompileOptions {
        skip_type_check: cli.skip_type_check,
        ..Default::default()
    };
    let result = compile(&source, &options);

    let use_color = stderr_is_terminal();
    for diagnostic in &result.errors {
        print_diagnostic(diagnostic, &source, use_color);
    }

    if !result.success {
        let count = result.errors.iter().filter(|d| d.is_error()).count();
        eprintln!(
            "\nFound {} error{}.",
            count,
            if count == 1 { "" } else { "s" }
        );
        return 1;
    }

    let output_path = cli
        .out_file
        .clone()
        .or_else(|| cli.output.clone())
        .unwrap_or_else(|| default_output_path(&cli.input));

    if let Err(error) = std::fs::write(&output_path, result.output.unwrap_or_default()) {
        print_error(&format!("Failed to write '{}': {}", output_path, error));
        return 1;
    }

    if use_color {
        eprintln!(
            "{}Compiled {} -> {} in {:.2?}.{}",
            GRAY, cli.input, output_path, start.elapsed(), RESET
        );
    }

    0
}

/// The input path with a trailing `.ts` replaced by `.js`.
fn default_output_path(input: &str) -> String {
    match input.strip_suffix(".ts") {
        Some(stem) => format!("{}.js", stem),
        None => {
            let path = Path::new(input);
            let stem = path.file_stem().unwrap_or_default().to_string_lossy();
            match path.parent() {
                Some(parent) if parent != Path::new("") => {
                    format!("{}/{}.js", parent.display(), stem)
                }
                _ => format!("{}.js", stem),
            }
        }
    }
}

fn print_diagnostic(diagnostic: &detype_compiler::Diagnostic, source: &str, use_color: bool) {
    if use_color {
        let color = if diagnostic.is_error() { RED } else { YELLOW };
        eprintln!(
            "{}{}{}{} (line {}): {}",
            BOLD, color, diagnostic.severity, RESET, diagnostic.line, diagnostic.message
        );
        if let Some(index) = (diagnostic.line as usize).checked_sub(1) {
            if let Some(text) = source.lines().nth(index) {
                eprintln!("  {}{} | {}{}", GRAY, diagnostic.line, text, RESET);
            }
        }
    } else {
        eprint!(
            "{}",
            format_errors(std::slice::from_ref(diagnostic), Some(source))
        );
    }
}

fn print_error(message: &str) {
    if stderr_is_terminal() {
        eprintln!("{}{}error{}: {}", BOLD, RED, RESET, message);
    } else {
        eprintln!("error: {}", message);
    }
}

fn stderr_is_terminal() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::isatty(2) != 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}
