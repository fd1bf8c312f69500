//! detype_compiler: Pipeline orchestration.
//!
//! [`compile`] runs the stages in order — lex, parse, check, emit — and
//! never panics on user input: lexical and syntax faults are lowered to a
//! one-element diagnostic list, checker diagnostics pass through, and a
//! successful run carries the emitted text. The stages are strictly
//! sequential; nothing here suspends or touches the file system.

use bumpalo::Bump;
use detype_checker::check;
use detype_diagnostics::{CompileError, Severity};
use detype_emitter::emit;
use detype_lexer::tokenize;
use detype_parser::parse;

pub use detype_diagnostics::Diagnostic;
pub use detype_lexer::Token;

/// Options accepted by [`compile`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Skip the checker; any program that parses emits.
    pub skip_type_check: bool,
    /// Include a rendered form of the syntax tree in the result.
    pub include_ast: bool,
    /// Include the token stream in the result.
    pub include_tokens: bool,
}

/// The structured result of a compilation.
#[derive(Debug)]
pub struct CompileResult {
    pub success: bool,
    /// The emitted text; present exactly when `success` is true.
    pub output: Option<String>,
    /// Diagnostics in non-decreasing line order. Warnings may be present
    /// on a successful compilation.
    pub errors: Vec<Diagnostic>,
    /// Rendered syntax tree, when requested.
    pub ast: Option<String>,
    /// The token stream, when requested.
    pub tokens: Option<Vec<Token>>,
}

impl CompileResult {
    /// Lower a fatal lex/parse fault. The structured line is 1 here; the
    /// message text itself names the true position.
    fn fatal(error: CompileError, tokens: Option<Vec<Token>>) -> Self {
        Self {
            success: false,
            output: None,
            errors: vec![Diagnostic::from_message_text(
                error.to_string(),
                1,
                Severity::Error,
            )],
            ast: None,
            tokens,
        }
    }
}

/// Compile a single source text. Returns either emitted output with an
/// empty (or warnings-only) diagnostic list, or a non-empty diagnostic
/// list and no output.
pub fn compile(source: &str, options: &CompileOptions) -> CompileResult {
    let tokens = match tokenize(source) {
        Ok(tokens) => tokens,
        Err(error) => return CompileResult::fatal(error, None),
    };
    let kept_tokens = options.include_tokens.then(|| tokens.clone());

    let arena = Bump::new();
    let program = match parse(&arena, tokens) {
        Ok(program) => program,
        Err(error) => return CompileResult::fatal(error, kept_tokens),
    };
    let ast = options.include_ast.then(|| format!("{:#?}", program));

    let errors = if options.skip_type_check {
        Vec::new()
    } else {
        check(&program)
    };
    if errors.iter().any(Diagnostic::is_error) {
        return CompileResult {
            success: false,
            output: None,
            errors,
            ast,
            tokens: kept_tokens,
        };
    }

    let output = emit(&program);
    CompileResult {
        success: true,
        output: Some(output),
        errors,
        ast,
        tokens: kept_tokens,
    }
}

/// Render diagnostics as `Error (line N): <message>` lines; when the
/// source is supplied, each entry is followed by the offending line.
pub fn format_errors(errors: &[Diagnostic], source: Option<&str>) -> String {
    let source_lines: Vec<&str> = source.map(|s| s.lines().collect()).unwrap_or_default();
    let mut rendered = String::new();
    for diagnostic in errors {
        rendered.push_str(&format!(
            "{} (line {}): {}\n",
            diagnostic.severity, diagnostic.line, diagnostic.message
        ));
        if let Some(index) = (diagnostic.line as usize).checked_sub(1) {
            if let Some(text) = source_lines.get(index) {
                rendered.push_str(&format!("  {} | {}\n", diagnostic.line, text));
            }
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_success_shape() {
        let result = compile("let x: number = 1;", &CompileOptions::default());
        assert!(result.success);
        assert!(result.output.is_some());
        assert!(result.errors.is_empty());
        assert!(result.ast.is_none());
        assert!(result.tokens.is_none());
    }

    #[test]
    fn test_compile_failure_shape() {
        let result = compile("let x: number = \"oops\";", &CompileOptions::default());
        assert!(!result.success);
        assert!(result.output.is_none());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn test_lex_error_is_flattened_to_line_one() {
        let result = compile("let x;\nlet s = \"unterminated", &CompileOptions::default());
        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].line, 1);
        assert!(result.errors[0].message.contains("line 2"));
    }

    #[test]
    fn test_parse_error_is_flattened_to_line_one() {
        let result = compile("let = 3;", &CompileOptions::default());
        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].line, 1);
    }

    #[test]
    fn test_include_tokens_and_ast() {
        let options = CompileOptions {
            include_ast: true,
            include_tokens: true,
            ..Default::default()
        };
        let result = compile("let x = 1;", &options);
        assert!(result.success);
        let tokens = result.tokens.unwrap();
        assert!(tokens.last().unwrap().is_eof());
        assert!(result.ast.unwrap().contains("Variable"));
    }

    #[test]
    fn test_format_errors_with_source() {
        let source = "let x: number = \"hello\";";
        let result = compile(source, &CompileOptions::default());
        let rendered = format_errors(&result.errors, Some(source));
        assert!(rendered.starts_with("Error (line 1): "));
        assert!(rendered.contains("  1 | let x: number = \"hello\";"));
    }

    #[test]
    fn test_format_errors_without_source() {
        let result = compile("unknown;", &CompileOptions::default());
        let rendered = format_errors(&result.errors, None);
        assert!(rendered.contains("Error (line 1): Cannot find name 'unknown'."));
        assert!(!rendered.contains(" | "));
    }
}
