//! detype_diagnostics: Diagnostic messages and error reporting infrastructure.
//!
//! Two error shapes exist in the pipeline. Lexical and syntax faults are
//! fatal per compilation and are represented by [`CompileError`]; the
//! checker instead accumulates [`Diagnostic`]s in a
//! [`DiagnosticCollection`] and keeps going where it can. Message templates
//! live in [`messages`] with `{0}`-style placeholders and stable codes.

use std::fmt;
use thiserror::Error;

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "Error"),
            Severity::Warning => write!(f, "Warning"),
        }
    }
}

/// A diagnostic message template with a code and severity.
#[derive(Debug, Clone)]
pub struct DiagnosticMessage {
    /// Stable diagnostic code.
    pub code: u32,
    pub severity: Severity,
    /// The message template. May contain `{0}`, `{1}`, … placeholders.
    pub message: &'static str,
}

/// A realized diagnostic with location information and resolved text.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    pub line: u32,
    pub column: Option<u32>,
    pub severity: Severity,
    pub code: u32,
}

impl Diagnostic {
    /// Realize a message template at a source line.
    pub fn new(message: &DiagnosticMessage, args: &[&str], line: u32) -> Self {
        Self {
            message: format_message(message.message, args),
            line,
            column: None,
            severity: message.severity,
            code: message.code,
        }
    }

    pub fn with_column(mut self, column: u32) -> Self {
        self.column = Some(column);
        self
    }

    /// A diagnostic carrying pre-rendered text, used when lowering a fatal
    /// [`CompileError`] at the compile boundary. The structured line is
    /// always 1 there; the message itself names the true position.
    pub fn from_message_text(message: String, line: u32, severity: Severity) -> Self {
        Self {
            message,
            line,
            column: None,
            severity,
            code: 0,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {}): {}", self.severity, self.line, self.message)
    }
}

/// Replace `{0}`, `{1}`, … in a message template with arguments.
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut result = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{}}}", i), arg);
    }
    result
}

/// Diagnostics accumulated during checking, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollection {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollection {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Stable sort by source line. Discovery order is preserved within a
    /// line, so reported output is deterministic and non-decreasing.
    pub fn sort(&mut self) {
        self.diagnostics.sort_by_key(|d| d.line);
    }
}

/// A fatal lexical or syntax fault. Raised by the lexer or parser as a
/// single error per compilation and lowered to a one-element diagnostic
/// list at the compile boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("Unterminated string literal at line {line}")]
    UnterminatedString { line: u32 },

    #[error("Unterminated template literal at line {line}")]
    UnterminatedTemplate { line: u32 },

    #[error("Unterminated block comment at line {line}")]
    UnterminatedComment { line: u32 },

    #[error("Unexpected character '{ch}' at line {line}")]
    UnknownCharacter { ch: char, line: u32 },

    #[error("Unexpected '..' at line {line}; an ellipsis has three dots")]
    IncompleteEllipsis { line: u32 },

    #[error("{expected} expected, but found '{found}' at line {line}")]
    Syntax {
        expected: String,
        found: String,
        line: u32,
    },
}

impl CompileError {
    /// The source line the fault was raised at.
    pub fn line(&self) -> u32 {
        match self {
            CompileError::UnterminatedString { line }
            | CompileError::UnterminatedTemplate { line }
            | CompileError::UnterminatedComment { line }
            | CompileError::UnknownCharacter { line, .. }
            | CompileError::IncompleteEllipsis { line }
            | CompileError::Syntax { line, .. } => *line,
        }
    }
}

// ============================================================================
// Diagnostic messages
// ============================================================================

pub mod messages {
    use super::*;

    macro_rules! diag {
        ($code:expr, Error, $msg:expr) => {
            DiagnosticMessage {
                code: $code,
                severity: Severity::Error,
                message: $msg,
            }
        };
        ($code:expr, Warning, $msg:expr) => {
            DiagnosticMessage {
                code: $code,
                severity: Severity::Warning,
                message: $msg,
            }
        };
    }

    // ------------------------------------------------------------------------
    // Name resolution
    // ------------------------------------------------------------------------
    pub const CANNOT_FIND_NAME_0: DiagnosticMessage =
        diag!(2304, Error, "Cannot find name '{0}'.");
    pub const IDENTIFIER_0_HAS_ALREADY_BEEN_DECLARED: DiagnosticMessage =
        diag!(2300, Error, "Identifier '{0}' has already been declared.");

    // ------------------------------------------------------------------------
    // Assignability
    // ------------------------------------------------------------------------
    pub const TYPE_0_IS_NOT_ASSIGNABLE_TO_TYPE_1: DiagnosticMessage =
        diag!(2322, Error, "Type '{0}' is not assignable to type '{1}'.");
    pub const ARGUMENT_OF_TYPE_0_IS_NOT_ASSIGNABLE_TO_PARAMETER_OF_TYPE_1: DiagnosticMessage =
        diag!(2345, Error, "Argument of type '{0}' is not assignable to parameter of type '{1}'.");
    pub const PROPERTY_0_IS_MISSING_IN_TYPE_1: DiagnosticMessage =
        diag!(2324, Error, "Property '{0}' is missing in type '{1}'.");

    // ------------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------------
    pub const EXPECTED_AT_LEAST_0_ARGUMENTS_BUT_GOT_1: DiagnosticMessage =
        diag!(2555, Error, "Expected at least {0} arguments, but got {1}.");
    pub const EXPECTED_AT_MOST_0_ARGUMENTS_BUT_GOT_1: DiagnosticMessage =
        diag!(2554, Error, "Expected at most {0} arguments, but got {1}.");
    pub const THIS_EXPRESSION_IS_NOT_CALLABLE: DiagnosticMessage =
        diag!(2349, Error, "This expression is not callable. Type '{0}' has no call signatures.");
    pub const THIS_EXPRESSION_IS_NOT_CONSTRUCTABLE: DiagnosticMessage =
        diag!(2351, Error, "This expression is not constructable. Type '{0}' has no construct signatures.");

    // ------------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------------
    pub const PROPERTY_0_DOES_NOT_EXIST_ON_TYPE_1: DiagnosticMessage =
        diag!(2339, Error, "Property '{0}' does not exist on type '{1}'.");
    pub const CANNOT_ASSIGN_TO_0_BECAUSE_IT_IS_A_READ_ONLY_PROPERTY: DiagnosticMessage =
        diag!(2540, Error, "Cannot assign to '{0}' because it is a read-only property.");

    // ------------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------------
    pub const LEFT_SIDE_OF_ARITHMETIC_MUST_BE_NUMBER: DiagnosticMessage = diag!(
        2362,
        Error,
        "The left-hand side of an arithmetic operation must be of type 'any' or 'number'."
    );
    pub const RIGHT_SIDE_OF_ARITHMETIC_MUST_BE_NUMBER: DiagnosticMessage = diag!(
        2363,
        Error,
        "The right-hand side of an arithmetic operation must be of type 'any' or 'number'."
    );
    pub const OPERATOR_0_CANNOT_BE_APPLIED_TO_TYPES_1_AND_2: DiagnosticMessage =
        diag!(2365, Error, "Operator '{0}' cannot be applied to types '{1}' and '{2}'.");
    pub const INCREMENT_DECREMENT_OPERAND_MUST_BE_NUMBER: DiagnosticMessage = diag!(
        2356,
        Error,
        "The operand of an increment or decrement operator must be of type 'number'."
    );

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------
    pub const RETURN_OUTSIDE_FUNCTION: DiagnosticMessage = diag!(
        1108,
        Error,
        "A 'return' statement can only be used within a function body."
    );
    pub const CANNOT_ASSIGN_TO_0_BECAUSE_IT_IS_A_CONSTANT: DiagnosticMessage =
        diag!(2588, Error, "Cannot assign to '{0}' because it is a constant.");

    // ------------------------------------------------------------------------
    // Enumerations
    // ------------------------------------------------------------------------
    pub const CONST_ENUM_MEMBER_NOT_INLINED: DiagnosticMessage = diag!(
        2748,
        Warning,
        "Const enum '{0}' is lowered to a comment; the access to member '{1}' is not inlined in the output."
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message() {
        assert_eq!(
            format_message("Type '{0}' is not assignable to type '{1}'.", &["string", "number"]),
            "Type 'string' is not assignable to type 'number'."
        );
    }

    #[test]
    fn test_diagnostic_display() {
        let d = Diagnostic::new(&messages::CANNOT_FIND_NAME_0, &["foo"], 3);
        assert_eq!(d.to_string(), "Error (line 3): Cannot find name 'foo'.");
    }

    #[test]
    fn test_collection_sort_is_stable() {
        let mut diags = DiagnosticCollection::new();
        diags.add(Diagnostic::from_message_text("b".into(), 2, Severity::Error));
        diags.add(Diagnostic::from_message_text("a".into(), 1, Severity::Error));
        diags.add(Diagnostic::from_message_text("c".into(), 2, Severity::Error));
        diags.sort();
        let lines: Vec<_> = diags.diagnostics().iter().map(|d| (&d.message, d.line)).collect();
        assert_eq!(lines[0].1, 1);
        assert_eq!(*lines[1].0, "b");
        assert_eq!(*lines[2].0, "c");
    }

    #[test]
    fn test_compile_error_line() {
        let e = CompileError::UnterminatedString { line: 7 };
        assert_eq!(e.line(), 7);
        assert!(e.to_string().contains("line 7"));
    }
}
