//! detype_parser: Recursive-descent parser for the typed source dialect.
//!
//! [`parse`] consumes the token stream produced by the lexer and builds an
//! arena-allocated syntax tree. Expressions use Pratt-style precedence
//! climbing; the three genuinely ambiguous constructs (arrow function vs.
//! parenthesized expression, call-site type arguments vs. comparison, and
//! conditional types) are resolved with bounded speculation over an integer
//! cursor. The parser raises on the first error; the compile entry collates
//! messages by stage.

mod parser;
mod precedence;

pub use parser::{parse, Parser};
