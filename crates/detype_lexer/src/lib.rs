//! detype_lexer: The lexer for the typed source dialect.
//!
//! [`tokenize`] converts source text into a token vector terminated by a
//! single end-of-file token. Trivia (whitespace and comments) is discarded;
//! multi-character operators are matched with maximal munch; template
//! literals with interpolation are split into head/middle/tail fragments
//! with the embedded expressions tokenized in between.

mod lexer;
mod token;

pub use lexer::{numeric_value, tokenize, Lexer};
pub use token::Token;
