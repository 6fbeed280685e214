//! FHIRPath expression parser
//!
//! Tokenizer and precedence-climbing parser producing a spanned AST.

pub mod error;
pub mod pratt;
pub mod span;
pub mod tokenizer;

pub use error::{ParseError, ParseResult};
pub use pratt::{Parser, Precedence, parse_expression};
pub use span::{Span, Spanned};
pub use tokenizer::{Token, Tokenizer, tokenize};

/// Parse an FHIRPath expression string into an AST
pub fn parse(input: &str) -> ParseResult<crate::ast::ExpressionNode> {
    parse_expression(input)
}
