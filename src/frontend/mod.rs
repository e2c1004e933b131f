//! Front end: shared lexer, SIMPLE tokens, AST, and the SIMPLE parser.
//!
//! SIMPLE is a small imperative language of procedures, assignments,
//! `if`/`else`, `while`, `read`, `print`, and `call`:
//!
//! ```text
//! procedure main {
//!     while (y == 3) {
//!         gucci = 1;
//!     }
//!     some_var = 23 + another_var;
//! }
//! ```
//!
//! The lexer is shared with the PQL front end in [`crate::query`].

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::*;
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Token, TokenKind};

use crate::utils::errors::SpaqlResult;

/// Parse SIMPLE source text into an AST.
pub fn parse(source: &str) -> SpaqlResult<ast::Program> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(tokens);
    Ok(parser.parse_program()?)
}
