//! Error types for the query engine, organized by the phase that produces them.

use crate::utils::location::Span;
use std::fmt;
use thiserror::Error;

/// Top-level error type for the engine.
#[derive(Error, Debug)]
pub enum SpaqlError {
    /// Error during lexing of SIMPLE or PQL text
    #[error("lexer error: {0}")]
    Lexer(#[from] LexerError),

    /// Error during SIMPLE parsing
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Error during design extraction
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// I/O error while reading a source file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error during lexical analysis.
#[derive(Error, Debug, Clone)]
pub struct LexerError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of lexer error
    pub kind: LexerErrorKind,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerErrorKind {
    /// Character outside the token alphabet
    UnexpectedChar,
    /// Integer literal with a leading zero
    InvalidNumber,
}

/// Error during SIMPLE parsing.
#[derive(Error, Debug, Clone)]
pub struct ParseError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of parse error
    pub kind: ParseErrorKind,
    /// What was found instead
    pub found: Option<String>,
}

impl ParseError {
    /// Create a parse error at the given span.
    pub fn new(kind: ParseErrorKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            kind,
            found: None,
        }
    }

    /// Attach the offending lexeme.
    pub fn with_found(mut self, found: impl Into<String>) -> Self {
        self.found = Some(found.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.span)?;
        if let Some(ref found) = self.found {
            write!(f, " (found: {})", found)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Unexpected token
    UnexpectedToken,
    /// A specific token was required
    ExpectedToken,
    /// An expression was required
    ExpectedExpression,
    /// A statement was required
    ExpectedStatement,
    /// A name was required
    ExpectedName,
    /// Input ended mid-production
    UnexpectedEof,
}

/// Error during design extraction. Extraction errors are fatal: the program
/// is structurally invalid and no PKB is produced.
#[derive(Error, Debug, Clone)]
pub struct ExtractError {
    /// The error message
    pub message: String,
    /// The kind of extraction error
    pub kind: ExtractErrorKind,
}

impl ExtractError {
    /// Create an extraction error.
    pub fn new(kind: ExtractErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractErrorKind {
    /// Two procedures share a name
    DuplicateProcedure,
    /// A call statement targets an undeclared procedure
    UnknownCallTarget,
    /// The call graph contains a cycle
    RecursiveCall,
}

/// Error during PQL parsing. These are recoverable at the engine level:
/// a query that fails to parse simply produces no results.
#[derive(Error, Debug, Clone)]
pub struct QueryParseError {
    /// The error message
    pub message: String,
    /// The kind of query parse error
    pub kind: QueryParseErrorKind,
}

impl QueryParseError {
    /// Create a query parse error.
    pub fn new(kind: QueryParseErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }
}

impl fmt::Display for QueryParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryParseErrorKind {
    /// Token sequence does not match any production
    UnexpectedToken,
    /// Query text ended mid-production
    UnexpectedEof,
    /// A quoted pattern expression failed to parse
    InvalidExpression,
    /// The query text failed to lex
    Lexer,
}

/// Result type for the engine pipeline.
pub type SpaqlResult<T> = Result<T, SpaqlError>;
