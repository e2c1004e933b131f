//! # spaql: a static program-query engine for SIMPLE
//!
//! Given a SIMPLE source program, the engine extracts a program knowledge
//! base (PKB) of design relations (`Follows`, `Parent`, `Uses`, `Modifies`,
//! `Calls`, `Next`, `Affects`, their transitive closures, and the
//! interprocedural `NextBip`/`AffectsBip` variants) plus assignment pattern
//! and condition-variable indices. PQL queries are then evaluated against
//! the PKB.
//!
//! ## Architecture
//!
//! ```text
//! source → Lexer → Parser → AST → Extractor → PKB     (once per source)
//! query  → PQL parser → Query → Evaluator (+PKB) → result strings
//! ```
//!
//! ## Example
//!
//! ```rust
//! use spaql::QueryEngine;
//!
//! let mut engine = QueryEngine::new();
//! engine
//!     .parse_source("procedure main { x = 1; y = x; }")
//!     .expect("valid program");
//!
//! let mut results = Vec::new();
//! engine.evaluate("stmt s; Select s such that Follows(1, s)", &mut results);
//! assert_eq!(results, vec!["2"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod frontend;
pub mod pkb;
pub mod query;
pub mod utils;

pub mod prelude {
    //! Convenient re-exports of commonly used types.

    pub use crate::frontend::ast::{Program, Stmt, StmtKind};
    pub use crate::pkb::{Pkb, StmtType};
    pub use crate::query::{parse_query, Query, QueryEvaluator};
    pub use crate::utils::errors::{SpaqlError, SpaqlResult};
    pub use crate::QueryEngine;
}

pub use pkb::Pkb;
pub use query::QueryEvaluator;
pub use utils::errors::{SpaqlError, SpaqlResult};

use std::path::Path;
use tracing::{debug, warn};

/// Parse SIMPLE source text and extract its knowledge base.
pub fn parse_and_extract(source: &str) -> SpaqlResult<Pkb> {
    let program = frontend::parse(source)?;
    Ok(Pkb::build(&program)?)
}

/// The engine a harness holds: one PKB per parsed source, and an
/// evaluate-many query surface that never fails outward.
///
/// `parse_*` records failure instead of leaving a stale PKB behind;
/// evaluation against a failed or absent parse yields no results.
#[derive(Debug, Default)]
pub struct QueryEngine {
    pkb: Option<Pkb>,
    parse_failed: bool,
}

impl QueryEngine {
    /// Create an engine with no program loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read, parse, and extract a SIMPLE source file.
    pub fn parse_file(&mut self, path: &Path) -> SpaqlResult<()> {
        self.pkb = None;
        self.parse_failed = true;
        let source = std::fs::read_to_string(path)?;
        self.parse_source(&source)
    }

    /// Parse and extract SIMPLE source text.
    pub fn parse_source(&mut self, source: &str) -> SpaqlResult<()> {
        self.pkb = None;
        self.parse_failed = true;
        match parse_and_extract(source) {
            Ok(pkb) => {
                self.pkb = Some(pkb);
                self.parse_failed = false;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to parse SIMPLE source");
                Err(e)
            }
        }
    }

    /// Whether the last parse failed (or none happened yet).
    pub fn has_parse_failed(&self) -> bool {
        self.parse_failed
    }

    /// Evaluate one PQL query, appending result strings to `out`.
    ///
    /// Never fails: an unparsed source, a malformed query, or an
    /// unsatisfiable query all contribute nothing (BOOLEAN queries
    /// contribute `FALSE` on semantic failure).
    pub fn evaluate(&self, query_text: &str, out: &mut Vec<String>) {
        let Some(pkb) = &self.pkb else {
            warn!("no program loaded; query skipped");
            return;
        };
        match query::parse_query(query_text) {
            Ok(parsed) => {
                out.extend(QueryEvaluator::new(pkb).evaluate(&parsed));
            }
            Err(e) => {
                debug!(error = %e, "query failed to parse");
            }
        }
    }

    /// The extracted knowledge base, when a parse succeeded.
    pub fn pkb(&self) -> Option<&Pkb> {
        self.pkb.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_round_trip() {
        let mut engine = QueryEngine::new();
        assert!(engine.has_parse_failed());

        engine
            .parse_source("procedure main { x = 1; y = x; }")
            .unwrap();
        assert!(!engine.has_parse_failed());

        let mut results = Vec::new();
        engine.evaluate("variable v; Select v", &mut results);
        assert_eq!(results, vec!["x", "y"]);
    }

    #[test]
    fn test_failed_parse_disables_evaluation() {
        let mut engine = QueryEngine::new();
        assert!(engine.parse_source("procedure main { call ghost; }").is_err());
        assert!(engine.has_parse_failed());

        let mut results = Vec::new();
        engine.evaluate("stmt s; Select s", &mut results);
        assert!(results.is_empty());
    }

    #[test]
    fn test_reparse_replaces_program() {
        let mut engine = QueryEngine::new();
        engine.parse_source("procedure a { x = 1; }").unwrap();
        engine.parse_source("procedure b { y = 2; z = 3; }").unwrap();

        let mut results = Vec::new();
        engine.evaluate("procedure p; Select p", &mut results);
        assert_eq!(results, vec!["b"]);
    }

    #[test]
    fn test_malformed_query_appends_nothing() {
        let mut engine = QueryEngine::new();
        engine.parse_source("procedure main { x = 1; }").unwrap();

        let mut results = vec!["kept".to_string()];
        engine.evaluate("not a query at all", &mut results);
        assert_eq!(results, vec!["kept"]);
    }
}
