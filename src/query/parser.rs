//! Recursive descent parser for PQL.
//!
//! The parser consumes the shared token stream and builds a [`Query`].
//! Alternatives are tried with checkpoint/rewind: a production that fails
//! restores the cursor and the caller attempts the next rule, the more
//! specific form first (an `elem` is tried as an `attrRef` before falling
//! back to a bare synonym).
//!
//! Syntax errors abort the parse and surface as [`QueryParseError`]; the
//! engine turns that into an empty result set. Semantic rule violations
//! (a redeclared synonym, an undeclared reference, an incompatible
//! attribute, wrong pattern arity) poison the query instead, so BOOLEAN
//! queries can still answer `FALSE`.

use crate::frontend::lexer::Lexer;
use crate::frontend::parser::parse_expression_text;
use crate::frontend::token::{Token, TokenKind};
use crate::query::{
    attr_compatible, Arg, AttrArg, AttrName, ClauseType, EntityType, PatternClause, PatternSpec,
    Query, RelClause, ReturnTarget, WithClause,
};
use crate::utils::errors::{QueryParseError, QueryParseErrorKind};

/// Parse a PQL query.
pub fn parse_query(text: &str) -> Result<Query, QueryParseError> {
    let tokens = Lexer::new(text)
        .tokenize()
        .map_err(|e| QueryParseError::new(QueryParseErrorKind::Lexer, e.message))?;
    PqlParser {
        tokens,
        pos: 0,
        query: Query::default(),
    }
    .parse()
}

type QResult<T> = Result<T, QueryParseError>;

struct PqlParser {
    tokens: Vec<Token>,
    pos: usize,
    query: Query,
}

impl PqlParser {
    fn parse(mut self) -> QResult<Query> {
        self.parse_declarations()?;
        self.expect_word("Select")?;
        self.parse_result_clause()?;
        while !self.at_end() {
            if self.check_word("such") {
                self.advance();
                self.expect_word("that")?;
                self.parse_rel_clause()?;
            } else if self.check_word("pattern") {
                self.advance();
                self.parse_pattern_clause()?;
            } else if self.check_word("with") {
                self.advance();
                self.parse_with_clause()?;
            } else {
                return Err(self.error("expected 'such that', 'pattern', or 'with'"));
            }
        }
        Ok(self.query)
    }

    // declaration := design-entity synonym (',' synonym)* ';'
    fn parse_declarations(&mut self) -> QResult<()> {
        loop {
            let Some(kind) = EntityType::from_keyword(&self.current().lexeme) else {
                return Ok(());
            };
            if self.current().kind != TokenKind::Name {
                return Ok(());
            }
            self.advance();
            loop {
                let name = self.expect_name("expected a synonym name")?;
                // Redeclaration poisons the whole query.
                if self.query.declarations.insert(name, kind).is_some() {
                    self.query.poisoned = true;
                }
                if self.check(TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            self.expect(TokenKind::Semicolon)?;
        }
    }

    // result-cl := 'BOOLEAN' | elem | '<' elem (',' elem)* '>'
    fn parse_result_clause(&mut self) -> QResult<()> {
        if self.check(TokenKind::Less) {
            self.advance();
            loop {
                let elem = self.parse_elem()?;
                self.query.returns.push(elem);
                if self.check(TokenKind::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
            self.expect(TokenKind::Greater)?;
            return Ok(());
        }
        // BOOLEAN is only a marker when it is not a declared synonym.
        if self.current().is_word("BOOLEAN") && !self.query.declarations.contains_key("BOOLEAN") {
            self.advance();
            self.query.returns.push(ReturnTarget::Boolean);
            return Ok(());
        }
        let elem = self.parse_elem()?;
        self.query.returns.push(elem);
        Ok(())
    }

    // elem := synonym '.' attrName | synonym
    fn parse_elem(&mut self) -> QResult<ReturnTarget> {
        let checkpoint = self.checkpoint();
        match self.parse_attr_ref() {
            Ok((synonym, attr)) => {
                self.check_attr_semantics(&synonym, Some(attr));
                Ok(ReturnTarget::Elem {
                    synonym,
                    attr: Some(attr),
                })
            }
            Err(_) => {
                self.rewind(checkpoint);
                let synonym = self.expect_name("expected a synonym")?;
                if self.query.kind_of(&synonym).is_none() {
                    self.query.poisoned = true;
                }
                Ok(ReturnTarget::Elem {
                    synonym,
                    attr: None,
                })
            }
        }
    }

    // attrRef := synonym '.' attrName
    fn parse_attr_ref(&mut self) -> QResult<(String, AttrName)> {
        let synonym = self.expect_name("expected a synonym")?;
        self.expect(TokenKind::Dot)?;
        let attr = self.parse_attr_name()?;
        Ok((synonym, attr))
    }

    // attrName := 'procName' | 'varName' | 'value' | 'stmt' '#'
    fn parse_attr_name(&mut self) -> QResult<AttrName> {
        let word = self.expect_name("expected an attribute name")?;
        match word.as_str() {
            "procName" => Ok(AttrName::ProcName),
            "varName" => Ok(AttrName::VarName),
            "value" => Ok(AttrName::Value),
            "stmt" => {
                self.expect(TokenKind::Hash)?;
                Ok(AttrName::StmtNo)
            }
            _ => Err(self.error("unknown attribute name")),
        }
    }

    /// Poison the query when an attribute reference does not type-check.
    fn check_attr_semantics(&mut self, synonym: &str, attr: Option<AttrName>) {
        match (self.query.kind_of(synonym), attr) {
            (None, _) => self.query.poisoned = true,
            (Some(kind), Some(attr)) => {
                if !attr_compatible(kind, attr) {
                    self.query.poisoned = true;
                }
            }
            (Some(_), None) => {}
        }
    }

    // relRef := relation-name ('*')? '(' arg ',' arg ')'
    fn parse_rel_clause(&mut self) -> QResult<()> {
        let mut name = self.expect_name("expected a relation name")?;
        if self.check(TokenKind::Star) {
            self.advance();
            name.push('*');
        }
        let Some(rel) = ClauseType::from_name(&name) else {
            return Err(self.error("unknown relation name"));
        };
        self.expect(TokenKind::LeftParen)?;
        let left = self.parse_arg()?;
        self.expect(TokenKind::Comma)?;
        let right = self.parse_arg()?;
        self.expect(TokenKind::RightParen)?;
        self.query.such_that.push(RelClause { rel, left, right });
        Ok(())
    }

    // arg := '_' | INTEGER | '"' NAME '"' | synonym
    fn parse_arg(&mut self) -> QResult<Arg> {
        match self.current().kind {
            TokenKind::Underscore => {
                self.advance();
                Ok(Arg::Wildcard)
            }
            TokenKind::Integer => {
                let value = self
                    .current()
                    .lexeme
                    .parse()
                    .map_err(|_| self.error("integer argument out of range"))?;
                self.advance();
                Ok(Arg::Number(value))
            }
            TokenKind::Quote => {
                self.advance();
                let name = self.expect_name("expected a quoted name")?;
                self.expect(TokenKind::Quote)?;
                Ok(Arg::Name(name))
            }
            TokenKind::Name => {
                let synonym = self.expect_name("expected an argument")?;
                if self.query.kind_of(&synonym).is_none() {
                    self.query.poisoned = true;
                }
                Ok(Arg::Synonym(synonym))
            }
            _ => Err(self.error("expected a clause argument")),
        }
    }

    // pattern-cl := synonym '(' arg ',' pattern-spec (',' '_')? ')'
    fn parse_pattern_clause(&mut self) -> QResult<()> {
        let synonym = self.expect_name("expected a pattern synonym")?;
        self.expect(TokenKind::LeftParen)?;
        let lhs = self.parse_arg()?;
        self.expect(TokenKind::Comma)?;
        let spec = self.parse_pattern_spec()?;
        let third_wildcard = if self.check(TokenKind::Comma) {
            self.advance();
            self.expect(TokenKind::Underscore)?;
            true
        } else {
            false
        };
        self.expect(TokenKind::RightParen)?;

        // The declared kind fixes the arity and admissible spec.
        match self.query.kind_of(&synonym) {
            Some(EntityType::Assign) => {
                if third_wildcard {
                    self.query.poisoned = true;
                }
            }
            Some(EntityType::While) => {
                if third_wildcard || spec != PatternSpec::Any {
                    self.query.poisoned = true;
                }
            }
            Some(EntityType::If) => {
                if !third_wildcard || spec != PatternSpec::Any {
                    self.query.poisoned = true;
                }
            }
            _ => self.query.poisoned = true,
        }

        self.query.patterns.push(PatternClause { synonym, lhs, spec });
        Ok(())
    }

    // pattern-spec := '_' | '"' expr '"' | '_' '"' expr '"' '_'
    fn parse_pattern_spec(&mut self) -> QResult<PatternSpec> {
        if self.check(TokenKind::Quote) {
            let canonical = self.parse_quoted_expression()?;
            return Ok(PatternSpec::Exact(canonical));
        }
        self.expect(TokenKind::Underscore)?;
        if self.check(TokenKind::Quote) {
            let canonical = self.parse_quoted_expression()?;
            self.expect(TokenKind::Underscore)?;
            return Ok(PatternSpec::Sub(canonical));
        }
        Ok(PatternSpec::Any)
    }

    /// Consume `"` expr `"` and canonicalize the expression the same way
    /// the extractor keys the pattern index.
    fn parse_quoted_expression(&mut self) -> QResult<String> {
        self.expect(TokenKind::Quote)?;
        let mut pieces: Vec<String> = Vec::new();
        while !self.check(TokenKind::Quote) {
            if self.at_end() {
                return Err(QueryParseError::new(
                    QueryParseErrorKind::UnexpectedEof,
                    "unterminated pattern expression",
                ));
            }
            pieces.push(self.current().lexeme.clone());
            self.advance();
        }
        self.expect(TokenKind::Quote)?;

        let text = pieces.join(" ");
        let expr = parse_expression_text(&text).map_err(|e| {
            QueryParseError::new(
                QueryParseErrorKind::InvalidExpression,
                format!("bad pattern expression '{}': {}", text, e),
            )
        })?;
        Ok(expr.to_string())
    }

    // with-cl := attr-arg '=' attr-arg
    fn parse_with_clause(&mut self) -> QResult<()> {
        let left = self.parse_attr_arg()?;
        self.expect(TokenKind::Equal)?;
        let right = self.parse_attr_arg()?;
        self.query.with.push(WithClause { left, right });
        Ok(())
    }

    // attr-arg := INTEGER | '"' NAME '"' | attrRef | synonym
    fn parse_attr_arg(&mut self) -> QResult<AttrArg> {
        match self.current().kind {
            TokenKind::Integer => {
                let value = self
                    .current()
                    .lexeme
                    .parse()
                    .map_err(|_| self.error("integer out of range"))?;
                self.advance();
                Ok(AttrArg::Number(value))
            }
            TokenKind::Quote => {
                self.advance();
                let name = self.expect_name("expected a quoted name")?;
                self.expect(TokenKind::Quote)?;
                Ok(AttrArg::Name(name))
            }
            TokenKind::Name => {
                let checkpoint = self.checkpoint();
                match self.parse_attr_ref() {
                    Ok((synonym, attr)) => {
                        self.check_attr_semantics(&synonym, Some(attr));
                        Ok(AttrArg::Ref {
                            synonym,
                            attr: Some(attr),
                        })
                    }
                    Err(_) => {
                        self.rewind(checkpoint);
                        let synonym = self.expect_name("expected a synonym")?;
                        if self.query.kind_of(&synonym).is_none() {
                            self.query.poisoned = true;
                        }
                        Ok(AttrArg::Ref {
                            synonym,
                            attr: None,
                        })
                    }
                }
            }
            _ => Err(self.error("expected a 'with' argument")),
        }
    }

    // Cursor helpers

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn at_end(&self) -> bool {
        self.current().is_eof()
    }

    fn advance(&mut self) {
        if !self.at_end() {
            self.pos += 1;
        }
    }

    fn checkpoint(&self) -> usize {
        self.pos
    }

    fn rewind(&mut self, checkpoint: usize) {
        self.pos = checkpoint;
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn check_word(&self, word: &str) -> bool {
        self.current().is_word(word)
    }

    fn expect(&mut self, kind: TokenKind) -> QResult<Token> {
        if self.check(kind) {
            let token = self.current().clone();
            self.advance();
            Ok(token)
        } else {
            Err(self.error(&format!("expected '{}'", kind)))
        }
    }

    fn expect_word(&mut self, word: &str) -> QResult<()> {
        if self.check_word(word) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", word)))
        }
    }

    fn expect_name(&mut self, message: &str) -> QResult<String> {
        if self.check(TokenKind::Name) {
            let name = self.current().lexeme.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error(message))
        }
    }

    fn error(&self, message: &str) -> QueryParseError {
        let kind = if self.at_end() {
            QueryParseErrorKind::UnexpectedEof
        } else {
            QueryParseErrorKind::UnexpectedToken
        };
        QueryParseError::new(kind, format!("{} (found '{}')", message, self.current().lexeme))
    }
}
