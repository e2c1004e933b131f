//! PQL: query model, parser, evaluator, and the result table.
//!
//! A parsed query is a [`Query`] value: declared synonyms, return targets,
//! and the `such that` / `pattern` / `with` clause lists. Semantic problems
//! found at parse time (redeclared synonyms, undeclared references, bad
//! attributes) poison the query rather than failing the parse; the
//! evaluator turns a poisoned query into an empty result set, or `FALSE`
//! for BOOLEAN queries.

pub mod evaluator;
pub mod parser;
pub mod relations;
pub mod table;

pub use evaluator::QueryEvaluator;
pub use parser::parse_query;

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// The design-entity kinds a synonym can be declared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    /// `stmt`: any statement
    Stmt,
    /// `read`
    Read,
    /// `print`
    Print,
    /// `call`
    Call,
    /// `while`
    While,
    /// `if`
    If,
    /// `assign`
    Assign,
    /// `variable`
    Variable,
    /// `constant`
    Constant,
    /// `procedure`
    Procedure,
    /// `prog_line`: a statement number usable bare in `with`
    ProgLine,
}

/// Keyword table for design entities.
static ENTITY_KEYWORDS: Lazy<HashMap<&'static str, EntityType>> = Lazy::new(|| {
    HashMap::from([
        ("stmt", EntityType::Stmt),
        ("read", EntityType::Read),
        ("print", EntityType::Print),
        ("call", EntityType::Call),
        ("while", EntityType::While),
        ("if", EntityType::If),
        ("assign", EntityType::Assign),
        ("variable", EntityType::Variable),
        ("constant", EntityType::Constant),
        ("procedure", EntityType::Procedure),
        ("prog_line", EntityType::ProgLine),
    ])
});

impl EntityType {
    /// Look up a design-entity keyword.
    pub fn from_keyword(word: &str) -> Option<EntityType> {
        ENTITY_KEYWORDS.get(word).copied()
    }

    /// Whether synonyms of this kind stand for statements.
    pub fn is_stmt_kind(&self) -> bool {
        matches!(
            self,
            EntityType::Stmt
                | EntityType::Read
                | EntityType::Print
                | EntityType::Call
                | EntityType::While
                | EntityType::If
                | EntityType::Assign
                | EntityType::ProgLine
        )
    }
}

/// The sixteen relation clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)] // the variants are the relation names themselves
pub enum ClauseType {
    Follows,
    FollowsT,
    Parent,
    ParentT,
    Uses,
    Modifies,
    Calls,
    CallsT,
    Next,
    NextT,
    NextBip,
    NextBipT,
    Affects,
    AffectsT,
    AffectsBip,
    AffectsBipT,
}

/// Relation-name table, keyed by the surface spelling.
static RELATION_NAMES: Lazy<HashMap<&'static str, ClauseType>> = Lazy::new(|| {
    HashMap::from([
        ("Follows", ClauseType::Follows),
        ("Follows*", ClauseType::FollowsT),
        ("Parent", ClauseType::Parent),
        ("Parent*", ClauseType::ParentT),
        ("Uses", ClauseType::Uses),
        ("Modifies", ClauseType::Modifies),
        ("Calls", ClauseType::Calls),
        ("Calls*", ClauseType::CallsT),
        ("Next", ClauseType::Next),
        ("Next*", ClauseType::NextT),
        ("NextBip", ClauseType::NextBip),
        ("NextBip*", ClauseType::NextBipT),
        ("Affects", ClauseType::Affects),
        ("Affects*", ClauseType::AffectsT),
        ("AffectsBip", ClauseType::AffectsBip),
        ("AffectsBip*", ClauseType::AffectsBipT),
    ])
});

impl ClauseType {
    /// Look up a relation name as spelled in a query.
    pub fn from_name(name: &str) -> Option<ClauseType> {
        RELATION_NAMES.get(name).copied()
    }

    /// Whether this is a transitive-closure variant.
    pub fn is_transitive(&self) -> bool {
        matches!(
            self,
            ClauseType::FollowsT
                | ClauseType::ParentT
                | ClauseType::CallsT
                | ClauseType::NextT
                | ClauseType::NextBipT
                | ClauseType::AffectsT
                | ClauseType::AffectsBipT
        )
    }
}

impl fmt::Display for ClauseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = RELATION_NAMES
            .iter()
            .find(|(_, v)| **v == *self)
            .map(|(k, _)| *k)
            .unwrap_or("?");
        write!(f, "{}", name)
    }
}

/// A clause argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// A declared synonym
    Synonym(String),
    /// A statement or line number
    Number(u32),
    /// A quoted variable or procedure name
    Name(String),
    /// `_`
    Wildcard,
}

impl Arg {
    /// The synonym name, if this argument is one.
    pub fn synonym(&self) -> Option<&str> {
        match self {
            Arg::Synonym(name) => Some(name),
            _ => None,
        }
    }
}

/// A `such that` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelClause {
    /// The relation
    pub rel: ClauseType,
    /// Left argument
    pub left: Arg,
    /// Right argument
    pub right: Arg,
}

/// The expression part of an assign pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSpec {
    /// `_`
    Any,
    /// `"expr"`, canonicalized
    Exact(String),
    /// `_"expr"_`, canonicalized
    Sub(String),
}

/// A `pattern` clause. The synonym's declared kind decides whether this is
/// an assign, if, or while pattern; if and while patterns only admit
/// wildcard bodies, so their spec is always [`PatternSpec::Any`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternClause {
    /// The pattern synonym
    pub synonym: String,
    /// First argument: variable synonym, quoted name, or wildcard
    pub lhs: Arg,
    /// Expression spec
    pub spec: PatternSpec,
}

/// Attribute names usable in `attrRef`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrName {
    /// `procName`
    ProcName,
    /// `varName`
    VarName,
    /// `value`
    Value,
    /// `stmt#`
    StmtNo,
}

impl AttrName {
    /// Whether attribute values of this name are numbers (as opposed to names).
    pub fn is_numeric(&self) -> bool {
        matches!(self, AttrName::Value | AttrName::StmtNo)
    }
}

/// Whether an attribute name is legal on a synonym kind.
pub(crate) fn attr_compatible(kind: EntityType, attr: AttrName) -> bool {
    match attr {
        AttrName::ProcName => matches!(kind, EntityType::Call | EntityType::Procedure),
        AttrName::VarName => matches!(
            kind,
            EntityType::Read | EntityType::Print | EntityType::Variable
        ),
        AttrName::Value => kind == EntityType::Constant,
        AttrName::StmtNo => kind.is_stmt_kind(),
    }
}

/// One side of a `with` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrArg {
    /// `synonym.attr`, or a bare `prog_line` synonym when `attr` is `None`
    Ref {
        synonym: String,
        attr: Option<AttrName>,
    },
    /// An integer literal
    Number(u32),
    /// A quoted name literal
    Name(String),
}

/// A `with` equality constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithClause {
    /// Left side
    pub left: AttrArg,
    /// Right side
    pub right: AttrArg,
}

/// One Select target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnTarget {
    /// `Select BOOLEAN`
    Boolean,
    /// `Select syn` or `Select syn.attr`, possibly inside a tuple
    Elem {
        synonym: String,
        attr: Option<AttrName>,
    },
}

/// A parsed PQL query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Declared synonyms and their kinds
    pub declarations: HashMap<String, EntityType>,
    /// Select targets, in order; empty means the query failed to parse
    pub returns: Vec<ReturnTarget>,
    /// `such that` clauses
    pub such_that: Vec<RelClause>,
    /// `pattern` clauses
    pub patterns: Vec<PatternClause>,
    /// `with` clauses
    pub with: Vec<WithClause>,
    /// Set when a semantic rule was violated; the evaluator short-circuits
    pub poisoned: bool,
}

impl Query {
    /// Whether this is a `Select BOOLEAN` query.
    pub fn is_boolean(&self) -> bool {
        matches!(self.returns.as_slice(), [ReturnTarget::Boolean])
    }

    /// The declared kind of a synonym.
    pub fn kind_of(&self, synonym: &str) -> Option<EntityType> {
        self.declarations.get(synonym).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_keywords() {
        assert_eq!(EntityType::from_keyword("assign"), Some(EntityType::Assign));
        assert_eq!(EntityType::from_keyword("prog_line"), Some(EntityType::ProgLine));
        assert_eq!(EntityType::from_keyword("Select"), None);
    }

    #[test]
    fn test_relation_names() {
        assert_eq!(ClauseType::from_name("Follows"), Some(ClauseType::Follows));
        assert_eq!(ClauseType::from_name("Follows*"), Some(ClauseType::FollowsT));
        assert_eq!(ClauseType::from_name("AffectsBip*"), Some(ClauseType::AffectsBipT));
        assert_eq!(ClauseType::from_name("follows"), None);
    }

    #[test]
    fn test_stmt_kinds() {
        assert!(EntityType::Stmt.is_stmt_kind());
        assert!(EntityType::ProgLine.is_stmt_kind());
        assert!(!EntityType::Variable.is_stmt_kind());
        assert!(!EntityType::Procedure.is_stmt_kind());
    }

    #[test]
    fn test_boolean_query() {
        let mut query = Query::default();
        assert!(!query.is_boolean());
        query.returns.push(ReturnTarget::Boolean);
        assert!(query.is_boolean());
    }
}
