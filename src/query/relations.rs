//! Dispatch from relation clauses to PKB lookups.
//!
//! A clause is first resolved against the declaration map: the relation
//! name plus the shapes of its two arguments select one concrete PKB
//! subrelation, or nothing when the combination is outside the table (a
//! variable synonym in a statement position, a wildcard as the first
//! argument of `Uses`, an undeclared synonym). An unresolvable clause fails
//! the whole query.
//!
//! Resolved relations are queried through four flavors: fixed left value,
//! fixed right value, left wildcard domain, right wildcard domain. All
//! values cross this boundary as strings; statement numbers use their
//! canonical decimal form.

use crate::pkb::Pkb;
use crate::query::{Arg, ClauseType, EntityType, Query};

/// A relation clause resolved to a concrete PKB subrelation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResolvedRel {
    Follows { transitive: bool },
    Parent { transitive: bool },
    UsesStmt,
    UsesProc,
    ModifiesStmt,
    ModifiesProc,
    Calls { transitive: bool },
    Next { transitive: bool },
    NextBip { transitive: bool },
    Affects { transitive: bool },
    AffectsBip { transitive: bool },
}

/// Argument positions a relation can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArgPosition {
    StmtRef,
    VarRef,
    ProcRef,
}

/// Whether an argument fits a position, given the declarations.
fn fits(arg: &Arg, position: ArgPosition, query: &Query) -> bool {
    match (arg, position) {
        (Arg::Wildcard, _) => true,
        (Arg::Number(_), ArgPosition::StmtRef) => true,
        (Arg::Number(_), _) => false,
        (Arg::Name(_), ArgPosition::VarRef | ArgPosition::ProcRef) => true,
        (Arg::Name(_), ArgPosition::StmtRef) => false,
        (Arg::Synonym(name), position) => match query.kind_of(name) {
            Some(kind) => match position {
                ArgPosition::StmtRef => kind.is_stmt_kind(),
                ArgPosition::VarRef => kind == EntityType::Variable,
                ArgPosition::ProcRef => kind == EntityType::Procedure,
            },
            None => false,
        },
    }
}

/// Resolve a clause to a PKB subrelation, or `None` when the argument
/// shapes are invalid for the relation.
pub(crate) fn resolve(
    rel: ClauseType,
    left: &Arg,
    right: &Arg,
    query: &Query,
) -> Option<ResolvedRel> {
    use ArgPosition::*;
    let transitive = rel.is_transitive();

    let resolved = match rel {
        ClauseType::Follows | ClauseType::FollowsT => {
            (fits(left, StmtRef, query) && fits(right, StmtRef, query))
                .then_some(ResolvedRel::Follows { transitive })
        }
        ClauseType::Parent | ClauseType::ParentT => {
            (fits(left, StmtRef, query) && fits(right, StmtRef, query))
                .then_some(ResolvedRel::Parent { transitive })
        }
        ClauseType::Next | ClauseType::NextT => {
            (fits(left, StmtRef, query) && fits(right, StmtRef, query))
                .then_some(ResolvedRel::Next { transitive })
        }
        ClauseType::NextBip | ClauseType::NextBipT => {
            (fits(left, StmtRef, query) && fits(right, StmtRef, query))
                .then_some(ResolvedRel::NextBip { transitive })
        }
        ClauseType::Affects | ClauseType::AffectsT => {
            (fits(left, StmtRef, query) && fits(right, StmtRef, query))
                .then_some(ResolvedRel::Affects { transitive })
        }
        ClauseType::AffectsBip | ClauseType::AffectsBipT => {
            (fits(left, StmtRef, query) && fits(right, StmtRef, query))
                .then_some(ResolvedRel::AffectsBip { transitive })
        }
        ClauseType::Calls | ClauseType::CallsT => {
            (fits(left, ProcRef, query) && fits(right, ProcRef, query))
                .then_some(ResolvedRel::Calls { transitive })
        }
        ClauseType::Uses | ClauseType::Modifies => {
            // The first argument decides the statement or procedure flavor;
            // a wildcard there is ambiguous and therefore invalid.
            if !fits(right, VarRef, query) {
                return None;
            }
            let stmt_flavor = match left {
                Arg::Wildcard => return None,
                Arg::Number(_) => true,
                Arg::Name(_) => false,
                Arg::Synonym(name) => match query.kind_of(name) {
                    Some(EntityType::Procedure) => false,
                    Some(kind) if kind.is_stmt_kind() => true,
                    _ => return None,
                },
            };
            Some(match (rel == ClauseType::Uses, stmt_flavor) {
                (true, true) => ResolvedRel::UsesStmt,
                (true, false) => ResolvedRel::UsesProc,
                (false, true) => ResolvedRel::ModifiesStmt,
                (false, false) => ResolvedRel::ModifiesProc,
            })
        }
    };
    resolved
}

fn num(value: &str) -> Option<u32> {
    value.parse().ok()
}

fn stringify(numbers: Vec<u32>) -> Vec<String> {
    numbers.into_iter().map(|n| n.to_string()).collect()
}

/// Values y with `R(left, y)`.
pub(crate) fn right_of(pkb: &Pkb, rel: ResolvedRel, left: &str) -> Vec<String> {
    match rel {
        ResolvedRel::Follows { transitive } => num(left)
            .map(|n| stringify(pkb.follows_after(n, transitive)))
            .unwrap_or_default(),
        ResolvedRel::Parent { transitive } => num(left)
            .map(|n| stringify(pkb.children_of(n, transitive)))
            .unwrap_or_default(),
        ResolvedRel::UsesStmt => num(left)
            .map(|n| pkb.vars_used_by_stmt(n))
            .unwrap_or_default(),
        ResolvedRel::UsesProc => pkb.vars_used_by_proc(left),
        ResolvedRel::ModifiesStmt => num(left)
            .map(|n| pkb.vars_modified_by_stmt(n))
            .unwrap_or_default(),
        ResolvedRel::ModifiesProc => pkb.vars_modified_by_proc(left),
        ResolvedRel::Calls { transitive } => pkb.callees_of(left, transitive),
        ResolvedRel::Next { transitive } => num(left)
            .map(|n| stringify(pkb.next_of(n, transitive)))
            .unwrap_or_default(),
        ResolvedRel::NextBip { transitive } => num(left)
            .map(|n| stringify(pkb.next_bip_of(n, transitive)))
            .unwrap_or_default(),
        ResolvedRel::Affects { transitive } => num(left)
            .map(|n| stringify(pkb.affects_from(n, transitive)))
            .unwrap_or_default(),
        ResolvedRel::AffectsBip { transitive } => num(left)
            .map(|n| stringify(pkb.affects_bip_from(n, transitive)))
            .unwrap_or_default(),
    }
}

/// Values x with `R(x, right)`.
pub(crate) fn left_of(pkb: &Pkb, rel: ResolvedRel, right: &str) -> Vec<String> {
    match rel {
        ResolvedRel::Follows { transitive } => num(right)
            .map(|n| stringify(pkb.follows_before(n, transitive)))
            .unwrap_or_default(),
        ResolvedRel::Parent { transitive } => num(right)
            .map(|n| stringify(pkb.parents_of(n, transitive)))
            .unwrap_or_default(),
        ResolvedRel::UsesStmt => stringify(pkb.stmts_using(right)),
        ResolvedRel::UsesProc => pkb.procs_using(right),
        ResolvedRel::ModifiesStmt => stringify(pkb.stmts_modifying(right)),
        ResolvedRel::ModifiesProc => pkb.procs_modifying(right),
        ResolvedRel::Calls { transitive } => pkb.callers_of(right, transitive),
        ResolvedRel::Next { transitive } => num(right)
            .map(|n| stringify(pkb.prev_of(n, transitive)))
            .unwrap_or_default(),
        ResolvedRel::NextBip { transitive } => num(right)
            .map(|n| stringify(pkb.prev_bip_of(n, transitive)))
            .unwrap_or_default(),
        ResolvedRel::Affects { transitive } => num(right)
            .map(|n| stringify(pkb.affects_to(n, transitive)))
            .unwrap_or_default(),
        ResolvedRel::AffectsBip { transitive } => num(right)
            .map(|n| stringify(pkb.affects_bip_to(n, transitive)))
            .unwrap_or_default(),
    }
}

/// Whether `R(left, right)` holds.
pub(crate) fn holds(pkb: &Pkb, rel: ResolvedRel, left: &str, right: &str) -> bool {
    right_of(pkb, rel, left).iter().any(|v| v == right)
}

/// Values x with `R(x, _)`.
pub(crate) fn left_domain(pkb: &Pkb, rel: ResolvedRel) -> Vec<String> {
    match rel {
        ResolvedRel::Follows { .. } => stringify(pkb.statements_with_follower()),
        ResolvedRel::Parent { .. } => stringify(pkb.statements_with_child()),
        ResolvedRel::UsesStmt => stringify(pkb.stmts_using_any()),
        ResolvedRel::UsesProc => pkb.procs_using_any(),
        ResolvedRel::ModifiesStmt => stringify(pkb.stmts_modifying_any()),
        ResolvedRel::ModifiesProc => pkb.procs_modifying_any(),
        ResolvedRel::Calls { .. } => pkb.procs_calling_any(),
        ResolvedRel::Next { .. } => stringify(pkb.stmts_with_next()),
        ResolvedRel::NextBip { .. } => stringify(pkb.stmts_with_next_bip()),
        ResolvedRel::Affects { .. } => stringify(pkb.stmts_affecting_any()),
        ResolvedRel::AffectsBip { .. } => stringify(pkb.stmts_affecting_bip_any()),
    }
}

/// Values y with `R(_, y)`.
pub(crate) fn right_domain(pkb: &Pkb, rel: ResolvedRel) -> Vec<String> {
    match rel {
        ResolvedRel::Follows { .. } => stringify(pkb.statements_following()),
        ResolvedRel::Parent { .. } => stringify(pkb.statements_with_parent()),
        ResolvedRel::UsesStmt => pkb.vars_used_by_some_stmt(),
        ResolvedRel::UsesProc => pkb.vars_used_by_some_proc(),
        ResolvedRel::ModifiesStmt => pkb.vars_modified_by_some_stmt(),
        ResolvedRel::ModifiesProc => pkb.vars_modified_by_some_proc(),
        ResolvedRel::Calls { .. } => pkb.procs_called_by_any(),
        ResolvedRel::Next { .. } => stringify(pkb.stmts_with_prev()),
        ResolvedRel::NextBip { .. } => stringify(pkb.stmts_with_prev_bip()),
        ResolvedRel::Affects { .. } => stringify(pkb.stmts_affected_any()),
        ResolvedRel::AffectsBip { .. } => stringify(pkb.stmts_affected_bip_any()),
    }
}
