//! The query evaluator: candidate sets, clause grouping and ordering, table
//! joins, and projection.
//!
//! Evaluation proceeds in stages. Clauses are validated and resolved against
//! the declaration map, candidate sets are materialized for every synonym a
//! clause or return target mentions, and clauses are grouped by the
//! connected components of the synonym-sharing graph. Zero-synonym clauses
//! are checked first since they can short-circuit the whole query. Within a
//! group, `with` clauses that pin a synonym to a literal run first, then
//! one-synonym clauses, then two-synonym clauses ordered by the product of
//! their candidate sizes. Each clause becomes a small table that is joined
//! into the group's running table; any empty join fails the query.
//!
//! Any failure (semantic poison, an unresolvable clause, an empty candidate
//! set, an empty join) produces no rows, or `FALSE` for BOOLEAN queries.

use crate::pkb::{Pkb, StmtType};
use crate::query::relations::{self, ResolvedRel};
use crate::query::table::ResultTable;
use crate::query::{
    attr_compatible, Arg, AttrArg, AttrName, EntityType, PatternClause, PatternSpec, Query,
    RelClause, ReturnTarget, WithClause,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Evaluates queries against one PKB.
pub struct QueryEvaluator<'a> {
    pkb: &'a Pkb,
}

impl<'a> QueryEvaluator<'a> {
    /// Create an evaluator over a PKB.
    pub fn new(pkb: &'a Pkb) -> Self {
        Self { pkb }
    }

    /// Evaluate a query to its result strings. A query that failed to parse
    /// (no return targets) produces nothing.
    pub fn evaluate(&self, query: &Query) -> Vec<String> {
        if query.returns.is_empty() {
            return Vec::new();
        }
        Evaluation {
            pkb: self.pkb,
            query,
            candidates: HashMap::new(),
        }
        .run()
    }
}

/// A clause in evaluation form.
enum Clause<'q> {
    Rel(&'q RelClause, ResolvedRel),
    Pattern(&'q PatternClause),
    With(&'q WithClause),
}

impl<'q> Clause<'q> {
    /// The synonyms this clause constrains.
    fn synonyms(&self) -> Vec<&'q str> {
        let mut syns = Vec::new();
        match self {
            Clause::Rel(rel, _) => {
                syns.extend(rel.left.synonym());
                syns.extend(rel.right.synonym());
            }
            Clause::Pattern(pattern) => {
                syns.push(pattern.synonym.as_str());
                syns.extend(pattern.lhs.synonym());
            }
            Clause::With(with) => {
                for side in [&with.left, &with.right] {
                    if let AttrArg::Ref { synonym, .. } = side {
                        syns.push(synonym.as_str());
                    }
                }
            }
        }
        syns.dedup();
        syns
    }

    /// Whether this is a `with` clause pinning one synonym to a literal.
    fn pins_literal(&self) -> bool {
        if let Clause::With(with) = self {
            let refs = [&with.left, &with.right]
                .iter()
                .filter(|s| matches!(s, AttrArg::Ref { .. }))
                .count();
            refs == 1
        } else {
            false
        }
    }
}

/// The result of one clause.
enum Outcome {
    Holds(bool),
    Rows(ResultTable),
}

/// One side of a `with` clause after validation.
enum WithSide<'q> {
    Lit {
        value: String,
        numeric: bool,
    },
    Ref {
        synonym: &'q str,
        kind: EntityType,
        attr: Option<AttrName>,
    },
}

impl<'q> WithSide<'q> {
    fn numeric(&self) -> bool {
        match self {
            WithSide::Lit { numeric, .. } => *numeric,
            // A bare ref is a prog_line; attribute refs follow the attribute.
            WithSide::Ref { attr, .. } => attr.map(|a| a.is_numeric()).unwrap_or(true),
        }
    }
}

struct Evaluation<'a> {
    pkb: &'a Pkb,
    query: &'a Query,
    candidates: HashMap<String, Vec<String>>,
}

impl<'a> Evaluation<'a> {
    fn run(mut self) -> Vec<String> {
        if self.query.poisoned {
            trace!("query is semantically poisoned");
            return self.failure();
        }
        if self.query.returns.len() > 1
            && self.query.returns.iter().any(|r| matches!(r, ReturnTarget::Boolean))
        {
            return self.failure();
        }

        // Resolve and validate every clause up front.
        let mut clauses: Vec<Clause> = Vec::new();
        for rel in &self.query.such_that {
            match relations::resolve(rel.rel, &rel.left, &rel.right, self.query) {
                Some(resolved) => clauses.push(Clause::Rel(rel, resolved)),
                None => {
                    trace!(rel = %rel.rel, "clause arguments do not fit the relation");
                    return self.failure();
                }
            }
        }
        for pattern in &self.query.patterns {
            if !self.pattern_is_valid(pattern) {
                return self.failure();
            }
            clauses.push(Clause::Pattern(pattern));
        }
        for with in &self.query.with {
            let (Some(left), Some(right)) =
                (self.with_side(&with.left), self.with_side(&with.right))
            else {
                return self.failure();
            };
            if left.numeric() != right.numeric() {
                return self.failure();
            }
            clauses.push(Clause::With(with));
        }

        // Candidate sets for every synonym in a clause or return target.
        let mut needed: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        for clause in &clauses {
            for syn in clause.synonyms() {
                if seen.insert(syn.to_string()) {
                    needed.push(syn.to_string());
                }
            }
        }
        for target in &self.query.returns {
            if let ReturnTarget::Elem { synonym, .. } = target {
                if seen.insert(synonym.clone()) {
                    needed.push(synonym.clone());
                }
            }
        }
        for syn in needed {
            let Some(values) = self.candidate_values(&syn) else {
                return self.failure();
            };
            if values.is_empty() {
                trace!(synonym = %syn, "candidate set is empty");
                return self.failure();
            }
            self.candidates.insert(syn, values);
        }

        let (booleans, groups) = group_clauses(&clauses);
        debug!(
            clauses = clauses.len(),
            groups = groups.len(),
            boolean = self.query.is_boolean(),
            "evaluating query"
        );

        // Zero-synonym clauses short-circuit before any join work.
        for clause in booleans {
            match self.eval_clause(clause) {
                Outcome::Holds(true) => {}
                _ => return self.failure(),
            }
        }

        let return_syns: HashSet<&str> = self
            .query
            .returns
            .iter()
            .filter_map(|t| match t {
                ReturnTarget::Elem { synonym, .. } => Some(synonym.as_str()),
                ReturnTarget::Boolean => None,
            })
            .collect();

        let mut final_table = ResultTable::new();
        for mut group in groups {
            self.order_group(&mut group);
            let mut table = ResultTable::new();
            for clause in group {
                match self.eval_clause(clause) {
                    Outcome::Holds(true) => {}
                    Outcome::Holds(false) => return self.failure(),
                    Outcome::Rows(rows) => {
                        table = table.merge(rows);
                        if table.is_empty() {
                            return self.failure();
                        }
                    }
                }
            }
            // This group is fully evaluated; only returned columns matter now.
            for column in table.columns().to_vec() {
                if !return_syns.contains(column.as_str()) {
                    table.drop_column(&column);
                }
            }
            table.compact();
            if !table.columns().is_empty() {
                final_table = final_table.merge(table);
                if final_table.is_empty() {
                    return self.failure();
                }
            }
        }

        if self.query.is_boolean() {
            return vec!["TRUE".to_string()];
        }
        self.project(final_table)
    }

    /// The failure result: nothing, or `FALSE` for BOOLEAN queries.
    fn failure(&self) -> Vec<String> {
        if self.query.is_boolean() {
            vec!["FALSE".to_string()]
        } else {
            Vec::new()
        }
    }

    /// All values a synonym ranges over, before any clause constrains it.
    fn candidate_values(&self, synonym: &str) -> Option<Vec<String>> {
        let kind = self.query.kind_of(synonym)?;
        let stringify = |v: Vec<u32>| v.into_iter().map(|n| n.to_string()).collect();
        Some(match kind {
            EntityType::Variable => self.pkb.all_variables(),
            EntityType::Procedure => self.pkb.all_procedures(),
            EntityType::Constant => self.pkb.all_constants(),
            EntityType::Stmt | EntityType::ProgLine => stringify(self.pkb.all_statements()),
            EntityType::Read => stringify(self.pkb.statements_of(StmtType::Read)),
            EntityType::Print => stringify(self.pkb.statements_of(StmtType::Print)),
            EntityType::Call => stringify(self.pkb.statements_of(StmtType::Call)),
            EntityType::While => stringify(self.pkb.statements_of(StmtType::While)),
            EntityType::If => stringify(self.pkb.statements_of(StmtType::If)),
            EntityType::Assign => stringify(self.pkb.statements_of(StmtType::Assign)),
        })
    }

    /// Order clauses inside a group: literal-pinning `with` clauses first,
    /// then one-synonym clauses, then two-synonym clauses by ascending
    /// product of their candidate sizes.
    fn order_group(&self, group: &mut [&Clause<'_>]) {
        group.sort_by_key(|clause| {
            if clause.pins_literal() {
                return (0u8, 0usize);
            }
            let syns = clause.synonyms();
            match syns.len() {
                0 | 1 => (1, 0),
                _ => {
                    let product = syns
                        .iter()
                        .map(|s| self.candidates.get(*s).map(|c| c.len()).unwrap_or(0))
                        .product();
                    (2, product)
                }
            }
        });
    }

    fn eval_clause(&self, clause: &Clause<'_>) -> Outcome {
        match clause {
            Clause::Rel(rel, resolved) => self.eval_relation(*resolved, &rel.left, &rel.right),
            Clause::Pattern(pattern) => self.eval_pattern(pattern),
            Clause::With(with) => self.eval_with(with),
        }
    }

    /// Intersect relation results with a synonym's candidates, preserving
    /// the relation's order.
    fn restrict(&self, synonym: &str, values: Vec<String>) -> Vec<String> {
        let allowed: HashSet<&String> = self.candidates[synonym].iter().collect();
        values.into_iter().filter(|v| allowed.contains(v)).collect()
    }

    fn eval_relation(&self, rel: ResolvedRel, left: &Arg, right: &Arg) -> Outcome {
        let literal = |arg: &Arg| match arg {
            Arg::Number(n) => Some(n.to_string()),
            Arg::Name(name) => Some(name.clone()),
            _ => None,
        };

        match (left, right) {
            (Arg::Synonym(a), Arg::Synonym(b)) if a == b => {
                // Self-relation: keep the values related to themselves.
                let values: Vec<String> = self.candidates[a]
                    .iter()
                    .filter(|x| relations::holds(self.pkb, rel, x, x))
                    .cloned()
                    .collect();
                Outcome::Rows(ResultTable::from_column(a.clone(), values))
            }
            (Arg::Synonym(a), Arg::Synonym(b)) => {
                let allowed: HashSet<&String> = self.candidates[b].iter().collect();
                let mut rows = Vec::new();
                for x in &self.candidates[a] {
                    for y in relations::right_of(self.pkb, rel, x) {
                        if allowed.contains(&y) {
                            rows.push(vec![x.clone(), y]);
                        }
                    }
                }
                Outcome::Rows(ResultTable::from_columns(vec![a.clone(), b.clone()], rows))
            }
            (Arg::Synonym(a), _) => {
                let base = match literal(right) {
                    Some(value) => relations::left_of(self.pkb, rel, &value),
                    None => relations::left_domain(self.pkb, rel),
                };
                Outcome::Rows(ResultTable::from_column(a.clone(), self.restrict(a, base)))
            }
            (_, Arg::Synonym(b)) => {
                let base = match literal(left) {
                    Some(value) => relations::right_of(self.pkb, rel, &value),
                    None => relations::right_domain(self.pkb, rel),
                };
                Outcome::Rows(ResultTable::from_column(b.clone(), self.restrict(b, base)))
            }
            _ => {
                let holds = match (literal(left), literal(right)) {
                    (Some(l), Some(r)) => relations::holds(self.pkb, rel, &l, &r),
                    (Some(l), None) => !relations::right_of(self.pkb, rel, &l).is_empty(),
                    (None, Some(r)) => !relations::left_of(self.pkb, rel, &r).is_empty(),
                    (None, None) => !relations::left_domain(self.pkb, rel).is_empty(),
                };
                Outcome::Holds(holds)
            }
        }
    }

    fn pattern_is_valid(&self, pattern: &PatternClause) -> bool {
        let Some(kind) = self.query.kind_of(&pattern.synonym) else {
            return false;
        };
        let kind_ok = match kind {
            EntityType::Assign => true,
            // Condition patterns admit only wildcard bodies.
            EntityType::If | EntityType::While => pattern.spec == PatternSpec::Any,
            _ => false,
        };
        let lhs_ok = match &pattern.lhs {
            Arg::Wildcard | Arg::Name(_) => true,
            Arg::Synonym(v) => self.query.kind_of(v) == Some(EntityType::Variable),
            Arg::Number(_) => false,
        };
        kind_ok && lhs_ok
    }

    fn eval_pattern(&self, pattern: &PatternClause) -> Outcome {
        // (statement, variable) pairs: assignments with their assignee, or
        // containers with their condition variables.
        let pairs: Vec<(u32, String)> = match self.query.kind_of(&pattern.synonym) {
            Some(EntityType::Assign) => match &pattern.spec {
                PatternSpec::Any => self.pkb.all_assign_pairs(),
                PatternSpec::Exact(canonical) => self.pkb.assigns_matching(canonical, true),
                PatternSpec::Sub(canonical) => self.pkb.assigns_matching(canonical, false),
            },
            Some(EntityType::While) => self.pkb.while_cond_pairs(),
            Some(EntityType::If) => self.pkb.if_cond_pairs(),
            _ => Vec::new(),
        };

        match &pattern.lhs {
            Arg::Synonym(var_syn) => {
                let stmt_allowed: HashSet<&String> =
                    self.candidates[&pattern.synonym].iter().collect();
                let var_allowed: HashSet<&String> = self.candidates[var_syn].iter().collect();
                let rows: Vec<Vec<String>> = pairs
                    .into_iter()
                    .map(|(s, v)| vec![s.to_string(), v])
                    .filter(|row| stmt_allowed.contains(&row[0]) && var_allowed.contains(&row[1]))
                    .collect();
                Outcome::Rows(ResultTable::from_columns(
                    vec![pattern.synonym.clone(), var_syn.clone()],
                    rows,
                ))
            }
            lhs => {
                let filter_name = match lhs {
                    Arg::Name(name) => Some(name.as_str()),
                    _ => None,
                };
                let mut stmts: Vec<String> = pairs
                    .into_iter()
                    .filter(|(_, v)| filter_name.map(|n| v == n).unwrap_or(true))
                    .map(|(s, _)| s.to_string())
                    .collect();
                stmts.dedup();
                Outcome::Rows(ResultTable::from_column(
                    pattern.synonym.clone(),
                    self.restrict(&pattern.synonym, stmts),
                ))
            }
        }
    }

    /// Classify and validate one side of a `with` clause.
    fn with_side<'q>(&self, arg: &'q AttrArg) -> Option<WithSide<'q>> {
        match arg {
            AttrArg::Number(n) => Some(WithSide::Lit {
                value: n.to_string(),
                numeric: true,
            }),
            AttrArg::Name(name) => Some(WithSide::Lit {
                value: name.clone(),
                numeric: false,
            }),
            AttrArg::Ref { synonym, attr } => {
                let kind = self.query.kind_of(synonym)?;
                match attr {
                    // A bare synonym in `with` must be a prog_line.
                    None => (kind == EntityType::ProgLine).then_some(()),
                    Some(attr) => attr_compatible(kind, *attr).then_some(()),
                }?;
                Some(WithSide::Ref {
                    synonym: synonym.as_str(),
                    kind,
                    attr: *attr,
                })
            }
        }
    }

    /// The attribute value of one candidate value: the value itself except
    /// for the attributes backed by the call/read/print maps.
    fn attr_of(&self, kind: EntityType, attr: Option<AttrName>, value: &str) -> Option<String> {
        match (kind, attr) {
            (EntityType::Call, Some(AttrName::ProcName)) => {
                value.parse().ok().and_then(|s| self.pkb.called_proc_name(s))
            }
            (EntityType::Read, Some(AttrName::VarName)) => {
                value.parse().ok().and_then(|s| self.pkb.read_var_name(s))
            }
            (EntityType::Print, Some(AttrName::VarName)) => {
                value.parse().ok().and_then(|s| self.pkb.print_var_name(s))
            }
            _ => Some(value.to_string()),
        }
    }

    fn eval_with(&self, with: &WithClause) -> Outcome {
        // Sides were validated before grouping.
        let (Some(left), Some(right)) = (self.with_side(&with.left), self.with_side(&with.right))
        else {
            return Outcome::Holds(false);
        };

        match (left, right) {
            (WithSide::Lit { value: l, .. }, WithSide::Lit { value: r, .. }) => {
                Outcome::Holds(l == r)
            }
            (WithSide::Ref { synonym, kind, attr }, WithSide::Lit { value, .. })
            | (WithSide::Lit { value, .. }, WithSide::Ref { synonym, kind, attr }) => {
                let values: Vec<String> = self.candidates[synonym]
                    .iter()
                    .filter(|x| self.attr_of(kind, attr, x).as_deref() == Some(value.as_str()))
                    .cloned()
                    .collect();
                Outcome::Rows(ResultTable::from_column(synonym.to_string(), values))
            }
            (WithSide::Ref { synonym: a, .. }, WithSide::Ref { synonym: b, .. }) if a == b => {
                // Same synonym on both sides of a same-domain equality.
                Outcome::Holds(true)
            }
            (
                WithSide::Ref { synonym: a, kind: ka, attr: aa },
                WithSide::Ref { synonym: b, kind: kb, attr: ab },
            ) => {
                let mut by_attr: HashMap<String, Vec<&String>> = HashMap::new();
                for y in &self.candidates[b] {
                    if let Some(value) = self.attr_of(kb, ab, y) {
                        by_attr.entry(value).or_default().push(y);
                    }
                }
                let mut rows = Vec::new();
                for x in &self.candidates[a] {
                    let Some(value) = self.attr_of(ka, aa, x) else {
                        continue;
                    };
                    if let Some(matches) = by_attr.get(&value) {
                        for y in matches {
                            rows.push(vec![x.clone(), (*y).clone()]);
                        }
                    }
                }
                Outcome::Rows(ResultTable::from_columns(
                    vec![a.to_string(), b.to_string()],
                    rows,
                ))
            }
        }
    }

    /// Project the final table to the requested tuple, expanding mapped
    /// attributes into derived columns and joining in unconstrained
    /// candidate columns.
    fn project(&self, mut table: ResultTable) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for target in &self.query.returns {
            let ReturnTarget::Elem { synonym, attr } = target else {
                continue;
            };
            if !table.contains_column(synonym) {
                table = table.merge(ResultTable::from_column(
                    synonym.clone(),
                    self.candidates[synonym].clone(),
                ));
            }
            let kind = self.query.kind_of(synonym);
            let mapped = matches!(
                (kind, attr),
                (Some(EntityType::Call), Some(AttrName::ProcName))
                    | (Some(EntityType::Read), Some(AttrName::VarName))
                    | (Some(EntityType::Print), Some(AttrName::VarName))
            );
            match (mapped, kind, attr) {
                (true, Some(kind), Some(attr_name)) => {
                    let column = format!("{}.{}", synonym, attr_keyword(*attr_name));
                    if !table.contains_column(&column) {
                        let rows: Vec<Vec<String>> = self.candidates[synonym]
                            .iter()
                            .filter_map(|x| {
                                self.attr_of(kind, Some(*attr_name), x)
                                    .map(|v| vec![x.clone(), v])
                            })
                            .collect();
                        table = table.merge(ResultTable::from_columns(
                            vec![synonym.clone(), column.clone()],
                            rows,
                        ));
                    }
                    columns.push(column);
                }
                _ => columns.push(synonym.clone()),
            }
        }

        if table.is_empty() {
            return Vec::new();
        }
        table
            .project_distinct(&columns)
            .into_iter()
            .map(|row| row.join(" "))
            .collect()
    }
}

/// The surface spelling of an attribute.
fn attr_keyword(attr: AttrName) -> &'static str {
    match attr {
        AttrName::ProcName => "procName",
        AttrName::VarName => "varName",
        AttrName::Value => "value",
        AttrName::StmtNo => "stmt#",
    }
}

/// Split clauses into zero-synonym checks and connected groups of the
/// synonym-sharing graph.
fn group_clauses<'c, 'q>(
    clauses: &'c [Clause<'q>],
) -> (Vec<&'c Clause<'q>>, Vec<Vec<&'c Clause<'q>>>) {
    let mut booleans = Vec::new();
    let mut roots: HashMap<String, usize> = HashMap::new();
    let mut parent: Vec<usize> = Vec::new();

    fn find(parent: &mut Vec<usize>, mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    let mut clause_root: Vec<Option<usize>> = Vec::new();
    for clause in clauses {
        let syns = clause.synonyms();
        if syns.is_empty() {
            booleans.push(clause);
            clause_root.push(None);
            continue;
        }
        let mut ids: Vec<usize> = Vec::new();
        for syn in syns {
            let id = *roots.entry(syn.to_string()).or_insert_with(|| {
                parent.push(parent.len());
                parent.len() - 1
            });
            ids.push(id);
        }
        let root = find(&mut parent, ids[0]);
        for id in &ids[1..] {
            let other = find(&mut parent, *id);
            parent[other] = root;
        }
        clause_root.push(Some(root));
    }

    // Bucket clauses by their final root, in first-appearance order.
    let mut group_order: Vec<usize> = Vec::new();
    let mut groups: HashMap<usize, Vec<&Clause>> = HashMap::new();
    for (clause, root) in clauses.iter().zip(&clause_root) {
        let Some(root) = root else { continue };
        let root = find(&mut parent, *root);
        if !groups.contains_key(&root) {
            group_order.push(root);
        }
        groups.entry(root).or_default().push(clause);
    }

    let grouped = group_order
        .into_iter()
        .filter_map(|root| groups.remove(&root))
        .collect();
    (booleans, grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend;
    use crate::query::parse_query;

    const SOURCE: &str = r#"
        procedure main {
            while (y == 3) {
                gucci = 1;
            }
            if (!(armani == gucci)) then {
                armani = 7;
            } else {
                apple = 1;
            }
            some_var = 23 + another_var;
        }
    "#;

    fn eval(source: &str, query_text: &str) -> Vec<String> {
        let program = frontend::parse(source).unwrap();
        let pkb = Pkb::build(&program).unwrap();
        let query = parse_query(query_text).unwrap_or_default();
        QueryEvaluator::new(&pkb).evaluate(&query)
    }

    #[test]
    fn test_select_all_of_kind() {
        assert_eq!(eval(SOURCE, "assign a; Select a"), vec!["2", "4", "5", "6"]);
        assert_eq!(eval(SOURCE, "while w; Select w"), vec!["1"]);
        assert_eq!(
            eval(SOURCE, "variable v; Select v"),
            vec!["another_var", "apple", "armani", "gucci", "some_var", "y"]
        );
    }

    #[test]
    fn test_follows_clauses() {
        assert_eq!(eval(SOURCE, "stmt s; Select s such that Follows(1, s)"), vec!["3"]);
        assert_eq!(
            eval(SOURCE, "stmt s; Select s such that Follows*(1, s)"),
            vec!["3", "6"]
        );
    }

    #[test]
    fn test_parent_star() {
        assert_eq!(
            eval(SOURCE, "stmt s; Select s such that Parent*(3, s)"),
            vec!["4", "5"]
        );
    }

    #[test]
    fn test_modifies_literal() {
        assert_eq!(
            eval(SOURCE, "variable v; Select v such that Modifies(3, v)"),
            vec!["apple", "armani"]
        );
    }

    #[test]
    fn test_pattern_subexpression() {
        assert_eq!(
            eval(SOURCE, "assign a; Select a pattern a(_, _\"another_var\"_)"),
            vec!["6"]
        );
    }

    #[test]
    fn test_boolean_short_circuit() {
        assert_eq!(eval(SOURCE, "Select BOOLEAN such that Follows(1, 3)"), vec!["TRUE"]);
        assert_eq!(eval(SOURCE, "Select BOOLEAN such that Follows(1, 4)"), vec!["FALSE"]);
    }

    #[test]
    fn test_two_synonym_join() {
        assert_eq!(
            eval(SOURCE, "while w; assign a; Select a such that Parent(w, a)"),
            vec!["2"]
        );
    }

    #[test]
    fn test_unrelated_group_only_gates() {
        // The while/assign group is satisfiable, so the variable list is full.
        assert_eq!(
            eval(
                SOURCE,
                "variable v; while w; assign a; Select v such that Parent(w, a)"
            ),
            vec!["another_var", "apple", "armani", "gucci", "some_var", "y"]
        );
        // An unsatisfiable independent group empties the result.
        assert_eq!(
            eval(
                SOURCE,
                "variable v; read r; Select v such that Modifies(r, _)"
            ),
            Vec::<String>::new()
        );
    }

    #[test]
    fn test_empty_candidate_set_fails_query() {
        assert_eq!(eval(SOURCE, "read r; Select r"), Vec::<String>::new());
        assert_eq!(eval(SOURCE, "read r; Select BOOLEAN such that Modifies(r, _)"), vec!["FALSE"]);
    }

    #[test]
    fn test_tuple_projection() {
        assert_eq!(
            eval(SOURCE, "while w; assign a; Select <w, a> such that Parent(w, a)"),
            vec!["1 2"]
        );
    }

    #[test]
    fn test_with_literal_filter() {
        assert_eq!(eval(SOURCE, "stmt s; Select s with s.stmt# = 4"), vec!["4"]);
        assert_eq!(
            eval(SOURCE, "variable v; Select v with v.varName = \"apple\""),
            vec!["apple"]
        );
        assert_eq!(eval(SOURCE, "prog_line n; Select n with n = 2"), vec!["2"]);
    }

    #[test]
    fn test_with_cross_domain_is_invalid() {
        assert_eq!(
            eval(SOURCE, "stmt s; Select s with s.stmt# = \"apple\""),
            Vec::<String>::new()
        );
    }

    #[test]
    fn test_self_relation() {
        // No statement follows itself.
        assert_eq!(
            eval(SOURCE, "stmt s; Select s such that Follows(s, s)"),
            Vec::<String>::new()
        );
    }

    #[test]
    fn test_attribute_projection() {
        let source = r#"
            procedure first {
                call second;
                read x;
            }
            procedure second { y = 1; }
        "#;
        assert_eq!(eval(source, "call c; Select c.procName"), vec!["second"]);
        assert_eq!(eval(source, "read r; Select r.varName"), vec!["x"]);
        assert_eq!(eval(source, "call c; Select <c, c.procName>"), vec!["1 second"]);
    }

    #[test]
    fn test_with_attribute_join() {
        let source = r#"
            procedure first {
                call second;
            }
            procedure second { y = 1; }
        "#;
        assert_eq!(
            eval(
                source,
                "call c; procedure p; Select p with c.procName = p.procName"
            ),
            vec!["second"]
        );
    }

    #[test]
    fn test_syntactic_error_yields_nothing() {
        assert_eq!(eval(SOURCE, "stmt s; Select"), Vec::<String>::new());
        assert_eq!(eval(SOURCE, "Select BOOLEAN such that"), Vec::<String>::new());
    }

    #[test]
    fn test_semantic_error_yields_false_for_boolean() {
        // Redeclared synonym poisons the query.
        assert_eq!(
            eval(SOURCE, "stmt s; assign s; Select BOOLEAN"),
            vec!["FALSE"]
        );
        assert_eq!(eval(SOURCE, "stmt s; assign s; Select s"), Vec::<String>::new());
    }

    #[test]
    fn test_repeated_evaluation_is_stable() {
        let program = frontend::parse(SOURCE).unwrap();
        let pkb = Pkb::build(&program).unwrap();
        let query = parse_query("assign a; stmt s; Select a such that Follows(s, a)").unwrap();
        let evaluator = QueryEvaluator::new(&pkb);
        assert_eq!(evaluator.evaluate(&query), evaluator.evaluate(&query));
    }
}
