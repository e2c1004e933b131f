//! Program knowledge base: the indexed design relations of one SIMPLE program.
//!
//! The PKB is built once by the design extractor and is read-only afterwards.
//! Eagerly built indices (statement kinds, Follows, Parent, Uses, Modifies,
//! Calls, the control-flow graphs, pattern and attribute tables) live in the
//! [`Pkb`] fields; the lazy relations (`Calls*`, `Affects`, `AffectsBip` and
//! their closures) are memoized per start node in interior-mutability caches,
//! so every accessor stays `&self`. The caches make `Pkb` single-threaded;
//! evaluators sharing one program each hold their own engine.

pub mod affects;
pub mod cfg;
pub mod extractor;

pub use cfg::{BipEdge, BipEdgeKind};

use crate::frontend::ast::Program;
use crate::utils::errors::ExtractError;
use crate::utils::intern::{NameInterner, Symbol};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

/// The kind of a statement, as recorded in the PKB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StmtType {
    /// `x = ...;`
    Assign,
    /// `call proc;`
    Call,
    /// `if (...) then {...} else {...}`
    If,
    /// `print x;`
    Print,
    /// `read x;`
    Read,
    /// `while (...) {...}`
    While,
}

/// One entry of the assignment pattern index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PatternEntry {
    /// Variable assigned to
    pub assignee: Symbol,
    /// The assignment statement
    pub stmt: u32,
    /// True for strict subexpressions of the right-hand side
    pub is_subexpr: bool,
}

/// The program knowledge base.
#[derive(Debug, Default)]
pub struct Pkb {
    pub(crate) names: NameInterner,

    // Entities
    pub(crate) statements: BTreeSet<u32>,
    pub(crate) stmt_types: HashMap<u32, StmtType>,
    pub(crate) by_type: HashMap<StmtType, BTreeSet<u32>>,
    pub(crate) variables: Vec<Symbol>,
    pub(crate) procedures: Vec<Symbol>,
    pub(crate) constants: BTreeSet<String>,

    // Follows
    pub(crate) follows_next: HashMap<u32, u32>,
    pub(crate) follows_prev: HashMap<u32, u32>,

    // Parent
    pub(crate) parent_children: HashMap<u32, BTreeSet<u32>>,
    pub(crate) parent_of: HashMap<u32, u32>,

    // Uses
    pub(crate) uses_by_stmt: HashMap<u32, BTreeSet<Symbol>>,
    pub(crate) stmts_by_used_var: HashMap<Symbol, BTreeSet<u32>>,
    pub(crate) uses_by_proc: HashMap<Symbol, BTreeSet<Symbol>>,
    pub(crate) procs_by_used_var: HashMap<Symbol, BTreeSet<Symbol>>,

    // Modifies
    pub(crate) mods_by_stmt: HashMap<u32, BTreeSet<Symbol>>,
    pub(crate) stmts_by_modified_var: HashMap<Symbol, BTreeSet<u32>>,
    pub(crate) mods_by_proc: HashMap<Symbol, BTreeSet<Symbol>>,
    pub(crate) procs_by_modified_var: HashMap<Symbol, BTreeSet<Symbol>>,

    // Calls
    pub(crate) calls_out: HashMap<Symbol, BTreeSet<Symbol>>,
    pub(crate) calls_in: HashMap<Symbol, BTreeSet<Symbol>>,

    // Control flow
    pub(crate) next_out: HashMap<u32, BTreeSet<u32>>,
    pub(crate) next_in: HashMap<u32, BTreeSet<u32>>,
    pub(crate) bip_out: HashMap<u32, Vec<BipEdge>>,
    pub(crate) bip_in: HashMap<u32, Vec<BipEdge>>,

    // Patterns
    pub(crate) pattern_index: HashMap<String, Vec<PatternEntry>>,
    pub(crate) while_cond_vars: HashMap<Symbol, BTreeSet<u32>>,
    pub(crate) if_cond_vars: HashMap<Symbol, BTreeSet<u32>>,

    // Statement attributes
    pub(crate) call_proc: HashMap<u32, Symbol>,
    pub(crate) calls_by_proc_name: HashMap<Symbol, BTreeSet<u32>>,
    pub(crate) read_var: HashMap<u32, Symbol>,
    pub(crate) reads_by_var_name: HashMap<Symbol, BTreeSet<u32>>,
    pub(crate) print_var: HashMap<u32, Symbol>,
    pub(crate) prints_by_var_name: HashMap<Symbol, BTreeSet<u32>>,

    // Assignment targets, needed by the dataflow search
    pub(crate) assign_target: HashMap<u32, Symbol>,

    // Memoization caches for the lazy relations
    pub(crate) calls_star_out_memo: RefCell<HashMap<Symbol, BTreeSet<Symbol>>>,
    pub(crate) calls_star_in_memo: RefCell<HashMap<Symbol, BTreeSet<Symbol>>>,
    pub(crate) affects_from_memo: RefCell<HashMap<u32, BTreeSet<u32>>>,
    pub(crate) affects_to_memo: RefCell<HashMap<u32, BTreeSet<u32>>>,
    pub(crate) affects_star_from_memo: RefCell<HashMap<u32, BTreeSet<u32>>>,
    pub(crate) affects_star_to_memo: RefCell<HashMap<u32, BTreeSet<u32>>>,
    pub(crate) affects_bip_memo: RefCell<Option<affects::BipRelation>>,
}

impl Pkb {
    /// Extract a knowledge base from a parsed program.
    pub fn build(program: &Program) -> Result<Pkb, ExtractError> {
        extractor::extract(program)
    }

    pub(crate) fn name_of(&self, sym: Symbol) -> &str {
        self.names.resolve(sym).unwrap_or("")
    }

    fn resolve_sorted(&self, syms: impl IntoIterator<Item = Symbol>) -> Vec<String> {
        let mut names: Vec<String> = syms
            .into_iter()
            .map(|s| self.name_of(s).to_string())
            .collect();
        names.sort();
        names
    }

    // -- Mass retrieval of design entities --

    /// All statement numbers, ascending.
    pub fn all_statements(&self) -> Vec<u32> {
        self.statements.iter().copied().collect()
    }

    /// All variable names, lexically sorted.
    pub fn all_variables(&self) -> Vec<String> {
        self.variables
            .iter()
            .map(|s| self.name_of(*s).to_string())
            .collect()
    }

    /// All procedure names, lexically sorted.
    pub fn all_procedures(&self) -> Vec<String> {
        self.procedures
            .iter()
            .map(|s| self.name_of(*s).to_string())
            .collect()
    }

    /// All constant values appearing in the program.
    pub fn all_constants(&self) -> Vec<String> {
        self.constants.iter().cloned().collect()
    }

    /// The kind of a statement, if the number is in range.
    pub fn stmt_type(&self, s: u32) -> Option<StmtType> {
        self.stmt_types.get(&s).copied()
    }

    /// All statements of one kind, ascending.
    pub fn statements_of(&self, t: StmtType) -> Vec<u32> {
        self.by_type
            .get(&t)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Check if s is an assignment.
    pub fn is_assign(&self, s: u32) -> bool {
        self.stmt_type(s) == Some(StmtType::Assign)
    }

    /// Check if s is a call statement.
    pub fn is_call(&self, s: u32) -> bool {
        self.stmt_type(s) == Some(StmtType::Call)
    }

    /// Check if s is an if statement.
    pub fn is_if(&self, s: u32) -> bool {
        self.stmt_type(s) == Some(StmtType::If)
    }

    /// Check if s is a print statement.
    pub fn is_print(&self, s: u32) -> bool {
        self.stmt_type(s) == Some(StmtType::Print)
    }

    /// Check if s is a read statement.
    pub fn is_read(&self, s: u32) -> bool {
        self.stmt_type(s) == Some(StmtType::Read)
    }

    /// Check if s is a while statement.
    pub fn is_while(&self, s: u32) -> bool {
        self.stmt_type(s) == Some(StmtType::While)
    }

    // -- Follows / Follows* --

    /// Statements t with `Follows(s, t)`, or `Follows*(s, t)` when transitive.
    pub fn follows_after(&self, s: u32, transitive: bool) -> Vec<u32> {
        let mut result = Vec::new();
        let mut current = s;
        while let Some(&next) = self.follows_next.get(&current) {
            result.push(next);
            if !transitive {
                break;
            }
            current = next;
        }
        result
    }

    /// Statements t with `Follows(t, s)`, or `Follows*(t, s)` when transitive.
    pub fn follows_before(&self, s: u32, transitive: bool) -> Vec<u32> {
        let mut result = Vec::new();
        let mut current = s;
        while let Some(&prev) = self.follows_prev.get(&current) {
            result.push(prev);
            if !transitive {
                break;
            }
            current = prev;
        }
        result
    }

    /// Statements that have a follower.
    pub fn statements_with_follower(&self) -> Vec<u32> {
        let mut v: Vec<u32> = self.follows_next.keys().copied().collect();
        v.sort_unstable();
        v
    }

    /// Statements that follow some statement.
    pub fn statements_following(&self) -> Vec<u32> {
        let mut v: Vec<u32> = self.follows_prev.keys().copied().collect();
        v.sort_unstable();
        v
    }

    // -- Parent / Parent* --

    /// Children of s, or all descendants when transitive.
    pub fn children_of(&self, s: u32, transitive: bool) -> Vec<u32> {
        if !transitive {
            return self
                .parent_children
                .get(&s)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default();
        }
        let mut result = BTreeSet::new();
        let mut stack: Vec<u32> = self
            .parent_children
            .get(&s)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        while let Some(child) = stack.pop() {
            if result.insert(child) {
                if let Some(grandchildren) = self.parent_children.get(&child) {
                    stack.extend(grandchildren.iter().copied());
                }
            }
        }
        result.into_iter().collect()
    }

    /// Parent of s, or all ancestors when transitive.
    pub fn parents_of(&self, s: u32, transitive: bool) -> Vec<u32> {
        let mut result = Vec::new();
        let mut current = s;
        while let Some(&parent) = self.parent_of.get(&current) {
            result.push(parent);
            if !transitive {
                break;
            }
            current = parent;
        }
        result
    }

    /// Container statements that have at least one child.
    pub fn statements_with_child(&self) -> Vec<u32> {
        let mut v: Vec<u32> = self.parent_children.keys().copied().collect();
        v.sort_unstable();
        v
    }

    /// Statements nested inside some container.
    pub fn statements_with_parent(&self) -> Vec<u32> {
        let mut v: Vec<u32> = self.parent_of.keys().copied().collect();
        v.sort_unstable();
        v
    }

    // -- Uses --

    /// Variables used by a statement.
    pub fn vars_used_by_stmt(&self, s: u32) -> Vec<String> {
        self.resolve_sorted(
            self.uses_by_stmt
                .get(&s)
                .map(|set| set.iter().copied().collect::<Vec<_>>())
                .unwrap_or_default(),
        )
    }

    /// Statements using a variable.
    pub fn stmts_using(&self, var: &str) -> Vec<u32> {
        self.names
            .get(var)
            .and_then(|sym| self.stmts_by_used_var.get(&sym))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Variables used by a procedure.
    pub fn vars_used_by_proc(&self, proc: &str) -> Vec<String> {
        self.resolve_sorted(
            self.names
                .get(proc)
                .and_then(|sym| self.uses_by_proc.get(&sym))
                .map(|set| set.iter().copied().collect::<Vec<_>>())
                .unwrap_or_default(),
        )
    }

    /// Procedures using a variable.
    pub fn procs_using(&self, var: &str) -> Vec<String> {
        self.resolve_sorted(
            self.names
                .get(var)
                .and_then(|sym| self.procs_by_used_var.get(&sym))
                .map(|set| set.iter().copied().collect::<Vec<_>>())
                .unwrap_or_default(),
        )
    }

    /// Statements that use at least one variable.
    pub fn stmts_using_any(&self) -> Vec<u32> {
        let mut v: Vec<u32> = self.uses_by_stmt.keys().copied().collect();
        v.sort_unstable();
        v
    }

    /// Procedures that use at least one variable.
    pub fn procs_using_any(&self) -> Vec<String> {
        self.resolve_sorted(self.uses_by_proc.keys().copied().collect::<Vec<_>>())
    }

    /// Variables used by at least one statement.
    pub fn vars_used_by_some_stmt(&self) -> Vec<String> {
        self.resolve_sorted(self.stmts_by_used_var.keys().copied().collect::<Vec<_>>())
    }

    /// Variables used by at least one procedure.
    pub fn vars_used_by_some_proc(&self) -> Vec<String> {
        self.resolve_sorted(self.procs_by_used_var.keys().copied().collect::<Vec<_>>())
    }

    // -- Modifies --

    /// Variables modified by a statement.
    pub fn vars_modified_by_stmt(&self, s: u32) -> Vec<String> {
        self.resolve_sorted(
            self.mods_by_stmt
                .get(&s)
                .map(|set| set.iter().copied().collect::<Vec<_>>())
                .unwrap_or_default(),
        )
    }

    /// Statements modifying a variable.
    pub fn stmts_modifying(&self, var: &str) -> Vec<u32> {
        self.names
            .get(var)
            .and_then(|sym| self.stmts_by_modified_var.get(&sym))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Variables modified by a procedure.
    pub fn vars_modified_by_proc(&self, proc: &str) -> Vec<String> {
        self.resolve_sorted(
            self.names
                .get(proc)
                .and_then(|sym| self.mods_by_proc.get(&sym))
                .map(|set| set.iter().copied().collect::<Vec<_>>())
                .unwrap_or_default(),
        )
    }

    /// Procedures modifying a variable.
    pub fn procs_modifying(&self, var: &str) -> Vec<String> {
        self.resolve_sorted(
            self.names
                .get(var)
                .and_then(|sym| self.procs_by_modified_var.get(&sym))
                .map(|set| set.iter().copied().collect::<Vec<_>>())
                .unwrap_or_default(),
        )
    }

    /// Statements that modify at least one variable.
    pub fn stmts_modifying_any(&self) -> Vec<u32> {
        let mut v: Vec<u32> = self.mods_by_stmt.keys().copied().collect();
        v.sort_unstable();
        v
    }

    /// Procedures that modify at least one variable.
    pub fn procs_modifying_any(&self) -> Vec<String> {
        self.resolve_sorted(self.mods_by_proc.keys().copied().collect::<Vec<_>>())
    }

    /// Variables modified by at least one statement.
    pub fn vars_modified_by_some_stmt(&self) -> Vec<String> {
        self.resolve_sorted(self.stmts_by_modified_var.keys().copied().collect::<Vec<_>>())
    }

    /// Variables modified by at least one procedure.
    pub fn vars_modified_by_some_proc(&self) -> Vec<String> {
        self.resolve_sorted(self.procs_by_modified_var.keys().copied().collect::<Vec<_>>())
    }

    // -- Calls / Calls* --

    /// Procedures called by `proc`, directly or transitively.
    pub fn callees_of(&self, proc: &str, transitive: bool) -> Vec<String> {
        let Some(sym) = self.names.get(proc) else {
            return Vec::new();
        };
        if !transitive {
            return self.resolve_sorted(
                self.calls_out
                    .get(&sym)
                    .map(|set| set.iter().copied().collect::<Vec<_>>())
                    .unwrap_or_default(),
            );
        }
        self.resolve_sorted(self.calls_closure(sym, &self.calls_out, &self.calls_star_out_memo))
    }

    /// Procedures that call `proc`, directly or transitively.
    pub fn callers_of(&self, proc: &str, transitive: bool) -> Vec<String> {
        let Some(sym) = self.names.get(proc) else {
            return Vec::new();
        };
        if !transitive {
            return self.resolve_sorted(
                self.calls_in
                    .get(&sym)
                    .map(|set| set.iter().copied().collect::<Vec<_>>())
                    .unwrap_or_default(),
            );
        }
        self.resolve_sorted(self.calls_closure(sym, &self.calls_in, &self.calls_star_in_memo))
    }

    /// Procedures that call something.
    pub fn procs_calling_any(&self) -> Vec<String> {
        self.resolve_sorted(self.calls_out.keys().copied().collect::<Vec<_>>())
    }

    /// Procedures called by something.
    pub fn procs_called_by_any(&self) -> Vec<String> {
        self.resolve_sorted(self.calls_in.keys().copied().collect::<Vec<_>>())
    }

    /// Memoized reachability over the call graph. The call graph is a DAG,
    /// so the walk terminates without a visited check per start node.
    fn calls_closure(
        &self,
        start: Symbol,
        edges: &HashMap<Symbol, BTreeSet<Symbol>>,
        memo: &RefCell<HashMap<Symbol, BTreeSet<Symbol>>>,
    ) -> Vec<Symbol> {
        if let Some(cached) = memo.borrow().get(&start) {
            return cached.iter().copied().collect();
        }
        let mut reached = BTreeSet::new();
        let mut stack: Vec<Symbol> = edges
            .get(&start)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        while let Some(p) = stack.pop() {
            if reached.insert(p) {
                if let Some(next) = edges.get(&p) {
                    stack.extend(next.iter().copied());
                }
            }
        }
        let result: Vec<Symbol> = reached.iter().copied().collect();
        memo.borrow_mut().insert(start, reached);
        result
    }

    // -- Statement attributes --

    /// The procedure name of a call statement.
    pub fn called_proc_name(&self, s: u32) -> Option<String> {
        self.call_proc.get(&s).map(|sym| self.name_of(*sym).to_string())
    }

    /// Call statements targeting the named procedure.
    pub fn call_stmts_calling(&self, proc: &str) -> Vec<u32> {
        self.names
            .get(proc)
            .and_then(|sym| self.calls_by_proc_name.get(&sym))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The variable name of a read statement.
    pub fn read_var_name(&self, s: u32) -> Option<String> {
        self.read_var.get(&s).map(|sym| self.name_of(*sym).to_string())
    }

    /// Read statements targeting the named variable.
    pub fn read_stmts_reading(&self, var: &str) -> Vec<u32> {
        self.names
            .get(var)
            .and_then(|sym| self.reads_by_var_name.get(&sym))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// The variable name of a print statement.
    pub fn print_var_name(&self, s: u32) -> Option<String> {
        self.print_var.get(&s).map(|sym| self.name_of(*sym).to_string())
    }

    /// Print statements targeting the named variable.
    pub fn print_stmts_printing(&self, var: &str) -> Vec<u32> {
        self.names
            .get(var)
            .and_then(|sym| self.prints_by_var_name.get(&sym))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    // -- Patterns --

    /// Assignments whose right-hand side matches the canonical expression:
    /// the full side for exact matches, any subexpression otherwise.
    /// Returns (statement, assignee) pairs in statement order.
    pub fn assigns_matching(&self, canonical: &str, exact: bool) -> Vec<(u32, String)> {
        let mut pairs: Vec<(u32, String)> = self
            .pattern_index
            .get(canonical)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| !exact || !e.is_subexpr)
                    .map(|e| (e.stmt, self.name_of(e.assignee).to_string()))
                    .collect()
            })
            .unwrap_or_default();
        pairs.sort();
        pairs.dedup();
        pairs
    }

    /// All assignments with their assignee, in statement order.
    pub fn all_assign_pairs(&self) -> Vec<(u32, String)> {
        let mut pairs: Vec<(u32, String)> = self
            .assign_target
            .iter()
            .map(|(s, sym)| (*s, self.name_of(*sym).to_string()))
            .collect();
        pairs.sort();
        pairs
    }

    /// (while-statement, condition-variable) pairs, in statement order.
    pub fn while_cond_pairs(&self) -> Vec<(u32, String)> {
        let mut pairs: Vec<(u32, String)> = self
            .while_cond_vars
            .iter()
            .flat_map(|(sym, stmts)| {
                let name = self.name_of(*sym).to_string();
                stmts.iter().map(move |s| (*s, name.clone()))
            })
            .collect();
        pairs.sort();
        pairs
    }

    /// (if-statement, condition-variable) pairs, in statement order.
    pub fn if_cond_pairs(&self) -> Vec<(u32, String)> {
        let mut pairs: Vec<(u32, String)> = self
            .if_cond_vars
            .iter()
            .flat_map(|(sym, stmts)| {
                let name = self.name_of(*sym).to_string();
                stmts.iter().map(move |s| (*s, name.clone()))
            })
            .collect();
        pairs.sort();
        pairs
    }

    /// While statements whose condition reads the named variable.
    pub fn whiles_with_cond_var(&self, var: &str) -> Vec<u32> {
        self.names
            .get(var)
            .and_then(|sym| self.while_cond_vars.get(&sym))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// If statements whose condition reads the named variable.
    pub fn ifs_with_cond_var(&self, var: &str) -> Vec<u32> {
        self.names
            .get(var)
            .and_then(|sym| self.if_cond_vars.get(&sym))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend;

    fn build(source: &str) -> Pkb {
        let program = frontend::parse(source).unwrap();
        Pkb::build(&program).unwrap()
    }

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

    #[test]
    fn test_entities() {
        let pkb = build(SOURCE);
        assert_eq!(pkb.all_statements(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(pkb.all_procedures(), vec!["main"]);
        assert_eq!(
            pkb.all_variables(),
            vec!["another_var", "apple", "armani", "gucci", "some_var", "y"]
        );
        assert_eq!(pkb.all_constants(), vec!["1", "23", "3", "7"]);
    }

    #[test]
    fn test_exactly_one_kind_per_statement() {
        let pkb = build(SOURCE);
        for s in pkb.all_statements() {
            let kinds = [
                pkb.is_assign(s),
                pkb.is_call(s),
                pkb.is_if(s),
                pkb.is_print(s),
                pkb.is_read(s),
                pkb.is_while(s),
            ];
            assert_eq!(kinds.iter().filter(|k| **k).count(), 1, "statement {}", s);
        }
    }

    #[test]
    fn test_follows() {
        let pkb = build(SOURCE);
        assert_eq!(pkb.follows_after(1, false), vec![3]);
        assert_eq!(pkb.follows_after(1, true), vec![3, 6]);
        assert_eq!(pkb.follows_before(6, true), vec![3, 1]);
        // Nested statements do not follow their container.
        assert_eq!(pkb.follows_after(2, false), Vec::<u32>::new());
    }

    #[test]
    fn test_parent() {
        let pkb = build(SOURCE);
        assert_eq!(pkb.children_of(1, false), vec![2]);
        assert_eq!(pkb.children_of(3, true), vec![4, 5]);
        assert_eq!(pkb.parents_of(4, false), vec![3]);
        assert_eq!(pkb.parents_of(6, false), Vec::<u32>::new());
    }

    #[test]
    fn test_uses_and_modifies() {
        let pkb = build(SOURCE);
        assert_eq!(pkb.vars_modified_by_stmt(3), vec!["apple", "armani"]);
        assert_eq!(pkb.vars_used_by_stmt(1), vec!["y"]);
        assert_eq!(pkb.stmts_using("gucci"), vec![3]);
        assert_eq!(pkb.vars_used_by_proc("main"), vec!["another_var", "armani", "gucci", "y"]);
        assert_eq!(
            pkb.vars_modified_by_proc("main"),
            vec!["apple", "armani", "gucci", "some_var"]
        );
    }

    #[test]
    fn test_pattern_lookup() {
        let pkb = build(SOURCE);
        assert_eq!(
            pkb.assigns_matching("another_var", false),
            vec![(6, "some_var".to_string())]
        );
        // Exact matches only accept the full right-hand side.
        assert_eq!(pkb.assigns_matching("another_var", true), Vec::new());
        assert_eq!(
            pkb.assigns_matching("(23+another_var)", true),
            vec![(6, "some_var".to_string())]
        );
    }

    #[test]
    fn test_condition_indices() {
        let pkb = build(SOURCE);
        assert_eq!(pkb.whiles_with_cond_var("y"), vec![1]);
        assert_eq!(pkb.ifs_with_cond_var("armani"), vec![3]);
        assert_eq!(pkb.ifs_with_cond_var("y"), Vec::<u32>::new());
        assert_eq!(
            pkb.if_cond_pairs(),
            vec![(3, "armani".to_string()), (3, "gucci".to_string())]
        );
    }

    #[test]
    fn test_calls_closure() {
        let pkb = build(
            r#"
            procedure first { call second; }
            procedure second { call third; }
            procedure third { x = 1; }
            "#,
        );
        assert_eq!(pkb.callees_of("first", false), vec!["second"]);
        assert_eq!(pkb.callees_of("first", true), vec!["second", "third"]);
        assert_eq!(pkb.callers_of("third", true), vec!["first", "second"]);
        assert_eq!(pkb.procs_calling_any(), vec!["first", "second"]);
        // Memoized result is reused.
        assert_eq!(pkb.callees_of("first", true), vec!["second", "third"]);
    }

    #[test]
    fn test_attributes() {
        let pkb = build(
            r#"
            procedure first {
                read x;
                print z;
                call second;
            }
            procedure second { z = 1; }
            "#,
        );
        assert_eq!(pkb.read_var_name(1), Some("x".to_string()));
        assert_eq!(pkb.print_var_name(2), Some("z".to_string()));
        assert_eq!(pkb.called_proc_name(3), Some("second".to_string()));
        assert_eq!(pkb.call_stmts_calling("second"), vec![3]);
        assert_eq!(pkb.read_stmts_reading("x"), vec![1]);
        assert_eq!(pkb.print_stmts_printing("z"), vec![2]);
    }
}
