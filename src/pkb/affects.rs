//! Dataflow reachability: `Affects`, `Affects*`, and their interprocedural
//! `AffectsBip` variants.
//!
//! `Affects(a, b)` holds when both are assignments, `a` writes some variable
//! `v`, `b` reads `v`, and a control-flow path from `a` to `b` carries `v`
//! unmodified. Along a path, only assign, read, and call statements can kill
//! the value (containers aggregate their bodies' writes and must not kill).
//! The Bip variants search the `NextBip` graph instead, where calls are
//! traversed through rather than stepped over, so only assign and read
//! statements kill.
//!
//! Everything here is computed on demand and memoized per start node; the
//! Bip relation is small enough to materialize whole on first use.

use crate::pkb::{BipEdgeKind, Pkb, StmtType};
use crate::utils::intern::Symbol;
use std::collections::{BTreeSet, HashMap, HashSet};

/// The fully materialized `AffectsBip` relation with its closure.
#[derive(Debug, Default, Clone)]
pub struct BipRelation {
    from: HashMap<u32, BTreeSet<u32>>,
    to: HashMap<u32, BTreeSet<u32>>,
    star_from: HashMap<u32, BTreeSet<u32>>,
    star_to: HashMap<u32, BTreeSet<u32>>,
}

impl Pkb {
    // -- Affects / Affects* --

    /// Statements b with `Affects(s, b)`, or `Affects*(s, b)` when transitive.
    pub fn affects_from(&self, s: u32, transitive: bool) -> Vec<u32> {
        if transitive {
            self.affects_closure(s, true)
        } else {
            self.affects_direct_from(s).into_iter().collect()
        }
    }

    /// Statements a with `Affects(a, s)`, or `Affects*(a, s)` when transitive.
    pub fn affects_to(&self, s: u32, transitive: bool) -> Vec<u32> {
        if transitive {
            self.affects_closure(s, false)
        } else {
            self.affects_direct_to(s).into_iter().collect()
        }
    }

    /// Statements that affect something.
    pub fn stmts_affecting_any(&self) -> Vec<u32> {
        self.statements_of(StmtType::Assign)
            .into_iter()
            .filter(|a| !self.affects_direct_from(*a).is_empty())
            .collect()
    }

    /// Statements affected by something.
    pub fn stmts_affected_any(&self) -> Vec<u32> {
        self.statements_of(StmtType::Assign)
            .into_iter()
            .filter(|b| !self.affects_direct_to(*b).is_empty())
            .collect()
    }

    /// Whether a statement kills the value of `v` on an intraprocedural path.
    fn kills(&self, s: u32, v: Symbol) -> bool {
        matches!(
            self.stmt_type(s),
            Some(StmtType::Assign | StmtType::Read | StmtType::Call)
        ) && self
            .mods_by_stmt
            .get(&s)
            .map(|mods| mods.contains(&v))
            .unwrap_or(false)
    }

    fn affects_direct_from(&self, a: u32) -> BTreeSet<u32> {
        if let Some(cached) = self.affects_from_memo.borrow().get(&a) {
            return cached.clone();
        }
        let mut result = BTreeSet::new();
        if let Some(&v) = self.assign_target.get(&a) {
            // Prune the walk at any statement that rewrites v.
            let mut visited = HashSet::new();
            let mut work: Vec<u32> = self
                .next_out
                .get(&a)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default();
            while let Some(t) = work.pop() {
                if !visited.insert(t) {
                    continue;
                }
                if self.stmt_type(t) == Some(StmtType::Assign)
                    && self
                        .uses_by_stmt
                        .get(&t)
                        .map(|uses| uses.contains(&v))
                        .unwrap_or(false)
                {
                    result.insert(t);
                }
                if !self.kills(t, v) {
                    if let Some(next) = self.next_out.get(&t) {
                        work.extend(next.iter().copied());
                    }
                }
            }
        }
        self.affects_from_memo.borrow_mut().insert(a, result.clone());
        result
    }

    fn affects_direct_to(&self, b: u32) -> BTreeSet<u32> {
        if let Some(cached) = self.affects_to_memo.borrow().get(&b) {
            return cached.clone();
        }
        let mut result = BTreeSet::new();
        if self.stmt_type(b) == Some(StmtType::Assign) {
            let used: Vec<Symbol> = self
                .uses_by_stmt
                .get(&b)
                .map(|set| set.iter().copied().collect())
                .unwrap_or_default();
            for v in used {
                // Walk backwards until something rewrites v; an assignment
                // to v is a source and also ends the walk on that path.
                let mut visited = HashSet::new();
                let mut work: Vec<u32> = self
                    .next_in
                    .get(&b)
                    .map(|set| set.iter().copied().collect())
                    .unwrap_or_default();
                while let Some(t) = work.pop() {
                    if !visited.insert(t) {
                        continue;
                    }
                    if self.assign_target.get(&t) == Some(&v) {
                        result.insert(t);
                    }
                    if !self.kills(t, v) {
                        if let Some(prev) = self.next_in.get(&t) {
                            work.extend(prev.iter().copied());
                        }
                    }
                }
            }
        }
        self.affects_to_memo.borrow_mut().insert(b, result.clone());
        result
    }

    /// Transitive closure over the direct relation, memoized per start node.
    fn affects_closure(&self, s: u32, forward: bool) -> Vec<u32> {
        let memo = if forward {
            &self.affects_star_from_memo
        } else {
            &self.affects_star_to_memo
        };
        if let Some(cached) = memo.borrow().get(&s) {
            return cached.iter().copied().collect();
        }
        let mut closure = BTreeSet::new();
        let mut work: Vec<u32> = if forward {
            self.affects_direct_from(s).into_iter().collect()
        } else {
            self.affects_direct_to(s).into_iter().collect()
        };
        while let Some(t) = work.pop() {
            if closure.insert(t) {
                let next = if forward {
                    self.affects_direct_from(t)
                } else {
                    self.affects_direct_to(t)
                };
                work.extend(next);
            }
        }
        let result: Vec<u32> = closure.iter().copied().collect();
        memo.borrow_mut().insert(s, closure);
        result
    }

    // -- AffectsBip / AffectsBip* --

    /// Statements b with `AffectsBip(s, b)`, or the closure when transitive.
    pub fn affects_bip_from(&self, s: u32, transitive: bool) -> Vec<u32> {
        self.with_bip_relation(|rel| {
            let map = if transitive { &rel.star_from } else { &rel.from };
            map.get(&s).map(|set| set.iter().copied().collect()).unwrap_or_default()
        })
    }

    /// Statements a with `AffectsBip(a, s)`, or the closure when transitive.
    pub fn affects_bip_to(&self, s: u32, transitive: bool) -> Vec<u32> {
        self.with_bip_relation(|rel| {
            let map = if transitive { &rel.star_to } else { &rel.to };
            map.get(&s).map(|set| set.iter().copied().collect()).unwrap_or_default()
        })
    }

    /// Statements that affect something across procedure boundaries.
    pub fn stmts_affecting_bip_any(&self) -> Vec<u32> {
        self.with_bip_relation(|rel| {
            let mut v: Vec<u32> = rel.from.keys().copied().collect();
            v.sort_unstable();
            v
        })
    }

    /// Statements affected by something across procedure boundaries.
    pub fn stmts_affected_bip_any(&self) -> Vec<u32> {
        self.with_bip_relation(|rel| {
            let mut v: Vec<u32> = rel.to.keys().copied().collect();
            v.sort_unstable();
            v
        })
    }

    fn with_bip_relation<R>(&self, f: impl FnOnce(&BipRelation) -> R) -> R {
        if self.affects_bip_memo.borrow().is_none() {
            let rel = self.build_bip_relation();
            *self.affects_bip_memo.borrow_mut() = Some(rel);
        }
        let borrowed = self.affects_bip_memo.borrow();
        match borrowed.as_ref() {
            Some(rel) => f(rel),
            None => f(&BipRelation::default()),
        }
    }

    /// Materialize the whole `AffectsBip` relation: one stack-sensitive walk
    /// per assignment, then close both directions.
    fn build_bip_relation(&self) -> BipRelation {
        let mut rel = BipRelation::default();
        for a in self.statements_of(StmtType::Assign) {
            let targets = self.bip_affects_walk(a);
            for b in &targets {
                rel.to.entry(*b).or_default().insert(a);
            }
            if !targets.is_empty() {
                rel.from.insert(a, targets);
            }
        }
        rel.star_from = close(&rel.from);
        rel.star_to = close(&rel.to);
        rel
    }

    fn bip_affects_walk(&self, a: u32) -> BTreeSet<u32> {
        let mut result = BTreeSet::new();
        let Some(&v) = self.assign_target.get(&a) else {
            return result;
        };

        let mut visited: HashSet<(u32, Vec<u32>)> = HashSet::new();
        let mut work: Vec<(u32, Vec<u32>)> = Vec::new();
        self.push_bip_successors(a, &Vec::new(), &mut visited, &mut work);

        while let Some((t, stack)) = work.pop() {
            if self.stmt_type(t) == Some(StmtType::Assign)
                && self
                    .uses_by_stmt
                    .get(&t)
                    .map(|uses| uses.contains(&v))
                    .unwrap_or(false)
            {
                result.insert(t);
            }
            // Calls are walked through here, so only assignments and reads
            // kill the carried value.
            let killed = matches!(self.stmt_type(t), Some(StmtType::Assign | StmtType::Read))
                && self
                    .mods_by_stmt
                    .get(&t)
                    .map(|mods| mods.contains(&v))
                    .unwrap_or(false);
            if !killed {
                self.push_bip_successors(t, &stack, &mut visited, &mut work);
            }
        }
        result
    }

    fn push_bip_successors(
        &self,
        node: u32,
        stack: &[u32],
        visited: &mut HashSet<(u32, Vec<u32>)>,
        work: &mut Vec<(u32, Vec<u32>)>,
    ) {
        let Some(edges) = self.bip_out.get(&node) else {
            return;
        };
        for edge in edges {
            let next_stack = match edge.kind {
                BipEdgeKind::Flow => Some(stack.to_vec()),
                BipEdgeKind::Call(tag) => {
                    let mut s = stack.to_vec();
                    s.push(tag);
                    Some(s)
                }
                BipEdgeKind::Return(tag) => match stack.last() {
                    Some(&top) if top == tag => Some(stack[..stack.len() - 1].to_vec()),
                    None => Some(Vec::new()),
                    Some(_) => None,
                },
            };
            if let Some(next_stack) = next_stack {
                if visited.insert((edge.target, next_stack.clone())) {
                    work.push((edge.target, next_stack));
                }
            }
        }
    }
}

/// Transitive closure of a pair relation, per start node.
fn close(direct: &HashMap<u32, BTreeSet<u32>>) -> HashMap<u32, BTreeSet<u32>> {
    let mut star = HashMap::new();
    for &start in direct.keys() {
        let mut closure = BTreeSet::new();
        let mut work: Vec<u32> = direct[&start].iter().copied().collect();
        while let Some(t) = work.pop() {
            if closure.insert(t) {
                if let Some(next) = direct.get(&t) {
                    work.extend(next.iter().copied());
                }
            }
        }
        star.insert(start, closure);
    }
    star
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend;

    fn build(source: &str) -> Pkb {
        let program = frontend::parse(source).unwrap();
        Pkb::build(&program).unwrap()
    }

    const LOOPED: &str = r#"
        procedure Proc {
            while (i<10) {
                x = y;
                y = x;
                if (u==1) then {
                    y = y;
                } else {
                    unrelated = 0;
                }
                i = i + 1;
            }
            unrelated = x+y+i;
        }
    "#;

    #[test]
    fn test_affects_direct() {
        let pkb = build(LOOPED);
        assert_eq!(pkb.affects_from(2, false), vec![3, 8]);
        assert_eq!(pkb.affects_from(3, false), vec![2, 5, 8]);
        assert_eq!(pkb.affects_from(7, false), vec![7, 8]);
        assert_eq!(pkb.affects_to(8, false), vec![2, 3, 5, 7]);
    }

    #[test]
    fn test_affects_star_follows_cycles() {
        let pkb = build(LOOPED);
        // Affects(2,3), Affects(3,5), Affects(5,2) form a cycle, so the
        // closure from 2 reaches 2 itself.
        assert_eq!(pkb.affects_from(2, true), vec![2, 3, 5, 8]);
    }

    #[test]
    fn test_rewrite_kills_flow() {
        let pkb = build(
            r#"
            procedure main {
                x = 1;
                x = 2;
                y = x;
            }
            "#,
        );
        // Statement 2 rewrites x before 3 reads it.
        assert_eq!(pkb.affects_from(1, false), Vec::<u32>::new());
        assert_eq!(pkb.affects_from(2, false), vec![3]);
    }

    #[test]
    fn test_read_kills_flow() {
        let pkb = build(
            r#"
            procedure main {
                x = 1;
                read x;
                y = x;
            }
            "#,
        );
        assert_eq!(pkb.affects_from(1, false), Vec::<u32>::new());
    }

    #[test]
    fn test_modifying_call_kills_flow() {
        let pkb = build(
            r#"
            procedure main {
                x = 1;
                call clobber;
                y = x;
            }
            procedure clobber {
                x = 0;
            }
            "#,
        );
        // Intraprocedurally the call is an opaque step that rewrites x.
        assert_eq!(pkb.affects_from(1, false), Vec::<u32>::new());
        // A call that leaves x alone is transparent.
        let pkb = build(
            r#"
            procedure main {
                x = 1;
                call harmless;
                y = x;
            }
            procedure harmless {
                z = 0;
            }
            "#,
        );
        assert_eq!(pkb.affects_from(1, false), vec![3]);
    }

    #[test]
    fn test_affects_only_between_assignments() {
        let pkb = build(
            r#"
            procedure main {
                x = 1;
                print x;
            }
            "#,
        );
        // print uses x but is not an assignment.
        assert_eq!(pkb.affects_from(1, false), Vec::<u32>::new());
        assert_eq!(pkb.stmts_affecting_any(), Vec::<u32>::new());
    }

    #[test]
    fn test_affects_is_intraprocedural() {
        let pkb = build(
            r#"
            procedure first {
                x = 1;
                call second;
            }
            procedure second {
                y = x;
            }
            "#,
        );
        assert_eq!(pkb.affects_from(1, false), Vec::<u32>::new());
        // The Bip variant flows into the callee.
        assert_eq!(pkb.affects_bip_from(1, false), vec![3]);
    }

    #[test]
    fn test_affects_bip_through_call_and_back() {
        let pkb = build(
            r#"
            procedure main {
                x = 1;
                call inc;
                z = x;
            }
            procedure inc {
                x = x + 1;
            }
            "#,
        );
        // Numbers: main 1,2,3; inc 4.
        // x reaches the callee's x = x + 1, which rewrites it; the rewritten
        // value then reaches z = x after the return.
        assert_eq!(pkb.affects_bip_from(1, false), vec![4]);
        assert_eq!(pkb.affects_bip_from(4, false), vec![3]);
        assert_eq!(pkb.affects_bip_from(1, true), vec![3, 4]);
        assert_eq!(pkb.affects_bip_to(3, false), vec![4]);
        assert_eq!(pkb.stmts_affecting_bip_any(), vec![1, 4]);
    }

    #[test]
    fn test_affects_queries_are_idempotent() {
        let pkb = build(LOOPED);
        let first = pkb.affects_from(2, true);
        let second = pkb.affects_from(2, true);
        assert_eq!(first, second);
    }
}
