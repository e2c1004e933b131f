//! Control-flow graphs: intraprocedural `Next` and interprocedural `NextBip`.
//!
//! `Next` is built per procedure from the statement-list structure. `NextBip`
//! starts from `Next` and reroutes every call statement: its outgoing edges
//! are replaced by an edge into the callee's entry statement, and the
//! callee's exit statements fan out to the call site's successors. Call and
//! return edges carry the call-site statement as a tag; transitive traversal
//! keeps a call-site stack and only takes a return edge whose tag matches
//! the top of the stack (or any return edge while the stack is empty, for
//! walks that start inside a callee).
//!
//! A call site with no successor produces no return edges, so control that
//! enters its callee does not come back; consequently a trailing call
//! statement is not an exit of its procedure.

use crate::frontend::ast::{Program, Stmt, StmtKind};
use crate::pkb::Pkb;
use std::collections::{BTreeSet, HashMap, HashSet};

/// An edge of the `NextBip` graph. In the forward index the field is the
/// edge's head; in the reverse index it is the tail. The kind is the same in
/// both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BipEdge {
    /// The statement at the other end of the edge
    pub target: u32,
    /// How the edge crosses (or does not cross) a procedure boundary
    pub kind: BipEdgeKind,
}

/// The kind of a `NextBip` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BipEdgeKind {
    /// An intraprocedural edge
    Flow,
    /// Entry into a callee; the tag is the call-site statement
    Call(u32),
    /// Return from a callee to the call site's successor
    Return(u32),
}

/// The built control-flow graphs.
pub(crate) struct CfgGraphs {
    pub next_out: HashMap<u32, BTreeSet<u32>>,
    pub next_in: HashMap<u32, BTreeSet<u32>>,
    pub bip_out: HashMap<u32, Vec<BipEdge>>,
    pub bip_in: HashMap<u32, Vec<BipEdge>>,
}

/// Build `Next` and `NextBip` for a whole program.
pub(crate) fn build(program: &Program) -> CfgGraphs {
    let mut next_out: HashMap<u32, BTreeSet<u32>> = HashMap::new();
    let mut next_in: HashMap<u32, BTreeSet<u32>> = HashMap::new();

    for procedure in &program.procedures {
        wire_list(&procedure.body, None, &mut next_out, &mut next_in);
    }

    let (bip_out, bip_in) = build_bip(program, &next_out);

    CfgGraphs {
        next_out,
        next_in,
        bip_out,
        bip_in,
    }
}

fn add_next(
    from: u32,
    to: u32,
    next_out: &mut HashMap<u32, BTreeSet<u32>>,
    next_in: &mut HashMap<u32, BTreeSet<u32>>,
) {
    next_out.entry(from).or_default().insert(to);
    next_in.entry(to).or_default().insert(from);
}

/// Wire one statement list. `follow` is where control goes after the last
/// statement of the list: the enclosing while header, the statement after
/// the enclosing if, or nothing at the end of a procedure.
fn wire_list(
    stmts: &[Stmt],
    follow: Option<u32>,
    next_out: &mut HashMap<u32, BTreeSet<u32>>,
    next_in: &mut HashMap<u32, BTreeSet<u32>>,
) {
    for (i, stmt) in stmts.iter().enumerate() {
        let successor = stmts.get(i + 1).map(|s| s.number).or(follow);
        wire_stmt(stmt, successor, next_out, next_in);
    }
}

fn wire_stmt(
    stmt: &Stmt,
    successor: Option<u32>,
    next_out: &mut HashMap<u32, BTreeSet<u32>>,
    next_in: &mut HashMap<u32, BTreeSet<u32>>,
) {
    let s = stmt.number;
    match &stmt.kind {
        StmtKind::Assign { .. }
        | StmtKind::Read { .. }
        | StmtKind::Print { .. }
        | StmtKind::Call { .. } => {
            if let Some(t) = successor {
                add_next(s, t, next_out, next_in);
            }
        }
        StmtKind::While { body, .. } => {
            add_next(s, body[0].number, next_out, next_in);
            if let Some(t) = successor {
                add_next(s, t, next_out, next_in);
            }
            // The body loops back to the header.
            wire_list(body, Some(s), next_out, next_in);
        }
        StmtKind::If {
            then_body,
            else_body,
            ..
        } => {
            add_next(s, then_body[0].number, next_out, next_in);
            add_next(s, else_body[0].number, next_out, next_in);
            wire_list(then_body, successor, next_out, next_in);
            wire_list(else_body, successor, next_out, next_in);
        }
    }
}

/// Statements from which control can leave a statement list.
fn exit_statements(stmts: &[Stmt]) -> Vec<u32> {
    let Some(last) = stmts.last() else {
        return Vec::new();
    };
    match &last.kind {
        StmtKind::Assign { .. } | StmtKind::Read { .. } | StmtKind::Print { .. } => {
            vec![last.number]
        }
        // Control enters the callee and, with no successor here, never
        // returns through this statement.
        StmtKind::Call { .. } => Vec::new(),
        // A while loop exits at its header.
        StmtKind::While { .. } => vec![last.number],
        StmtKind::If {
            then_body,
            else_body,
            ..
        } => {
            let mut exits = exit_statements(then_body);
            exits.extend(exit_statements(else_body));
            exits
        }
    }
}

fn build_bip(
    program: &Program,
    next_out: &HashMap<u32, BTreeSet<u32>>,
) -> (HashMap<u32, Vec<BipEdge>>, HashMap<u32, Vec<BipEdge>>) {
    let mut entry_of: HashMap<&str, u32> = HashMap::new();
    let mut exits_of: HashMap<&str, Vec<u32>> = HashMap::new();
    for procedure in &program.procedures {
        entry_of.insert(procedure.name.as_str(), procedure.body[0].number);
        exits_of.insert(procedure.name.as_str(), exit_statements(&procedure.body));
    }

    let mut bip_out: HashMap<u32, Vec<BipEdge>> = HashMap::new();
    let mut bip_in: HashMap<u32, Vec<BipEdge>> = HashMap::new();
    let mut add_bip = |from: u32, to: u32, kind: BipEdgeKind| {
        bip_out
            .entry(from)
            .or_default()
            .push(BipEdge { target: to, kind });
        bip_in
            .entry(to)
            .or_default()
            .push(BipEdge { target: from, kind });
    };

    fn each_stmt<'a>(stmts: &'a [Stmt], f: &mut impl FnMut(&'a Stmt)) {
        for stmt in stmts {
            f(stmt);
            match &stmt.kind {
                StmtKind::While { body, .. } => each_stmt(body, f),
                StmtKind::If {
                    then_body,
                    else_body,
                    ..
                } => {
                    each_stmt(then_body, f);
                    each_stmt(else_body, f);
                }
                _ => {}
            }
        }
    }

    for procedure in &program.procedures {
        each_stmt(&procedure.body, &mut |stmt| {
            let s = stmt.number;
            if let StmtKind::Call { proc } = &stmt.kind {
                add_bip(s, entry_of[proc.as_str()], BipEdgeKind::Call(s));
                if let Some(successors) = next_out.get(&s) {
                    for &succ in successors {
                        for &exit in &exits_of[proc.as_str()] {
                            add_bip(exit, succ, BipEdgeKind::Return(s));
                        }
                    }
                }
            } else if let Some(successors) = next_out.get(&s) {
                for &succ in successors {
                    add_bip(s, succ, BipEdgeKind::Flow);
                }
            }
        });
    }

    (bip_out, bip_in)
}

/// How a stack-sensitive walk reacts to an edge.
fn step_stack(stack: &[u32], push: Option<u32>, pop: Option<u32>) -> Option<Vec<u32>> {
    if let Some(tag) = push {
        let mut next = stack.to_vec();
        next.push(tag);
        return Some(next);
    }
    if let Some(tag) = pop {
        return match stack.last() {
            Some(&top) if top == tag => Some(stack[..stack.len() - 1].to_vec()),
            // A walk that starts inside a callee may return anywhere.
            None => Some(Vec::new()),
            Some(_) => None,
        };
    }
    Some(stack.to_vec())
}

impl Pkb {
    // -- Next / Next* --

    /// Statements t with `Next(s, t)`, or `Next*(s, t)` when transitive.
    pub fn next_of(&self, s: u32, transitive: bool) -> Vec<u32> {
        self.cfg_reachable(s, transitive, &self.next_out)
    }

    /// Statements t with `Next(t, s)`, or `Next*(t, s)` when transitive.
    pub fn prev_of(&self, s: u32, transitive: bool) -> Vec<u32> {
        self.cfg_reachable(s, transitive, &self.next_in)
    }

    fn cfg_reachable(
        &self,
        s: u32,
        transitive: bool,
        edges: &HashMap<u32, BTreeSet<u32>>,
    ) -> Vec<u32> {
        let direct = edges.get(&s);
        if !transitive {
            return direct.map(|set| set.iter().copied().collect()).unwrap_or_default();
        }
        let mut reached = BTreeSet::new();
        let mut stack: Vec<u32> = direct.map(|set| set.iter().copied().collect()).unwrap_or_default();
        while let Some(t) = stack.pop() {
            if reached.insert(t) {
                if let Some(next) = edges.get(&t) {
                    stack.extend(next.iter().copied());
                }
            }
        }
        reached.into_iter().collect()
    }

    /// Statements with an outgoing `Next` edge.
    pub fn stmts_with_next(&self) -> Vec<u32> {
        let mut v: Vec<u32> = self.next_out.keys().copied().collect();
        v.sort_unstable();
        v
    }

    /// Statements with an incoming `Next` edge.
    pub fn stmts_with_prev(&self) -> Vec<u32> {
        let mut v: Vec<u32> = self.next_in.keys().copied().collect();
        v.sort_unstable();
        v
    }

    // -- NextBip / NextBip* --

    /// Statements t with `NextBip(s, t)`, or `NextBip*(s, t)` when transitive.
    pub fn next_bip_of(&self, s: u32, transitive: bool) -> Vec<u32> {
        if !transitive {
            let mut v: Vec<u32> = self
                .bip_out
                .get(&s)
                .map(|edges| edges.iter().map(|e| e.target).collect())
                .unwrap_or_default();
            v.sort_unstable();
            v.dedup();
            return v;
        }
        self.bip_reachable(s, true)
    }

    /// Statements t with `NextBip(t, s)`, or `NextBip*(t, s)` when transitive.
    pub fn prev_bip_of(&self, s: u32, transitive: bool) -> Vec<u32> {
        if !transitive {
            let mut v: Vec<u32> = self
                .bip_in
                .get(&s)
                .map(|edges| edges.iter().map(|e| e.target).collect())
                .unwrap_or_default();
            v.sort_unstable();
            v.dedup();
            return v;
        }
        self.bip_reachable(s, false)
    }

    /// Stack-sensitive reachability over the `NextBip` graph. Walking
    /// forward, a call edge pushes its tag and a return edge pops a matching
    /// one; walking backward the roles swap.
    fn bip_reachable(&self, start: u32, forward: bool) -> Vec<u32> {
        let edges = if forward { &self.bip_out } else { &self.bip_in };
        let mut reached = BTreeSet::new();
        let mut visited: HashSet<(u32, Vec<u32>)> = HashSet::new();
        let mut work: Vec<(u32, Vec<u32>)> = vec![(start, Vec::new())];
        visited.insert((start, Vec::new()));

        while let Some((node, stack)) = work.pop() {
            let Some(outgoing) = edges.get(&node) else {
                continue;
            };
            for edge in outgoing {
                let (push, pop) = match (edge.kind, forward) {
                    (BipEdgeKind::Flow, _) => (None, None),
                    (BipEdgeKind::Call(tag), true) | (BipEdgeKind::Return(tag), false) => {
                        (Some(tag), None)
                    }
                    (BipEdgeKind::Return(tag), true) | (BipEdgeKind::Call(tag), false) => {
                        (None, Some(tag))
                    }
                };
                if let Some(next_stack) = step_stack(&stack, push, pop) {
                    reached.insert(edge.target);
                    if visited.insert((edge.target, next_stack.clone())) {
                        work.push((edge.target, next_stack));
                    }
                }
            }
        }
        reached.into_iter().collect()
    }

    /// Statements with an outgoing `NextBip` edge.
    pub fn stmts_with_next_bip(&self) -> Vec<u32> {
        let mut v: Vec<u32> = self.bip_out.keys().copied().collect();
        v.sort_unstable();
        v
    }

    /// Statements with an incoming `NextBip` edge.
    pub fn stmts_with_prev_bip(&self) -> Vec<u32> {
        let mut v: Vec<u32> = self.bip_in.keys().copied().collect();
        v.sort_unstable();
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend;

    fn build_pkb(source: &str) -> Pkb {
        let program = frontend::parse(source).unwrap();
        Pkb::build(&program).unwrap()
    }

    const LOOPED: &str = r#"
        procedure main {
            while (x > 0) {
                x = x - 1;
                if (x == 1) then {
                    y = 1;
                } else {
                    y = 2;
                }
            }
            print y;
        }
    "#;

    #[test]
    fn test_next_edges() {
        let pkb = build_pkb(LOOPED);
        // While header branches into the body and past the loop.
        assert_eq!(pkb.next_of(1, false), vec![2, 6]);
        // If header branches into both arms.
        assert_eq!(pkb.next_of(3, false), vec![4, 5]);
        // Both arms rejoin at the loop header.
        assert_eq!(pkb.next_of(4, false), vec![1]);
        assert_eq!(pkb.next_of(5, false), vec![1]);
        // The final statement has no successor.
        assert_eq!(pkb.next_of(6, false), Vec::<u32>::new());
    }

    #[test]
    fn test_next_star_includes_loop() {
        let pkb = build_pkb(LOOPED);
        // Every loop statement can reach itself again through the back edge.
        let reach = pkb.next_of(2, true);
        assert_eq!(reach, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(pkb.prev_of(6, true), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_next_stays_within_procedure() {
        let pkb = build_pkb("procedure a { x = 1; } procedure b { y = 2; }");
        assert_eq!(pkb.next_of(1, true), Vec::<u32>::new());
        assert_eq!(pkb.next_of(1, false), Vec::<u32>::new());
    }

    const CALLS: &str = r#"
        procedure caller {
            a = 1;
            call helper;
            b = 2;
        }
        procedure other {
            call helper;
            c = 3;
        }
        procedure helper {
            d = 4;
        }
    "#;

    #[test]
    fn test_bip_splits_call_edges() {
        let pkb = build_pkb(CALLS);
        // Statement numbers: caller 1,2,3; other 4,5; helper 6.
        // The call's only NextBip successor is the callee entry.
        assert_eq!(pkb.next_bip_of(2, false), vec![6]);
        // The callee exit fans out to both call sites' successors.
        assert_eq!(pkb.next_bip_of(6, false), vec![3, 5]);
    }

    #[test]
    fn test_bip_star_respects_call_sites() {
        let pkb = build_pkb(CALLS);
        // From statement 1 control flows through the call into helper and
        // back to 3 only; the return edge into `other` is unmatched.
        assert_eq!(pkb.next_bip_of(1, true), vec![2, 3, 6]);
        // Starting inside the callee, both returns are possible.
        assert_eq!(pkb.next_bip_of(6, true), vec![3, 5]);
        // Backwards from 3: through helper to the matching call site only.
        assert_eq!(pkb.prev_bip_of(3, true), vec![1, 2, 6]);
    }

    #[test]
    fn test_trailing_call_has_no_return_edges() {
        let pkb = build_pkb(
            r#"
            procedure main {
                x = 1;
                call last;
            }
            procedure last {
                y = 2;
            }
            "#,
        );
        // Numbers: main 1,2; last 3. The callee exit has nowhere to return.
        assert_eq!(pkb.next_bip_of(2, false), vec![3]);
        assert_eq!(pkb.next_bip_of(3, false), Vec::<u32>::new());
        assert_eq!(pkb.next_bip_of(1, true), vec![2, 3]);
    }

    #[test]
    fn test_exits_of_trailing_if() {
        let pkb = build_pkb(
            r#"
            procedure main {
                call branchy;
                z = 0;
            }
            procedure branchy {
                if (x == 1) then {
                    a = 1;
                } else {
                    b = 2;
                }
            }
            "#,
        );
        // Numbers: main 1,2; branchy 3,4,5. Both branch tails return to 2.
        assert_eq!(pkb.next_bip_of(4, false), vec![2]);
        assert_eq!(pkb.next_bip_of(5, false), vec![2]);
        assert_eq!(pkb.prev_bip_of(2, false), vec![4, 5]);
    }

    #[test]
    fn test_exit_of_trailing_while() {
        let pkb = build_pkb(
            r#"
            procedure main {
                call loopy;
                z = 0;
            }
            procedure loopy {
                while (x > 0) {
                    x = x - 1;
                }
            }
            "#,
        );
        // Numbers: main 1,2; loopy 3,4. The loop header is the exit.
        assert_eq!(pkb.next_bip_of(3, false), vec![2, 4]);
        assert!(pkb.next_bip_of(1, true).contains(&2));
    }
}
