//! Design extractor: validates the AST and populates every PKB index.
//!
//! Extraction happens in three passes. The first collects procedure names
//! and rejects duplicates. The second walks every statement once, recording
//! kinds, Follows, Parent, call edges, attribute maps, pattern entries and
//! condition variables, and rejects calls to undeclared procedures. The
//! third computes Uses and Modifies bottom-up: procedures are processed in
//! reverse topological order of the call graph (callees before callers), so
//! a call statement can copy its callee's variable sets. A cyclic call graph
//! is rejected before the third pass.

use crate::frontend::ast::{Procedure, Program, Stmt, StmtKind};
use crate::pkb::{cfg, Pkb, PatternEntry, StmtType};
use crate::utils::errors::{ExtractError, ExtractErrorKind};
use crate::utils::intern::Symbol;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Extract a PKB from a parsed program. Fails on structural errors.
pub(crate) fn extract(program: &Program) -> Result<Pkb, ExtractError> {
    let mut extractor = Extractor::default();
    extractor.check_procedure_names(program)?;
    extractor.walk_program(program)?;
    let order = extractor.call_topological_order(program)?;
    extractor.compute_uses_modifies(&order);
    extractor.finalize();

    let graphs = cfg::build(program);
    extractor.pkb.next_out = graphs.next_out;
    extractor.pkb.next_in = graphs.next_in;
    extractor.pkb.bip_out = graphs.bip_out;
    extractor.pkb.bip_in = graphs.bip_in;

    debug!(
        procedures = extractor.pkb.procedures.len(),
        statements = extractor.pkb.statements.len(),
        variables = extractor.pkb.variables.len(),
        "design extraction complete"
    );
    Ok(extractor.pkb)
}

#[derive(Default)]
struct Extractor {
    pkb: Pkb,
    var_syms: BTreeSet<Symbol>,
    proc_syms: Vec<Symbol>,
}

impl Extractor {
    fn check_procedure_names(&mut self, program: &Program) -> Result<(), ExtractError> {
        let mut seen = HashSet::new();
        for procedure in &program.procedures {
            if !seen.insert(procedure.name.clone()) {
                return Err(ExtractError::new(
                    ExtractErrorKind::DuplicateProcedure,
                    format!("procedure '{}' is declared twice", procedure.name),
                ));
            }
            let sym = self.pkb.names.intern(&procedure.name);
            self.proc_syms.push(sym);
        }
        Ok(())
    }

    fn walk_program(&mut self, program: &Program) -> Result<(), ExtractError> {
        let declared: HashSet<&str> = program
            .procedures
            .iter()
            .map(|p| p.name.as_str())
            .collect();

        for procedure in &program.procedures {
            let proc_sym = self.pkb.names.intern(&procedure.name);
            self.walk_stmt_list(&procedure.body, None, proc_sym, &declared)?;
        }
        Ok(())
    }

    fn walk_stmt_list(
        &mut self,
        stmts: &[Stmt],
        parent: Option<u32>,
        proc_sym: Symbol,
        declared: &HashSet<&str>,
    ) -> Result<(), ExtractError> {
        let mut previous: Option<u32> = None;
        for stmt in stmts {
            self.record_stmt(stmt, parent, proc_sym, declared)?;
            if let Some(prev) = previous {
                self.pkb.follows_next.insert(prev, stmt.number);
                self.pkb.follows_prev.insert(stmt.number, prev);
            }
            previous = Some(stmt.number);
        }
        Ok(())
    }

    fn record_stmt(
        &mut self,
        stmt: &Stmt,
        parent: Option<u32>,
        proc_sym: Symbol,
        declared: &HashSet<&str>,
    ) -> Result<(), ExtractError> {
        let s = stmt.number;
        self.pkb.statements.insert(s);
        if let Some(p) = parent {
            self.pkb.parent_children.entry(p).or_default().insert(s);
            self.pkb.parent_of.insert(s, p);
        }

        let stmt_type = match &stmt.kind {
            StmtKind::Assign { target, rhs } => {
                let target_sym = self.intern_var(target);
                self.pkb.assign_target.insert(s, target_sym);
                rhs.collect_consts(&mut self.pkb.constants);
                let mut vars = BTreeSet::new();
                rhs.collect_vars(&mut vars);
                for v in vars {
                    self.intern_var(&v);
                }
                self.index_pattern(s, target_sym, rhs);
                StmtType::Assign
            }
            StmtKind::Read { var } => {
                let var_sym = self.intern_var(var);
                self.pkb.read_var.insert(s, var_sym);
                self.pkb
                    .reads_by_var_name
                    .entry(var_sym)
                    .or_default()
                    .insert(s);
                StmtType::Read
            }
            StmtKind::Print { var } => {
                let var_sym = self.intern_var(var);
                self.pkb.print_var.insert(s, var_sym);
                self.pkb
                    .prints_by_var_name
                    .entry(var_sym)
                    .or_default()
                    .insert(s);
                StmtType::Print
            }
            StmtKind::Call { proc } => {
                if !declared.contains(proc.as_str()) {
                    return Err(ExtractError::new(
                        ExtractErrorKind::UnknownCallTarget,
                        format!("call to undeclared procedure '{}'", proc),
                    ));
                }
                let callee_sym = self.pkb.names.intern(proc);
                self.pkb.call_proc.insert(s, callee_sym);
                self.pkb
                    .calls_by_proc_name
                    .entry(callee_sym)
                    .or_default()
                    .insert(s);
                self.pkb
                    .calls_out
                    .entry(proc_sym)
                    .or_default()
                    .insert(callee_sym);
                self.pkb
                    .calls_in
                    .entry(callee_sym)
                    .or_default()
                    .insert(proc_sym);
                StmtType::Call
            }
            StmtKind::While { cond, body } => {
                cond.collect_consts(&mut self.pkb.constants);
                let mut vars = BTreeSet::new();
                cond.collect_vars(&mut vars);
                for v in vars {
                    let sym = self.intern_var(&v);
                    self.pkb.while_cond_vars.entry(sym).or_default().insert(s);
                }
                self.walk_stmt_list(body, Some(s), proc_sym, declared)?;
                StmtType::While
            }
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                cond.collect_consts(&mut self.pkb.constants);
                let mut vars = BTreeSet::new();
                cond.collect_vars(&mut vars);
                for v in vars {
                    let sym = self.intern_var(&v);
                    self.pkb.if_cond_vars.entry(sym).or_default().insert(s);
                }
                self.walk_stmt_list(then_body, Some(s), proc_sym, declared)?;
                self.walk_stmt_list(else_body, Some(s), proc_sym, declared)?;
                StmtType::If
            }
        };

        self.pkb.stmt_types.insert(s, stmt_type);
        self.pkb.by_type.entry(stmt_type).or_default().insert(s);
        Ok(())
    }

    /// Record every subexpression of an assignment's right-hand side under
    /// its canonical string. The full side is flagged as non-subexpression.
    fn index_pattern(&mut self, s: u32, assignee: Symbol, rhs: &crate::frontend::ast::Expr) {
        let mut seen = HashSet::new();
        for (i, node) in rhs.subexpressions().into_iter().enumerate() {
            let canonical = node.to_string();
            let is_subexpr = i > 0;
            // The same subexpression can occur twice in one side; one entry
            // per (key, flag) is enough.
            if seen.insert((canonical.clone(), is_subexpr)) {
                self.pkb
                    .pattern_index
                    .entry(canonical)
                    .or_default()
                    .push(PatternEntry {
                        assignee,
                        stmt: s,
                        is_subexpr,
                    });
            }
        }
    }

    fn intern_var(&mut self, name: &str) -> Symbol {
        let sym = self.pkb.names.intern(name);
        self.var_syms.insert(sym);
        sym
    }

    /// Topological order of the call graph (callees last). Rejects cycles.
    fn call_topological_order<'p>(
        &self,
        program: &'p Program,
    ) -> Result<Vec<&'p Procedure>, ExtractError> {
        let mut in_degree: HashMap<&str, usize> = program
            .procedures
            .iter()
            .map(|p| (p.name.as_str(), 0))
            .collect();
        let mut callees_of: HashMap<&str, Vec<&str>> = HashMap::new();

        fn collect_calls<'a>(stmts: &'a [Stmt], out: &mut Vec<&'a str>) {
            for stmt in stmts {
                match &stmt.kind {
                    StmtKind::Call { proc } => out.push(proc.as_str()),
                    StmtKind::While { body, .. } => collect_calls(body, out),
                    StmtKind::If {
                        then_body,
                        else_body,
                        ..
                    } => {
                        collect_calls(then_body, out);
                        collect_calls(else_body, out);
                    }
                    _ => {}
                }
            }
        }

        for procedure in &program.procedures {
            let mut calls = Vec::new();
            collect_calls(&procedure.body, &mut calls);
            calls.sort_unstable();
            calls.dedup();
            for callee in &calls {
                *in_degree.entry(callee).or_insert(0) += 1;
            }
            callees_of.insert(procedure.name.as_str(), calls);
        }

        let by_name: HashMap<&str, &Procedure> = program
            .procedures
            .iter()
            .map(|p| (p.name.as_str(), p))
            .collect();

        let mut ready: Vec<&str> = program
            .procedures
            .iter()
            .map(|p| p.name.as_str())
            .filter(|name| in_degree[name] == 0)
            .collect();
        let mut order: Vec<&Procedure> = Vec::new();

        while let Some(name) = ready.pop() {
            order.push(by_name[name]);
            for callee in &callees_of[name] {
                if let Some(degree) = in_degree.get_mut(callee) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(callee);
                    }
                }
            }
        }

        if order.len() != program.procedures.len() {
            let stuck: Vec<&str> = in_degree
                .iter()
                .filter(|(_, d)| **d > 0)
                .map(|(name, _)| *name)
                .collect();
            return Err(ExtractError::new(
                ExtractErrorKind::RecursiveCall,
                format!("call graph is cyclic among: {}", stuck.join(", ")),
            ));
        }

        // Callers first in `order`; reverse so callees are computed first.
        order.reverse();
        Ok(order)
    }

    fn compute_uses_modifies(&mut self, order: &[&Procedure]) {
        for procedure in order {
            let proc_sym = self.pkb.names.intern(&procedure.name);
            let mut proc_uses = BTreeSet::new();
            let mut proc_mods = BTreeSet::new();
            for stmt in &procedure.body {
                let (uses, mods) = self.stmt_uses_modifies(stmt);
                proc_uses.extend(uses);
                proc_mods.extend(mods);
            }
            for v in &proc_uses {
                self.pkb
                    .procs_by_used_var
                    .entry(*v)
                    .or_default()
                    .insert(proc_sym);
            }
            for v in &proc_mods {
                self.pkb
                    .procs_by_modified_var
                    .entry(*v)
                    .or_default()
                    .insert(proc_sym);
            }
            if !proc_uses.is_empty() {
                self.pkb.uses_by_proc.insert(proc_sym, proc_uses);
            }
            if !proc_mods.is_empty() {
                self.pkb.mods_by_proc.insert(proc_sym, proc_mods);
            }
        }
    }

    /// Uses and Modifies of one statement, recorded and returned for the
    /// enclosing container to union in.
    fn stmt_uses_modifies(&mut self, stmt: &Stmt) -> (BTreeSet<Symbol>, BTreeSet<Symbol>) {
        let s = stmt.number;
        let mut uses = BTreeSet::new();
        let mut mods = BTreeSet::new();

        match &stmt.kind {
            StmtKind::Assign { target, rhs } => {
                let mut vars = BTreeSet::new();
                rhs.collect_vars(&mut vars);
                for v in vars {
                    uses.insert(self.intern_var(&v));
                }
                mods.insert(self.intern_var(target));
            }
            StmtKind::Read { var } => {
                mods.insert(self.intern_var(var));
            }
            StmtKind::Print { var } => {
                uses.insert(self.intern_var(var));
            }
            StmtKind::Call { proc } => {
                // Callee sets are complete: procedures are processed in
                // reverse topological order of the acyclic call graph.
                let callee = self.pkb.names.intern(proc);
                if let Some(callee_uses) = self.pkb.uses_by_proc.get(&callee) {
                    uses.extend(callee_uses.iter().copied());
                }
                if let Some(callee_mods) = self.pkb.mods_by_proc.get(&callee) {
                    mods.extend(callee_mods.iter().copied());
                }
            }
            StmtKind::While { cond, body } => {
                let mut vars = BTreeSet::new();
                cond.collect_vars(&mut vars);
                for v in vars {
                    uses.insert(self.intern_var(&v));
                }
                for child in body {
                    let (child_uses, child_mods) = self.stmt_uses_modifies(child);
                    uses.extend(child_uses);
                    mods.extend(child_mods);
                }
            }
            StmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                let mut vars = BTreeSet::new();
                cond.collect_vars(&mut vars);
                for v in vars {
                    uses.insert(self.intern_var(&v));
                }
                for child in then_body.iter().chain(else_body) {
                    let (child_uses, child_mods) = self.stmt_uses_modifies(child);
                    uses.extend(child_uses);
                    mods.extend(child_mods);
                }
            }
        }

        for v in &uses {
            self.pkb.stmts_by_used_var.entry(*v).or_default().insert(s);
        }
        for v in &mods {
            self.pkb
                .stmts_by_modified_var
                .entry(*v)
                .or_default()
                .insert(s);
        }
        if !uses.is_empty() {
            self.pkb.uses_by_stmt.insert(s, uses.clone());
        }
        if !mods.is_empty() {
            self.pkb.mods_by_stmt.insert(s, mods.clone());
        }
        (uses, mods)
    }

    fn finalize(&mut self) {
        let mut variables: Vec<Symbol> = self.var_syms.iter().copied().collect();
        variables.sort_by(|a, b| {
            self.pkb
                .names
                .resolve(*a)
                .unwrap_or("")
                .cmp(self.pkb.names.resolve(*b).unwrap_or(""))
        });
        self.pkb.variables = variables;

        let mut procedures = self.proc_syms.clone();
        procedures.sort_by(|a, b| {
            self.pkb
                .names
                .resolve(*a)
                .unwrap_or("")
                .cmp(self.pkb.names.resolve(*b).unwrap_or(""))
        });
        self.pkb.procedures = procedures;
    }
}
