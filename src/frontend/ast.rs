//! Abstract syntax tree for SIMPLE programs.
//!
//! Statement numbers are assigned by the parser in source order, starting at
//! 1 and dense across the whole program. The `Display` impl on [`Expr`]
//! produces the canonical expression string used as the pattern-index key:
//! whitespace-free and fully parenthesized with the parse's associativity,
//! so `a + b + c` renders as `((a+b)+c)`.

use crate::utils::location::Span;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A complete SIMPLE program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Procedures in declaration order
    pub procedures: Vec<Procedure>,
    /// Source span
    pub span: Span,
}

impl Program {
    /// Find a procedure by name.
    pub fn find_procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures.iter().find(|p| p.name == name)
    }

    /// Total number of statements, counting nested ones.
    pub fn statement_count(&self) -> usize {
        fn count(stmts: &[Stmt]) -> usize {
            stmts
                .iter()
                .map(|s| match &s.kind {
                    StmtKind::While { body, .. } => 1 + count(body),
                    StmtKind::If {
                        then_body,
                        else_body,
                        ..
                    } => 1 + count(then_body) + count(else_body),
                    _ => 1,
                })
                .sum()
        }
        self.procedures.iter().map(|p| count(&p.body)).sum()
    }
}

/// A procedure definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    /// Procedure name
    pub name: String,
    /// Body statement list (non-empty)
    pub body: Vec<Stmt>,
    /// Source span
    pub span: Span,
}

/// A statement with its number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    /// Statement number (positive, program-unique)
    pub number: u32,
    /// The statement itself
    pub kind: StmtKind,
    /// Source span
    pub span: Span,
}

/// The kinds of SIMPLE statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// `target = rhs;`
    Assign { target: String, rhs: Expr },
    /// `read var;`
    Read { var: String },
    /// `print var;`
    Print { var: String },
    /// `call proc;`
    Call { proc: String },
    /// `while (cond) { body }`
    While { cond: CondExpr, body: Vec<Stmt> },
    /// `if (cond) then { then_body } else { else_body }`
    If {
        cond: CondExpr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
}

impl StmtKind {
    /// Whether this statement contains nested statements.
    pub fn is_container(&self) -> bool {
        matches!(self, StmtKind::While { .. } | StmtKind::If { .. })
    }

    /// A short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            StmtKind::Assign { .. } => "assign",
            StmtKind::Read { .. } => "read",
            StmtKind::Print { .. } => "print",
            StmtKind::Call { .. } => "call",
            StmtKind::While { .. } => "while",
            StmtKind::If { .. } => "if",
        }
    }
}

/// An arithmetic expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    /// Variable reference
    Var(String),
    /// Integer constant, kept as its source digits
    Const(String),
    /// Binary operation
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Collect the variable names read by this expression.
    pub fn collect_vars(&self, vars: &mut BTreeSet<String>) {
        match self {
            Expr::Var(name) => {
                vars.insert(name.clone());
            }
            Expr::Const(_) => {}
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_vars(vars);
                rhs.collect_vars(vars);
            }
        }
    }

    /// Collect the constant values appearing in this expression.
    pub fn collect_consts(&self, consts: &mut BTreeSet<String>) {
        match self {
            Expr::Var(_) => {}
            Expr::Const(value) => {
                consts.insert(value.clone());
            }
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_consts(consts);
                rhs.collect_consts(consts);
            }
        }
    }

    /// All nodes of the expression tree in preorder, the whole tree first.
    pub fn subexpressions(&self) -> Vec<&Expr> {
        let mut nodes = Vec::new();
        fn walk<'a>(e: &'a Expr, out: &mut Vec<&'a Expr>) {
            out.push(e);
            if let Expr::Binary { lhs, rhs, .. } = e {
                walk(lhs, out);
                walk(rhs, out);
            }
        }
        walk(self, &mut nodes);
        nodes
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Const(value) => write!(f, "{}", value),
            Expr::Binary { op, lhs, rhs } => write!(f, "({}{}{})", lhs, op, rhs),
        }
    }
}

/// Binary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
        };
        write!(f, "{}", s)
    }
}

/// A condition expression for `if` and `while` statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CondExpr {
    /// `!(cond)`
    Not(Box<CondExpr>),
    /// `(cond) && (cond)`
    And(Box<CondExpr>, Box<CondExpr>),
    /// `(cond) || (cond)`
    Or(Box<CondExpr>, Box<CondExpr>),
    /// `lhs op rhs`
    Rel {
        op: RelOp,
        lhs: Expr,
        rhs: Expr,
    },
}

impl CondExpr {
    /// Collect the variable names read by this condition.
    pub fn collect_vars(&self, vars: &mut BTreeSet<String>) {
        match self {
            CondExpr::Not(inner) => inner.collect_vars(vars),
            CondExpr::And(lhs, rhs) | CondExpr::Or(lhs, rhs) => {
                lhs.collect_vars(vars);
                rhs.collect_vars(vars);
            }
            CondExpr::Rel { lhs, rhs, .. } => {
                lhs.collect_vars(vars);
                rhs.collect_vars(vars);
            }
        }
    }

    /// Collect the constant values appearing in this condition.
    pub fn collect_consts(&self, consts: &mut BTreeSet<String>) {
        match self {
            CondExpr::Not(inner) => inner.collect_consts(consts),
            CondExpr::And(lhs, rhs) | CondExpr::Or(lhs, rhs) => {
                lhs.collect_consts(consts);
                rhs.collect_consts(consts);
            }
            CondExpr::Rel { lhs, rhs, .. } => {
                lhs.collect_consts(consts);
                rhs.collect_consts(consts);
            }
        }
    }
}

/// Relational comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelOp::Eq => "==",
            RelOp::Ne => "!=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
            RelOp::Lt => "<",
            RelOp::Le => "<=",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    #[test]
    fn test_canonical_left_associative() {
        // a + b + c parses left-associatively
        let e = binary(BinOp::Add, binary(BinOp::Add, var("a"), var("b")), var("c"));
        assert_eq!(e.to_string(), "((a+b)+c)");
    }

    #[test]
    fn test_canonical_leaf() {
        assert_eq!(var("x").to_string(), "x");
        assert_eq!(Expr::Const("23".to_string()).to_string(), "23");
    }

    #[test]
    fn test_subexpressions_preorder() {
        let e = binary(BinOp::Add, Expr::Const("23".to_string()), var("another_var"));
        let subs: Vec<String> = e.subexpressions().iter().map(|s| s.to_string()).collect();
        assert_eq!(subs, vec!["(23+another_var)", "23", "another_var"]);
    }

    #[test]
    fn test_collect_vars_and_consts() {
        let e = binary(
            BinOp::Mul,
            binary(BinOp::Add, var("x"), Expr::Const("1".to_string())),
            var("y"),
        );
        let mut vars = BTreeSet::new();
        e.collect_vars(&mut vars);
        assert_eq!(vars.into_iter().collect::<Vec<_>>(), vec!["x", "y"]);

        let mut consts = BTreeSet::new();
        e.collect_consts(&mut consts);
        assert_eq!(consts.into_iter().collect::<Vec<_>>(), vec!["1"]);
    }

    #[test]
    fn test_cond_collect_vars() {
        // !(armani == gucci)
        let cond = CondExpr::Not(Box::new(CondExpr::Rel {
            op: RelOp::Eq,
            lhs: var("armani"),
            rhs: var("gucci"),
        }));
        let mut vars = BTreeSet::new();
        cond.collect_vars(&mut vars);
        assert_eq!(
            vars.into_iter().collect::<Vec<_>>(),
            vec!["armani", "gucci"]
        );
    }
}
