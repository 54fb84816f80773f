//! Expression AST and read-set analysis.

use std::collections::BTreeSet;

use super::value::Value;

/// Binary operators, grouped by precedence tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `||`
    Or,
    /// `&&`
    And,
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Neg,
}

/// An assignment target: a root identifier plus optional property path.
///
/// `message` has no segments; `user.name` has root `user` and one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub root: String,
    pub segments: Vec<String>,
}

/// A compiled expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal value.
    Literal(Value),
    /// Identifier lookup through the scope chain.
    Ident(String),
    /// Property access: `base.name`.
    Member(Box<Expr>, String),
    /// Object literal: `{ key: expr, ... }`. Key order is preserved.
    Object(Vec<(String, Expr)>),
    /// Unary operation.
    Unary(UnaryOp, Box<Expr>),
    /// Binary operation.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Assignment: allowed only in event-handler position.
    Assign(Path, Box<Expr>),
}

impl Expr {
    /// The root identifiers this expression reads.
    ///
    /// Subscriptions are keyed by root identifier: `user.profile.name`
    /// subscribes to `user`. An assignment's target is a write, not a read,
    /// but its value expression still contributes reads.
    pub fn reads(&self) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        self.collect_reads(&mut keys);
        keys
    }

    fn collect_reads(&self, keys: &mut BTreeSet<String>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Ident(name) => {
                keys.insert(name.clone());
            }
            Expr::Member(base, _) => base.collect_reads(keys),
            Expr::Object(entries) => {
                for (_, expr) in entries {
                    expr.collect_reads(keys);
                }
            }
            Expr::Unary(_, inner) => inner.collect_reads(keys),
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_reads(keys);
                rhs.collect_reads(keys);
            }
            Expr::Assign(_, value) => value.collect_reads(keys),
        }
    }

    /// Whether this expression contains an assignment anywhere.
    pub fn contains_assignment(&self) -> bool {
        match self {
            Expr::Assign(..) => true,
            Expr::Literal(_) | Expr::Ident(_) => false,
            Expr::Member(base, _) => base.contains_assignment(),
            Expr::Object(entries) => entries.iter().any(|(_, e)| e.contains_assignment()),
            Expr::Unary(_, inner) => inner.contains_assignment(),
            Expr::Binary(_, lhs, rhs) => lhs.contains_assignment() || rhs.contains_assignment(),
        }
    }
}
