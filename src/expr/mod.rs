//! Expression language: a closed subset shared by state, bindings, and
//! handlers.
//!
//! - [`tokenizer`] — logos lexer for the operator/literal token set.
//! - [`ast`] — [`Expr`] nodes plus dependency extraction ([`Expr::reads`]).
//! - [`parser`] — recursive-descent parser, precedence climbing.
//! - [`value`] — [`Value`], the dynamic result type.
//! - [`eval`] — pure [`evaluate`] and handler-position [`execute`].
//!
//! The grammar deliberately has no calls, no indexing, and no access to
//! anything outside the scope chain; expressions come from markup
//! attributes and are treated as untrusted input.

pub mod ast;
pub mod eval;
pub mod parser;
pub mod tokenizer;
pub mod value;

pub use ast::{Expr, Path};
pub use eval::{evaluate, execute};
pub use parser::parse_expression;
pub use value::Value;

use thiserror::Error;

/// Failure while parsing or evaluating an expression.
///
/// A single taxonomy covers both phases: bindings report whichever stage
/// failed through the same channel, and the runtime treats any variant as
/// "skip this binding, keep the rest alive".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The source text did not parse. `position` is a byte offset for
    /// tokenizer failures and a token index for parser failures.
    #[error("syntax error at {position}: {message}")]
    Syntax { position: usize, message: String },

    /// An identifier resolved to nothing anywhere on the scope chain.
    #[error("undefined identifier '{0}'")]
    UndefinedIdentifier(String),

    /// Property access on an object that has no such key.
    #[error("unknown property '{property}' on {object}")]
    UnknownProperty { object: String, property: String },

    /// An operator was applied to operands of unsupported types.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Assignment appeared outside handler position.
    #[error("assignment is only allowed in event handlers")]
    AssignmentNotAllowed,
}
