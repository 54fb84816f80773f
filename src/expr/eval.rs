//! Expression evaluation against the scope chain.
//!
//! Two entry points with different capability:
//!
//! - [`evaluate`] — pure; reads the scope chain, never mutates. Used for
//!   text/visibility bindings, scope declarations, and request parameters.
//!   Rejects assignment with [`EvalError::AssignmentNotAllowed`].
//! - [`execute`] — event-handler position; additionally performs assignment,
//!   writing through [`ScopeTree::set`] so subscribers are notified.
//!
//! Expressions originate from server-rendered markup that may interpolate
//! untrusted content, so the evaluator exposes nothing beyond this grammar:
//! no calls, no indexing, no global access.

use std::collections::BTreeMap;

use super::ast::{BinaryOp, Expr, Path, UnaryOp};
use super::value::Value;
use super::EvalError;
use crate::reactive::{ScopeId, ScopeTree};

/// Evaluate an expression without side effects.
pub fn evaluate(expr: &Expr, scopes: &ScopeTree, scope: ScopeId) -> Result<Value, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Ident(name) => scopes
            .get(scope, name)
            .ok_or_else(|| EvalError::UndefinedIdentifier(name.clone())),
        Expr::Member(base, name) => {
            let base = evaluate(base, scopes, scope)?;
            member(&base, name)
        }
        Expr::Object(entries) => {
            let mut object = BTreeMap::new();
            for (key, value_expr) in entries {
                object.insert(key.clone(), evaluate(value_expr, scopes, scope)?);
            }
            Ok(Value::Object(object))
        }
        Expr::Unary(op, inner) => {
            let value = evaluate(inner, scopes, scope)?;
            unary(*op, value)
        }
        Expr::Binary(op, lhs, rhs) => binary(*op, lhs, rhs, scopes, scope),
        Expr::Assign(..) => Err(EvalError::AssignmentNotAllowed),
    }
}

/// Evaluate an event-handler expression, performing assignments.
///
/// Returns the resulting value (an assignment yields the assigned value).
pub fn execute(expr: &Expr, scopes: &mut ScopeTree, scope: ScopeId) -> Result<Value, EvalError> {
    match expr {
        Expr::Assign(path, value_expr) => {
            let value = execute(value_expr, scopes, scope)?;
            assign(path, value.clone(), scopes, scope)?;
            Ok(value)
        }
        _ => evaluate(expr, scopes, scope),
    }
}

/// Write `value` at `path`, resolving the owning scope for the root key.
///
/// The write lands in the scope where the root key is visible from `scope`
/// walking inward-out; a root key not yet declared anywhere is created in
/// `scope` itself. Writes never cross into a parent's mapping: the store's
/// `set` is always local to the scope it is called on.
fn assign(path: &Path, value: Value, scopes: &mut ScopeTree, scope: ScopeId) -> Result<(), EvalError> {
    let target_scope = owning_scope(scopes, scope, &path.root).unwrap_or(scope);
    if path.segments.is_empty() {
        scopes.set(target_scope, &path.root, value);
        return Ok(());
    }
    let mut root = scopes
        .get(target_scope, &path.root)
        .ok_or_else(|| EvalError::UndefinedIdentifier(path.root.clone()))?;
    set_in_object(&mut root, &path.segments, value)?;
    scopes.set(target_scope, &path.root, root);
    Ok(())
}

/// The nearest scope (self first, then ancestors) declaring `key` locally.
fn owning_scope(scopes: &ScopeTree, scope: ScopeId, key: &str) -> Option<ScopeId> {
    let mut current = Some(scope);
    while let Some(id) = current {
        if scopes.get_local(id, key).is_some() {
            return Some(id);
        }
        current = scopes.parent(id);
    }
    None
}

fn set_in_object(target: &mut Value, segments: &[String], value: Value) -> Result<(), EvalError> {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return Ok(());
    };
    let Value::Object(map) = target else {
        return Err(EvalError::TypeMismatch(format!(
            "cannot set property '{head}' on {}",
            target.type_name()
        )));
    };
    if rest.is_empty() {
        map.insert(head.clone(), value);
        return Ok(());
    }
    let next = map
        .get_mut(head)
        .ok_or_else(|| EvalError::UnknownProperty {
            object: "object".to_string(),
            property: head.clone(),
        })?;
    set_in_object(next, rest, value)
}

fn member(base: &Value, name: &str) -> Result<Value, EvalError> {
    match base {
        Value::Object(map) => map
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownProperty {
                object: "object".to_string(),
                property: name.to_string(),
            }),
        other => Err(EvalError::TypeMismatch(format!(
            "cannot read property '{name}' of {}",
            other.type_name()
        ))),
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
        UnaryOp::Neg => match value {
            Value::Number(n) => Ok(Value::Number(-n)),
            other => Err(EvalError::TypeMismatch(format!(
                "cannot negate {}",
                other.type_name()
            ))),
        },
    }
}

fn binary(
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    scopes: &ScopeTree,
    scope: ScopeId,
) -> Result<Value, EvalError> {
    // Short-circuit forms evaluate the right side only when needed.
    match op {
        BinaryOp::Or => {
            let left = evaluate(lhs, scopes, scope)?;
            if left.is_truthy() {
                return Ok(Value::Bool(true));
            }
            let right = evaluate(rhs, scopes, scope)?;
            return Ok(Value::Bool(right.is_truthy()));
        }
        BinaryOp::And => {
            let left = evaluate(lhs, scopes, scope)?;
            if !left.is_truthy() {
                return Ok(Value::Bool(false));
            }
            let right = evaluate(rhs, scopes, scope)?;
            return Ok(Value::Bool(right.is_truthy()));
        }
        _ => {}
    }

    let left = evaluate(lhs, scopes, scope)?;
    let right = evaluate(rhs, scopes, scope)?;
    match op {
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::NotEq => Ok(Value::Bool(left != right)),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => compare(op, &left, &right),
        BinaryOp::Add => add(&left, &right),
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => arithmetic(op, &left, &right),
        BinaryOp::Or | BinaryOp::And => unreachable!("handled above"),
    }
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => {
            return Err(EvalError::TypeMismatch(format!(
                "cannot compare {} with {}",
                left.type_name(),
                right.type_name()
            )))
        }
    };
    let Some(ordering) = ordering else {
        // NaN involved: all comparisons are false.
        return Ok(Value::Bool(false));
    };
    let result = match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::Ge => ordering.is_ge(),
        _ => unreachable!(),
    };
    Ok(Value::Bool(result))
}

fn add(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
        // String concatenation when either side is a string.
        (Value::Str(_), _) | (_, Value::Str(_)) => {
            Ok(Value::Str(format!("{}{}", left.render(), right.render())))
        }
        _ => Err(EvalError::TypeMismatch(format!(
            "cannot add {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let (Value::Number(a), Value::Number(b)) = (left, right) else {
        return Err(EvalError::TypeMismatch(format!(
            "arithmetic requires numbers, got {} and {}",
            left.type_name(),
            right.type_name()
        )));
    };
    let result = match op {
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        _ => unreachable!(),
    };
    Ok(Value::Number(result))
}
