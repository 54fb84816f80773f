//! Directive recognition: turning `w-` attributes into compiled directives.
//!
//! Attributes outside the `w-` namespace are plain markup and ignored.
//! Recognition is per element: the standalone directives each yield one
//! [`Directive`], while `w-get`/`w-post` and the modifier attributes
//! (`w-trigger`, `w-target`, `w-swap`, `w-params`) collapse into a single
//! [`Directive::Request`].

use thiserror::Error;

use crate::expr::{parse_expression, EvalError, Expr};
use crate::fetch::{Method, RequestDescriptor, SwapStrategy, Target, UnknownSwapStrategy};

/// One compiled behavior attached to an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// `w-scope` — declare a nested state scope from an object expression.
    Scope(Expr),
    /// `w-text` — keep the element's text content equal to the expression.
    Text(Expr),
    /// `w-show` — toggle visibility on the expression's truthiness.
    Show(Expr),
    /// `w-on:<event>` — run a handler expression when the event fires.
    Handler { event: String, expr: Expr },
    /// `w-get`/`w-post` plus modifiers — a server round-trip.
    Request(RequestDescriptor),
}

/// A `w-` attribute that could not be compiled.
///
/// Recognition keeps going past a bad directive: the element's remaining
/// directives still bind, and the error is surfaced through the runtime's
/// event queue.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DirectiveError {
    #[error("invalid expression in '{attribute}': {source}")]
    Expression {
        attribute: String,
        source: EvalError,
    },

    #[error(transparent)]
    Swap(#[from] UnknownSwapStrategy),

    /// `w-target` must be `this` or an id selector like `#result`.
    #[error("invalid target '{0}': expected 'this' or '#<id>'")]
    InvalidTarget(String),

    /// An element carried both `w-get` and `w-post`.
    #[error("conflicting request methods on one element")]
    ConflictingMethods,

    /// A request modifier appeared without `w-get` or `w-post`.
    #[error("'{0}' has no effect without w-get or w-post")]
    DanglingModifier(String),
}

/// Compile every recognized directive on an element.
///
/// Returns the directives that compiled alongside the errors for those
/// that did not; one bad attribute never suppresses its siblings, except
/// that any error within the request group voids the whole request.
pub fn compile(attributes: &[(String, String)]) -> (Vec<Directive>, Vec<DirectiveError>) {
    let mut directives = Vec::new();
    let mut errors = Vec::new();
    let mut request: Option<(Method, String)> = None;
    let mut modifiers = RequestModifiers::default();

    for (name, value) in attributes {
        match name.as_str() {
            "w-scope" => push_expr(&mut directives, &mut errors, name, value, Directive::Scope),
            "w-text" => push_expr(&mut directives, &mut errors, name, value, Directive::Text),
            "w-show" => push_expr(&mut directives, &mut errors, name, value, Directive::Show),
            "w-get" | "w-post" => {
                let method = if name == "w-get" { Method::Get } else { Method::Post };
                if request.is_some() {
                    errors.push(DirectiveError::ConflictingMethods);
                    request = None;
                    modifiers.voided = true;
                } else if !modifiers.voided {
                    request = Some((method, value.clone()));
                }
            }
            "w-trigger" => {
                modifiers.saw_modifier = true;
                modifiers.event = Some(value.clone());
            }
            "w-target" => {
                modifiers.saw_modifier = true;
                match parse_target(value) {
                    Ok(target) => modifiers.target = Some(target),
                    Err(err) => {
                        errors.push(err);
                        request = None;
                        modifiers.voided = true;
                    }
                }
            }
            "w-swap" => {
                modifiers.saw_modifier = true;
                match value.parse::<SwapStrategy>() {
                    Ok(strategy) => modifiers.strategy = Some(strategy),
                    Err(err) => {
                        errors.push(err.into());
                        request = None;
                        modifiers.voided = true;
                    }
                }
            }
            "w-params" => {
                modifiers.saw_modifier = true;
                match parse_expression(value) {
                    Ok(expr) => modifiers.params = Some(expr),
                    Err(source) => {
                        errors.push(DirectiveError::Expression {
                            attribute: name.clone(),
                            source,
                        });
                        request = None;
                        modifiers.voided = true;
                    }
                }
            }
            _ => {
                if let Some(event) = name.strip_prefix("w-on:") {
                    match parse_expression(value) {
                        Ok(expr) => directives.push(Directive::Handler {
                            event: event.to_string(),
                            expr,
                        }),
                        Err(source) => errors.push(DirectiveError::Expression {
                            attribute: name.clone(),
                            source,
                        }),
                    }
                }
            }
        }
    }

    match request {
        Some((method, url)) => {
            let mut descriptor = RequestDescriptor::new(method, url);
            if let Some(event) = modifiers.event {
                descriptor.event = event;
            }
            if let Some(target) = modifiers.target {
                descriptor.target = target;
            }
            if let Some(strategy) = modifiers.strategy {
                descriptor.strategy = strategy;
            }
            descriptor.params = modifiers.params;
            directives.push(Directive::Request(descriptor));
        }
        None => {
            if modifiers.saw_modifier && !modifiers.voided {
                errors.push(DirectiveError::DanglingModifier("w-trigger/w-target/w-swap/w-params".to_string()));
            }
        }
    }

    (directives, errors)
}

/// Parse an expression attribute and push the wrapped directive.
///
/// Assignment is handler-only; a reactive or scope expression carrying one
/// is rejected here rather than failing on every re-evaluation.
fn push_expr(
    directives: &mut Vec<Directive>,
    errors: &mut Vec<DirectiveError>,
    attribute: &str,
    value: &str,
    wrap: fn(Expr) -> Directive,
) {
    match parse_expression(value) {
        Ok(expr) if expr.contains_assignment() => errors.push(DirectiveError::Expression {
            attribute: attribute.to_string(),
            source: EvalError::AssignmentNotAllowed,
        }),
        Ok(expr) => directives.push(wrap(expr)),
        Err(source) => errors.push(DirectiveError::Expression {
            attribute: attribute.to_string(),
            source,
        }),
    }
}

#[derive(Default)]
struct RequestModifiers {
    event: Option<String>,
    target: Option<Target>,
    strategy: Option<SwapStrategy>,
    params: Option<Expr>,
    saw_modifier: bool,
    /// Set when any part of the request group failed; suppresses emitting
    /// a half-compiled request.
    voided: bool,
}

fn parse_target(value: &str) -> Result<Target, DirectiveError> {
    if value == "this" {
        return Ok(Target::This);
    }
    match value.strip_prefix('#') {
        Some(id) if !id.is_empty() => Ok(Target::Id(id.to_string())),
        _ => Err(DirectiveError::InvalidTarget(value.to_string())),
    }
}
