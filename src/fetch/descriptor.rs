//! Request descriptors: the compiled form of the network directives on an
//! element.
//!
//! A descriptor is assembled once at bind time from `w-get`/`w-post` plus
//! the modifier attributes (`w-trigger`, `w-target`, `w-swap`, `w-params`)
//! and stays immutable afterwards; parameter expressions are re-evaluated
//! per dispatch, everything else is fixed.

use std::str::FromStr;

use thiserror::Error;

use crate::expr::Expr;

/// HTTP method for a round-trip. Only the two the directive set exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// Where a response fragment lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The element carrying the directive.
    This,
    /// The attached element whose `id` attribute matches.
    Id(String),
}

/// How the fragment is spliced relative to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwapStrategy {
    /// Replace the target's children. The default.
    #[default]
    ReplaceInner,
    /// Replace the target element itself.
    ReplaceOuter,
    /// Insert after the target's last child.
    Append,
    /// Insert before the target's first child.
    Prepend,
    /// Discard the body; the request runs for its side effects.
    None,
}

/// `w-swap` carried a value outside the strategy vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown swap strategy '{0}'")]
pub struct UnknownSwapStrategy(pub String);

impl FromStr for SwapStrategy {
    type Err = UnknownSwapStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inner" => Ok(SwapStrategy::ReplaceInner),
            "outer" => Ok(SwapStrategy::ReplaceOuter),
            "append" => Ok(SwapStrategy::Append),
            "prepend" => Ok(SwapStrategy::Prepend),
            "none" => Ok(SwapStrategy::None),
            other => Err(UnknownSwapStrategy(other.to_string())),
        }
    }
}

/// What happens when an element's request fires while one is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConcurrencyMode {
    /// Ignore the new trigger. The default.
    #[default]
    DropIfPending,
    /// Remember that a trigger arrived and re-dispatch once when the
    /// in-flight request settles. Repeat triggers collapse into one.
    QueueLatest,
    /// Dispatch immediately; responses race and stale generations are
    /// discarded on arrival.
    AllowConcurrent,
}

/// The complete network behavior bound to one element.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    /// Event name that fires the request, default `click`.
    pub event: String,
    pub method: Method,
    pub url: String,
    /// Expression producing an object of request parameters, evaluated at
    /// dispatch time against the element's scope.
    pub params: Option<Expr>,
    pub target: Target,
    pub strategy: SwapStrategy,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        RequestDescriptor {
            event: "click".to_string(),
            method,
            url: url.into(),
            params: None,
            target: Target::This,
            strategy: SwapStrategy::default(),
        }
    }
}
