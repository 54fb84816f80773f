//! Top-level error type for runtime entry points.

use thiserror::Error;

use crate::markup::ParseError;

/// Failure surfaced by a runtime entry point.
///
/// Most faults inside a running document are reported through the event
/// queue and never reach this type; it covers the operations with a
/// direct caller to answer to, like mounting markup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("markup error: {0}")]
    Markup(#[from] ParseError),

    /// Reactive propagation failed to settle within the configured number
    /// of rounds.
    #[error("reactive propagation did not settle within {limit} rounds")]
    ReactivityDepthExceeded { limit: usize },
}
