//! Reactive state: per-subtree scopes with subscriptions and dirty tracking.
//!
//! - [`ScopeTree`] — the scope arena: chained lookup, local writes,
//!   subscription edges, and the pending dirty set the runtime flushes.

pub mod store;

pub use store::{ScopeId, ScopeTree};
