//! Retained DOM: slotmap-backed node arena with tree operations and queries.
//!
//! - [`node`] — `NodeId` key type and `NodeData` (element/text content).
//! - [`tree`] — the [`Dom`](tree::Dom) arena: insert, remove, walks,
//!   attachment checks.
//! - [`query`] — lookups by id, tag, and attribute.

pub mod node;
pub mod query;
pub mod tree;

pub use node::{NodeData, NodeId, NodeKind};
pub use tree::Dom;
