//! Fragment parsing and serialization.
//!
//! The server collaborator returns well-formed HTML fragments; [`parser`]
//! turns them into [`MarkupNode`] trees and [`serialize`] writes DOM subtrees
//! back out (used by the swap round-trip property and tests).

pub mod parser;
pub mod serialize;

pub use parser::{parse_fragment, Fragment, MarkupNode, ParseError};
pub use serialize::{
    instantiate, serialize_children, serialize_document, serialize_fragment, serialize_node,
};
