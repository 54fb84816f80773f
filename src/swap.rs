//! Swap execution: splicing a response fragment into the document.
//!
//! A swap is resolved against the live arena at application time, not at
//! dispatch time; if the target left the document while the request was in
//! flight the swap refuses rather than writing into a detached subtree.

use thiserror::Error;

use crate::dom::{Dom, NodeId};
use crate::fetch::SwapStrategy;
use crate::markup::{parse_fragment, ParseError};

/// Nodes affected by one swap, for rebinding and teardown.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SwapOutcome {
    /// Top-level nodes spliced in, in document order.
    pub inserted: Vec<NodeId>,
    /// Every node detached, including descendants.
    pub removed: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SwapError {
    /// The target is gone or detached; the response is discarded.
    #[error("swap target is no longer attached")]
    TargetMissing,

    /// Outer replacement of the document root is not meaningful.
    #[error("cannot replace the document root")]
    RootReplacement,

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Apply `body` to `target` according to `strategy`.
///
/// The body is parsed before anything is detached, so a malformed
/// fragment leaves the document untouched.
pub fn swap(
    dom: &mut Dom,
    target: NodeId,
    strategy: SwapStrategy,
    body: &str,
) -> Result<SwapOutcome, SwapError> {
    if strategy == SwapStrategy::None {
        return Ok(SwapOutcome::default());
    }
    if !dom.is_attached(target) {
        return Err(SwapError::TargetMissing);
    }
    let fragment = parse_fragment(body)?;

    let mut outcome = SwapOutcome::default();
    match strategy {
        SwapStrategy::ReplaceInner => {
            outcome.removed = dom.remove_children(target);
            for node in &fragment.nodes {
                let index = dom.children(target).len();
                outcome.inserted.push(crate::markup::instantiate(dom, target, index, node));
            }
        }
        SwapStrategy::ReplaceOuter => {
            let Some(parent) = dom.parent(target) else {
                return Err(SwapError::RootReplacement);
            };
            let Some(index) = dom.sibling_index(target) else {
                return Err(SwapError::TargetMissing);
            };
            outcome.removed = dom.remove(target);
            for (offset, node) in fragment.nodes.iter().enumerate() {
                outcome
                    .inserted
                    .push(crate::markup::instantiate(dom, parent, index + offset, node));
            }
        }
        SwapStrategy::Append => {
            for node in &fragment.nodes {
                let index = dom.children(target).len();
                outcome.inserted.push(crate::markup::instantiate(dom, target, index, node));
            }
        }
        SwapStrategy::Prepend => {
            for (offset, node) in fragment.nodes.iter().enumerate() {
                outcome
                    .inserted
                    .push(crate::markup::instantiate(dom, target, offset, node));
            }
        }
        SwapStrategy::None => {}
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeData;
    use crate::markup::serialize_children;
    use pretty_assertions::assert_eq;

    /// A body root holding `<div id="target"><span>old</span></div>`.
    fn document() -> (Dom, NodeId, NodeId) {
        let mut dom = Dom::new();
        let root = dom.insert(NodeData::element("body"));
        dom.set_root(root);
        let target = dom.insert_child(root, NodeData::element("div").with_attr("id", "target"));
        let span = dom.insert_child(target, NodeData::element("span"));
        dom.insert_child(span, NodeData::text("old"));
        (dom, root, target)
    }

    #[test]
    fn replace_inner_swaps_children() {
        let (mut dom, _, target) = document();
        let outcome = swap(&mut dom, target, SwapStrategy::ReplaceInner, "<p>OK</p>").unwrap();
        assert_eq!(serialize_children(&dom, target), "<p>OK</p>");
        assert_eq!(outcome.inserted.len(), 1);
        // The old span and its text node both came out.
        assert_eq!(outcome.removed.len(), 2);
        for &id in &outcome.removed {
            assert!(!dom.contains(id));
        }
    }

    #[test]
    fn replace_outer_swaps_the_element_in_place() {
        let (mut dom, root, target) = document();
        dom.insert_child(root, NodeData::element("footer"));
        let outcome = swap(&mut dom, target, SwapStrategy::ReplaceOuter, "<p>OK</p>").unwrap();
        assert_eq!(serialize_children(&dom, root), "<p>OK</p><footer></footer>");
        assert!(!dom.contains(target));
        assert_eq!(dom.parent(outcome.inserted[0]), Some(root));
    }

    #[test]
    fn append_and_prepend_preserve_existing_children() {
        let (mut dom, _, target) = document();
        swap(&mut dom, target, SwapStrategy::Append, "<i>a</i><i>b</i>").unwrap();
        swap(&mut dom, target, SwapStrategy::Prepend, "<u>x</u><u>y</u>").unwrap();
        assert_eq!(
            serialize_children(&dom, target),
            "<u>x</u><u>y</u><span>old</span><i>a</i><i>b</i>"
        );
    }

    #[test]
    fn none_discards_the_body() {
        let (mut dom, _, target) = document();
        let outcome = swap(&mut dom, target, SwapStrategy::None, "<p>ignored</p>").unwrap();
        assert_eq!(outcome, SwapOutcome::default());
        assert_eq!(serialize_children(&dom, target), "<span>old</span>");
    }

    #[test]
    fn detached_target_is_refused() {
        let (mut dom, _, target) = document();
        dom.remove(target);
        let err = swap(&mut dom, target, SwapStrategy::ReplaceInner, "<p>OK</p>").unwrap_err();
        assert_eq!(err, SwapError::TargetMissing);
    }

    #[test]
    fn malformed_fragment_leaves_document_untouched() {
        let (mut dom, _, target) = document();
        let err = swap(&mut dom, target, SwapStrategy::ReplaceInner, "<p>bad</div>");
        assert!(matches!(err, Err(SwapError::Parse(_))));
        assert_eq!(serialize_children(&dom, target), "<span>old</span>");
    }

    #[test]
    fn outer_swap_of_root_is_refused() {
        let (mut dom, root, _) = document();
        let err = swap(&mut dom, root, SwapStrategy::ReplaceOuter, "<p>OK</p>").unwrap_err();
        assert_eq!(err, SwapError::RootReplacement);
    }
}
