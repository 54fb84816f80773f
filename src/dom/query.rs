//! DOM queries: by id, tag, attribute; swap-target resolution.

use super::node::{NodeData, NodeId};
use super::tree::Dom;

impl Dom {
    /// Find the first attached node whose `id` attribute matches.
    ///
    /// Document order (depth-first from the root), matching how an id
    /// selector resolves in a real document.
    pub fn query_by_id(&self, id: &str) -> Option<NodeId> {
        let root = self.root()?;
        self.walk_depth_first(root)
            .into_iter()
            .find(|&n| self.get(n).and_then(NodeData::id) == Some(id))
    }

    /// Find all attached nodes with the given tag name, in document order.
    pub fn query_by_tag(&self, tag: &str) -> Vec<NodeId> {
        let Some(root) = self.root() else {
            return Vec::new();
        };
        self.walk_depth_first(root)
            .into_iter()
            .filter(|&n| self.get(n).and_then(NodeData::tag) == Some(tag))
            .collect()
    }

    /// Find all attached nodes carrying the given attribute, in document order.
    pub fn query_by_attr(&self, name: &str) -> Vec<NodeId> {
        let Some(root) = self.root() else {
            return Vec::new();
        };
        self.walk_depth_first(root)
            .into_iter()
            .filter(|&n| self.get(n).map(|d| d.attr(name).is_some()).unwrap_or(false))
            .collect()
    }
}
