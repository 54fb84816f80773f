//! Tree operations: insert, remove, attach checks, walks.

use std::collections::VecDeque;

use slotmap::{SecondaryMap, SlotMap};

use super::node::{NodeData, NodeId, NodeKind};

/// Empty slice constant for returning when a node has no children.
const EMPTY_CHILDREN: &[NodeId] = &[];

/// The central DOM tree, backed by a slotmap arena.
///
/// All nodes live in a single `SlotMap`. Parent/child relationships are stored
/// in secondary maps so that node removal is O(subtree size) and lookup is O(1).
///
/// A node is *attached* when it is reachable from the document root. Swap
/// targets and binding nodes are checked for attachment before any mutation is
/// applied to them.
pub struct Dom {
    pub(crate) nodes: SlotMap<NodeId, NodeData>,
    children: SecondaryMap<NodeId, Vec<NodeId>>,
    parent: SecondaryMap<NodeId, NodeId>,
    root: Option<NodeId>,
}

impl Dom {
    /// Create an empty DOM.
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            children: SecondaryMap::new(),
            parent: SecondaryMap::new(),
            root: None,
        }
    }

    /// Insert a root-level node (no parent).
    ///
    /// If no root has been set yet, this node becomes the document root.
    pub fn insert(&mut self, data: NodeData) -> NodeId {
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        if self.root.is_none() {
            self.root = Some(id);
        }
        id
    }

    /// Insert a node as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics (debug) if `parent` does not exist in the tree.
    pub fn insert_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        debug_assert!(
            self.nodes.contains_key(parent),
            "parent node does not exist"
        );
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        self.parent.insert(id, parent);
        self.children
            .get_mut(parent)
            .expect("parent must have children vec")
            .push(id);
        id
    }

    /// Insert a node as a child of `parent` at the given index.
    ///
    /// An index past the end appends. Used by prepend and replace-outer swaps,
    /// which must preserve sibling order.
    ///
    /// # Panics
    ///
    /// Panics (debug) if `parent` does not exist in the tree.
    pub fn insert_child_at(&mut self, parent: NodeId, index: usize, data: NodeData) -> NodeId {
        debug_assert!(
            self.nodes.contains_key(parent),
            "parent node does not exist"
        );
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        self.parent.insert(id, parent);
        let siblings = self
            .children
            .get_mut(parent)
            .expect("parent must have children vec");
        let index = index.min(siblings.len());
        siblings.insert(index, id);
        id
    }

    /// Remove a node and all its descendants recursively.
    ///
    /// Returns the ids of every removed node (the subtree in BFS order), or an
    /// empty vec if the node didn't exist. The caller uses the returned ids to
    /// tear down bindings and scopes tied to the removed subtree.
    pub fn remove(&mut self, id: NodeId) -> Vec<NodeId> {
        if !self.nodes.contains_key(id) {
            return Vec::new();
        }

        // Detach from parent's children list.
        if let Some(parent_id) = self.parent.remove(id) {
            if let Some(siblings) = self.children.get_mut(parent_id) {
                siblings.retain(|&child| child != id);
            }
        }

        // Clear root if we're removing it.
        if self.root == Some(id) {
            self.root = None;
        }

        // Collect all descendants (BFS) and remove them.
        let mut to_remove = VecDeque::new();
        to_remove.push_back(id);
        let mut removed = Vec::new();

        while let Some(current) = to_remove.pop_front() {
            // Queue children before removing.
            if let Some(kids) = self.children.remove(current) {
                for &child in &kids {
                    to_remove.push_back(child);
                }
            }
            self.parent.remove(current);
            if self.nodes.remove(current).is_some() {
                removed.push(current);
            }
        }

        removed
    }

    /// Remove all children of `node`, returning every removed id.
    pub fn remove_children(&mut self, node: NodeId) -> Vec<NodeId> {
        let kids: Vec<NodeId> = self.children(node).to_vec();
        let mut removed = Vec::new();
        for child in kids {
            removed.extend(self.remove(child));
        }
        removed
    }

    /// Get the parent of a node, if it has one.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent.get(id).copied()
    }

    /// Get the children of a node. Returns an empty slice if the node has no
    /// children or does not exist.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_CHILDREN)
    }

    /// The position of `id` within its parent's children list.
    pub fn sibling_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Walk from `id` up to the root, collecting ancestor node ids.
    ///
    /// The returned vec does **not** include `id` itself; it starts with the
    /// immediate parent and ends at the topmost ancestor.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = id;
        while let Some(p) = self.parent.get(current).copied() {
            result.push(p);
            current = p;
        }
        result
    }

    /// Whether `id` is attached to the document: it exists and its ancestor
    /// chain terminates at the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        if !self.nodes.contains_key(id) {
            return false;
        }
        let Some(root) = self.root else {
            return false;
        };
        if id == root {
            return true;
        }
        self.ancestors(id).last() == Some(&root)
    }

    /// Immutable access to a node's data.
    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    /// Mutable access to a node's data.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id)
    }

    /// The current document root, if set.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Explicitly set the document root.
    pub fn set_root(&mut self, id: NodeId) {
        self.root = Some(id);
    }

    /// Number of nodes in the DOM.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the DOM is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the DOM contains a node with the given id.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Replace the children of `node` with a single text node holding `content`.
    ///
    /// This is the `textContent`-style mutation applied by text bindings.
    /// Returns the removed child ids so bindings under them can be torn down.
    pub fn set_text(&mut self, node: NodeId, content: &str) -> Vec<NodeId> {
        if !self.nodes.contains_key(node) {
            return Vec::new();
        }
        // A text node's own content is updated in place.
        if let Some(data) = self.nodes.get_mut(node) {
            if let NodeKind::Text(existing) = &mut data.kind {
                *existing = content.to_string();
                return Vec::new();
            }
        }
        let removed = self.remove_children(node);
        self.insert_child(node, NodeData::text(content));
        removed
    }

    /// Concatenated text content of `node` and its descendants, in order.
    pub fn text_of(&self, node: NodeId) -> String {
        let mut out = String::new();
        for id in self.walk_depth_first(node) {
            if let Some(content) = self.get(id).and_then(NodeData::text_content) {
                out.push_str(content);
            }
        }
        out
    }

    /// Pre-order depth-first traversal starting from `start`.
    pub fn walk_depth_first(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            // Push children in reverse so the first child is visited first.
            let kids = self.children(current);
            for &child in kids.iter().rev() {
                stack.push(child);
            }
        }
        result
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a small test tree:
    /// ```text
    ///       body
    ///      /    \
    ///    a        b
    ///   / \
    ///  c   t ("hi")
    /// ```
    fn build_tree() -> (Dom, NodeId, NodeId, NodeId, NodeId, NodeId) {
        let mut dom = Dom::new();
        let root = dom.insert(NodeData::element("body"));
        let a = dom.insert_child(root, NodeData::element("div").with_attr("id", "a"));
        let b = dom.insert_child(root, NodeData::element("div").with_attr("id", "b"));
        let c = dom.insert_child(a, NodeData::element("button").with_attr("id", "c"));
        let t = dom.insert_child(a, NodeData::text("hi"));
        (dom, root, a, b, c, t)
    }

    #[test]
    fn insert_sets_root() {
        let mut dom = Dom::new();
        let id = dom.insert(NodeData::element("body"));
        assert_eq!(dom.root(), Some(id));
    }

    #[test]
    fn insert_child_parent_relationship() {
        let (dom, root, a, _b, c, _t) = build_tree();
        assert_eq!(dom.parent(a), Some(root));
        assert_eq!(dom.parent(c), Some(a));
        assert_eq!(dom.parent(root), None);
    }

    #[test]
    fn children_list() {
        let (dom, root, a, b, c, t) = build_tree();
        assert_eq!(dom.children(root), &[a, b]);
        assert_eq!(dom.children(a), &[c, t]);
        assert!(dom.children(c).is_empty());
    }

    #[test]
    fn insert_child_at_prepends() {
        let (mut dom, root, a, b, ..) = build_tree();
        let new = dom.insert_child_at(root, 0, NodeData::element("header"));
        assert_eq!(dom.children(root), &[new, a, b]);
    }

    #[test]
    fn insert_child_at_clamps_index() {
        let (mut dom, root, a, b, ..) = build_tree();
        let new = dom.insert_child_at(root, 99, NodeData::element("footer"));
        assert_eq!(dom.children(root), &[a, b, new]);
    }

    #[test]
    fn sibling_index() {
        let (dom, _root, a, b, ..) = build_tree();
        assert_eq!(dom.sibling_index(a), Some(0));
        assert_eq!(dom.sibling_index(b), Some(1));
    }

    #[test]
    fn sibling_index_of_root_is_none() {
        let (dom, root, ..) = build_tree();
        assert_eq!(dom.sibling_index(root), None);
    }

    #[test]
    fn ancestors() {
        let (dom, root, a, _b, c, _t) = build_tree();
        assert_eq!(dom.ancestors(c), vec![a, root]);
        assert_eq!(dom.ancestors(a), vec![root]);
        assert!(dom.ancestors(root).is_empty());
    }

    #[test]
    fn remove_returns_subtree_ids() {
        let (mut dom, root, a, b, c, t) = build_tree();
        let removed = dom.remove(a);
        assert_eq!(removed, vec![a, c, t]);
        assert!(!dom.contains(a));
        assert!(!dom.contains(c));
        assert!(dom.contains(root));
        assert!(dom.contains(b));
        assert_eq!(dom.children(root), &[b]);
        assert_eq!(dom.len(), 2);
    }

    #[test]
    fn remove_root() {
        let (mut dom, root, ..) = build_tree();
        dom.remove(root);
        assert!(dom.is_empty());
        assert_eq!(dom.root(), None);
    }

    #[test]
    fn remove_nonexistent() {
        let mut dom = Dom::new();
        let id = dom.insert(NodeData::element("div"));
        dom.remove(id);
        assert!(dom.remove(id).is_empty());
    }

    #[test]
    fn remove_children_keeps_node() {
        let (mut dom, _root, a, _b, c, t) = build_tree();
        let removed = dom.remove_children(a);
        assert_eq!(removed.len(), 2);
        assert!(removed.contains(&c));
        assert!(removed.contains(&t));
        assert!(dom.contains(a));
        assert!(dom.children(a).is_empty());
    }

    #[test]
    fn is_attached() {
        let (mut dom, root, a, _b, c, _t) = build_tree();
        assert!(dom.is_attached(root));
        assert!(dom.is_attached(c));
        dom.remove(a);
        assert!(!dom.is_attached(a));
        assert!(!dom.is_attached(c));
    }

    #[test]
    fn detached_second_root_is_not_attached() {
        let mut dom = Dom::new();
        let _root = dom.insert(NodeData::element("body"));
        let orphan = dom.insert(NodeData::element("div"));
        assert!(!dom.is_attached(orphan));
    }

    #[test]
    fn set_text_replaces_children() {
        let (mut dom, _root, a, _b, c, t) = build_tree();
        let removed = dom.set_text(a, "updated");
        assert!(removed.contains(&c));
        assert!(removed.contains(&t));
        assert_eq!(dom.children(a).len(), 1);
        assert_eq!(dom.text_of(a), "updated");
    }

    #[test]
    fn set_text_on_text_node_updates_in_place() {
        let (mut dom, _root, _a, _b, _c, t) = build_tree();
        let removed = dom.set_text(t, "bye");
        assert!(removed.is_empty());
        assert_eq!(dom.get(t).unwrap().text_content(), Some("bye"));
    }

    #[test]
    fn text_of_concatenates_in_order() {
        let mut dom = Dom::new();
        let root = dom.insert(NodeData::element("p"));
        dom.insert_child(root, NodeData::text("Hello, "));
        let span = dom.insert_child(root, NodeData::element("span"));
        dom.insert_child(span, NodeData::text("World"));
        dom.insert_child(root, NodeData::text("!"));
        assert_eq!(dom.text_of(root), "Hello, World!");
    }

    #[test]
    fn walk_depth_first() {
        let (dom, root, a, b, c, t) = build_tree();
        let order = dom.walk_depth_first(root);
        assert_eq!(order, vec![root, a, c, t, b]);
    }

    #[test]
    fn walk_depth_first_subtree() {
        let (dom, _root, a, _b, c, t) = build_tree();
        let order = dom.walk_depth_first(a);
        assert_eq!(order, vec![a, c, t]);
    }

    #[test]
    fn default_impl() {
        let dom = Dom::default();
        assert!(dom.is_empty());
        assert_eq!(dom.root(), None);
    }
}
