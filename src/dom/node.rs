//! Node types: NodeId, NodeData.

use slotmap::new_key_type;

new_key_type! {
    /// Unique identifier for a DOM node. Copy, lightweight (u64).
    ///
    /// Slotmap keys are generational: a key held after its node was removed
    /// simply fails lookup instead of aliasing a newer node, so holding stale
    /// ids (e.g. inside a binding) is always safe.
    pub struct NodeId;
}

/// The content of a single DOM node: an element or a run of text.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// An element: tag name plus ordered attribute list.
    Element {
        /// Tag name, lowercased (e.g. "div", "button").
        tag: String,
        /// Attributes in document order. Order is preserved so that a parsed
        /// fragment serializes back in its original shape.
        attributes: Vec<(String, String)>,
    },
    /// A text node.
    Text(String),
}

/// Data associated with a single DOM node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    /// Element or text content.
    pub kind: NodeKind,
    /// Whether this node is visible (toggled by visibility bindings).
    pub visible: bool,
}

impl NodeData {
    /// Create an element node with the given tag and no attributes.
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Element {
                tag: tag.into(),
                attributes: Vec::new(),
            },
            visible: true,
        }
    }

    /// Create a text node.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Text(content.into()),
            visible: true,
        }
    }

    /// Set an attribute (builder). Replaces an existing value for the same name.
    ///
    /// No-op on text nodes.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// The tag name, or `None` for text nodes.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    /// Whether this is a text node.
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text(_))
    }

    /// The text content of a text node, or `None` for elements.
    pub fn text_content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(content) => Some(content),
            NodeKind::Element { .. } => None,
        }
    }

    /// Look up an attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    /// Set an attribute, replacing an existing value for the same name.
    ///
    /// New attributes append at the end, preserving document order for the
    /// rest. No-op on text nodes.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        if let NodeKind::Element { attributes, .. } = &mut self.kind {
            let name = name.into();
            let value = value.into();
            match attributes.iter_mut().find(|(n, _)| *n == name) {
                Some(entry) => entry.1 = value,
                None => attributes.push((name, value)),
            }
        }
    }

    /// Remove an attribute. Returns the removed value, if any.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        if let NodeKind::Element { attributes, .. } = &mut self.kind {
            let pos = attributes.iter().position(|(n, _)| n == name)?;
            Some(attributes.remove(pos).1)
        } else {
            None
        }
    }

    /// All attributes in document order. Empty for text nodes.
    pub fn attributes(&self) -> &[(String, String)] {
        match &self.kind {
            NodeKind::Element { attributes, .. } => attributes,
            NodeKind::Text(_) => &[],
        }
    }

    /// The `id` attribute, if present.
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }
}
