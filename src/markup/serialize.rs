//! Serialization of fragments and DOM subtrees back to markup.
//!
//! Used by the swap round-trip property (replace-inner leaves the target's
//! serialized children equal to the parsed body) and by tests asserting on
//! tree state.

use crate::dom::{Dom, NodeData, NodeId, NodeKind};

use super::parser::{Fragment, MarkupNode, VOID_ELEMENTS};

/// Serialize a parsed fragment.
pub fn serialize_fragment(fragment: &Fragment) -> String {
    let mut out = String::new();
    for node in &fragment.nodes {
        write_markup_node(&mut out, node);
    }
    out
}

fn write_markup_node(out: &mut String, node: &MarkupNode) {
    match node {
        MarkupNode::Text(text) => out.push_str(&escape_text(text)),
        MarkupNode::Element {
            tag,
            attributes,
            children,
        } => {
            write_open_tag(out, tag, attributes);
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            for child in children {
                write_markup_node(out, child);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

/// Serialize a single DOM node and its subtree.
pub fn serialize_node(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    write_dom_node(dom, id, &mut out);
    out
}

/// Serialize the children of a DOM node (its "inner" markup).
pub fn serialize_children(dom: &Dom, id: NodeId) -> String {
    let mut out = String::new();
    for &child in dom.children(id) {
        write_dom_node(dom, child, &mut out);
    }
    out
}

fn write_dom_node(dom: &Dom, id: NodeId, out: &mut String) {
    let Some(data) = dom.get(id) else {
        return;
    };
    match &data.kind {
        NodeKind::Text(text) => out.push_str(&escape_text(text)),
        NodeKind::Element { tag, attributes } => {
            write_open_tag(out, tag, attributes);
            if VOID_ELEMENTS.contains(&tag.as_str()) {
                return;
            }
            for &child in dom.children(id) {
                write_dom_node(dom, child, out);
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}

fn write_open_tag(out: &mut String, tag: &str, attributes: &[(String, String)]) {
    out.push('<');
    out.push_str(tag);
    for (name, value) in attributes {
        out.push(' ');
        out.push_str(name);
        if !value.is_empty() {
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
    }
    out.push('>');
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Convenience for tests and callers: serialize a DOM subtree rooted at the
/// document root, or empty if no root is set.
pub fn serialize_document(dom: &Dom) -> String {
    match dom.root() {
        Some(root) => serialize_node(dom, root),
        None => String::new(),
    }
}

/// Instantiate a parsed markup node into the DOM arena under `parent` at
/// `index`, returning the created root id.
pub fn instantiate(dom: &mut Dom, parent: NodeId, index: usize, node: &MarkupNode) -> NodeId {
    let data = match node {
        MarkupNode::Text(text) => NodeData::text(text.clone()),
        MarkupNode::Element {
            tag, attributes, ..
        } => {
            let mut data = NodeData::element(tag.clone());
            for (name, value) in attributes {
                data.set_attr(name.clone(), value.clone());
            }
            data
        }
    };
    let id = dom.insert_child_at(parent, index, data);
    if let MarkupNode::Element { children, .. } = node {
        for child in children {
            instantiate_append(dom, id, child);
        }
    }
    id
}

fn instantiate_append(dom: &mut Dom, parent: NodeId, node: &MarkupNode) {
    let index = dom.children(parent).len();
    instantiate(dom, parent, index, node);
}
