//! Hand-rolled fragment parser for the well-formed HTML subset the server
//! collaborator is contracted to return.
//!
//! The grammar is context-sensitive (text vs. tag position), so this module
//! uses a byte cursor instead of a table-driven lexer. Comments are skipped,
//! void elements close themselves, and the five basic entities are decoded.
//! It is not a recovery parser: malformed input is an error, never a guess.

/// Elements that never have children or a closing tag.
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// A parsed markup node, not yet instantiated into the DOM arena.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    /// An element with attributes (document order) and children.
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<MarkupNode>,
    },
    /// A text run with entities decoded.
    Text(String),
}

/// A parsed fragment: zero or more sibling nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    pub nodes: Vec<MarkupNode>,
}

/// Errors from fragment parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unexpected end of input: {0}")]
    UnexpectedEof(String),
    #[error("malformed tag at byte {offset}: {message}")]
    MalformedTag { offset: usize, message: String },
    #[error("mismatched closing tag at byte {offset}: expected </{expected}>, found </{found}>")]
    MismatchedClose {
        offset: usize,
        expected: String,
        found: String,
    },
    #[error("closing tag </{tag}> at byte {offset} has no open element")]
    UnexpectedClose { tag: String, offset: usize },
}

/// Parse a fragment string into a [`Fragment`].
pub fn parse_fragment(input: &str) -> Result<Fragment, ParseError> {
    let mut parser = Parser {
        bytes: input.as_bytes(),
        pos: 0,
    };
    let nodes = parser.parse_nodes(None)?;
    Ok(Fragment { nodes })
}

/// Byte-cursor parser state.
struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.bytes[self.pos..].starts_with(prefix.as_bytes())
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Parse sibling nodes until EOF, or until the closing tag for
    /// `open_tag` when inside an element.
    fn parse_nodes(&mut self, open_tag: Option<&str>) -> Result<Vec<MarkupNode>, ParseError> {
        let mut nodes = Vec::new();
        loop {
            if self.is_eof() {
                return match open_tag {
                    Some(tag) => Err(ParseError::UnexpectedEof(format!(
                        "element <{tag}> is never closed"
                    ))),
                    None => Ok(nodes),
                };
            }
            if self.starts_with("<!--") {
                self.skip_comment()?;
            } else if self.starts_with("</") {
                let offset = self.pos;
                let found = self.parse_closing_tag()?;
                return match open_tag {
                    Some(expected) if expected == found => Ok(nodes),
                    Some(expected) => Err(ParseError::MismatchedClose {
                        offset,
                        expected: expected.to_string(),
                        found,
                    }),
                    None => Err(ParseError::UnexpectedClose { tag: found, offset }),
                };
            } else if self.peek() == Some(b'<') {
                nodes.push(self.parse_element()?);
            } else {
                nodes.push(MarkupNode::Text(self.parse_text()));
            }
        }
    }

    fn skip_comment(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        self.pos += 4; // past "<!--"
        while self.pos < self.bytes.len() {
            if self.starts_with("-->") {
                self.pos += 3;
                return Ok(());
            }
            self.pos += 1;
        }
        Err(ParseError::UnexpectedEof(format!(
            "comment starting at byte {start} is never closed"
        )))
    }

    /// Parse `<tag attr="v" ...>children</tag>`, `<tag .../>`, or a void element.
    fn parse_element(&mut self) -> Result<MarkupNode, ParseError> {
        let offset = self.pos;
        self.pos += 1; // past '<'
        let tag = self.parse_name().ok_or_else(|| ParseError::MalformedTag {
            offset,
            message: "expected tag name after '<'".to_string(),
        })?;
        let tag = tag.to_ascii_lowercase();

        let mut attributes = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some(b'>') => {
                    self.pos += 1;
                    break;
                }
                Some(b'/') => {
                    if self.starts_with("/>") {
                        self.pos += 2;
                        // Explicitly self-closed: no children.
                        return Ok(MarkupNode::Element {
                            tag,
                            attributes,
                            children: Vec::new(),
                        });
                    }
                    return Err(ParseError::MalformedTag {
                        offset: self.pos,
                        message: "expected '/>'".to_string(),
                    });
                }
                Some(_) => {
                    let (name, value) = self.parse_attribute()?;
                    attributes.push((name, value));
                }
                None => {
                    return Err(ParseError::UnexpectedEof(format!(
                        "tag <{tag}> is never closed"
                    )))
                }
            }
        }

        if VOID_ELEMENTS.contains(&tag.as_str()) {
            return Ok(MarkupNode::Element {
                tag,
                attributes,
                children: Vec::new(),
            });
        }

        let children = self.parse_nodes(Some(&tag))?;
        Ok(MarkupNode::Element {
            tag,
            attributes,
            children,
        })
    }

    /// Parse `</tag>` and return the tag name.
    fn parse_closing_tag(&mut self) -> Result<String, ParseError> {
        let offset = self.pos;
        self.pos += 2; // past "</"
        let tag = self.parse_name().ok_or_else(|| ParseError::MalformedTag {
            offset,
            message: "expected tag name after '</'".to_string(),
        })?;
        self.skip_whitespace();
        match self.peek() {
            Some(b'>') => {
                self.pos += 1;
                Ok(tag.to_ascii_lowercase())
            }
            _ => Err(ParseError::MalformedTag {
                offset,
                message: format!("closing tag </{tag} is missing '>'"),
            }),
        }
    }

    /// A tag or attribute name: starts with a letter, continues with
    /// letters, digits, '-', '_', or ':' (for `w-on:click` style attributes).
    fn parse_name(&mut self) -> Option<String> {
        let start = self.pos;
        match self.peek() {
            Some(b) if b.is_ascii_alphabetic() => self.pos += 1,
            _ => return None,
        }
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':' {
                self.pos += 1;
            } else {
                break;
            }
        }
        Some(String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned())
    }

    /// Parse one attribute: `name`, `name="value"`, or `name='value'`.
    fn parse_attribute(&mut self) -> Result<(String, String), ParseError> {
        let offset = self.pos;
        let name = self.parse_name().ok_or_else(|| ParseError::MalformedTag {
            offset,
            message: "expected attribute name".to_string(),
        })?;
        self.skip_whitespace();
        if self.peek() != Some(b'=') {
            // Boolean attribute: present with empty value.
            return Ok((name, String::new()));
        }
        self.pos += 1;
        self.skip_whitespace();
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => {
                return Err(ParseError::MalformedTag {
                    offset: self.pos,
                    message: format!("attribute '{name}' value must be quoted"),
                })
            }
        };
        self.pos += 1;
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == quote {
                let raw = String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned();
                self.pos += 1;
                return Ok((name, decode_entities(&raw)));
            }
            self.pos += 1;
        }
        Err(ParseError::UnexpectedEof(format!(
            "attribute '{name}' value is never closed"
        )))
    }

    /// Consume text up to the next '<' (or EOF), decoding entities.
    fn parse_text(&mut self) -> String {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b == b'<' {
                break;
            }
            self.pos += 1;
        }
        decode_entities(&String::from_utf8_lossy(&self.bytes[start..self.pos]))
    }
}

/// Decode the five basic entities. Unknown entities pass through verbatim.
pub(crate) fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let decoded = [
            ("&amp;", '&'),
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&quot;", '"'),
            ("&#39;", '\''),
            ("&apos;", '\''),
        ]
        .iter()
        .find(|(entity, _)| rest.starts_with(entity));
        match decoded {
            Some((entity, ch)) => {
                out.push(*ch);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Fragment {
        parse_fragment(input).expect("fragment should parse")
    }

    fn element(node: &MarkupNode) -> (&str, &[(String, String)], &[MarkupNode]) {
        match node {
            MarkupNode::Element {
                tag,
                attributes,
                children,
            } => (tag, attributes, children),
            MarkupNode::Text(_) => panic!("expected element"),
        }
    }

    // ── Basic structure ──────────────────────────────────────────────

    #[test]
    fn empty_input() {
        assert!(parse("").nodes.is_empty());
    }

    #[test]
    fn single_text() {
        let frag = parse("hello");
        assert_eq!(frag.nodes, vec![MarkupNode::Text("hello".to_string())]);
    }

    #[test]
    fn single_element_with_text() {
        let frag = parse("<p>OK</p>");
        let (tag, attrs, children) = element(&frag.nodes[0]);
        assert_eq!(tag, "p");
        assert!(attrs.is_empty());
        assert_eq!(children, &[MarkupNode::Text("OK".to_string())]);
    }

    #[test]
    fn nested_elements() {
        let frag = parse("<div><span>a</span><span>b</span></div>");
        let (_, _, children) = element(&frag.nodes[0]);
        assert_eq!(children.len(), 2);
        let (tag, _, inner) = element(&children[1]);
        assert_eq!(tag, "span");
        assert_eq!(inner, &[MarkupNode::Text("b".to_string())]);
    }

    #[test]
    fn sibling_roots() {
        let frag = parse("<p>a</p><p>b</p>");
        assert_eq!(frag.nodes.len(), 2);
    }

    #[test]
    fn tag_names_lowercased() {
        let frag = parse("<DIV></DIV>");
        assert_eq!(element(&frag.nodes[0]).0, "div");
    }

    // ── Attributes ───────────────────────────────────────────────────

    #[test]
    fn attributes_in_order() {
        let frag = parse(r##"<button w-get="/demo" w-target="#out" w-swap="inner">Go</button>"##);
        let (_, attrs, _) = element(&frag.nodes[0]);
        assert_eq!(
            attrs,
            &[
                ("w-get".to_string(), "/demo".to_string()),
                ("w-target".to_string(), "#out".to_string()),
                ("w-swap".to_string(), "inner".to_string()),
            ]
        );
    }

    #[test]
    fn single_quoted_attribute() {
        let frag = parse("<div w-text='message'></div>");
        let (_, attrs, _) = element(&frag.nodes[0]);
        assert_eq!(attrs[0].1, "message");
    }

    #[test]
    fn boolean_attribute() {
        let frag = parse("<input disabled>");
        let (_, attrs, _) = element(&frag.nodes[0]);
        assert_eq!(attrs, &[("disabled".to_string(), String::new())]);
    }

    #[test]
    fn attribute_name_with_colon() {
        let frag = parse(r#"<button w-on:click="count = count + 1"></button>"#);
        let (_, attrs, _) = element(&frag.nodes[0]);
        assert_eq!(attrs[0].0, "w-on:click");
    }

    #[test]
    fn attribute_entities_decoded() {
        let frag = parse(r#"<div w-scope="{ message: &#39;Hi&#39; }"></div>"#);
        let (_, attrs, _) = element(&frag.nodes[0]);
        assert_eq!(attrs[0].1, "{ message: 'Hi' }");
    }

    #[test]
    fn unquoted_attribute_is_error() {
        assert!(parse_fragment("<div id=main></div>").is_err());
    }

    // ── Void and self-closing elements ───────────────────────────────

    #[test]
    fn void_element_takes_no_children() {
        let frag = parse("<div><br>text</div>");
        let (_, _, children) = element(&frag.nodes[0]);
        assert_eq!(children.len(), 2);
        assert_eq!(element(&children[0]).0, "br");
        assert_eq!(children[1], MarkupNode::Text("text".to_string()));
    }

    #[test]
    fn self_closing_element() {
        let frag = parse("<div/>");
        let (tag, _, children) = element(&frag.nodes[0]);
        assert_eq!(tag, "div");
        assert!(children.is_empty());
    }

    // ── Comments ─────────────────────────────────────────────────────

    #[test]
    fn comments_are_skipped() {
        let frag = parse("<div><!-- loading state --><p>OK</p></div>");
        let (_, _, children) = element(&frag.nodes[0]);
        assert_eq!(children.len(), 1);
    }

    #[test]
    fn unterminated_comment_is_error() {
        assert!(parse_fragment("<!-- oops").is_err());
    }

    // ── Text entities ────────────────────────────────────────────────

    #[test]
    fn text_entities_decoded() {
        let frag = parse("<p>a &amp; b &lt;c&gt;</p>");
        let (_, _, children) = element(&frag.nodes[0]);
        assert_eq!(children, &[MarkupNode::Text("a & b <c>".to_string())]);
    }

    #[test]
    fn unknown_entity_passes_through() {
        assert_eq!(decode_entities("1 &nbsp; 2"), "1 &nbsp; 2");
    }

    // ── Errors ───────────────────────────────────────────────────────

    #[test]
    fn unclosed_element_is_error() {
        let err = parse_fragment("<div><p>hi</div>").unwrap_err();
        assert!(matches!(err, ParseError::MismatchedClose { .. }));
    }

    #[test]
    fn stray_closing_tag_is_error() {
        let err = parse_fragment("</div>").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedClose { .. }));
    }

    #[test]
    fn eof_inside_element_is_error() {
        let err = parse_fragment("<div>hi").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof(_)));
    }

    #[test]
    fn missing_tag_name_is_error() {
        let err = parse_fragment("<>").unwrap_err();
        assert!(matches!(err, ParseError::MalformedTag { .. }));
    }

    #[test]
    fn whitespace_text_preserved() {
        let frag = parse("<div> <p>a</p> </div>");
        let (_, _, children) = element(&frag.nodes[0]);
        assert_eq!(children.len(), 3);
        assert_eq!(children[0], MarkupNode::Text(" ".to_string()));
    }
}
