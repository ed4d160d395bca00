/*!
 * Inline content of a translation unit variant.
 *
 * A segment is an ordered list of text runs and inline elements (`bpt`, `ept`,
 * `ph`, `it`, `ut`, `hi`, `sub` or any other element found inside `<seg>`).
 * Its pure-text projection keeps the text runs and descends only into `hi`
 * and `sub`, whose content is translatable text.
 */

use serde::{Deserialize, Serialize};

/// Inline elements whose children are part of the translatable text
pub const TEXT_CONTAINERS: [&str; 2] = ["hi", "sub"];

/// One node of inline content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    /// Unescaped character data
    Text(String),
    /// Nested element
    Element(Element),
}

/// XML element with ordered attributes and mixed content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Value of an attribute, if present
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set or replace an attribute, keeping its original position
    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    /// Remove an attribute and return its value
    pub fn remove_attribute(&mut self, key: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(k, _)| k == key)?;
        Some(self.attributes.remove(index).1)
    }

    /// Concatenation of every text node below this element
    pub fn text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out, &|_| true);
        out
    }
}

/// Structural equality: same name, same attribute set, children equal in order.
///
/// Attribute order is not significant. Text nodes are compared after the
/// normalization done by `Segment::new`, so split runs do not cause mismatches.
impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        if self.name != other.name || self.attributes.len() != other.attributes.len() {
            return false;
        }
        let mut left: Vec<_> = self.attributes.iter().collect();
        let mut right: Vec<_> = other.attributes.iter().collect();
        left.sort();
        right.sort();
        left == right && nodes_equal(&self.children, &other.children)
    }
}

impl Eq for Element {}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Node::Text(a), Node::Text(b)) => a == b,
            (Node::Element(a), Node::Element(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Node {}

/// Compare two node lists after merging adjacent text runs
pub fn nodes_equal(left: &[Node], right: &[Node]) -> bool {
    let left = normalize(left.to_vec());
    let right = normalize(right.to_vec());
    left.len() == right.len() && left.iter().zip(right.iter()).all(|(a, b)| a == b)
}

/// Merge adjacent text nodes and drop empty ones, recursively
pub fn normalize(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Text(text) => {
                if text.is_empty() {
                    continue;
                }
                if let Some(Node::Text(previous)) = out.last_mut() {
                    previous.push_str(&text);
                } else {
                    out.push(Node::Text(text));
                }
            }
            Node::Element(mut element) => {
                element.children = normalize(std::mem::take(&mut element.children));
                out.push(Node::Element(element));
            }
        }
    }
    out
}

fn collect_text(nodes: &[Node], out: &mut String, descend: &dyn Fn(&Element) -> bool) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(element) if descend(element) => {
                collect_text(&element.children, out, descend)
            }
            Node::Element(_) => {}
        }
    }
}

/// Content of a `<seg>` element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    nodes: Vec<Node>,
}

impl Segment {
    /// Build a normalized segment
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes: normalize(nodes),
        }
    }

    /// Segment holding a single text run
    pub fn from_text(text: &str) -> Self {
        Self::new(vec![Node::Text(text.to_string())])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// True when the segment has no content at all
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Tag-stripped text used for search, sort and comparisons
    pub fn pure_text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.nodes, &mut out, &|e| {
            TEXT_CONTAINERS.contains(&e.name.as_str())
        });
        out
    }

    /// True when the pure text is empty or whitespace
    pub fn is_blank(&self) -> bool {
        self.pure_text().trim().is_empty()
    }

    /// True when the segment contains inline elements
    pub fn has_tags(&self) -> bool {
        self.nodes.iter().any(|n| matches!(n, Node::Element(_)))
    }

    /// Structural equality of the inline trees
    pub fn structurally_equal(&self, other: &Segment) -> bool {
        nodes_equal(&self.nodes, &other.nodes)
    }

    /// Apply `rewrite` to every translatable text run, leaving tags untouched.
    ///
    /// Returns true if any run changed.
    pub fn rewrite_text<F>(&mut self, rewrite: &mut F) -> bool
    where
        F: FnMut(&str) -> String,
    {
        let changed = rewrite_nodes(&mut self.nodes, rewrite);
        if changed {
            self.nodes = normalize(std::mem::take(&mut self.nodes));
        }
        changed
    }

    /// Trim whitespace at both ends of the segment's top-level text
    pub fn trim(&mut self) -> bool {
        let mut changed = false;
        if let Some(Node::Text(first)) = self.nodes.first_mut() {
            let trimmed = first.trim_start();
            if trimmed.len() != first.len() {
                *first = trimmed.to_string();
                changed = true;
            }
        }
        if let Some(Node::Text(last)) = self.nodes.last_mut() {
            let trimmed = last.trim_end();
            if trimmed.len() != last.len() {
                *last = trimmed.to_string();
                changed = true;
            }
        }
        if changed {
            self.nodes = normalize(std::mem::take(&mut self.nodes));
        }
        changed
    }

    /// Replace the content with its pure text
    pub fn strip_tags(&mut self) -> bool {
        if !self.has_tags() {
            return false;
        }
        let text = self.pure_text();
        *self = Segment::from_text(&text);
        true
    }
}

fn rewrite_nodes<F>(nodes: &mut [Node], rewrite: &mut F) -> bool
where
    F: FnMut(&str) -> String,
{
    let mut changed = false;
    for node in nodes.iter_mut() {
        match node {
            Node::Text(text) => {
                let replaced = rewrite(text);
                if replaced != *text {
                    *text = replaced;
                    changed = true;
                }
            }
            Node::Element(element) if TEXT_CONTAINERS.contains(&element.name.as_str()) => {
                changed |= rewrite_nodes(&mut element.children, rewrite);
            }
            Node::Element(_) => {}
        }
    }
    changed
}
