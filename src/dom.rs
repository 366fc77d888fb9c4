//! Arena-backed document tree.
//!
//! Every node lives in a single `Vec` owned by [`Document`] and is addressed by
//! a [`NodeId`]. Parent and child links are plain indices, so the extraction
//! passes can re-parent, retag and remove nodes freely, and a whole tree can be
//! snapshotted with `Clone`.
//!
//! Parsing is delegated to `scraper` (html5ever); the parsed `ego_tree` is copied
//! into the arena once and never touched again.

use ego_tree::NodeRef;
use scraper::{Html, Node as HtmlNode};

/// Elements that never have a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Elements whose text children are serialized without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "iframe", "noembed", "noframes", "noscript", "plaintext", "script", "style", "xmp",
];

/// Index of a node inside its owning [`Document`].
///
/// Ids are only meaningful for the document that created them (or a clone of it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ElementData {
    name: String,
    attrs: Vec<Attribute>,
}

impl ElementData {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attrs(&self) -> &[Attribute] {
        &self.attrs
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A mutable HTML document tree.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Parse a complete HTML document.
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut document = Self::new();
        let root = document.root();
        document.import_children(parsed.tree.root(), root);
        document
    }

    /// Parse an HTML fragment in a `<body>` context. The fragment's top level
    /// nodes become children of the document root.
    pub fn parse_fragment(html: &str) -> Self {
        let parsed = Html::parse_fragment(html);
        let mut document = Self::new();
        let root = document.root();
        document.import_children(*parsed.root_element(), root);
        document
    }

    /// Parse `html` as a fragment into this document.
    ///
    /// # Returns
    /// A detached `div` holding the parsed nodes.
    pub fn import_fragment(&mut self, html: &str) -> NodeId {
        let parsed = Html::parse_fragment(html);
        let holder = self.create_element("div");
        self.import_children(*parsed.root_element(), holder);
        holder
    }

    fn import_children(&mut self, source: NodeRef<'_, HtmlNode>, parent: NodeId) {
        let mut stack = vec![(source, parent)];
        while let Some((source, parent)) = stack.pop() {
            for child in source.children() {
                match child.value() {
                    HtmlNode::Element(element) => {
                        let id = self.create_element(element.name());
                        for (name, value) in element.attrs() {
                            self.set_attr(id, name, value);
                        }
                        self.append_child(parent, id);
                        stack.push((child, id));
                    }
                    HtmlNode::Text(text) => {
                        let id = self.create_text(&**text);
                        self.append_child(parent, id);
                    }
                    _ => {}
                }
            }
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Element(_))
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.node(id).data, NodeData::Text(_))
    }

    /// Lower-case tag name, or `None` for text and the document root.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Element(element) => Some(&element.name),
            _ => None,
        }
    }

    pub fn has_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag_name(id) == Some(tag)
    }

    /// Contents of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Rename an element in place, keeping its attributes, children and id.
    pub fn set_tag_name(&mut self, id: NodeId, name: &str) {
        if let NodeData::Element(element) = &mut self.node_mut(id).data {
            element.name = name.to_ascii_lowercase();
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[Attribute] {
        match &self.node(id).data {
            NodeData::Element(element) => &element.attrs,
            _ => &[],
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attrs(id)
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// The `class` attribute, or an empty string.
    pub fn class_name(&self, id: NodeId) -> &str {
        self.attr(id, "class").unwrap_or("")
    }

    /// The `id` attribute, or an empty string.
    pub fn id_attr(&self, id: NodeId) -> &str {
        self.attr(id, "id").unwrap_or("")
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element(element) = &mut self.node_mut(id).data {
            match element.attrs.iter_mut().find(|attr| attr.name == name) {
                Some(attr) => attr.value = value.to_string(),
                None => element.attrs.push(Attribute {
                    name: name.to_string(),
                    value: value.to_string(),
                }),
            }
        }
    }

    /// Set an attribute only if `name` is a valid markup attribute name.
    ///
    /// # Returns
    /// `false` when the name was rejected and nothing changed.
    pub fn try_set_attr(&mut self, id: NodeId, name: &str, value: &str) -> bool {
        if !is_valid_attribute_name(name) {
            return false;
        }
        self.set_attr(id, name, value);
        true
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let NodeData::Element(element) = &mut self.node_mut(id).data {
            element.attrs.retain(|attr| attr.name != name);
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.is_element(child))
            .collect()
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&child| self.is_element(child))
    }

    fn index_in_parent(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let index = self.children(parent).iter().position(|&c| c == id)?;
        Some((parent, index))
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.index_in_parent(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.index_in_parent(id)?;
        self.children(parent)[index + 1..]
            .iter()
            .copied()
            .find(|&sibling| self.is_element(sibling))
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.index_in_parent(id)?;
        self.children(parent)[..index]
            .iter()
            .rev()
            .copied()
            .find(|&sibling| self.is_element(sibling))
    }

    /// Iterate over the ancestors of a node, nearest first. The document root
    /// is included when the node is attached.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            document: self,
            next: self.parent(id),
        }
    }

    /// All descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            result.push(node);
            stack.extend(self.children(node).iter().rev());
        }
        result
    }

    /// Descendant elements whose tag is in `tags`, in document order.
    /// `"*"` matches every element.
    pub fn elements_by_tag(&self, id: NodeId, tags: &[&str]) -> Vec<NodeId> {
        let any = tags.contains(&"*");
        self.descendants(id)
            .into_iter()
            .filter(|&node| match self.tag_name(node) {
                Some(tag) => any || tags.contains(&tag),
                None => false,
            })
            .collect()
    }

    /// The `<html>` element.
    pub fn document_element(&self) -> Option<NodeId> {
        self.first_element_child(self.root())
    }

    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .into_iter()
            .find(|&child| self.has_tag(child, "body"))
    }

    pub fn head(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .into_iter()
            .find(|&child| self.has_tag(child, "head"))
    }

    /// Number of elements reachable from the root.
    pub fn element_count(&self) -> usize {
        self.descendants(self.root())
            .into_iter()
            .filter(|&node| self.is_element(node))
            .count()
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element(ElementData {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Remove a node from its parent. The node and its subtree stay in the
    /// arena and can be re-inserted.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.node_mut(id).parent.take() {
            self.node_mut(parent).children.retain(|&child| child != id);
        }
    }

    /// Append `child` as the last child of `parent`, moving it if it is
    /// already attached elsewhere.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(child).parent = Some(parent);
        self.node_mut(parent).children.push(child);
    }

    /// Insert `node` immediately before `reference`. Does nothing when
    /// `reference` is detached.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        if reference == node {
            return;
        }
        self.detach(node);
        if let Some((parent, index)) = self.index_in_parent(reference) {
            self.node_mut(node).parent = Some(parent);
            self.node_mut(parent).children.insert(index, node);
        }
    }

    /// Put `new` where `old` is and detach `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        if old == new {
            return;
        }
        self.insert_before(old, new);
        self.detach(old);
    }

    /// Move every child of `from` to the end of `to`.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        let children = self.children(from).to_vec();
        for child in children {
            self.append_child(to, child);
        }
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.text(id) {
            return text.to_string();
        }
        let mut out = String::new();
        for node in self.descendants(id) {
            if let Some(text) = self.text(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Markup of the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        let raw = self.tag_name(id).is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
        for &child in self.children(id) {
            self.serialize_node(child, raw, &mut out);
        }
        out
    }

    /// Markup of `id` itself, including its children.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.serialize_node(id, false, &mut out);
        out
    }

    fn serialize_node(&self, id: NodeId, raw_text: bool, out: &mut String) {
        let mut stack = vec![Step::Open(id, raw_text)];

        while let Some(step) = stack.pop() {
            let (id, raw_text) = match step {
                Step::Open(id, raw_text) => (id, raw_text),
                Step::Close(name) => {
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                    continue;
                }
            };

            match &self.node(id).data {
                NodeData::Document => {
                    stack.extend(
                        self.children(id)
                            .iter()
                            .rev()
                            .map(|&child| Step::Open(child, false)),
                    );
                }
                NodeData::Text(text) => {
                    if raw_text {
                        out.push_str(text);
                    } else {
                        out.push_str(&v_htmlescape::escape(text).to_string());
                    }
                }
                NodeData::Element(element) => {
                    out.push('<');
                    out.push_str(&element.name);
                    for attr in &element.attrs {
                        out.push(' ');
                        out.push_str(&attr.name);
                        out.push_str("=\"");
                        out.push_str(&escape_attribute(&attr.value));
                        out.push('"');
                    }
                    out.push('>');

                    if VOID_ELEMENTS.contains(&element.name.as_str()) {
                        continue;
                    }

                    let raw = RAW_TEXT_ELEMENTS.contains(&element.name.as_str());
                    stack.push(Step::Close(&element.name));
                    stack.extend(
                        self.children(id)
                            .iter()
                            .rev()
                            .map(|&child| Step::Open(child, raw)),
                    );
                }
            }
        }
    }
}

/// Pending work of the serializer.
enum Step<'a> {
    Open(NodeId, bool),
    Close(&'a str),
}

pub struct Ancestors<'a> {
    document: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.document.parent(current);
        Some(current)
    }
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// Whether `name` may be used as an attribute name in serialized markup.
pub fn is_valid_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && !name.chars().any(|c| {
            c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '>' | '/' | '=' | '<')
        })
}
