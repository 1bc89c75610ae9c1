pub mod parser;
pub mod render;

use std::collections::{BTreeMap, HashMap};
use serde::Serialize;

/// Tag name of the synthetic element wrapping a parsed fragment.
pub const FRAGMENT_ROOT: &str = "#fragment";

/// Represents a node in the DOM tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    /// An element node, containing a tag name, attributes, and children.
    Element(ElementData),
    /// A text node.
    Text(String),
    /// A comment node.
    Comment(String),
}

/// Represents the data associated with an element node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementData {
    pub id: u64, // Preorder position, assigned by Dom::new
    pub tag_name: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<Node>,
}

impl ElementData {
    pub fn new(tag_name: &str) -> Self {
        Self {
            id: 0,
            tag_name: tag_name.to_string(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Helper function to get the HTML id attribute.
    pub fn html_id(&self) -> Option<&String> {
        self.attributes.get("id")
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Visible text of this element and its descendants, with runs of
    /// whitespace collapsed to single spaces.
    pub fn text_content(&self) -> String {
        let mut raw = String::new();
        collect_text(&self.children, &mut raw);
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => collect_text(&el.children, out),
            Node::Comment(_) => {}
        }
    }
}

/// A parsed HTML fragment with stable element ids and a parent index.
#[derive(Debug, Clone, PartialEq)]
pub struct Dom {
    pub root: Node,
    parents: HashMap<u64, u64>,
}

impl Dom {
    /// Takes ownership of a tree, renumbers its elements in document order
    /// (root is 0) and indexes parent links.
    pub fn new(mut root: Node) -> Self {
        let mut next_id = 0;
        assign_ids(&mut root, &mut next_id);
        let mut parents = HashMap::new();
        index_parents(&root, None, &mut parents);
        Self { root, parents }
    }

    pub fn empty() -> Self {
        Self::new(Node::Element(ElementData::new(FRAGMENT_ROOT)))
    }

    pub fn root_element(&self) -> Option<&ElementData> {
        match &self.root {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element(&self, id: u64) -> Option<&ElementData> {
        self.elements().into_iter().find(|el| el.id == id)
    }

    pub fn parent_of(&self, id: u64) -> Option<u64> {
        self.parents.get(&id).copied()
    }

    /// The element itself followed by each ancestor up to and including the root.
    pub fn ancestors(&self, id: u64) -> Vec<&ElementData> {
        let mut chain = Vec::new();
        let mut current = self.element(id);
        while let Some(el) = current {
            chain.push(el);
            current = self.parent_of(el.id).and_then(|pid| self.element(pid));
        }
        chain
    }

    pub fn find_by_html_id(&self, html_id: &str) -> Option<&ElementData> {
        self.elements()
            .into_iter()
            .find(|el| el.html_id().map(String::as_str) == Some(html_id))
    }

    /// All elements in document order.
    pub fn elements(&self) -> Vec<&ElementData> {
        let mut out = Vec::new();
        collect_elements(&self.root, &mut out);
        out
    }

    /// True when nothing but the synthetic root and whitespace remains.
    pub fn is_blank(&self) -> bool {
        match &self.root {
            Node::Element(root) => root.children.iter().all(|child| match child {
                Node::Text(text) => text.trim().is_empty(),
                Node::Comment(_) => true,
                Node::Element(_) => false,
            }),
            Node::Text(text) => text.trim().is_empty(),
            Node::Comment(_) => true,
        }
    }
}

fn assign_ids(node: &mut Node, next_id: &mut u64) {
    if let Node::Element(el) = node {
        el.id = *next_id;
        *next_id += 1;
        for child in el.children.iter_mut() {
            assign_ids(child, next_id);
        }
    }
}

fn index_parents(node: &Node, parent: Option<u64>, parents: &mut HashMap<u64, u64>) {
    if let Node::Element(el) = node {
        if let Some(pid) = parent {
            parents.insert(el.id, pid);
        }
        for child in &el.children {
            index_parents(child, Some(el.id), parents);
        }
    }
}

fn collect_elements<'a>(node: &'a Node, out: &mut Vec<&'a ElementData>) {
    if let Node::Element(el) = node {
        out.push(el);
        for child in &el.children {
            collect_elements(child, out);
        }
    }
}
