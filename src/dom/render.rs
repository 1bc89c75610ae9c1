use super::{Dom, ElementData, Node, FRAGMENT_ROOT};

/// Attribute stamped on every element when rendering for a client, so click
/// targets can be reported back by id.
pub const NODE_ID_ATTR: &str = "data-node-id";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr",
];

/// Serializes the fragment back to HTML. Comments are not emitted.
pub fn to_html(dom: &Dom, stamp_node_ids: bool) -> String {
    let mut out = String::new();
    write_node(&dom.root, stamp_node_ids, &mut out);
    out
}

fn write_node(node: &Node, stamp_node_ids: bool, out: &mut String) {
    match node {
        Node::Element(el) if el.tag_name == FRAGMENT_ROOT => {
            for child in &el.children {
                write_node(child, stamp_node_ids, out);
            }
        }
        Node::Element(el) => write_element(el, stamp_node_ids, out),
        Node::Text(text) => out.push_str(&escape_text(text)),
        Node::Comment(_) => {}
    }
}

fn write_element(el: &ElementData, stamp_node_ids: bool, out: &mut String) {
    out.push('<');
    out.push_str(&el.tag_name);
    for (name, value) in &el.attributes {
        if name == NODE_ID_ATTR {
            continue;
        }
        out.push_str(&format!(" {}=\"{}\"", name, escape_attr(value)));
    }
    if stamp_node_ids {
        out.push_str(&format!(" {}=\"{}\"", NODE_ID_ATTR, el.id));
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&el.tag_name.as_str()) {
        return;
    }
    for child in &el.children {
        write_node(child, stamp_node_ids, out);
    }
    out.push_str(&format!("</{}>", el.tag_name));
}

pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}
