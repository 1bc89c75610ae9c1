use crate::dom::{parser, render, Dom, ElementData, Node};

/// Elements kept as-is (with their filtered attributes).
const ALLOWED_TAGS: &[&str] = &[
    "a", "article", "aside", "b", "blockquote", "br", "button", "caption", "code", "dd", "div", "dl", "dt",
    "em", "fieldset", "figcaption", "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "i", "input", "label", "legend", "li", "main", "mark", "nav", "ol", "option", "p", "pre", "progress",
    "section", "select", "small", "span", "strong", "sub", "sup", "table", "tbody", "td", "textarea",
    "tfoot", "th", "thead", "tr", "u", "ul",
];

/// Elements removed together with everything inside them.
const DROPPED_WITH_CONTENT: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "template", "noscript", "frame", "frameset", "applet",
    "link", "meta", "base", "svg", "math",
];

/// Attributes that survive on allowed elements. The interaction attributes
/// must stay on this list: the dispatcher resolves clicks through them.
const ALLOWED_ATTRIBUTES: &[&str] = &[
    "aria-label", "class", "colspan", "data-input-ref", "data-interaction-id", "data-interaction-kind",
    "data-step", "disabled", "for", "href", "id", "max", "min", "name", "placeholder", "role", "rows",
    "rowspan", "title", "type", "value",
];

pub fn sanitize_html(html: &str) -> String {
    render::to_html(&sanitize_dom(&parser::parse_fragment(html)), false)
}

pub fn sanitize_dom(dom: &Dom) -> Dom {
    match &dom.root {
        Node::Element(root) => {
            let mut clean_root = ElementData::new(&root.tag_name);
            clean_root.children = sanitize_children(&root.children);
            Dom::new(Node::Element(clean_root))
        }
        _ => Dom::empty(),
    }
}

fn sanitize_children(children: &[Node]) -> Vec<Node> {
    let mut out = Vec::new();
    for child in children {
        match child {
            Node::Text(text) => out.push(Node::Text(text.clone())),
            Node::Comment(_) => {}
            Node::Element(el) => {
                let tag = el.tag_name.as_str();
                if DROPPED_WITH_CONTENT.contains(&tag) {
                    log::debug!("Sanitizer dropped a <{}> element and its content", tag);
                } else if ALLOWED_TAGS.contains(&tag) {
                    out.push(Node::Element(sanitize_element(el)));
                } else {
                    // Unknown wrapper: keep what is inside it.
                    out.extend(sanitize_children(&el.children));
                }
            }
        }
    }
    out
}

fn sanitize_element(el: &ElementData) -> ElementData {
    let mut clean = ElementData::new(&el.tag_name);
    for (name, value) in &el.attributes {
        if is_allowed_attribute(name, value) {
            clean.attributes.insert(name.clone(), value.clone());
        }
    }
    clean.children = sanitize_children(&el.children);
    clean
}

fn is_allowed_attribute(name: &str, value: &str) -> bool {
    if name.starts_with("on") || !ALLOWED_ATTRIBUTES.contains(&name) {
        return false;
    }
    if name == "href" {
        return is_safe_url(value);
    }
    true
}

fn is_safe_url(value: &str) -> bool {
    let normalized: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    match normalized.split_once(':') {
        // Relative URLs and fragments have no scheme.
        None => true,
        Some((scheme, _)) if scheme.contains('/') || scheme.contains('#') || scheme.contains('?') => true,
        Some((scheme, _)) => matches!(scheme, "http" | "https" | "mailto"),
    }
}
