use scraper::{Html, Node as ScraperNode};

use super::{Dom, ElementData, Node, FRAGMENT_ROOT};

/// Parses an HTML fragment (no `<html>`/`<body>` expected) into a [`Dom`]
/// rooted at a synthetic fragment element.
pub fn parse_fragment(html: &str) -> Dom {
    let fragment = Html::parse_fragment(html);
    // html5ever wraps fragment content in an `<html>` context element; its
    // children are the actual fragment nodes.
    let children = fragment
        .root_element()
        .children()
        .filter_map(convert_node)
        .collect();

    let mut root = ElementData::new(FRAGMENT_ROOT);
    root.children = children;
    Dom::new(Node::Element(root))
}

fn convert_node(scraper_node: ego_tree::NodeRef<ScraperNode>) -> Option<Node> {
    match scraper_node.value() {
        ScraperNode::Element(el) => {
            let attributes = el.attrs().map(|(k, v)| (k.to_ascii_lowercase(), v.to_string())).collect();
            let children = scraper_node
                .children()
                .filter_map(convert_node)
                .collect();

            Some(Node::Element(ElementData {
                id: 0,
                tag_name: el.name().to_ascii_lowercase(),
                attributes,
                children,
            }))
        }
        ScraperNode::Text(text) => Some(Node::Text(text.text.to_string())),
        ScraperNode::Comment(comment) => Some(Node::Comment(comment.comment.to_string())),
        // Doctypes and processing instructions carry nothing renderable.
        _ => None,
    }
}
