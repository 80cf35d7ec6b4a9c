//! DOM Operations Adapter
//!
//! Node-level operations over the `dom_query` tree used by the XPath
//! evaluator: document-order traversal, sibling walks, names, attributes and
//! string values. Every traversal here yields nodes in document order unless
//! the function says otherwise.

// Re-export core types for external use
pub use dom_query::{Document, NodeId, NodeRef};

use dom_query::NodeData;

// Re-export StrTendril for external use
pub use tendril::StrTendril;

// === Parsing ===

/// Parse HTML string into document
///
/// html5ever recovers from any markup error, so this never fails.
#[inline]
#[must_use]
pub fn parse(html: &str) -> Document {
    Document::from(html)
}

// === Tag/Node Information ===

/// Get tag name (lowercase) of an element node
#[must_use]
pub fn tag_name(node: &NodeRef) -> Option<StrTendril> {
    if node.is_element() {
        node.node_name()
    } else {
        None
    }
}

/// Check an element's tag name, ignoring ASCII case
#[must_use]
pub fn has_tag(node: &NodeRef, name: &str) -> bool {
    tag_name(node).is_some_and(|tag| tag.eq_ignore_ascii_case(name))
}

/// Get all attributes as name-value pairs, in source order
///
/// Returns an empty vector for non-element nodes.
#[must_use]
pub fn attributes(node: &NodeRef) -> Vec<(String, String)> {
    if !node.is_element() {
        return Vec::new();
    }
    node.attrs()
        .iter()
        .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
        .collect()
}

/// Get an attribute value by name, ignoring ASCII case
#[must_use]
pub fn attribute(node: &NodeRef, name: &str) -> Option<String> {
    attributes(node)
        .into_iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value)
}

// === Text Content ===

/// String value of a node: the concatenated text of all descendant text
/// nodes for elements and documents, the character data for text and
/// comment nodes.
#[must_use]
pub fn text_content(node: &NodeRef) -> StrTendril {
    if node.is_comment() {
        return comment_text(node).unwrap_or_default();
    }
    node.text()
}

/// Contents of a comment node, without the `<!--` and `-->` delimiters
fn comment_text(node: &NodeRef) -> Option<StrTendril> {
    node.query(|tree_node| match &tree_node.data {
        NodeData::Comment { contents } => Some(StrTendril::from(contents.to_string())),
        _ => None,
    })
    .flatten()
}

// === Tree Navigation ===

/// All nodes of the subtree rooted at `node`, `node` first, in document order
#[must_use]
pub fn subtree<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    let mut out = Vec::new();
    let mut stack = vec![*node];
    while let Some(current) = stack.pop() {
        out.push(current);
        let children = current.children();
        stack.extend(children.into_iter().rev());
    }
    out
}

/// Descendants of `node` in document order, excluding `node`
#[must_use]
pub fn descendants<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    let mut out = subtree(node);
    out.remove(0);
    out
}

/// Last node of the subtree rooted at `node` in document order
#[must_use]
pub fn last_descendant<'a>(node: &NodeRef<'a>) -> NodeRef<'a> {
    let mut current = *node;
    while let Some(child) = current.children().last().copied() {
        current = child;
    }
    current
}

/// Ancestors of `node`, nearest first
#[must_use]
pub fn ancestors<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    let mut out = Vec::new();
    let mut current = node.parent();
    while let Some(parent) = current {
        current = parent.parent();
        out.push(parent);
    }
    out
}

/// Siblings after `node`, nearest first
#[must_use]
pub fn following_siblings<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    let mut out = Vec::new();
    let mut current = node.next_sibling();
    while let Some(sibling) = current {
        current = sibling.next_sibling();
        out.push(sibling);
    }
    out
}

/// Siblings before `node`, nearest first
#[must_use]
pub fn preceding_siblings<'a>(node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
    let mut out = Vec::new();
    let mut current = node.prev_sibling();
    while let Some(sibling) = current {
        current = sibling.prev_sibling();
        out.push(sibling);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element<'a>(doc: &'a Document, tag: &str) -> NodeRef<'a> {
        subtree(&doc.root())
            .into_iter()
            .find(|node| has_tag(node, tag))
            .expect("element present")
    }

    #[test]
    fn subtree_is_in_document_order() {
        let doc = parse("<div><p>a</p><p>b<span>c</span></p></div><em>d</em>");
        let tags: Vec<String> = subtree(&doc.root())
            .iter()
            .filter_map(|node| tag_name(node).map(|t| t.to_string()))
            .collect();
        assert_eq!(tags, ["html", "head", "body", "div", "p", "p", "span", "em"]);
    }

    #[test]
    fn attributes_keep_source_order() {
        let doc = parse(r#"<div id="main" class="container" data-x="1">content</div>"#);
        let div = element(&doc, "div");
        let names: Vec<String> = attributes(&div).into_iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["id", "class", "data-x"]);
        assert_eq!(attribute(&div, "CLASS").as_deref(), Some("container"));
        assert_eq!(attribute(&div, "missing"), None);
    }

    #[test]
    fn sibling_walks_are_nearest_first() {
        let doc = parse("<ul><li>1</li><li>2</li><li>3</li></ul>");
        let ul = element(&doc, "ul");
        let items = ul.children();
        let before = preceding_siblings(&items[2]);
        assert_eq!(text_content(&before[0]).to_string(), "2");
        let after = following_siblings(&items[0]);
        assert_eq!(text_content(&after[1]).to_string(), "3");
    }

    #[test]
    fn comment_string_value_is_its_contents() {
        let doc = parse("<div><!-- c1 --><p>a</p></div>");
        let div = element(&doc, "div");
        let comment = div.children()[0];
        assert!(comment.is_comment());
        assert_eq!(text_content(&comment).to_string(), " c1 ");
        // Element text never includes comments.
        assert_eq!(text_content(&div).to_string(), "a");
    }

    #[test]
    fn last_descendant_finds_deepest_last_node() {
        let doc = parse("<div><p>a</p><p>b<span>c</span></p></div>");
        let div = element(&doc, "div");
        let last = last_descendant(&div);
        assert!(last.is_text());
        assert_eq!(text_content(&last).to_string(), "c");
    }

    #[test]
    fn ancestors_end_at_the_document() {
        let doc = parse("<div><p>text</p></div>");
        let p = element(&doc, "p");
        let chain = ancestors(&p);
        assert!(has_tag(&chain[0], "div"));
        assert_eq!(chain.last().map(|n| n.id), Some(doc.root().id));
    }
}
