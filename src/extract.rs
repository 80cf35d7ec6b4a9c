//! Rule-driven text extraction.
//!
//! Runs a rule's XPath against a parsed page and glues together the trimmed
//! text of every selected node.

use std::io::Read;

use dom_query::Document;
use tracing::debug;

use crate::dom;
use crate::error::QueryError;
use crate::result::Content;
use crate::rule::Rule;
use crate::xpath::Query;

/// Extracts content from an already parsed document.
///
/// Each selected node contributes its string value with leading and trailing
/// whitespace removed; the pieces are concatenated in document order with
/// nothing between them. A query that selects nothing yields empty text.
pub fn extract_document(document: &Document, rule: &Rule) -> Result<Content, QueryError> {
    let query = rule.query()?;
    let text = collect_text(document, query)?;
    debug!(rule = rule.name(), chars = text.len(), "extracted body");
    Ok(Content::with_text(text))
}

/// Parses `html` and extracts content from it.
///
/// # Example
///
/// ```rust
/// use rs_fullfeed::{extract_html, Rule, RuleData, RuleRecord};
///
/// let rule = Rule::compile(RuleRecord {
///     data: RuleData {
///         url: r"^https?://example\.com/".to_string(),
///         xpath: "//div[@class='entry']/p".to_string(),
///         ..RuleData::default()
///     },
///     ..RuleRecord::default()
/// })?;
/// let html = r#"<div class="entry"><p> Hello </p><p>World</p></div>"#;
/// let content = extract_html(html, &rule)?;
/// assert_eq!(content.text, "HelloWorld");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn extract_html(html: &str, rule: &Rule) -> Result<Content, QueryError> {
    // Compile first so a bad expression is reported without parsing the page.
    rule.query()?;
    let document = dom::parse(html);
    extract_document(&document, rule)
}

/// Reads a UTF-8 document from `reader` and extracts content from it.
///
/// A failed read or bytes that are not UTF-8 fail with
/// [`QueryError::Unparsable`]; decode other encodings first with
/// [`encoding::decode`](crate::encoding::decode).
pub fn extract_reader<R: Read>(mut reader: R, rule: &Rule) -> Result<Content, QueryError> {
    rule.query()?;
    let mut html = String::new();
    reader
        .read_to_string(&mut html)
        .map_err(|err| QueryError::Unparsable(err.to_string()))?;
    extract_html(&html, rule)
}

/// Concatenated trimmed string values of the nodes `query` selects.
pub fn collect_text(document: &Document, query: &Query) -> Result<String, QueryError> {
    let mut body = String::new();
    for node in query.select(document)? {
        body.push_str(node.string_value().trim());
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{RuleData, RuleRecord};

    fn rule(xpath: &str) -> Rule {
        Rule::compile(RuleRecord {
            name: "unit".to_string(),
            data: RuleData {
                url: "example".to_string(),
                xpath: xpath.to_string(),
                ..RuleData::default()
            },
            ..RuleRecord::default()
        })
        .expect("valid rule")
    }

    #[test]
    fn attribute_values_are_text_too() {
        let html = r#"<a href="/one">1</a><a href="/two">2</a>"#;
        let content = extract_html(html, &rule("//a/@href")).expect("extracts");
        assert_eq!(content.text, "/one/two");
    }

    #[test]
    fn nested_selection_repeats_text() {
        // Both the div and the inner p are selected; each contributes once.
        let html = "<div class='x'><p class='x'>a</p></div>";
        let content = extract_html(html, &rule("//*[@class='x']")).expect("extracts");
        assert_eq!(content.text, "aa");
    }

    #[test]
    fn invalid_utf8_reader_is_unparsable() {
        let bytes: &[u8] = b"<p>\xFF\xFE</p>";
        let err = extract_reader(bytes, &rule("//p")).expect_err("not UTF-8");
        assert!(matches!(err, QueryError::Unparsable(_)));
    }

    #[test]
    fn bad_query_fails_before_reading() {
        let bytes: &[u8] = b"\xFF";
        let err = extract_reader(bytes, &rule("//p[")).expect_err("bad query");
        assert!(matches!(err, QueryError::InvalidExpression { .. }));
    }

    #[test]
    fn title_and_description_stay_empty() {
        let html = "<html><head><title>T</title><meta name='description' content='D'></head><body><p>x</p></body></html>";
        let content = extract_html(html, &rule("//p")).expect("extracts");
        assert_eq!(content.title, "");
        assert_eq!(content.description, "");
        assert_eq!(content.text, "x");
    }
}
