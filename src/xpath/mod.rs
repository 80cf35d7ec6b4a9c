//! XPath 1.0 queries over HTML documents.
//!
//! Rule tables locate page bodies with XPath, while the HTML parser builds a
//! `dom_query` tree. This module compiles XPath 1.0 expressions and evaluates
//! them directly against that tree.
//!
//! Supported: every axis except `namespace`, all node tests, predicates,
//! operators and the core function library. Element and attribute names
//! compare ASCII case-insensitively and namespace prefixes are ignored,
//! since HTML trees carry neither case nor namespaces worth testing.
//!
//! # Example
//!
//! ```rust
//! use rs_fullfeed::dom;
//! use rs_fullfeed::xpath::Query;
//!
//! let doc = dom::parse(r#"<div id="body"><p>one</p><p>two</p></div>"#);
//! let query = Query::compile("//div[@id='body']/p[last()]")?;
//! let texts: Vec<String> = query.select(&doc)?.map(|node| node.string_value()).collect();
//! assert_eq!(texts, ["two"]);
//! # Ok::<(), rs_fullfeed::QueryError>(())
//! ```

mod ast;
mod eval;
mod lexer;
mod parser;

use dom_query::Document;

use crate::error::QueryError;

pub use eval::Node;

/// A compiled XPath expression that selects nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    source: String,
    expr: ast::Expr,
}

impl Query {
    /// Compiles `source`.
    ///
    /// Fails with [`QueryError::InvalidExpression`] for syntax errors,
    /// unknown functions, variables, and expressions whose result is not a
    /// node-set (`count(//p)`, `'text'`).
    pub fn compile(source: &str) -> Result<Self, QueryError> {
        let invalid = |reason: String| QueryError::InvalidExpression {
            expression: source.to_string(),
            reason,
        };
        let expr = parser::parse(source).map_err(invalid)?;
        if !expr.yields_nodes() {
            return Err(invalid("expression does not select nodes".to_string()));
        }
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// The expression as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Runs the query with the document node as context.
    ///
    /// Nodes come back in document order without duplicates.
    pub fn select<'a>(&self, document: &'a Document) -> Result<Nodes<'a>, QueryError> {
        let evaluator = eval::Evaluator::new(document.root());
        match evaluator.evaluate(&self.expr) {
            Ok(eval::Value::Nodes(nodes)) => Ok(Nodes {
                inner: nodes.into_iter(),
            }),
            Ok(other) => Err(QueryError::InvalidExpression {
                expression: self.source.clone(),
                reason: format!("evaluated to {other:?} instead of nodes"),
            }),
            Err(reason) => Err(QueryError::InvalidExpression {
                expression: self.source.clone(),
                reason,
            }),
        }
    }
}

/// Nodes selected by a [`Query`], in document order.
#[derive(Debug)]
pub struct Nodes<'a> {
    inner: std::vec::IntoIter<Node<'a>>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = Node<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Nodes<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom;

    const PAGE: &str = r#"
        <html lang="en-GB">
          <head><title>Story</title></head>
          <body>
            <div id="header" class="nav top">Site</div>
            <div id="storybody" class="entry content">
              <h1>Headline</h1>
              <p class="lead">First</p>
              <p>Second</p>
              <!-- note -->
              <p>Third <b>bold</b></p>
            </div>
            <div class="related"><p>Other</p></div>
            <ul><li>1</li><li>2</li><li>3</li></ul>
          </body>
        </html>
    "#;

    fn texts(source: &str) -> Vec<String> {
        let doc = dom::parse(PAGE);
        let query = Query::compile(source).expect("query compiles");
        query
            .select(&doc)
            .expect("query evaluates")
            .map(|node| node.string_value().trim().to_string())
            .collect()
    }

    #[test]
    fn descendant_with_attribute_predicate() {
        assert_eq!(texts("//div[@id='storybody']/p[@class='lead']"), ["First"]);
    }

    #[test]
    fn positional_predicates() {
        assert_eq!(texts("//div[@id='storybody']/p[2]"), ["Second"]);
        assert_eq!(texts("//div[@id='storybody']/p[last()]"), ["Third bold"]);
        assert_eq!(texts("//li[position() > 1]"), ["2", "3"]);
        assert_eq!(texts("(//p)[1]"), ["First"]);
    }

    #[test]
    fn every_p_is_its_parents_first_p_once() {
        // //p[1] selects the first p child of each parent.
        assert_eq!(texts("//p[1]"), ["First", "Other"]);
    }

    #[test]
    fn class_token_idiom() {
        let source = "//div[contains(concat(' ', normalize-space(@class), ' '), ' content ')]/h1";
        assert_eq!(texts(source), ["Headline"]);
    }

    #[test]
    fn union_is_in_document_order() {
        assert_eq!(texts("//h1 | //div[@id='header']"), ["Site", "Headline"]);
    }

    #[test]
    fn id_function() {
        assert_eq!(texts("id('header storybody')/@id"), ["header", "storybody"]);
        assert_eq!(texts("id('storybody')//b"), ["bold"]);
    }

    #[test]
    fn reverse_axes_count_backwards() {
        assert_eq!(texts("//li[3]/preceding-sibling::li[1]"), ["2"]);
        assert_eq!(texts("//b/ancestor::*[2]/@id"), ["storybody"]);
        assert_eq!(texts("//h1/following-sibling::p[1]"), ["First"]);
    }

    #[test]
    fn following_and_preceding() {
        assert_eq!(texts("//div[@class='related']/preceding::h1"), ["Headline"]);
        assert_eq!(texts("//h1/following::li[1]"), ["1"]);
        assert!(texts("//h1/following::h1").is_empty());
    }

    #[test]
    fn text_and_comment_nodes() {
        assert_eq!(texts("//div[@id='storybody']/p[3]/text()"), ["Third"]);
        assert_eq!(texts("//div[@id='storybody']/comment()"), ["note"]);
        assert_eq!(texts("//p[preceding-sibling::comment() = ' note ']"), ["Third bold"]);
        assert!(texts("//comment()[2]").is_empty());
    }

    #[test]
    fn parent_and_self_abbreviations() {
        assert_eq!(texts("//b/../../h1"), ["Headline"]);
        assert_eq!(texts("//h1/./self::h1"), ["Headline"]);
        assert_eq!(texts("//b/parent::p/@class"), Vec::<String>::new());
    }

    #[test]
    fn names_ignore_case_and_prefix() {
        assert_eq!(texts("//H1"), ["Headline"]);
        assert_eq!(texts("//x:h1"), ["Headline"]);
    }

    #[test]
    fn string_functions_in_predicates() {
        assert_eq!(texts("//p[starts-with(., 'Sec')]"), ["Second"]);
        assert_eq!(texts("//p[string-length(.) = 5]"), ["First", "Other"]);
        assert_eq!(texts("//p[substring(., 2, 3) = 'eco']"), ["Second"]);
        assert_eq!(texts("//p[translate(., 'FIRST', 'first') = 'first']"), ["First"]);
        assert_eq!(texts("//li[number(.) mod 2 = 0]"), ["2"]);
        assert_eq!(texts("//li[. = 2 or . = '3']"), ["2", "3"]);
        assert_eq!(texts("//li[sum(../li) = 6][not(. = 1)]"), ["2", "3"]);
    }

    #[test]
    fn lang_follows_ancestors() {
        assert_eq!(texts("//h1[lang('en')]"), ["Headline"]);
        assert!(texts("//h1[lang('fr')]").is_empty());
    }

    #[test]
    fn root_only_and_wildcards() {
        assert_eq!(texts("/").len(), 1);
        assert_eq!(texts("/html/body/*").len(), 4);
        assert_eq!(texts("//div[@id='header']/@*"), ["header", "nav top"]);
    }

    #[test]
    fn non_node_expressions_are_rejected() {
        for source in ["count(//p)", "'text'", "1 + 1", "//p = 'x'"] {
            let err = Query::compile(source).expect_err("should not compile");
            assert!(matches!(err, QueryError::InvalidExpression { .. }), "{source}");
        }
    }

    #[test]
    fn deep_nesting_is_an_invalid_expression() {
        let source = format!("{}//p{}", "(".repeat(2000), ")".repeat(2000));
        match Query::compile(&source) {
            Err(QueryError::InvalidExpression { reason, .. }) => {
                assert_eq!(reason, "expression nested too deeply");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn nodes_iterator_knows_its_length() {
        let doc = dom::parse(PAGE);
        let nodes = Query::compile("//li").expect("compiles").select(&doc).expect("evaluates");
        assert_eq!(nodes.len(), 3);
    }
}
