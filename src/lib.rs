//! # rs-fullfeed
//!
//! Site-rule web content extraction.
//!
//! Instead of guessing where the article is, this library looks the page URL
//! up in a table of hand-written site rules (the LDRFullFeed format published
//! on wedata). Each rule pairs a URL regular expression with an XPath
//! expression that locates the body on that site's pages.
//!
//! ## Quick Start
//!
//! ```rust
//! use rs_fullfeed::{extract_html, MatchMode, RuleStore};
//!
//! let rules = r#"[{
//!     "name": "Example blog",
//!     "data": {"url": "^https?://blog\\.example\\.com/", "xpath": "//div[@class='entry']"}
//! }]"#;
//! let store = RuleStore::from_reader(rules.as_bytes(), MatchMode::Linear)?;
//!
//! let url = "https://blog.example.com/2024/01/hello";
//! let html = r#"<html><body><div class="entry"> Hello world </div></body></html>"#;
//! if let Some(rule) = store.find(url) {
//!     let content = extract_html(html, &rule)?;
//!     assert_eq!(content.text, "Hello world");
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Features
//!
//! - **Rule tables**: JSON rule arrays load atomically; rules with bad
//!   patterns are logged and skipped, the rest still install
//! - **First-match lookup**: table order decides, optionally through a
//!   single `RegexSet` pass
//! - **XPath 1.0**: evaluated directly on the `dom_query` HTML tree
//! - **Fetching** (`fetch` feature): blocking HTTP with charset detection

mod error;
mod extract;
mod options;
mod pipeline;
mod result;

/// Node-level operations over the parsed HTML tree.
pub mod dom;

/// Character encoding detection and transcoding.
pub mod encoding;

/// Page fetching.
pub mod fetch;

/// URL-to-rule matching.
pub mod matcher;

/// Rule records and compiled rules.
pub mod rule;

/// Rule table loading and sharing.
pub mod store;

/// XPath 1.0 compiler and evaluator.
pub mod xpath;

// Public API - re-exports
pub use error::{DecodeError, Error, FetchError, LoadError, QueryError, Result};
pub use extract::{collect_text, extract_document, extract_html, extract_reader};
#[cfg(feature = "fetch")]
pub use fetch::HttpFetcher;
pub use fetch::{FetchedPage, Fetcher};
pub use matcher::Matcher;
pub use options::{MatchMode, Options};
pub use pipeline::Extractor;
pub use result::Content;
pub use rule::{Rule, RuleData, RuleRecord, RuleRejection};
pub use store::{LoadReport, MatchedRule, RuleSet, RuleStore};
