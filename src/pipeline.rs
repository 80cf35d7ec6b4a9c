//! Match, fetch, decode and extract in one call.

use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::encoding;
use crate::error::{LoadError, QueryError};
use crate::extract;
use crate::fetch::Fetcher;
use crate::result::Content;
use crate::store::{LoadReport, MatchedRule, RuleStore};

/// Rule-driven extractor.
///
/// Pairs a [`RuleStore`] with a [`Fetcher`]. Pages whose URL matches no rule
/// are neither fetched nor parsed; every entry point reports them as
/// `Ok(None)`.
///
/// # Example
///
/// ```rust
/// use rs_fullfeed::{Extractor, FetchError, FetchedPage, Fetcher, MatchMode, RuleStore};
///
/// struct Offline;
///
/// impl Fetcher for Offline {
///     fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
///         Err(FetchError::Other(format!("offline: {url}")))
///     }
/// }
///
/// let rules = r#"[{"name": "ex", "data": {"url": "^https://example\\.com/", "xpath": "//p"}}]"#;
/// let store = RuleStore::from_reader(rules.as_bytes(), MatchMode::Linear)?;
/// let extractor = Extractor::new(store, Offline);
///
/// let content = extractor.extract_html("<p>Hello</p>", "https://example.com/a")?;
/// assert_eq!(content.map(|c| c.text).as_deref(), Some("Hello"));
/// assert!(extractor.extract_url("https://other.org/")?.is_none());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Extractor<F> {
    store: RuleStore,
    fetcher: F,
}

#[cfg(feature = "fetch")]
impl Extractor<crate::fetch::HttpFetcher> {
    /// Loads the rule table named in `options` and builds an HTTP fetcher.
    pub fn from_options(options: &crate::options::Options) -> crate::Result<Self> {
        let store = RuleStore::from_path(&options.rules_path, options.match_mode)?;
        let fetcher = crate::fetch::HttpFetcher::new(options)?;
        Ok(Self::new(store, fetcher))
    }
}

impl<F: Fetcher> Extractor<F> {
    /// Creates an extractor over `store` that fetches with `fetcher`.
    #[must_use]
    pub fn new(store: RuleStore, fetcher: F) -> Self {
        Self { store, fetcher }
    }

    /// The rule store.
    #[must_use]
    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    /// The fetcher.
    #[must_use]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Rule that applies to `url`, if any.
    #[must_use]
    pub fn matches(&self, url: &str) -> Option<MatchedRule> {
        self.store.find(url)
    }

    /// Replaces the rule table with the one at `path`.
    ///
    /// On error the current table stays active.
    pub fn reload(&self, path: impl AsRef<Path>) -> Result<LoadReport, LoadError> {
        self.store.load_from_path(path)
    }

    /// Extracts from an already fetched page.
    pub fn extract_html(&self, html: &str, url: &str) -> Result<Option<Content>, QueryError> {
        let Some(rule) = self.lookup(url) else {
            return Ok(None);
        };
        extract::extract_html(html, &rule).map(Some)
    }

    /// Extracts from a UTF-8 page stream. The stream is not read when no
    /// rule applies.
    pub fn extract_reader<R: Read>(
        &self,
        reader: R,
        url: &str,
    ) -> Result<Option<Content>, QueryError> {
        let Some(rule) = self.lookup(url) else {
            return Ok(None);
        };
        extract::extract_reader(reader, &rule).map(Some)
    }

    /// Fetches `url`, decodes the body and extracts from it.
    ///
    /// Returns `Ok(None)` without touching the network when no rule applies.
    pub fn extract_url(&self, url: &str) -> crate::Result<Option<Content>> {
        let Some(rule) = self.lookup(url) else {
            return Ok(None);
        };
        // Reject a broken query before spending a request on it.
        rule.query()?;

        let page = self.fetcher.fetch(url)?;
        let html = encoding::decode(&page.body, page.content_type.as_deref())?;
        let content = extract::extract_html(&html, &rule)?;
        Ok(Some(content))
    }

    fn lookup(&self, url: &str) -> Option<MatchedRule> {
        let matched = self.store.find(url);
        match &matched {
            Some(rule) => debug!(url, rule = rule.name(), "rule matched"),
            None => debug!(url, "no rule matches"),
        }
        matched
    }
}
