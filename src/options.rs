//! Configuration options for the extraction pipeline.
//!
//! The `Options` struct controls where rules come from, how URLs are matched
//! against them and how pages are fetched.

use std::path::PathBuf;
use std::time::Duration;

/// How a URL is matched against the rule table.
///
/// Both modes return the same rule: the first one, in table order, whose
/// pattern matches the URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Try each rule's pattern in turn and stop at the first hit.
    #[default]
    Linear,

    /// Run every pattern at once through a `RegexSet` and take the lowest
    /// matching index. Falls back to `Linear` when the set cannot be built.
    Indexed,
}

/// Configuration options for the extraction pipeline.
///
/// All fields are public for easy configuration. Use `Default::default()`
/// for standard settings.
///
/// # Example
///
/// ```rust
/// use rs_fullfeed::{MatchMode, Options};
///
/// // Use defaults
/// let options = Options::default();
///
/// // Customize specific fields
/// let options = Options {
///     rules_path: "rules/items.json".into(),
///     match_mode: MatchMode::Indexed,
///     ..Options::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct Options {
    /// Rule table loaded by [`Extractor::from_options`](crate::Extractor::from_options).
    ///
    /// Default: `./items.json`
    pub rules_path: PathBuf,

    /// Matching strategy.
    ///
    /// Default: [`MatchMode::Linear`]
    pub match_mode: MatchMode,

    /// `User-Agent` header sent by the HTTP fetcher.
    ///
    /// Default: `rs-fullfeed/<version>`
    pub user_agent: String,

    /// Whole-request timeout for the HTTP fetcher.
    ///
    /// Default: 30 seconds
    pub timeout: Duration,

    /// Maximum number of redirects the HTTP fetcher follows.
    ///
    /// Default: `5`
    pub max_redirects: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from("./items.json"),
            match_mode: MatchMode::Linear,
            user_agent: concat!("rs-fullfeed/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            max_redirects: 5,
        }
    }
}
