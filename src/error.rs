//! Error types for rs-fullfeed.
//!
//! Each stage of the pipeline has its own error enum. [`Error`] wraps them
//! all for callers that drive the whole pipeline through
//! [`Extractor`](crate::Extractor).

use std::path::PathBuf;

/// Failure to install a rule table.
///
/// A `LoadError` aborts the whole load: nothing is installed and the
/// previously active rules stay in place. A single rule with a bad URL
/// pattern is not a `LoadError`; it is logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The resource is not a JSON array of rule records.
    #[error("malformed rule resource: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The rule resource could not be opened.
    #[error("cannot open rule resource {}: {source}", path.display())]
    Io {
        /// Path that was being opened.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Reading the rule stream failed part way.
    #[error("failed to read rule resource: {0}")]
    Read(#[source] std::io::Error),
}

/// Failure to run a rule's query against a document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The XPath expression does not compile, or cannot select nodes.
    #[error("invalid query expression `{expression}`: {reason}")]
    InvalidExpression {
        /// The expression as written in the rule.
        expression: String,
        /// What the compiler rejected.
        reason: String,
    },

    /// The document stream could not be turned into a tree.
    #[error("unparsable document: {0}")]
    Unparsable(String),
}

/// Failure reported by a [`Fetcher`](crate::fetch::Fetcher).
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[cfg(feature = "fetch")]
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request failed before a response arrived, or the body could not be read.
    #[cfg(feature = "fetch")]
    #[error("request to {url} failed: {source}")]
    Request {
        /// Requested URL.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Status {
        /// Requested URL.
        url: String,
        /// Numeric status code.
        status: u16,
    },

    /// Any other fetcher-specific failure.
    #[error("fetch failed: {0}")]
    Other(String),
}

/// Failure to turn fetched bytes into text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The declared charset label is not known to `encoding_rs`.
    #[error("unsupported charset: {0}")]
    UnsupportedCharset(String),
}

/// Error type for the full match-fetch-decode-extract pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rule table could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Query compilation or document parsing failed.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Fetching the page failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Decoding the fetched body failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
