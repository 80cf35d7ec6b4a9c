//! Page fetching.
//!
//! The pipeline only needs the body bytes and the declared content type, so
//! fetching sits behind the [`Fetcher`] trait. [`HttpFetcher`] is the
//! blocking `reqwest` implementation; tests and embedders can supply their
//! own.

use crate::error::FetchError;

/// Raw response of a fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    /// Response body, undecoded.
    pub body: Vec<u8>,
    /// `Content-Type` header value, if the server sent one.
    pub content_type: Option<String>,
}

/// Retrieves a page by URL.
pub trait Fetcher {
    /// Fetches `url`. Non-success statuses are errors.
    fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        (**self).fetch(url)
    }
}

impl<F: Fetcher + ?Sized> Fetcher for Box<F> {
    fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        (**self).fetch(url)
    }
}

#[cfg(feature = "fetch")]
pub use self::http::HttpFetcher;

#[cfg(feature = "fetch")]
mod http {
    use reqwest::blocking::Client;
    use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
    use reqwest::redirect::Policy;
    use tracing::debug;

    use super::{FetchedPage, Fetcher};
    use crate::error::FetchError;
    use crate::options::Options;

    /// Blocking HTTP fetcher.
    #[derive(Debug, Clone)]
    pub struct HttpFetcher {
        client: Client,
    }

    impl HttpFetcher {
        /// Builds a client from the fetch settings in `options`.
        pub fn new(options: &Options) -> Result<Self, FetchError> {
            let mut headers = HeaderMap::new();
            headers.insert(
                ACCEPT,
                HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
            );

            let client = Client::builder()
                .timeout(options.timeout)
                .user_agent(options.user_agent.as_str())
                .default_headers(headers)
                .redirect(Policy::limited(options.max_redirects))
                .build()
                .map_err(FetchError::Client)?;

            Ok(Self { client })
        }
    }

    impl Fetcher for HttpFetcher {
        fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
            let request_error = |source| FetchError::Request {
                url: url.to_string(),
                source,
            };

            let response = self.client.get(url).send().map_err(request_error)?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let body = response.bytes().map_err(request_error)?.to_vec();
            debug!(url, bytes = body.len(), content_type = content_type.as_deref(), "fetched page");

            Ok(FetchedPage { body, content_type })
        }
    }
}
