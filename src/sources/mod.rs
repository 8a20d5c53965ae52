//! Access to the external scholarly-search service.
//!
//! The [`ScholarSource`] trait is the seam between the resolver and the
//! network. [`ScholarClient`] talks to Google Scholar over HTTP and
//! [`MockScholar`] serves canned pages for tests. Everything that depends on
//! the service's markup lives in [`parser`].

mod google_scholar;
pub mod mock;
pub mod parser;

pub use google_scholar::ScholarClient;
pub use mock::MockScholar;

use async_trait::async_trait;

use crate::models::{CitationFormat, ResultPage};

/// Interface to a scholarly-search service
#[async_trait]
pub trait ScholarSource: Send + Sync + std::fmt::Debug {
    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Search for `query` and return the raw result pages in rank order
    ///
    /// `format` selects which export link the service embeds next to each
    /// entry. An affirmative "no matches" answer is an empty vector.
    async fn search(
        &self,
        query: &str,
        format: CitationFormat,
    ) -> Result<Vec<ResultPage>, SourceError>;

    /// Fetch an export or popup document; relative URLs resolve against the service
    async fn fetch(&self, url: &str, format: CitationFormat) -> Result<String, SourceError>;

    /// URL of the cite popup listing every export link for a citation id
    fn cite_url(&self, citation_id: &str) -> String;
}

/// Errors that can occur when interacting with the service
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The query is empty after trimming
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Base URL or export link cannot be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Network or transport error
    #[error("Network error: {0}")]
    Network(String),

    /// A request, or the whole call, ran out of time
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Non-success HTTP status
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// The service answered with an automation challenge
    #[error("Scholar is blocking automated requests ({0}); try again later or look the citation up manually")]
    ServiceChallenge(String),

    /// The response does not look like anything the parser knows
    #[error("Unrecognized response from Scholar: {0}")]
    ServiceResponseUnrecognized(String),

    /// No export capability for the requested format
    #[error("No {format} export available for \"{title}\"")]
    UnsupportedFormat {
        format: CitationFormat,
        title: String,
    },
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();
        if err.is_timeout() {
            SourceError::Timeout(url)
        } else if let Some(status) = err.status() {
            SourceError::Http {
                status: status.as_u16(),
                url,
            }
        } else {
            SourceError::Network(err.to_string())
        }
    }
}
