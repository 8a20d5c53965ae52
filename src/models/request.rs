//! Resolution requests and fetched result pages.

use std::path::PathBuf;

/// What the caller wants resolved
///
/// Exactly one variant is active per invocation; the resolver dispatches on it
/// once at entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionRequest {
    /// Free-text search terms
    Query(String),

    /// Derive the search terms from a local PDF, starting at a one-based page
    PdfLookup {
        path: PathBuf,
        start_page: Option<u32>,
    },
}

impl ResolutionRequest {
    pub fn query(text: impl Into<String>) -> Self {
        ResolutionRequest::Query(text.into())
    }

    pub fn pdf(path: impl Into<PathBuf>, start_page: Option<u32>) -> Self {
        ResolutionRequest::PdfLookup {
            path: path.into(),
            start_page,
        }
    }
}

/// One fetched page of search results, consumed once by the parser
#[derive(Debug, Clone)]
pub struct ResultPage {
    /// Raw HTML body
    pub body: String,

    /// Query that produced this page
    pub query: String,

    /// Zero-based page index
    pub index: usize,
}

impl ResultPage {
    pub fn new(body: impl Into<String>, query: impl Into<String>, index: usize) -> Self {
        Self {
            body: body.into(),
            query: query.into(),
            index,
        }
    }
}
