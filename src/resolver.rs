//! Orchestration of a single citation resolution.
//!
//! A [`Resolver`] takes a [`ResolutionRequest`], derives the search terms
//! (from a PDF when asked), searches, parses and renders the records in the
//! service's rank order.

use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;
use crate::models::{CitationFormat, CitationRecord, ResolutionRequest};
use crate::sources::{parser, ScholarSource, SourceError};
use crate::utils::{derive_query, CitationRenderer, PdfExtractError};

/// Errors that end a resolution, tagged with the stage that failed
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Pdf(#[from] PdfExtractError),

    #[error("Search failed: {0}")]
    Search(#[source] SourceError),

    #[error("Unreadable search results: {0}")]
    Parse(#[source] SourceError),

    #[error("Cannot render result #{rank} \"{title}\": {source}")]
    Render {
        rank: usize,
        title: String,
        #[source]
        source: SourceError,
    },
}

impl ResolveError {
    /// Name of the stage that failed
    pub fn stage(&self) -> &'static str {
        match self {
            ResolveError::Pdf(_) => "pdf",
            ResolveError::Search(_) => "search",
            ResolveError::Parse(_) => "parse",
            ResolveError::Render { .. } => "render",
        }
    }

    /// The service asked for proof that a human is on the other end
    pub fn is_challenge(&self) -> bool {
        matches!(
            self,
            ResolveError::Search(SourceError::ServiceChallenge(_))
                | ResolveError::Render {
                    source: SourceError::ServiceChallenge(_),
                    ..
                }
        )
    }
}

/// Records found for a request, before rendering
#[derive(Debug, Clone)]
pub struct Lookup {
    /// Search terms actually sent
    pub query: String,
    /// Records in service rank order
    pub records: Vec<CitationRecord>,
    /// Entries the parser dropped
    pub skipped: usize,
}

/// Full outcome of a resolution
#[derive(Debug, Clone)]
pub struct Resolution {
    pub lookup: Lookup,
    /// Rendered citations in rank order
    pub citations: Vec<String>,
    /// Records left out of a batch because their format was unavailable
    pub unrendered: usize,
}

/// Resolves requests against a scholarly-search source
#[derive(Debug, Clone)]
pub struct Resolver {
    source: Arc<dyn ScholarSource>,
    renderer: CitationRenderer,
    max_query_words: usize,
}

impl Resolver {
    pub fn new(source: Arc<dyn ScholarSource>, config: &Config) -> Self {
        Self {
            renderer: CitationRenderer::new(source.clone(), config.export.strategy),
            source,
            max_query_words: config.pdf.max_query_words,
        }
    }

    /// Turn a request into search terms
    ///
    /// PDF requests are read locally; no network call happens before this
    /// succeeds.
    pub fn query_for(&self, request: &ResolutionRequest) -> Result<String, ResolveError> {
        match request {
            ResolutionRequest::Query(text) => Ok(text.clone()),
            ResolutionRequest::PdfLookup { path, start_page } => {
                Ok(derive_query(path, *start_page, self.max_query_words)?)
            }
        }
    }

    /// Search and parse, without rendering
    pub async fn lookup(
        &self,
        request: &ResolutionRequest,
        format: CitationFormat,
    ) -> Result<Lookup, ResolveError> {
        let query = self.query_for(request)?;
        tracing::debug!("Searching {} for \"{}\"", self.source.name(), query);

        let pages = self
            .source
            .search(&query, format)
            .await
            .map_err(ResolveError::Search)?;
        let parsed = parser::parse_pages(pages).map_err(ResolveError::Parse)?;

        Ok(Lookup {
            query,
            records: parsed.records,
            skipped: parsed.skipped,
        })
    }

    /// Resolve a request to rendered citations in rank order
    ///
    /// Only the best match is rendered unless `render_all` is set. An empty
    /// vector means the service found nothing.
    pub async fn resolve(
        &self,
        request: &ResolutionRequest,
        format: CitationFormat,
        render_all: bool,
    ) -> Result<Vec<String>, ResolveError> {
        Ok(self
            .resolve_detailed(request, format, render_all)
            .await?
            .citations)
    }

    /// Like [`Resolver::resolve`], keeping the records and diagnostics
    ///
    /// When rendering all records, a record whose format is unavailable is
    /// left out and counted; every other render failure ends the call.
    pub async fn resolve_detailed(
        &self,
        request: &ResolutionRequest,
        format: CitationFormat,
        render_all: bool,
    ) -> Result<Resolution, ResolveError> {
        let lookup = self.lookup(request, format).await?;
        let selected = if render_all {
            &lookup.records[..]
        } else {
            &lookup.records[..lookup.records.len().min(1)]
        };

        let mut citations = Vec::with_capacity(selected.len());
        let mut unrendered = 0;
        for (index, record) in selected.iter().enumerate() {
            match self.renderer.render(record, format).await {
                Ok(text) => citations.push(text),
                Err(e @ SourceError::UnsupportedFormat { .. }) if render_all => {
                    tracing::warn!("Leaving out result #{}: {}", index + 1, e);
                    unrendered += 1;
                }
                Err(source) => {
                    return Err(ResolveError::Render {
                        rank: index + 1,
                        title: record.title.clone(),
                        source,
                    })
                }
            }
        }

        Ok(Resolution {
            lookup,
            citations,
            unrendered,
        })
    }
}
