//! PDF text extraction and search-query derivation.
//!
//! This module provides page-addressed PDF text extraction using the lopdf
//! crate, and derives a search query from the first non-empty line of text
//! at or after a start page (usually the title).

use lopdf::Document;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during PDF extraction
#[derive(Debug, Error)]
pub enum PdfExtractError {
    #[error("Cannot read {path} as a PDF: {reason}")]
    UnreadablePdf { path: String, reason: String },

    #[error("No extractable text in {path} at or after page {start_page}")]
    EmptyDocument { path: String, start_page: u32 },
}

/// Load a PDF, mapping any parse failure to [`PdfExtractError::UnreadablePdf`]
pub fn load_pdf(path: &Path) -> Result<Document, PdfExtractError> {
    Document::load(path).map_err(|e| PdfExtractError::UnreadablePdf {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Lazily extract the text of each page at or after `start_page` (one-based)
///
/// Yields `(page number, text)` pairs in page order, extracting a page only
/// when it is pulled. Pages whose text cannot be extracted are logged and
/// left out.
pub fn extract_pages(
    document: &Document,
    start_page: u32,
) -> impl Iterator<Item = (u32, String)> + '_ {
    let start_page = start_page.max(1);
    document
        .get_pages()
        .into_keys()
        .filter(move |page_number| *page_number >= start_page)
        .filter_map(move |page_number| match document.extract_text(&[page_number]) {
            Ok(text) => Some((page_number, text)),
            Err(e) => {
                tracing::debug!("Skipping page {}: {}", page_number, e);
                None
            }
        })
}

/// Derive a search query from a PDF
///
/// The query is the first non-empty line of extracted text at or after
/// `start_page` (default: first page), with non-word characters replaced by
/// spaces and capped at `max_words` words. Extraction stops at the first page
/// that yields such a line. A start page beyond the end of the document is
/// reported as [`PdfExtractError::EmptyDocument`].
pub fn derive_query(
    path: &Path,
    start_page: Option<u32>,
    max_words: usize,
) -> Result<String, PdfExtractError> {
    let start_page = start_page.unwrap_or(1).max(1);
    let document = load_pdf(path)?;

    let query = extract_pages(&document, start_page).find_map(|(page_number, text)| {
        let words = text
            .lines()
            .map(|line| query_words(line, max_words))
            .find(|words| !words.is_empty())?;
        tracing::debug!(
            "Derived query from page {} of {}: {}",
            page_number,
            path.display(),
            words
        );
        Some(words)
    });

    query.ok_or_else(|| PdfExtractError::EmptyDocument {
        path: path.display().to_string(),
        start_page,
    })
}

/// Replace non-word characters with spaces and keep at most `max_words` words
fn query_words(line: &str, max_words: usize) -> String {
    line.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .take(max_words.max(1))
        .collect::<Vec<_>>()
        .join(" ")
}
