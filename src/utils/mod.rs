//! Utility modules supporting citation resolution.
//!
//! This module provides the pieces the resolver composes:
//!
//! - [`CitationRenderer`]: Render citation records in BibTeX, EndNote, RefMan or WenXianWang
//! - [`format_citation`]: Rebuild a citation locally from its parsed fields
//! - [`HttpClient`]: HTTP client carrying the configured identity and timeouts
//! - [`derive_query`]: Derive a search query from the text of a PDF
//! - [`PdfExtractError`]: Errors that can occur during PDF extraction
//! - [`rename_file`]: Rename a PDF after the citation it was resolved to
//! - [`RetryConfig`]: Configuration for retry logic with exponential backoff
//! - [`with_retry`]: Execute an operation with automatic retry on transient errors
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use gscholar::sources::SourceError;
//! use gscholar::utils::{with_retry, RetryConfig};
//!
//! # async fn fetch_data() -> Result<String, SourceError> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), SourceError> {
//! let config = RetryConfig {
//!     max_attempts: 5,
//!     ..RetryConfig::default()
//! };
//! let result = with_retry(config, || fetch_data()).await?;
//! # Ok(())
//! # }
//! ```

mod cite;
mod http;
mod pdf;
mod rename;
mod retry;

pub use cite::{format_citation, CitationRenderer};
pub use http::HttpClient;
pub use pdf::{derive_query, extract_pages, load_pdf, PdfExtractError};
pub use rename::{rename_file, target_filename, RenameError};
pub use retry::{with_retry, RetryConfig, TransientError};

#[cfg(test)]
pub(crate) use pdf::tests::write_pdf;
