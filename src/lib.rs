//! # gscholar
//!
//! Look up citations on Google Scholar from free-text search terms or from
//! the title page of a PDF, and render them as BibTeX, EndNote, RefMan or
//! WenXianWang.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Core data structures (CitationRecord, ResolutionRequest, etc.)
//! - [`sources`]: The search service seam, its Google Scholar client and result parser
//! - [`resolver`]: Orchestration of one resolution from request to rendered citations
//! - [`utils`]: Rendering, PDF query derivation, renaming, HTTP and retry utilities
//! - [`config`]: Configuration management
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use gscholar::config::Config;
//! use gscholar::models::{CitationFormat, ResolutionRequest};
//! use gscholar::resolver::Resolver;
//! use gscholar::sources::ScholarClient;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let resolver = Resolver::new(Arc::new(ScholarClient::new(&config)?), &config);
//! let citations = resolver
//!     .resolve(
//!         &ResolutionRequest::query("attention is all you need"),
//!         CitationFormat::Bibtex,
//!         false,
//!     )
//!     .await?;
//! for citation in citations {
//!     println!("{}", citation);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod models;
pub mod resolver;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use models::{CitationFormat, CitationRecord, ResolutionRequest};
pub use resolver::{ResolveError, Resolver};
pub use sources::{ScholarClient, ScholarSource, SourceError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
