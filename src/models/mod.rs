//! Core data models for citation resolution.

mod citation;
mod request;

pub use citation::{CitationFormat, CitationRecord, CitationRecordBuilder};
pub use request::{ResolutionRequest, ResultPage};
