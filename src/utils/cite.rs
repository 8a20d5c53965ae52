//! Citation rendering in BibTeX, EndNote, RefMan and WenXianWang formats.
//!
//! Remote rendering passes the service's own export through untouched. Local
//! rendering rebuilds BibTeX, EndNote and RIS from the parsed record.

use std::sync::Arc;

use crate::config::ExportStrategy;
use crate::models::{CitationFormat, CitationRecord};
use crate::sources::{parser, ScholarSource, SourceError};

/// Leading title words skipped when building a BibTeX key
const KEY_STOP_WORDS: &[&str] = &["a", "an", "the", "on", "of", "in", "for", "and", "to"];

/// Renders citation records in the caller's chosen format
#[derive(Debug, Clone)]
pub struct CitationRenderer {
    source: Arc<dyn ScholarSource>,
    strategy: ExportStrategy,
}

impl CitationRenderer {
    pub fn new(source: Arc<dyn ScholarSource>, strategy: ExportStrategy) -> Self {
        Self { source, strategy }
    }

    pub fn strategy(&self) -> ExportStrategy {
        self.strategy
    }

    /// Render one record
    ///
    /// Fails with [`SourceError::UnsupportedFormat`] when the record has no
    /// export for `format`; network failures during the export fetch are
    /// retried by the source.
    pub async fn render(
        &self,
        record: &CitationRecord,
        format: CitationFormat,
    ) -> Result<String, SourceError> {
        match self.strategy {
            ExportStrategy::Local => format_citation(record, format),
            ExportStrategy::Remote => self.fetch_export(record, format).await,
        }
    }

    async fn fetch_export(
        &self,
        record: &CitationRecord,
        format: CitationFormat,
    ) -> Result<String, SourceError> {
        let link = match record.export_link(format) {
            Some(link) => link.to_string(),
            None => self.lookup_export_link(record, format).await?,
        };

        tracing::debug!("Fetching {} export for \"{}\"", format, record.title);
        self.source.fetch(&link, format).await
    }

    /// Ask the cite popup for the export link of `format`
    async fn lookup_export_link(
        &self,
        record: &CitationRecord,
        format: CitationFormat,
    ) -> Result<String, SourceError> {
        let Some(citation_id) = record.citation_id.as_deref().filter(|id| !id.is_empty()) else {
            return Err(unsupported(record, format));
        };

        let popup = self
            .source
            .fetch(&self.source.cite_url(citation_id), format)
            .await?;

        parser::parse_cite_links(&popup)
            .remove(&format)
            .ok_or_else(|| unsupported(record, format))
    }
}

fn unsupported(record: &CitationRecord, format: CitationFormat) -> SourceError {
    SourceError::UnsupportedFormat {
        format,
        title: record.title.clone(),
    }
}

/// Rebuild a record in `format` from its parsed fields
pub fn format_citation(
    record: &CitationRecord,
    format: CitationFormat,
) -> Result<String, SourceError> {
    match format {
        CitationFormat::Bibtex => Ok(format_bibtex(record)),
        CitationFormat::Endnote => Ok(format_endnote(record)),
        CitationFormat::Refman => Ok(format_ris(record)),
        CitationFormat::Wenxianwang => Err(unsupported(record, format)),
    }
}

/// Convert "A Vaswani" to "Vaswani, A"; names already containing a comma are kept
fn inverted_name(author: &str) -> String {
    let author = author.trim();
    if author.contains(',') {
        return author.to_string();
    }
    let words: Vec<&str> = author.split_whitespace().collect();
    match words.split_last() {
        Some((last, given)) if !given.is_empty() => format!("{}, {}", last, given.join(" ")),
        _ => author.to_string(),
    }
}

/// Generate a key shaped like Scholar's own: surname + year + first title word
fn bibtex_key(record: &CitationRecord) -> String {
    let surname: String = record
        .first_author_surname()
        .unwrap_or("unknown")
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    let year = record.year.as_deref().unwrap_or("");
    let word = record
        .title
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .find(|w| !w.is_empty() && !KEY_STOP_WORDS.contains(&w.as_str()))
        .unwrap_or_default();

    format!("{}{}{}", surname, year, word)
}

/// Generate a BibTeX entry
/// Format: @article{key,
///   title = {Title},
///   author = {Last, First and Last, First},
///   journal = {Venue},
///   year = {Year}
/// }
fn format_bibtex(record: &CitationRecord) -> String {
    let mut fields = vec![format!("  title = {{{}}}", balanced_braces(&record.title))];
    if !record.authors.is_empty() {
        let authors: Vec<String> = record.authors.iter().map(|a| inverted_name(a)).collect();
        fields.push(format!("  author = {{{}}}", authors.join(" and ")));
    }
    if let Some(venue) = &record.venue {
        fields.push(format!("  journal = {{{}}}", balanced_braces(venue)));
    }
    if let Some(year) = &record.year {
        fields.push(format!("  year = {{{}}}", year));
    }

    format!("@article{{{},\n{}\n}}\n", bibtex_key(record), fields.join(",\n"))
}

/// Keep matched braces and spell out unmatched ones, so a value can never
/// close its BibTeX field early
fn balanced_braces(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut unmatched = vec![false; chars.len()];
    let mut open = Vec::new();
    for (i, c) in chars.iter().enumerate() {
        match c {
            '{' => open.push(i),
            '}' => {
                if open.pop().is_none() {
                    unmatched[i] = true;
                }
            }
            _ => {}
        }
    }
    for i in open {
        unmatched[i] = true;
    }

    let mut out = String::with_capacity(value.len());
    for (c, unmatched) in chars.into_iter().zip(unmatched) {
        match (c, unmatched) {
            ('{', true) => out.push_str("\\textbraceleft{}"),
            ('}', true) => out.push_str("\\textbraceright{}"),
            (c, _) => out.push(c),
        }
    }
    out
}

/// Generate an EndNote tagged entry
fn format_endnote(record: &CitationRecord) -> String {
    let mut lines = vec!["%0 Journal Article".to_string(), format!("%T {}", record.title)];
    lines.extend(record.authors.iter().map(|a| format!("%A {}", inverted_name(a))));
    if let Some(venue) = &record.venue {
        lines.push(format!("%J {}", venue));
    }
    if let Some(year) = &record.year {
        lines.push(format!("%D {}", year));
    }
    lines.join("\n") + "\n"
}

/// Generate a RIS (RefMan) entry
fn format_ris(record: &CitationRecord) -> String {
    let mut lines = vec!["TY  - JOUR".to_string(), format!("T1  - {}", record.title)];
    lines.extend(record.authors.iter().map(|a| format!("AU  - {}", inverted_name(a))));
    if let Some(venue) = &record.venue {
        lines.push(format!("JO  - {}", venue));
    }
    if let Some(year) = &record.year {
        lines.push(format!("PY  - {}", year));
    }
    lines.push("ER  - ".to_string());
    lines.join("\n") + "\n"
}
