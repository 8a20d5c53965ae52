//! Citation record model representing one bibliographic match.

use std::collections::BTreeMap;
use std::str::FromStr;

/// Citation export grammar selectable by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CitationFormat {
    Bibtex,
    Endnote,
    Refman,
    Wenxianwang,
}

impl CitationFormat {
    /// All formats, in preference-code order used by the service
    pub const ALL: [CitationFormat; 4] = [
        CitationFormat::Bibtex,
        CitationFormat::Endnote,
        CitationFormat::Refman,
        CitationFormat::Wenxianwang,
    ];

    /// Scholar preference code sent in the `GSP=CF=` cookie
    pub fn preference_code(&self) -> u8 {
        match self {
            CitationFormat::Bibtex => 4,
            CitationFormat::Endnote => 3,
            CitationFormat::Refman => 2,
            CitationFormat::Wenxianwang => 5,
        }
    }

    /// File extension of the export endpoint (`scholar.bib`, `scholar.enw`, ...)
    pub fn extension(&self) -> &'static str {
        match self {
            CitationFormat::Bibtex => "bib",
            CitationFormat::Endnote => "enw",
            CitationFormat::Refman => "ris",
            CitationFormat::Wenxianwang => "ral",
        }
    }

    /// Map an export endpoint extension back to its format
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(ext))
    }

    /// Returns the identifier used on the command line and in config files
    pub fn id(&self) -> &'static str {
        match self {
            CitationFormat::Bibtex => "bibtex",
            CitationFormat::Endnote => "endnote",
            CitationFormat::Refman => "refman",
            CitationFormat::Wenxianwang => "wenxianwang",
        }
    }
}

impl std::fmt::Display for CitationFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CitationFormat::Bibtex => "BibTeX",
            CitationFormat::Endnote => "EndNote",
            CitationFormat::Refman => "RefMan",
            CitationFormat::Wenxianwang => "WenXianWang",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for CitationFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown output format: {}", s))
    }
}

/// A normalized bibliographic match parsed from a result page
///
/// Records live only for the duration of one resolution. A record reaching
/// the renderer always carries a `citation_id` and a non-empty `title`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationRecord {
    /// Title as displayed by the service
    pub title: String,

    /// Authors in display order
    pub authors: Vec<String>,

    /// Publication year, when the byline carries one
    pub year: Option<String>,

    /// Journal, conference or publisher
    pub venue: Option<String>,

    /// Service-assigned token used to fetch export links
    pub citation_id: Option<String>,

    /// Unparsed excerpt kept for diagnostics
    pub raw_snippet: String,

    /// Export links embedded next to the entry, keyed by format
    pub export_links: BTreeMap<CitationFormat, String>,
}

impl CitationRecord {
    /// Create a record with a title and no other metadata
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            authors: Vec::new(),
            year: None,
            venue: None,
            citation_id: None,
            raw_snippet: String::new(),
            export_links: BTreeMap::new(),
        }
    }

    /// Whether the record can be handed to the renderer
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && self.is_exportable()
    }

    /// A record without a citation id cannot be exported, embedded links or not
    pub fn is_exportable(&self) -> bool {
        self.citation_id.as_deref().is_some_and(|id| !id.trim().is_empty())
    }

    pub fn export_link(&self, format: CitationFormat) -> Option<&str> {
        self.export_links.get(&format).map(String::as_str)
    }

    pub fn first_author(&self) -> Option<&str> {
        self.authors.first().map(String::as_str)
    }

    /// Surname of the first author ("A Vaswani" -> "Vaswani", "Vaswani, Ashish" -> "Vaswani")
    pub fn first_author_surname(&self) -> Option<&str> {
        let author = self.first_author()?.trim();
        let surname = match author.split_once(',') {
            Some((family, _)) => family.trim(),
            None => author.split_whitespace().last().unwrap_or(author),
        };
        let surname = surname.trim_end_matches('…').trim();
        (!surname.is_empty()).then_some(surname)
    }
}

/// Builder for constructing CitationRecord objects
#[derive(Debug, Clone)]
pub struct CitationRecordBuilder {
    record: CitationRecord,
}

impl CitationRecordBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            record: CitationRecord::new(title),
        }
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.record.authors.push(author.into());
        self
    }

    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    pub fn year(mut self, year: impl Into<String>) -> Self {
        self.record.year = Some(year.into());
        self
    }

    pub fn venue(mut self, venue: impl Into<String>) -> Self {
        self.record.venue = Some(venue.into());
        self
    }

    pub fn citation_id(mut self, id: impl Into<String>) -> Self {
        self.record.citation_id = Some(id.into());
        self
    }

    pub fn raw_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.record.raw_snippet = snippet.into();
        self
    }

    pub fn export_link(mut self, format: CitationFormat, url: impl Into<String>) -> Self {
        self.record.export_links.insert(format, url.into());
        self
    }

    pub fn build(self) -> CitationRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_builder() {
        let record = CitationRecordBuilder::new("Attention is All you Need")
            .authors(["A Vaswani", "N Shazeer"])
            .year("2017")
            .venue("Advances in neural information processing systems")
            .citation_id("abc123")
            .build();

        assert_eq!(record.title, "Attention is All you Need");
        assert_eq!(record.authors, vec!["A Vaswani", "N Shazeer"]);
        assert_eq!(record.year.as_deref(), Some("2017"));
        assert!(record.is_valid());
    }

    #[test]
    fn test_record_without_citation_id_is_not_exportable() {
        let record = CitationRecord::new("Some title");
        assert!(!record.is_exportable());
        assert!(!record.is_valid());

        let record = CitationRecordBuilder::new("Some title")
            .export_link(CitationFormat::Bibtex, "https://example.com/scholar.bib?q=1")
            .build();
        assert!(!record.is_exportable());
        assert!(!record.is_valid());

        let record = CitationRecordBuilder::new("Some title").citation_id("  ").build();
        assert!(!record.is_valid());
    }

    #[test]
    fn test_first_author_surname() {
        let record = CitationRecordBuilder::new("t").author("A Vaswani").build();
        assert_eq!(record.first_author_surname(), Some("Vaswani"));

        let record = CitationRecordBuilder::new("t").author("Vaswani, Ashish").build();
        assert_eq!(record.first_author_surname(), Some("Vaswani"));

        let record = CitationRecord::new("t");
        assert_eq!(record.first_author_surname(), None);
    }

    #[test]
    fn test_format_codes_and_extensions() {
        assert_eq!(CitationFormat::Bibtex.preference_code(), 4);
        assert_eq!(CitationFormat::Endnote.preference_code(), 3);
        assert_eq!(CitationFormat::Refman.preference_code(), 2);
        assert_eq!(CitationFormat::Wenxianwang.preference_code(), 5);

        assert_eq!(CitationFormat::from_extension("ris"), Some(CitationFormat::Refman));
        assert_eq!(CitationFormat::from_extension("pdf"), None);
        assert_eq!("EndNote".parse::<CitationFormat>(), Ok(CitationFormat::Endnote));
        assert!("apa".parse::<CitationFormat>().is_err());
    }
}
