//! Best-effort extraction of citation records from Scholar markup.
//!
//! Scholar's HTML is not a contract and changes without notice, so each result
//! entry is parsed in isolation: a malformed entry is skipped and counted, the
//! rest of the page still goes through.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::models::{CitationFormat, CitationRecord, CitationRecordBuilder, ResultPage};
use crate::sources::SourceError;

static ENTRY: LazyLock<Selector> = LazyLock::new(|| selector("div.gs_r"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("h3.gs_rt"));
static TITLE_LINK: LazyLock<Selector> = LazyLock::new(|| selector("h3.gs_rt a[id]"));
static BYLINE: LazyLock<Selector> = LazyLock::new(|| selector("div.gs_a"));
static SNIPPET: LazyLock<Selector> = LazyLock::new(|| selector("div.gs_rs"));
static LINKS: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));
static RESULTS_PANE: LazyLock<Selector> =
    LazyLock::new(|| selector("#gs_res_ccl, #gs_res_ccl_mid"));
static NOTICE: LazyLock<Selector> =
    LazyLock::new(|| selector("#gs_res_ccl_mid, #gs_res_ccl_top, div.gs_med"));
static CHALLENGE_FORM: LazyLock<Selector> = LazyLock::new(|| {
    selector("#gs_captcha_ccl, #gs_captcha_f, form#captcha-form, div.g-recaptcha")
});

static EXPORT_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/scholar\.(bib|enw|ris|ral)\?").expect("valid regex"));
static TITLE_BADGES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*\[[A-Z]+\])+\s*").expect("valid regex"));
static YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid regex"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

const NO_RESULTS_NOTICE: &str = "did not match any articles";
const UNUSUAL_TRAFFIC_NOTICE: &str = "unusual traffic from your computer network";

/// What a fetched search page turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    /// A result list with this many `gs_r` entries, possibly none
    Results(usize),
    /// Scholar's "did not match any articles" notice and no entries
    NoResults,
    /// A CAPTCHA or "unusual traffic" interstitial instead of results
    Challenge(String),
    /// Neither results, a notice nor a challenge
    Unrecognized,
}

/// Outcome of parsing a single result entry
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Parsed(CitationRecord),
    Skipped(String),
}

/// Records extracted from a set of pages, in service rank order
#[derive(Debug, Clone, Default)]
pub struct ParsedResults {
    pub records: Vec<CitationRecord>,
    /// Entries dropped because they were malformed or not exportable
    pub skipped: usize,
}

/// Parse fetched pages into citation records, preserving rank order
///
/// A page whose entries all fail to parse contributes nothing. A page that
/// has neither entries nor a results pane is not a results page at all and
/// fails with [`SourceError::ServiceResponseUnrecognized`].
pub fn parse_pages(pages: Vec<ResultPage>) -> Result<ParsedResults, SourceError> {
    let mut results = ParsedResults::default();

    for page in pages {
        for (rank, outcome) in parse_page(&page)?.into_iter().enumerate() {
            match outcome {
                EntryOutcome::Parsed(record) => results.records.push(record),
                EntryOutcome::Skipped(reason) => {
                    tracing::debug!(page = page.index, rank, %reason, "Skipping result entry");
                    results.skipped += 1;
                }
            }
        }
    }

    if results.skipped > 0 {
        tracing::debug!(
            "Parsed {} records, skipped {} entries",
            results.records.len(),
            results.skipped
        );
    }

    Ok(results)
}

/// Parse one page into per-entry outcomes
pub fn parse_page(page: &ResultPage) -> Result<Vec<EntryOutcome>, SourceError> {
    let document = Html::parse_document(&page.body);
    let outcomes: Vec<EntryOutcome> = document.select(&ENTRY).map(|e| parse_entry(&e)).collect();

    if outcomes.is_empty() && classify(&document) == PageKind::Unrecognized {
        return Err(SourceError::ServiceResponseUnrecognized(format!(
            "page {} for \"{}\" has no result list",
            page.index, page.query
        )));
    }

    Ok(outcomes)
}

/// Parse a single `div.gs_r` entry
pub fn parse_entry(entry: &ElementRef) -> EntryOutcome {
    let Some(title) = entry
        .select(&TITLE)
        .next()
        .map(|h| clean_title(&element_text(&h)))
        .filter(|t| !t.is_empty())
    else {
        return EntryOutcome::Skipped("missing title".to_string());
    };

    let citation_id = entry
        .value()
        .attr("data-cid")
        .or_else(|| {
            entry
                .select(&TITLE_LINK)
                .next()
                .and_then(|a| a.value().attr("id"))
        })
        .map(str::trim)
        .filter(|id| !id.is_empty());

    let byline = entry
        .select(&BYLINE)
        .next()
        .map(|b| element_text(&b))
        .unwrap_or_default();
    let (authors, venue, year) = parse_byline(&byline);

    let snippet = entry
        .select(&SNIPPET)
        .next()
        .map(|s| element_text(&s))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| byline.clone());

    let mut builder = CitationRecordBuilder::new(title)
        .authors(authors)
        .raw_snippet(snippet);
    if let Some(id) = citation_id {
        builder = builder.citation_id(id);
    }
    if let Some(venue) = venue {
        builder = builder.venue(venue);
    }
    if let Some(year) = year {
        builder = builder.year(year);
    }
    for (format, href) in export_links(entry) {
        builder = builder.export_link(format, href);
    }

    let record = builder.build();
    if !record.is_exportable() {
        return EntryOutcome::Skipped(format!(
            "\"{}\" has no citation id",
            record.title
        ));
    }

    EntryOutcome::Parsed(record)
}

/// Extract export links from a cite popup
pub fn parse_cite_links(body: &str) -> BTreeMap<CitationFormat, String> {
    let fragment = Html::parse_fragment(body);
    export_links(&fragment.root_element())
}

/// Classify a search page before it is handed to [`parse_pages`]
///
/// Entries win over everything else, so text inside a result never turns a
/// results page into a notice or a challenge. A challenge is only reported
/// for a page without a results pane.
pub fn classify_page(body: &str) -> PageKind {
    classify(&Html::parse_document(body))
}

fn classify(document: &Html) -> PageKind {
    let entries = document.select(&ENTRY).count();
    if entries > 0 {
        return PageKind::Results(entries);
    }

    let notice = document
        .select(&NOTICE)
        .any(|n| element_text(&n).to_lowercase().contains(NO_RESULTS_NOTICE));
    if notice {
        return PageKind::NoResults;
    }
    if document.select(&RESULTS_PANE).next().is_some() {
        return PageKind::Results(0);
    }

    if let Some(form) = document.select(&CHALLENGE_FORM).next() {
        let element = form.value();
        let name = match element.id() {
            Some(id) => format!("#{}", id),
            None => format!(
                "{}.{}",
                element.name(),
                element.classes().collect::<Vec<_>>().join(".")
            ),
        };
        return PageKind::Challenge(format!("page shows a CAPTCHA ({})", name));
    }
    if element_text(&document.root_element())
        .to_lowercase()
        .contains(UNUSUAL_TRAFFIC_NOTICE)
    {
        return PageKind::Challenge("page reports unusual traffic".to_string());
    }

    PageKind::Unrecognized
}

fn export_links(element: &ElementRef) -> BTreeMap<CitationFormat, String> {
    let mut links = BTreeMap::new();
    for anchor in element.select(&LINKS) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let format = EXPORT_HREF
            .captures(href)
            .and_then(|caps| caps.get(1))
            .and_then(|ext| CitationFormat::from_extension(ext.as_str()));
        if let Some(format) = format {
            links.entry(format).or_insert_with(|| href.to_string());
        }
    }
    links
}

fn element_text(element: &ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_title(text: &str) -> String {
    TITLE_BADGES.replace(text, "").trim().to_string()
}

/// Split a byline shaped `authors - venue, year - host`
fn parse_byline(byline: &str) -> (Vec<String>, Option<String>, Option<String>) {
    let parts: Vec<&str> = byline.split(" - ").map(str::trim).collect();
    let Some(author_part) = parts.first().filter(|p| !p.is_empty()) else {
        return (Vec::new(), None, None);
    };

    let authors = author_part
        .split(',')
        .map(|a| a.trim().trim_end_matches('…').trim_end_matches("...").trim())
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect();

    let segment = match parts.len() {
        0 | 1 => None,
        2 => Some(parts[1].to_string()).filter(|p| YEAR.is_match(p)),
        n => Some(parts[1..n - 1].join(" - ")),
    };

    let Some(segment) = segment else {
        return (authors, None, None);
    };

    let year = YEAR.find_iter(&segment).last().map(|m| m.as_str().to_string());
    let venue = match YEAR.find_iter(&segment).last() {
        Some(m) if m.end() == segment.len() => &segment[..m.start()],
        _ => segment.as_str(),
    };
    let venue = venue.trim().trim_end_matches(',').trim();
    let venue = (!venue.is_empty()).then(|| venue.to_string());

    (authors, venue, year)
}
