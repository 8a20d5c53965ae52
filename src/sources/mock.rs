//! Mock source for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::{CitationFormat, ResultPage};
use crate::sources::{ScholarSource, SourceError};

/// A mock source that serves predefined result pages and export documents
/// and records every request it receives.
#[derive(Debug, Default)]
pub struct MockScholar {
    pages: Mutex<Vec<String>>,
    documents: Mutex<HashMap<String, String>>,
    searches: Mutex<Vec<String>>,
    fetches: Mutex<Vec<String>>,
}

impl MockScholar {
    /// Create a new mock source with no results.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a result page returned by every search, in order.
    pub fn with_page(self, body: impl Into<String>) -> Self {
        lock(&self.pages).push(body.into());
        self
    }

    /// Serve `body` for fetches of `url`.
    pub fn with_document(self, url: impl Into<String>, body: impl Into<String>) -> Self {
        lock(&self.documents).insert(url.into(), body.into());
        self
    }

    /// Queries received so far.
    pub fn searches(&self) -> Vec<String> {
        lock(&self.searches).clone()
    }

    /// URLs fetched so far.
    pub fn fetches(&self) -> Vec<String> {
        lock(&self.fetches).clone()
    }

    /// Total number of requests received.
    pub fn request_count(&self) -> usize {
        lock(&self.searches).len() + lock(&self.fetches).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ScholarSource for MockScholar {
    fn name(&self) -> &str {
        "Mock Scholar"
    }

    async fn search(
        &self,
        query: &str,
        _format: CitationFormat,
    ) -> Result<Vec<ResultPage>, SourceError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SourceError::InvalidQuery(
                "search terms are empty".to_string(),
            ));
        }
        lock(&self.searches).push(query.to_string());

        Ok(lock(&self.pages)
            .iter()
            .enumerate()
            .map(|(index, body)| ResultPage::new(body.clone(), query, index))
            .collect())
    }

    async fn fetch(&self, url: &str, _format: CitationFormat) -> Result<String, SourceError> {
        lock(&self.fetches).push(url.to_string());
        lock(&self.documents)
            .get(url)
            .cloned()
            .ok_or_else(|| SourceError::Http {
                status: 404,
                url: url.to_string(),
            })
    }

    fn cite_url(&self, citation_id: &str) -> String {
        format!("mock://cite/{}", citation_id)
    }
}

/// Build a minimal results page with one entry per `(citation id, title)` pair.
pub fn results_page(entries: &[(&str, &str)]) -> String {
    let mut body = String::from(r#"<html><body><div id="gs_res_ccl_mid">"#);
    for (cid, title) in entries {
        body.push_str(&format!(
            r#"<div class="gs_r gs_or gs_scl" data-cid="{cid}"><div class="gs_ri"><h3 class="gs_rt"><a id="{cid}" href="https://example.com/{cid}">{title}</a></h3><div class="gs_a">A Author, B Author - Journal of Tests, 2020 - example.com</div></div></div>"#
        ));
    }
    body.push_str("</div></body></html>");
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_requests() {
        let mock = MockScholar::new()
            .with_page(results_page(&[("abc123", "A title")]))
            .with_document("mock://cite/abc123", "popup");

        let pages = tokio_test::block_on(mock.search("a query", CitationFormat::Bibtex)).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].body.contains("data-cid=\"abc123\""));

        let body = tokio_test::block_on(mock.fetch("mock://cite/abc123", CitationFormat::Bibtex));
        assert_eq!(body.unwrap(), "popup");

        let missing = tokio_test::block_on(mock.fetch("mock://nope", CitationFormat::Bibtex));
        assert!(matches!(missing, Err(SourceError::Http { status: 404, .. })));

        assert_eq!(mock.searches(), vec!["a query"]);
        assert_eq!(mock.request_count(), 3);
    }
}
