//! Google Scholar client.
//!
//! Google Scholar does not have an official public API. The client fetches
//! the regular HTML result pages with a browser-like identity, stops at the
//! first sign of an automation challenge, and leaves markup parsing to
//! [`crate::sources::parser`].

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, COOKIE};
use reqwest::StatusCode;
use url::Url;

use crate::config::Config;
use crate::models::{CitationFormat, ResultPage};
use crate::sources::parser::{self, PageKind};
use crate::sources::{ScholarSource, SourceError};
use crate::utils::{with_retry, HttpClient, RetryConfig};

const RESULTS_PER_PAGE: usize = 10;

/// Google Scholar search client
#[derive(Debug, Clone)]
pub struct ScholarClient {
    client: HttpClient,
    base_url: Url,
    language: String,
    pages: usize,
    retry: RetryConfig,
}

impl ScholarClient {
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let base_url = Url::parse(&config.scholar.base_url)
            .map_err(|e| SourceError::InvalidUrl(format!("{}: {}", config.scholar.base_url, e)))?;

        Ok(Self {
            client: HttpClient::new(&config.scholar, &config.network)?,
            base_url,
            language: config.scholar.language.clone(),
            pages: config.scholar.pages.max(1),
            retry: config.retry_config(),
        })
    }

    fn search_url(&self, query: &str, page: usize) -> String {
        let mut url = self.endpoint("scholar");
        url.query_pairs_mut()
            .append_pair("hl", &self.language)
            .append_pair("q", query);
        if page > 0 {
            url.query_pairs_mut()
                .append_pair("start", &(page * RESULTS_PER_PAGE).to_string());
        }
        url.to_string()
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(path);
        url.set_query(None);
        url
    }

    /// Resolve a possibly relative link against the service base URL
    fn absolute_url(&self, link: &str) -> Result<Url, SourceError> {
        self.base_url
            .join(link)
            .map_err(|e| SourceError::InvalidUrl(format!("{}: {}", link, e)))
    }

    /// GET a page with retry, classifying redirect and rate-limit challenges
    /// and HTTP failures. Bodies are returned untouched.
    async fn get_text(&self, url: &str, format: CitationFormat) -> Result<String, SourceError> {
        let cookie = format!("GSP=CF={}", format.preference_code());

        with_retry(self.retry, || {
            let client = self.client.clone();
            let cookie = cookie.clone();
            let language = self.language.clone();
            async move {
                tracing::debug!("GET {}", url);
                let response = client
                    .get(url)
                    .header(COOKIE, cookie)
                    .header(ACCEPT, "text/html,application/xhtml+xml,text/plain;q=0.9,*/*;q=0.8")
                    .header(ACCEPT_LANGUAGE, language)
                    .send()
                    .await
                    .map_err(|e| network_error(url, e))?;

                let status = response.status();
                let final_url = response.url().clone();

                if final_url.path().starts_with("/sorry") {
                    return Err(SourceError::ServiceChallenge(format!(
                        "redirected to {}",
                        final_url.path()
                    )));
                }
                if status == StatusCode::TOO_MANY_REQUESTS {
                    return Err(SourceError::ServiceChallenge(
                        "HTTP 429 Too Many Requests".to_string(),
                    ));
                }

                let body = response.text().await.map_err(|e| network_error(url, e))?;

                if !status.is_success() {
                    return Err(SourceError::Http {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }

                Ok(body)
            }
        })
        .await
    }
}

#[async_trait]
impl ScholarSource for ScholarClient {
    fn name(&self) -> &str {
        "Google Scholar"
    }

    async fn search(
        &self,
        query: &str,
        format: CitationFormat,
    ) -> Result<Vec<ResultPage>, SourceError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SourceError::InvalidQuery(
                "search terms are empty".to_string(),
            ));
        }

        let mut pages = Vec::new();
        for index in 0..self.pages {
            let url = self.search_url(query, index);
            let body = self.get_text(&url, format).await?;

            match parser::classify_page(&body) {
                PageKind::Challenge(reason) => return Err(SourceError::ServiceChallenge(reason)),
                PageKind::NoResults => {
                    tracing::debug!("Scholar reports no matches for \"{}\" on page {}", query, index);
                    break;
                }
                PageKind::Results(entries) if entries > 0 => {
                    pages.push(ResultPage::new(body, query, index));
                }
                PageKind::Results(_) | PageKind::Unrecognized => {
                    pages.push(ResultPage::new(body, query, index));
                    break;
                }
            }
        }

        Ok(pages)
    }

    async fn fetch(&self, url: &str, format: CitationFormat) -> Result<String, SourceError> {
        let url = self.absolute_url(url)?;
        self.get_text(url.as_str(), format).await
    }

    fn cite_url(&self, citation_id: &str) -> String {
        let mut url = self.endpoint("scholar");
        url.query_pairs_mut()
            .append_pair("q", &format!("info:{}:scholar.google.com/", citation_id))
            .append_pair("output", "cite")
            .append_pair("scirp", "0")
            .append_pair("hl", &self.language);
        url.to_string()
    }
}

fn network_error(url: &str, err: reqwest::Error) -> SourceError {
    match SourceError::from(err) {
        SourceError::Network(msg) => SourceError::Network(format!("{}: {}", url, msg)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS: &str = r#"<html><body><div id="gs_res_ccl_mid">
        <div class="gs_r gs_or gs_scl" data-cid="abc123">
          <h3 class="gs_rt"><a id="abc123" href="/paper">Attention is All you Need</a></h3>
          <div class="gs_a">A Vaswani, N Shazeer - Advances in neural information processing systems, 2017 - neurips.cc</div>
        </div></div></body></html>"#;

    fn client_for(server: &mockito::Server, pages: usize) -> ScholarClient {
        let mut config = Config::default();
        config.scholar.base_url = server.url();
        config.scholar.pages = pages;
        config.retry.max_attempts = 3;
        config.retry.initial_delay_ms = 5;
        config.retry.max_delay_ms = 10;
        config.network.request_timeout_secs = 5;
        ScholarClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_search_sends_identity_and_format_cookie() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/scholar")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("q".into(), "attention is all you need".into()),
                mockito::Matcher::UrlEncoded("hl".into(), "en".into()),
            ]))
            .match_header("cookie", "GSP=CF=4")
            .match_header("user-agent", mockito::Matcher::Regex("Firefox".into()))
            .with_status(200)
            .with_body(RESULTS)
            .create_async()
            .await;

        let client = client_for(&server, 1);
        let pages = client
            .search("  attention is all you need ", CitationFormat::Bibtex)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].index, 0);
        assert_eq!(pages[0].query, "attention is all you need");
    }

    #[tokio::test]
    async fn test_empty_query_is_rejected() {
        let server = mockito::Server::new_async().await;
        let client = client_for(&server, 1);
        let result = client.search("   ", CitationFormat::Bibtex).await;
        assert!(matches!(result, Err(SourceError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_no_results_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/scholar")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"<div id="gs_res_ccl_mid"><div class="gs_med"><p>Your search - <b>zzqx</b> - did not match any articles.</p></div></div>"#)
            .create_async()
            .await;

        let client = client_for(&server, 3);
        let pages = client.search("zzqx", CitationFormat::Bibtex).await.unwrap();
        assert!(pages.is_empty());
    }

    #[tokio::test]
    async fn test_captcha_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/scholar")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"<form id="gs_captcha_f"><div class="g-recaptcha"></div></form>"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server, 1);
        let result = client.search("transformers", CitationFormat::Bibtex).await;

        assert!(matches!(result, Err(SourceError::ServiceChallenge(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_too_many_requests_is_a_challenge() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/scholar")
            .match_query(mockito::Matcher::Any)
            .with_status(429)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server, 1);
        let result = client.search("transformers", CitationFormat::Bibtex).await;

        assert!(matches!(result, Err(SourceError::ServiceChallenge(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/scholar")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = client_for(&server, 1);
        let result = client.search("transformers", CitationFormat::Bibtex).await;

        assert!(matches!(result, Err(SourceError::Http { status: 503, .. })));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/scholar")
            .match_query(mockito::Matcher::Any)
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server, 1);
        let result = client.search("transformers", CitationFormat::Bibtex).await;

        assert!(matches!(result, Err(SourceError::Http { status: 404, .. })));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_resolves_relative_links() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/scholar.bib")
            .match_query(mockito::Matcher::UrlEncoded("q".into(), "info:abc123:scholar.google.com/".into()))
            .with_status(200)
            .with_body("@article{vaswani2017attention,\n  title={Attention is all you need}\n}\n")
            .create_async()
            .await;

        let client = client_for(&server, 1);
        let body = client
            .fetch("/scholar.bib?q=info:abc123:scholar.google.com/", CitationFormat::Bibtex)
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(body.starts_with("@article{vaswani2017attention"));
    }

    #[test]
    fn test_cite_url() {
        let config = Config::default();
        let client = ScholarClient::new(&config).unwrap();
        let url = client.cite_url("abc123");
        assert!(url.starts_with("https://scholar.google.com/scholar?q=info%3Aabc123%3Ascholar.google.com%2F"));
        assert!(url.contains("output=cite"));
    }

    #[test]
    fn test_search_url_paging() {
        let client = ScholarClient::new(&Config::default()).unwrap();
        assert!(!client.search_url("deep learning", 0).contains("start="));
        assert!(client.search_url("deep learning", 2).ends_with("start=20"));
        assert!(client.search_url("deep learning", 0).contains("q=deep+learning"));
    }

    #[tokio::test]
    async fn test_sorry_redirect_is_a_challenge() {
        let mut server = mockito::Server::new_async().await;
        let search = server
            .mock("GET", "/scholar")
            .match_query(mockito::Matcher::Any)
            .with_status(302)
            .with_header("location", "/sorry/index?continue=scholar")
            .expect(1)
            .create_async()
            .await;
        let sorry = server
            .mock("GET", "/sorry/index")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("<html><body>Please type the characters below</body></html>")
            .create_async()
            .await;

        let client = client_for(&server, 1);
        let result = client.search("transformers", CitationFormat::Bibtex).await;

        assert!(matches!(result, Err(SourceError::ServiceChallenge(ref reason)) if reason.contains("/sorry")));
        search.assert_async().await;
        sorry.assert_async().await;
    }

    #[tokio::test]
    async fn test_results_echoing_recaptcha_query_are_not_a_challenge() {
        let body = r#"<html><body>
            <form id="gs_hdr_frm"><input name="q" value="recaptcha"></form>
            <div id="gs_res_ccl_mid"><div class="gs_r gs_or gs_scl" data-cid="rc1">
              <h3 class="gs_rt"><a id="rc1">reCAPTCHA: Human-based character recognition via web security measures</a></h3>
              <div class="gs_a">L Von Ahn, B Maurer - Science, 2008 - science.org</div>
            </div></div></body></html>"#;
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/scholar")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let client = client_for(&server, 1);
        let pages = client.search("recaptcha", CitationFormat::Bibtex).await.unwrap();
        assert_eq!(pages.len(), 1);
    }

    #[tokio::test]
    async fn test_entry_snippet_with_notice_text_is_a_results_page() {
        let body = r#"<html><body><div id="gs_res_ccl_mid">
            <div class="gs_r gs_or gs_scl" data-cid="abc">
              <h3 class="gs_rt"><a id="abc">Empty result sets in academic search</a></h3>
              <div class="gs_rs">Queries that did not match any articles were logged.</div>
            </div></div></body></html>"#;
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/scholar")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let client = client_for(&server, 1);
        let pages = client.search("empty result sets", CitationFormat::Bibtex).await.unwrap();
        assert_eq!(pages.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_returns_export_mentioning_recaptcha() {
        let bibtex = "@inproceedings{von2008recaptcha,\n  title={reCAPTCHA: Human-based character recognition via web security measures},\n  note={g-recaptcha, unusual traffic from your computer network}\n}\n";
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/scholar.bib")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(bibtex)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server, 1);
        let body = client
            .fetch("/scholar.bib?q=info:rc1:scholar.google.com/", CitationFormat::Bibtex)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(body, bibtex);
    }
}
