//! HTTP page source for the crawler in `wordindex-core`.

pub mod html;

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header;
use scraper::Html;
use url::Url;
use wordindex_core::tokenizer::parse_words;
use wordindex_core::{FetchedPage, PageFetcher, Result, SearchError};

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_redirects: usize,
    /// Larger bodies are treated as a failed fetch.
    pub max_body_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("wordindex/", env!("CARGO_PKG_VERSION")).to_owned(),
            timeout: Duration::from_secs(12),
            max_redirects: 5,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// Fetches HTML over HTTP(S) and reduces it to words and links.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> std::result::Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, max_body_bytes: config.max_body_bytes })
    }

    fn fetch_html(&self, url: &str) -> Result<(Url, String)> {
        let parsed = Url::parse(url).map_err(|err| fetch_error(url, err))?;
        let resp = self.client.get(parsed).send().map_err(|err| fetch_error(url, err))?;

        if !resp.status().is_success() {
            return Err(fetch_error(url, format!("status {}", resp.status())));
        }
        if let Some(content_type) = resp.headers().get(header::CONTENT_TYPE) {
            if let Ok(value) = content_type.to_str() {
                if !value.starts_with("text/html") {
                    return Err(fetch_error(url, format!("unsupported content type {value}")));
                }
            }
        }

        let final_url = resp.url().clone();
        let bytes = resp.bytes().map_err(|err| fetch_error(url, err))?;
        if bytes.len() > self.max_body_bytes {
            return Err(fetch_error(url, format!("body of {} bytes exceeds limit", bytes.len())));
        }
        Ok((final_url, String::from_utf8_lossy(&bytes).into_owned()))
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let (base, body) = self.fetch_html(url)?;
        let document = Html::parse_document(&body);
        let words = parse_words(&html::extract_text(&document));
        let links = html::extract_links(&document, &base);
        tracing::debug!(url, words = words.len(), links = links.len(), "fetched page");
        Ok(FetchedPage { words, links })
    }
}

fn fetch_error(url: &str, reason: impl ToString) -> SearchError {
    SearchError::Fetch { url: url.to_owned(), reason: reason.to_string() }
}
