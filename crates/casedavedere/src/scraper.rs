use reqwest::{Client, StatusCode, redirect};

use crate::parser::parse_listing;
use crate::types::{PropertyRecord, SearchArea};

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Unexpected status {status} for {url}")]
    Status { status: StatusCode, url: String },
    #[error("Empty listing page: {0}")]
    EmptyPage(String),
}

/// Source of page bodies for the listing extractors.
pub trait PageFetcher {
    /// The body of `url` when the server answers 200, `None` otherwise.
    fn fetch(&self, url: &str) -> impl Future<Output = Option<String>>;
}

/// Search results page `page` (1-based) for `area` under `base_url`.
pub fn search_page_url(base_url: &str, area: &SearchArea, page: u32) -> String {
    format!("{}/vendita-case/{}/pag={}", base_url, area.slug(), page)
}

#[derive(Debug, Clone)]
pub struct WebScraper {
    client: Client,
    base_url: String,
}

impl WebScraper {
    pub fn new() -> Result<Self, ScraperError> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            base_url: crate::BASE_URL.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether the listing site's host name resolves at all.
    pub async fn resolve_host(&self) -> bool {
        match tokio::net::lookup_host((crate::HOST, 443)).await {
            Ok(mut addrs) => addrs.next().is_some(),
            Err(e) => {
                log::error!("Unable to resolve {}: {e}", crate::HOST);
                false
            }
        }
    }

    async fn get(&self, url: &str) -> Result<String, ScraperError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ScraperError::Status {
                status,
                url: url.to_string(),
            });
        }

        let html = response
            .text()
            .await
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?;
        Ok(html)
    }

    /// Fetches and extracts a single detail page, without any filtering.
    pub async fn fetch_listing(&self, url: &str) -> Result<PropertyRecord, ScraperError> {
        let html = self.get(url).await?;
        parse_listing(&html, url, "").ok_or_else(|| ScraperError::EmptyPage(url.to_string()))
    }
}

impl PageFetcher for WebScraper {
    async fn fetch(&self, url: &str) -> Option<String> {
        match self.get(url).await {
            Ok(html) => Some(html),
            Err(e) => {
                log::warn!("Skipping {}: {}", url, e);
                None
            }
        }
    }
}
