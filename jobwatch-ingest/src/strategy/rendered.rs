//! Rendered-fetch strategy: JavaScript-rendered HTML from a rendering service.
//!
//! With `render_endpoint` configured the search URL is posted to a
//! browserless-style `/content` endpoint, which answers with the page HTML
//! after scripts ran. Without one the page is fetched as-is.

use std::time::Duration;

use async_trait::async_trait;
use jobwatch_core::config::ScrapingConfig;
use jobwatch_core::RawListing;
use serde::Serialize;
use url::Url;

use super::cards::parse_listing_cards;
use super::{browser_headers, random_user_agent, AcquisitionStrategy, DelayPolicy, StrategyError};
use crate::params::SearchParams;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderRequest<'a> {
    url: &'a str,
    wait_for_timeout: u64,
}

pub struct RenderedFetchStrategy {
    client: reqwest::Client,
    base_url: String,
    render_endpoint: Option<String>,
    render_wait_ms: u64,
    limit: usize,
    delay: DelayPolicy,
}

impl RenderedFetchStrategy {
    pub fn new(
        base_url: impl Into<String>,
        render_endpoint: Option<String>,
        timeout: Duration,
        limit: usize,
    ) -> Result<Self, StrategyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(browser_headers())
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            render_endpoint: render_endpoint.filter(|e| !e.trim().is_empty()),
            render_wait_ms: 3000,
            limit,
            delay: DelayPolicy::none(),
        })
    }

    pub fn from_config(config: &ScrapingConfig) -> Result<Self, StrategyError> {
        // The render service waits for scripts on its side; allow for it.
        let timeout = Duration::from_secs(config.request_timeout_secs)
            + Duration::from_millis(config.render_wait_ms);
        let mut strategy = Self::new(
            config.base_url.clone(),
            config.render_endpoint.clone(),
            timeout,
            config.max_listings_per_attempt,
        )?
        .with_delay(DelayPolicy::from(config));
        strategy.render_wait_ms = config.render_wait_ms;
        Ok(strategy)
    }

    pub fn with_delay(mut self, delay: DelayPolicy) -> Self {
        self.delay = delay;
        self
    }

    async fn fetch_html(&self, url: &Url) -> Result<String, StrategyError> {
        let request = match &self.render_endpoint {
            Some(endpoint) => self.client.post(endpoint).json(&RenderRequest {
                url: url.as_str(),
                wait_for_timeout: self.render_wait_ms,
            }),
            None => self.client.get(url.as_str()),
        };

        let response = request.header(reqwest::header::USER_AGENT, random_user_agent()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StrategyError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl AcquisitionStrategy for RenderedFetchStrategy {
    async fn attempt(
        &self,
        term: &str,
        query: &SearchParams,
    ) -> Result<Vec<RawListing>, StrategyError> {
        let url = query.search_url(&self.base_url)?;
        tracing::info!(
            term = term,
            url = %url,
            rendered = self.render_endpoint.is_some(),
            "Rendered fetch: accessing search page"
        );

        self.delay.pause().await;
        let html = self.fetch_html(&url).await?;
        Ok(parse_listing_cards(&html, &url, query, self.limit))
    }

    fn name(&self) -> &str {
        "rendered"
    }
}
