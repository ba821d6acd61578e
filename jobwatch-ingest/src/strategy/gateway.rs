//! Gateway-routed strategy: plain HTTP through rotating egress gateways.
//!
//! Each request leaves through the next configured gateway (an HTTP proxy),
//! round-robin, with a browser-like header set and a random user agent.
//! A failed request is retried through the next gateway with jittered backoff.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use jobwatch_core::config::ScrapingConfig;
use jobwatch_core::RawListing;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use url::Url;

use super::cards::parse_listing_cards;
use super::{browser_headers, random_user_agent, AcquisitionStrategy, DelayPolicy, StrategyError};
use crate::params::SearchParams;

pub struct GatewayRoutedStrategy {
    base_url: String,
    gateways: Vec<String>,
    next_gateway: AtomicUsize,
    attempts: usize,
    timeout: Duration,
    limit: usize,
    delay: DelayPolicy,
}

impl GatewayRoutedStrategy {
    pub fn new(
        base_url: impl Into<String>,
        gateways: Vec<String>,
        timeout: Duration,
        limit: usize,
    ) -> Result<Self, StrategyError> {
        for gateway in &gateways {
            reqwest::Proxy::all(gateway.as_str()).map_err(|e| {
                StrategyError::Unavailable(format!("invalid gateway {}: {}", gateway, e))
            })?;
        }

        Ok(Self {
            base_url: base_url.into(),
            gateways,
            next_gateway: AtomicUsize::new(0),
            attempts: 2,
            timeout,
            limit,
            delay: DelayPolicy::none(),
        })
    }

    pub fn from_config(config: &ScrapingConfig) -> Result<Self, StrategyError> {
        Ok(Self::new(
            config.base_url.clone(),
            config.gateway_endpoints.clone(),
            Duration::from_secs(config.request_timeout_secs),
            config.max_listings_per_attempt,
        )?
        .with_attempts(config.gateway_attempts)
        .with_delay(DelayPolicy::from(config)))
    }

    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn with_delay(mut self, delay: DelayPolicy) -> Self {
        self.delay = delay;
        self
    }

    fn next_gateway(&self) -> &str {
        let i = self.next_gateway.fetch_add(1, Ordering::Relaxed) % self.gateways.len();
        &self.gateways[i]
    }

    async fn fetch_once(&self, url: &Url) -> Result<String, StrategyError> {
        let gateway = self.next_gateway();
        let proxy = reqwest::Proxy::all(gateway)
            .map_err(|e| StrategyError::Unavailable(format!("invalid gateway {}: {}", gateway, e)))?;

        let client = reqwest::Client::builder()
            .proxy(proxy)
            .timeout(self.timeout)
            .user_agent(random_user_agent())
            .default_headers(browser_headers())
            .build()?;

        tracing::debug!(gateway = gateway, url = %url, "Gateway: fetching search page");

        let response = client.get(url.as_str()).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(gateway = gateway, status = status.as_u16(), "Gateway: non-success status");
            return Err(StrategyError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl AcquisitionStrategy for GatewayRoutedStrategy {
    async fn attempt(
        &self,
        term: &str,
        query: &SearchParams,
    ) -> Result<Vec<RawListing>, StrategyError> {
        if self.gateways.is_empty() {
            return Err(StrategyError::Unavailable(
                "no egress gateways configured".to_string(),
            ));
        }

        let url = query.search_url(&self.base_url)?;
        tracing::info!(term = term, url = %url, "Gateway: accessing search page");

        self.delay.pause().await;

        let retry_strategy = ExponentialBackoff::from_millis(250)
            .max_delay(Duration::from_secs(5))
            .map(jitter)
            .take(self.attempts - 1);

        let html = Retry::spawn(retry_strategy, || self.fetch_once(&url)).await?;
        Ok(parse_listing_cards(&html, &url, query, self.limit))
    }

    fn name(&self) -> &str {
        "gateway"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::cards::fixtures::page_of;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params() -> SearchParams {
        SearchParams {
            term: "DevOps".to_string(),
            min_salary: 200_000,
            remote_only: true,
            fulltime_only: true,
            days_ago: 1,
        }
    }

    #[tokio::test]
    async fn test_no_gateways_is_unavailable() {
        let strategy = GatewayRoutedStrategy::new(
            "https://www.indeed.com/jobs",
            Vec::new(),
            Duration::from_secs(1),
            10,
        )
        .unwrap();

        let result = strategy.attempt("DevOps", &params()).await;
        assert!(matches!(result, Err(StrategyError::Unavailable(_))));
    }

    #[test]
    fn test_invalid_gateway_rejected() {
        let result = GatewayRoutedStrategy::new(
            "https://www.indeed.com/jobs",
            vec!["not a url".to_string()],
            Duration::from_secs(1),
            10,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_gateways_rotate_round_robin() {
        let strategy = GatewayRoutedStrategy::new(
            "https://www.indeed.com/jobs",
            vec!["http://gw-a:8080".to_string(), "http://gw-b:8080".to_string()],
            Duration::from_secs(1),
            10,
        )
        .unwrap();

        let picked: Vec<String> = (0..4).map(|_| strategy.next_gateway().to_string()).collect();
        assert_eq!(
            picked,
            vec!["http://gw-a:8080", "http://gw-b:8080", "http://gw-a:8080", "http://gw-b:8080"]
        );
    }

    #[tokio::test]
    async fn test_fetches_through_gateway_and_caps_batch() {
        let gateway = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/jobs"))
            .and(query_param("q", "DevOps"))
            .and(query_param("remotejob", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page_of(12)))
            .mount(&gateway)
            .await;

        let strategy = GatewayRoutedStrategy::new(
            format!("{}/jobs", gateway.uri()),
            vec![gateway.uri()],
            Duration::from_secs(5),
            10,
        )
        .unwrap();

        let listings = strategy.attempt("DevOps", &params()).await.unwrap();
        assert_eq!(listings.len(), 10);
        assert_eq!(listings[0].company, "JetCode");
    }

    #[tokio::test]
    async fn test_blocked_response_is_failure_after_retries() {
        let gateway = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .expect(2)
            .mount(&gateway)
            .await;

        let strategy = GatewayRoutedStrategy::new(
            format!("{}/jobs", gateway.uri()),
            vec![gateway.uri()],
            Duration::from_secs(5),
            10,
        )
        .unwrap()
        .with_attempts(2);

        let result = strategy.attempt("DevOps", &params()).await;
        match result {
            Err(StrategyError::Status { status, .. }) => assert_eq!(status, 403),
            other => panic!("Expected Status error, got {:?}", other.map(|l| l.len())),
        }
    }
}
