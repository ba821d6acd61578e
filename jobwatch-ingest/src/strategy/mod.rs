//! Acquisition strategies: pluggable ways of turning a search term into raw
//! listings.
//!
//! Every strategy honours the same contract: a term plus `SearchParams` in,
//! either a bounded batch of `RawListing`s or a `StrategyError` out. Internal
//! failures never escape as anything else, which is what lets the pipeline
//! move on to the next strategy in line.
//!
//! Built-in variants, in their default priority order:
//! - `browser`: headless Chrome (most reliable, slowest)
//! - `gateway`: HTTP through rotating egress gateways
//! - `rendered`: JS rendering service, or a bare fetch (fastest, least reliable)

pub mod browser;
pub mod cards;
pub mod gateway;
pub mod rendered;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jobwatch_core::config::ScrapingConfig;
use jobwatch_core::RawListing;
use rand::seq::IndexedRandom;
use rand::Rng;
use thiserror::Error;

use crate::params::SearchParams;

pub use browser::BrowserAutomationStrategy;
pub use gateway::GatewayRoutedStrategy;
pub use rendered::RenderedFetchStrategy;

#[async_trait]
pub trait AcquisitionStrategy: Send + Sync {
    /// Fetch and parse up to the strategy's batch cap of listings for `term`.
    async fn attempt(&self, term: &str, query: &SearchParams)
        -> Result<Vec<RawListing>, StrategyError>;

    /// Strategy name for logging and run reports.
    fn name(&self) -> &str;
}

#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("network error: {0}")]
    Network(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("strategy unavailable: {0}")]
    Unavailable(String),

    #[error("strategy {0}")]
    Panicked(String),
}

impl From<reqwest::Error> for StrategyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StrategyError::Timeout(e.to_string())
        } else if let Some(status) = e.status() {
            StrategyError::Status {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            StrategyError::Network(e.to_string())
        }
    }
}

impl From<url::ParseError> for StrategyError {
    fn from(e: url::ParseError) -> Self {
        StrategyError::Parse(format!("invalid search URL: {}", e))
    }
}

// ============================================================================
// Delay policy
// ============================================================================

/// Randomized pause between simulated-interaction steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayPolicy {
    pub min: Duration,
    pub max: Duration,
}

impl DelayPolicy {
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min: Duration::from_millis(min_ms),
            max: Duration::from_millis(max_ms.max(min_ms)),
        }
    }

    pub fn none() -> Self {
        Self::new(0, 0)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let ms = rng.random_range(self.min.as_millis() as u64..=self.max.as_millis() as u64);
        Duration::from_millis(ms)
    }

    pub async fn pause(&self) {
        let delay = self.sample(&mut rand::rng());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    /// Blocking variant for strategies that run on a blocking thread.
    pub fn pause_blocking(&self) {
        let delay = self.sample(&mut rand::rng());
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

impl From<&ScrapingConfig> for DelayPolicy {
    fn from(config: &ScrapingConfig) -> Self {
        Self::new(config.min_delay_ms, config.max_delay_ms)
    }
}

// ============================================================================
// Browser-like request identity
// ============================================================================

const USER_AGENTS: [&str; 6] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Headers a desktop browser sends on a top-level navigation.
pub fn browser_headers() -> reqwest::header::HeaderMap {
    use reqwest::header::{HeaderMap, HeaderValue};

    let mut headers = HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.5"),
    );
    headers.insert(
        reqwest::header::REFERER,
        HeaderValue::from_static("https://www.google.com/"),
    );
    headers.insert(reqwest::header::DNT, HeaderValue::from_static("1"));
    headers.insert(
        reqwest::header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers
}

// ============================================================================
// Factory
// ============================================================================

/// Build the strategy chain in the configured priority order.
/// Unknown names are logged and skipped.
pub fn build_strategies(config: &ScrapingConfig) -> Vec<Arc<dyn AcquisitionStrategy>> {
    let mut strategies: Vec<Arc<dyn AcquisitionStrategy>> = Vec::new();

    for name in &config.strategies {
        match name.as_str() {
            "browser" => strategies.push(Arc::new(BrowserAutomationStrategy::from_config(config))),
            "gateway" => match GatewayRoutedStrategy::from_config(config) {
                Ok(s) => strategies.push(Arc::new(s)),
                Err(e) => tracing::warn!(error = %e, "Gateway strategy disabled"),
            },
            "rendered" => match RenderedFetchStrategy::from_config(config) {
                Ok(s) => strategies.push(Arc::new(s)),
                Err(e) => tracing::warn!(error = %e, "Rendered-fetch strategy disabled"),
            },
            other => tracing::warn!(strategy = other, "Unknown acquisition strategy, skipping"),
        }
    }

    tracing::info!(
        strategies = ?strategies.iter().map(|s| s.name().to_string()).collect::<Vec<_>>(),
        "Acquisition strategy chain built"
    );
    strategies
}
