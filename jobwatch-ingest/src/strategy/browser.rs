//! Browser-automation strategy: drives headless Chrome.
//!
//! `headless_chrome` is a blocking driver, so a whole session (launch,
//! navigate, wait for cards, read the DOM) runs on a blocking thread. The
//! rendered DOM goes through the same card parser as every other strategy.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use jobwatch_core::config::ScrapingConfig;
use jobwatch_core::RawListing;
use url::Url;

use super::cards::parse_listing_cards;
use super::{random_user_agent, AcquisitionStrategy, DelayPolicy, StrategyError};
use crate::params::SearchParams;

const CARD_SELECTOR: &str = ".job_seen_beacon";

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub chrome_path: Option<PathBuf>,
    pub page_load_timeout: Duration,
    pub element_wait: Duration,
    pub delay: DelayPolicy,
}

pub struct BrowserAutomationStrategy {
    base_url: String,
    settings: BrowserSettings,
    limit: usize,
}

impl BrowserAutomationStrategy {
    pub fn new(base_url: impl Into<String>, settings: BrowserSettings, limit: usize) -> Self {
        Self {
            base_url: base_url.into(),
            settings,
            limit,
        }
    }

    pub fn from_config(config: &ScrapingConfig) -> Self {
        Self::new(
            config.base_url.clone(),
            BrowserSettings {
                chrome_path: config.chrome_path.as_ref().map(PathBuf::from),
                page_load_timeout: Duration::from_secs(config.page_load_timeout_secs),
                element_wait: Duration::from_secs(config.element_wait_secs),
                delay: DelayPolicy::from(config),
            },
            config.max_listings_per_attempt,
        )
    }
}

fn browser_err(e: impl std::fmt::Display) -> StrategyError {
    StrategyError::Browser(e.to_string())
}

/// Launch Chrome, load `url`, wait for listing cards and return the page HTML.
fn fetch_rendered_dom(url: &Url, settings: &BrowserSettings) -> Result<String, StrategyError> {
    let args = [
        OsStr::new("--disable-blink-features=AutomationControlled"),
        OsStr::new("--disable-dev-shm-usage"),
    ];
    let options = LaunchOptions::default_builder()
        .headless(true)
        .sandbox(false)
        .path(settings.chrome_path.clone())
        .idle_browser_timeout(settings.page_load_timeout * 3)
        .args(args.to_vec())
        .build()
        .map_err(browser_err)?;

    let browser = Browser::new(options).map_err(browser_err)?;
    let tab = browser.new_tab().map_err(browser_err)?;
    let html = read_listing_page(&tab, url, settings);
    if let Err(e) = tab.close(true) {
        tracing::debug!(error = %e, "Failed to close browser tab");
    }
    html
}

fn read_listing_page(tab: &Tab, url: &Url, settings: &BrowserSettings) -> Result<String, StrategyError> {
    tab.set_default_timeout(settings.page_load_timeout);
    tab.set_user_agent(random_user_agent(), Some("en-US,en;q=0.5"), None)
        .map_err(browser_err)?;

    settings.delay.pause_blocking();

    tab.navigate_to(url.as_str())
        .and_then(|t| t.wait_until_navigated())
        .map_err(|e| StrategyError::Timeout(format!("page load: {}", e)))?;

    tab.wait_for_element_with_custom_timeout(CARD_SELECTOR, settings.element_wait)
        .map_err(|e| StrategyError::Timeout(format!("waiting for listing cards: {}", e)))?;

    settings.delay.pause_blocking();

    tab.get_content().map_err(browser_err)
}

#[async_trait]
impl AcquisitionStrategy for BrowserAutomationStrategy {
    async fn attempt(
        &self,
        term: &str,
        query: &SearchParams,
    ) -> Result<Vec<RawListing>, StrategyError> {
        let url = query.search_url(&self.base_url)?;
        tracing::info!(term = term, url = %url, "Browser: accessing search page");

        let settings = self.settings.clone();
        let query = query.clone();
        let limit = self.limit;

        tokio::task::spawn_blocking(move || {
            let html = fetch_rendered_dom(&url, &settings)?;
            Ok(parse_listing_cards(&html, &url, &query, limit))
        })
        .await
        .map_err(|e| StrategyError::Browser(format!("browser task aborted: {}", e)))?
    }

    fn name(&self) -> &str {
        "browser"
    }
}
