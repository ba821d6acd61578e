use jobwatch_core::config::IngestionConfig;
use serde::{Deserialize, Serialize};
use url::Url;

/// Query for a single search term, handed to every acquisition strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub term: String,
    pub min_salary: u32,
    pub remote_only: bool,
    pub fulltime_only: bool,
    pub days_ago: u32,
}

impl SearchParams {
    /// Recency window in days, never below one.
    pub fn window_days(&self) -> u32 {
        self.days_ago.max(1)
    }

    /// Provider query pairs in the order the search page expects them.
    /// Pairs whose value would be empty are omitted.
    pub fn provider_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("q", self.term.clone())];
        if self.remote_only {
            pairs.push(("l", "Remote".to_string()));
        }
        if self.fulltime_only {
            pairs.push(("jt", "fulltime".to_string()));
        }
        pairs.push(("fromage", self.window_days().to_string()));
        pairs.push(("sort", "date".to_string()));
        pairs.push(("salary", format!("${}", self.min_salary)));
        if self.remote_only {
            pairs.push(("remotejob", "true".to_string()));
        }
        pairs
    }

    /// Full search URL against `base_url`.
    pub fn search_url(&self, base_url: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(base_url)?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in self.provider_query() {
                query.append_pair(key, &value);
            }
        }
        Ok(url)
    }
}

/// One ingestion run over a set of search terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionRequest {
    pub search_terms: Vec<String>,
    pub min_salary: u32,
    pub remote_only: bool,
    pub fulltime_only: bool,
    pub days_ago: u32,
}

impl IngestionRequest {
    pub fn params_for(&self, term: &str) -> SearchParams {
        SearchParams {
            term: term.to_string(),
            min_salary: self.min_salary,
            remote_only: self.remote_only,
            fulltime_only: self.fulltime_only,
            days_ago: self.days_ago,
        }
    }
}

impl From<&IngestionConfig> for IngestionRequest {
    fn from(config: &IngestionConfig) -> Self {
        Self {
            search_terms: config.default_search_terms.clone(),
            min_salary: config.min_salary,
            remote_only: config.remote_only,
            fulltime_only: config.fulltime_only,
            days_ago: config.days_ago,
        }
    }
}
