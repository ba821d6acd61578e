//! Catalog: read side of the job store.
//!
//! `min_salary` is carried through for compatibility but not applied: stored
//! salaries are free-form text ("$210,000 - $240,000 a year").

use chrono::{DateTime, Duration, Utc};
use jobwatch_core::config::IngestionConfig;
use jobwatch_core::{JobFilter, JobRecord, JobStore, StoreError};
use serde::Deserialize;

fn default_min_salary() -> u32 {
    200_000
}

fn default_true() -> bool {
    true
}

fn default_period_days() -> u32 {
    1
}

/// Filters for `list_jobs`, with the defaults of the public jobs endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ListJobsQuery {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default = "default_min_salary")]
    pub min_salary: u32,
    #[serde(default = "default_true")]
    pub remote_only: bool,
    #[serde(default = "default_true")]
    pub fulltime_only: bool,
    #[serde(default = "default_period_days", alias = "time_period")]
    pub period_days: u32,
}

impl Default for ListJobsQuery {
    fn default() -> Self {
        Self {
            query: None,
            min_salary: default_min_salary(),
            remote_only: true,
            fulltime_only: true,
            period_days: default_period_days(),
        }
    }
}

impl ListJobsQuery {
    pub fn to_filter(&self, now: DateTime<Utc>) -> JobFilter {
        JobFilter {
            posted_after: now
                .checked_sub_signed(Duration::days(i64::from(self.period_days)))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            title_contains: self
                .query
                .as_deref()
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(str::to_string),
            remote_only: self.remote_only,
            fulltime_only: self.fulltime_only,
        }
    }
}

/// Stored jobs matching `query`, newest first.
pub async fn list_jobs(store: &dyn JobStore, query: &ListJobsQuery) -> Result<Vec<JobRecord>, StoreError> {
    let filter = query.to_filter(Utc::now());
    let jobs = store.query(&filter).await?;
    tracing::debug!(
        query = ?query.query,
        period_days = query.period_days,
        count = jobs.len(),
        "Listed jobs"
    );
    Ok(jobs)
}

pub fn list_default_search_terms(config: &IngestionConfig) -> Vec<String> {
    config.default_search_terms.clone()
}
