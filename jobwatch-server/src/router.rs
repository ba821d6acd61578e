use crate::state::AppState;
use crate::subsystems::catalog::{self, ListJobsQuery};
use jobwatch_core::ipc::{JobwatchRequest, JobwatchResponse};
use jobwatch_ingest::{IngestionReport, IngestionRequest};

/// Overrides for one manual ingestion run; `None` keeps the service default.
#[derive(Debug, Clone, Default)]
pub struct IngestionOverrides {
    pub search_terms: Option<Vec<String>>,
    pub min_salary: Option<u32>,
    pub remote_only: Option<bool>,
    pub fulltime_only: Option<bool>,
    pub days_ago: Option<u32>,
}

impl IngestionOverrides {
    pub fn apply(self, defaults: &IngestionRequest) -> IngestionRequest {
        IngestionRequest {
            search_terms: self
                .search_terms
                .unwrap_or_else(|| defaults.search_terms.clone()),
            min_salary: self.min_salary.unwrap_or(defaults.min_salary),
            remote_only: self.remote_only.unwrap_or(defaults.remote_only),
            fulltime_only: self.fulltime_only.unwrap_or(defaults.fulltime_only),
            days_ago: self.days_ago.unwrap_or(defaults.days_ago),
        }
    }
}

pub fn report_json(report: &IngestionReport) -> serde_json::Value {
    serde_json::json!({
        "message": format!("Added {} new jobs", report.added_count),
        "added_count": report.added_count,
        "run_id": report.run_id,
        "terms": report.terms,
    })
}

pub async fn handle_request(request: JobwatchRequest, state: &AppState) -> JobwatchResponse {
    match request {
        JobwatchRequest::Ping => JobwatchResponse::pong(),
        JobwatchRequest::Health => match state.store.count().await {
            Ok(count) => JobwatchResponse::ok(serde_json::json!({
                "status": "healthy",
                "store": state.store.name(),
                "jobs": count,
                "ingestion_running": state.ingestion.is_running(),
            })),
            Err(e) => JobwatchResponse::err(format!("Store health check failed: {}", e)),
        },
        JobwatchRequest::ListJobs {
            query,
            min_salary,
            remote_only,
            fulltime_only,
            period_days,
        } => {
            let defaults = ListJobsQuery::default();
            let query = ListJobsQuery {
                query,
                min_salary: min_salary.unwrap_or(defaults.min_salary),
                remote_only: remote_only.unwrap_or(defaults.remote_only),
                fulltime_only: fulltime_only.unwrap_or(defaults.fulltime_only),
                period_days: period_days.unwrap_or(defaults.period_days),
            };
            match catalog::list_jobs(state.store.as_ref(), &query).await {
                Ok(jobs) => JobwatchResponse::ok(serde_json::json!({
                    "count": jobs.len(),
                    "jobs": jobs,
                })),
                Err(e) => JobwatchResponse::err(e.to_string()),
            }
        }
        JobwatchRequest::SearchTerms => JobwatchResponse::ok(serde_json::json!({
            "search_terms": catalog::list_default_search_terms(&state.config.ingestion),
        })),
        JobwatchRequest::TriggerIngestion {
            search_terms,
            min_salary,
            remote_only,
            fulltime_only,
            days_ago,
            wait,
        } => {
            let request = IngestionOverrides {
                search_terms,
                min_salary,
                remote_only,
                fulltime_only,
                days_ago,
            }
            .apply(state.ingestion.defaults());

            if wait {
                let report = state.ingestion.trigger(request).await;
                JobwatchResponse::ok(report_json(&report))
            } else {
                let terms = request.search_terms.clone();
                state.ingestion.spawn_trigger(request);
                JobwatchResponse::ok(serde_json::json!({
                    "accepted": true,
                    "message": "Ingestion started",
                    "search_terms": terms,
                }))
            }
        }
    }
}
