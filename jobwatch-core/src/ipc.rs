use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum JobwatchRequest {
    Ping,
    Health,
    ListJobs {
        #[serde(default)]
        query: Option<String>,
        #[serde(default)]
        min_salary: Option<u32>,
        #[serde(default)]
        remote_only: Option<bool>,
        #[serde(default)]
        fulltime_only: Option<bool>,
        #[serde(default)]
        period_days: Option<u32>,
    },
    SearchTerms,
    TriggerIngestion {
        #[serde(default)]
        search_terms: Option<Vec<String>>,
        #[serde(default)]
        min_salary: Option<u32>,
        #[serde(default)]
        remote_only: Option<bool>,
        #[serde(default)]
        fulltime_only: Option<bool>,
        #[serde(default)]
        days_ago: Option<u32>,
        /// Wait for the run to finish and report `added_count`.
        #[serde(default)]
        wait: bool,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct JobwatchResponse {
    pub status: String,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub version: String,
}

impl JobwatchResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(serde_json::json!({"pong": true}))
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
