use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical, persisted job listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobRecord {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub description: Option<String>,
    pub url: String,
    pub date_posted: DateTime<Utc>,
    pub date_found: DateTime<Utc>,
    pub is_remote: bool,
    pub is_fulltime: bool,
}

/// One listing as acquired from a source, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub description: Option<String>,
    pub url: String,
    pub date_posted: DateTime<Utc>,
}

/// Location text mentions remote work (case-insensitive).
pub fn location_is_remote(location: &str) -> bool {
    location.to_lowercase().contains("remote")
}
