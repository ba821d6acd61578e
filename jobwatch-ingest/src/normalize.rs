//! Listing Normalizer: RawListing to JobRecord.

use chrono::Utc;
use jobwatch_core::models::job::location_is_remote;
use jobwatch_core::{JobRecord, RawListing};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Hex characters kept from the identity digest.
pub const JOB_ID_LEN: usize = 16;

const UNSPECIFIED_LOCATION: &str = "Unspecified";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("listing has no {0}")]
    MissingField(&'static str),
}

/// Identity over `title-company-salt`, truncated to `JOB_ID_LEN` hex chars.
pub fn derive_job_id(title: &str, company: &str, salt: &str) -> String {
    let digest = Sha256::digest(format!("{}-{}-{}", title, company, salt).as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(JOB_ID_LEN);
    id
}

/// Normalizes listings for one search request.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    fulltime_only: bool,
    min_salary: u32,
}

impl Normalizer {
    pub fn new(fulltime_only: bool, min_salary: u32) -> Self {
        Self {
            fulltime_only,
            min_salary,
        }
    }

    pub fn normalize(&self, raw: RawListing, salt: &str) -> Result<JobRecord, NormalizeError> {
        let title = raw.title.trim().to_string();
        let company = raw.company.trim().to_string();
        if title.is_empty() {
            return Err(NormalizeError::MissingField("title"));
        }
        if company.is_empty() {
            return Err(NormalizeError::MissingField("company"));
        }

        let location = match raw.location.trim() {
            "" => UNSPECIFIED_LOCATION.to_string(),
            l => l.to_string(),
        };

        let salary = non_blank(raw.salary).unwrap_or_else(|| format!("${}+ /year", self.min_salary));
        let description = non_blank(raw.description)
            .unwrap_or_else(|| format!("Job description for {} at {}", title, company));

        Ok(JobRecord {
            id: derive_job_id(&title, &company, salt),
            is_remote: location_is_remote(&location),
            is_fulltime: self.fulltime_only,
            title,
            company,
            location,
            salary: Some(salary),
            description: Some(description),
            url: raw.url,
            date_posted: raw.date_posted,
            date_found: Utc::now(),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
