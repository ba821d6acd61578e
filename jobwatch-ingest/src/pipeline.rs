//! Ingestion pipeline: acquire, normalize, dedup, commit.
//!
//! Terms are processed one after another. Within a term the first strategy
//! that returns a non-empty batch wins; if none does, the fallback generator
//! fills in. New records from every term are staged and committed to the
//! store in one batch at the end of the run.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use jobwatch_core::{JobRecord, JobStore, RawListing, StoreError};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::fallback::FallbackGenerator;
use crate::normalize::Normalizer;
use crate::params::{IngestionRequest, SearchParams};
use crate::strategy::{AcquisitionStrategy, StrategyError};

pub use jobwatch_core::config::IdentitySalt;

const FALLBACK_SOURCE: &str = "fallback";
const NONCE_MIN: usize = 1000;
const NONCE_SPAN: usize = 9000;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

/// What happened to one search term during a run.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TermOutcome {
    pub term: String,
    /// Strategy name that produced the listings, `fallback`, or none.
    pub source: Option<String>,
    pub fetched: usize,
    pub added: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub added_count: usize,
    pub added: Vec<JobRecord>,
    pub terms: Vec<TermOutcome>,
}

impl IngestionReport {
    /// Report for a run that added nothing.
    pub fn empty() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            added_count: 0,
            added: Vec::new(),
            terms: Vec::new(),
        }
    }
}

pub struct IngestionPipeline {
    strategies: Vec<Arc<dyn AcquisitionStrategy>>,
    store: Arc<dyn JobStore>,
    fallback: Option<FallbackGenerator>,
    identity_salt: IdentitySalt,
}

impl IngestionPipeline {
    pub fn new(strategies: Vec<Arc<dyn AcquisitionStrategy>>, store: Arc<dyn JobStore>) -> Self {
        Self {
            strategies,
            store,
            fallback: Some(FallbackGenerator::default()),
            identity_salt: IdentitySalt::default(),
        }
    }

    pub fn with_fallback(mut self, fallback: Option<FallbackGenerator>) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_identity_salt(mut self, identity_salt: IdentitySalt) -> Self {
        self.identity_salt = identity_salt;
        self
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Run one ingestion over every term in `request`.
    ///
    /// A term that fails (or panics) is recorded in the report and the run
    /// moves on. A store failure aborts the run; nothing staged is written.
    pub async fn run(&self, request: &IngestionRequest) -> Result<IngestionReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        tracing::info!(
            run_id = %run_id,
            terms = request.search_terms.len(),
            "Starting ingestion run"
        );

        let mut staged: Vec<JobRecord> = Vec::new();
        let mut staged_ids: HashSet<String> = HashSet::new();
        let mut terms = Vec::with_capacity(request.search_terms.len());

        for term in &request.search_terms {
            let params = request.params_for(term);
            let result = AssertUnwindSafe(self.process_term(&params, &staged_ids))
                .catch_unwind()
                .await;

            match result {
                Ok(Ok((outcome, records))) => {
                    for record in records {
                        staged_ids.insert(record.id.clone());
                        staged.push(record);
                    }
                    terms.push(outcome);
                }
                Ok(Err(e)) => {
                    tracing::error!(run_id = %run_id, term = %term, error = %e, "Ingestion run aborted");
                    return Err(e);
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!(term = %term, error = %message, "Term processing panicked");
                    terms.push(TermOutcome {
                        term: term.clone(),
                        source: None,
                        fetched: 0,
                        added: 0,
                        error: Some(message),
                    });
                }
            }
        }

        let added_count = if staged.is_empty() {
            0
        } else {
            self.store.insert_batch(&staged).await?
        };

        let finished_at = Utc::now();
        tracing::info!(
            run_id = %run_id,
            added = added_count,
            elapsed_ms = (finished_at - started_at).num_milliseconds(),
            "Ingestion run complete"
        );

        Ok(IngestionReport {
            run_id,
            started_at,
            finished_at,
            added_count,
            added: staged,
            terms,
        })
    }

    async fn process_term(
        &self,
        params: &SearchParams,
        staged_ids: &HashSet<String>,
    ) -> Result<(TermOutcome, Vec<JobRecord>), PipelineError> {
        let term = params.term.as_str();
        let (source, listings) = self.acquire(params).await;
        let fetched = listings.len();

        let salts = match (&source, self.identity_salt) {
            (Some(s), _) if s == FALLBACK_SOURCE => index_salts(fetched),
            (_, IdentitySalt::Index) => index_salts(fetched),
            (_, IdentitySalt::Random) => random_salts(fetched),
        };

        let normalizer = Normalizer::new(params.fulltime_only, params.min_salary);
        let mut seen: HashSet<String> = HashSet::new();
        let mut records = Vec::new();

        for (raw, salt) in listings.into_iter().zip(salts) {
            let record = match normalizer.normalize(raw, &salt) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(term = term, error = %e, "Dropping listing");
                    continue;
                }
            };

            if staged_ids.contains(&record.id) || seen.contains(&record.id) {
                continue;
            }
            if self.store.exists(&record.id).await? {
                tracing::debug!(id = %record.id, "Listing already stored");
                continue;
            }

            seen.insert(record.id.clone());
            records.push(record);
        }

        tracing::info!(
            term = term,
            source = source.as_deref().unwrap_or("none"),
            fetched = fetched,
            new = records.len(),
            "Term processed"
        );

        Ok((
            TermOutcome {
                term: term.to_string(),
                source,
                fetched,
                added: records.len(),
                error: None,
            },
            records,
        ))
    }

    /// Walk the strategy chain; first non-empty batch wins.
    async fn acquire(&self, params: &SearchParams) -> (Option<String>, Vec<RawListing>) {
        let term = params.term.as_str();

        for strategy in &self.strategies {
            let attempt = AssertUnwindSafe(strategy.attempt(term, params))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(StrategyError::Panicked(panic_message(panic.as_ref())))
                });

            match attempt {
                Ok(listings) if !listings.is_empty() => {
                    tracing::info!(
                        term = term,
                        strategy = strategy.name(),
                        count = listings.len(),
                        "Strategy returned listings"
                    );
                    return (Some(strategy.name().to_string()), listings);
                }
                Ok(_) => {
                    tracing::info!(term = term, strategy = strategy.name(), "Strategy returned no listings");
                }
                Err(e) => {
                    tracing::warn!(term = term, strategy = strategy.name(), error = %e, "Strategy failed");
                }
            }
        }

        tracing::warn!(term = term, "All strategies exhausted");

        match &self.fallback {
            Some(generator) => {
                let listings = generator.generate(params);
                tracing::info!(term = term, count = listings.len(), "Using fallback listings");
                (Some(FALLBACK_SOURCE.to_string()), listings)
            }
            None => (None, Vec::new()),
        }
    }
}

fn index_salts(n: usize) -> Vec<String> {
    (0..n).map(|i| i.to_string()).collect()
}

/// Distinct nonces in 1000..=9999, one per listing.
fn random_salts(n: usize) -> Vec<String> {
    if n > NONCE_SPAN {
        return index_salts(n);
    }
    let mut rng = rand::rng();
    rand::seq::index::sample(&mut rng, NONCE_SPAN, n)
        .into_iter()
        .map(|i| (i + NONCE_MIN).to_string())
        .collect()
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
