//! Job Store: keyed persistence plus the filtered query surface.
//!
//! Two implementations share the `JobStore` trait:
//! - `PgJobStore`: Postgres via sqlx (the `jobs` table, see `db::ensure_schema`)
//! - `MemoryJobStore`: process-local map, used by tests and `store.backend = "memory"`
//!
//! Records are append-only: there is no update path, and inserting an id that
//! already exists is a no-op.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::models::job::JobRecord;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Predicates for `JobStore::query`. `false` flags mean "don't filter".
#[derive(Debug, Clone)]
pub struct JobFilter {
    pub posted_after: DateTime<Utc>,
    pub title_contains: Option<String>,
    pub remote_only: bool,
    pub fulltime_only: bool,
}

impl JobFilter {
    pub fn matches(&self, job: &JobRecord) -> bool {
        if job.date_posted < self.posted_after {
            return false;
        }
        if let Some(needle) = self.title_contains.as_deref().filter(|n| !n.is_empty()) {
            if !job.title.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if self.remote_only && !job.is_remote {
            return false;
        }
        if self.fulltime_only && !job.is_fulltime {
            return false;
        }
        true
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Returns true if a record with this id is stored.
    async fn exists(&self, id: &str) -> Result<bool, StoreError>;

    /// Insert one record unless its id is present. Returns whether it was inserted.
    async fn upsert_if_absent(&self, record: &JobRecord) -> Result<bool, StoreError>;

    /// Insert all records in one unit of work, skipping present ids.
    /// Either every absent record is written or none is.
    async fn insert_batch(&self, records: &[JobRecord]) -> Result<usize, StoreError>;

    /// Records matching `filter`, newest `date_posted` first.
    async fn query(&self, filter: &JobFilter) -> Result<Vec<JobRecord>, StoreError>;

    async fn count(&self) -> Result<u64, StoreError>;

    /// Backend name for logging and health output.
    fn name(&self) -> &str;
}

// ============================================================================
// MemoryJobStore
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, JobRecord>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.jobs.read().await.contains_key(id))
    }

    async fn upsert_if_absent(&self, record: &JobRecord) -> Result<bool, StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&record.id) {
            return Ok(false);
        }
        jobs.insert(record.id.clone(), record.clone());
        Ok(true)
    }

    async fn insert_batch(&self, records: &[JobRecord]) -> Result<usize, StoreError> {
        let mut jobs = self.jobs.write().await;
        let mut inserted = 0;
        for record in records {
            if !jobs.contains_key(&record.id) {
                jobs.insert(record.id.clone(), record.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn query(&self, filter: &JobFilter) -> Result<Vec<JobRecord>, StoreError> {
        let jobs = self.jobs.read().await;
        let mut matched: Vec<JobRecord> = jobs
            .values()
            .filter(|job| filter.matches(job))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.date_posted.cmp(&a.date_posted));
        Ok(matched)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.jobs.read().await.len() as u64)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// PgJobStore
// ============================================================================

#[derive(Debug, Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const INSERT_JOB_SQL: &str = r#"
    INSERT INTO jobs (id, title, company, location, salary, description, url,
                      date_posted, date_found, is_remote, is_fulltime)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
    ON CONFLICT (id) DO NOTHING
"#;

fn bind_insert<'q>(
    record: &'q JobRecord,
) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(INSERT_JOB_SQL)
        .bind(&record.id)
        .bind(&record.title)
        .bind(&record.company)
        .bind(&record.location)
        .bind(&record.salary)
        .bind(&record.description)
        .bind(&record.url)
        .bind(record.date_posted)
        .bind(record.date_found)
        .bind(record.is_remote)
        .bind(record.is_fulltime)
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        let found: Option<i32> = sqlx::query_scalar("SELECT 1 FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn upsert_if_absent(&self, record: &JobRecord) -> Result<bool, StoreError> {
        let result = bind_insert(record).execute(&self.pool).await?;
        Ok(result.rows_affected() == 1)
    }

    async fn insert_batch(&self, records: &[JobRecord]) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0usize;
        for record in records {
            let result = bind_insert(record).execute(&mut *tx).await?;
            inserted += result.rows_affected() as usize;
        }
        tx.commit().await?;
        tracing::debug!(staged = records.len(), inserted = inserted, "Committed job batch");
        Ok(inserted)
    }

    async fn query(&self, filter: &JobFilter) -> Result<Vec<JobRecord>, StoreError> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, title, company, location, salary, description, url, \
             date_posted, date_found, is_remote, is_fulltime FROM jobs WHERE date_posted >= ",
        );
        qb.push_bind(filter.posted_after);

        if let Some(needle) = filter.title_contains.as_deref().filter(|n| !n.is_empty()) {
            qb.push(" AND title ILIKE ");
            qb.push_bind(format!("%{}%", needle));
        }
        if filter.remote_only {
            qb.push(" AND is_remote = TRUE");
        }
        if filter.fulltime_only {
            qb.push(" AND is_fulltime = TRUE");
        }
        qb.push(" ORDER BY date_posted DESC");

        let rows = qb.build_query_as::<JobRecord>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*)::bigint FROM jobs")
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
