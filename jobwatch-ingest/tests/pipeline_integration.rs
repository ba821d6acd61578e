use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jobwatch_core::{JobFilter, JobRecord, JobStore, MemoryJobStore, RawListing, StoreError};
use jobwatch_ingest::{
    AcquisitionStrategy, FallbackGenerator, IdentitySalt, IngestionPipeline, IngestionRequest,
    PipelineError, SearchParams, StrategyError,
};

/// Returns a fixed batch and counts how often it was asked.
struct FixedStrategy {
    name: &'static str,
    listings: Vec<RawListing>,
    calls: AtomicUsize,
}

impl FixedStrategy {
    fn new(name: &'static str, listings: Vec<RawListing>) -> Arc<Self> {
        Arc::new(Self {
            name,
            listings,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AcquisitionStrategy for FixedStrategy {
    async fn attempt(&self, _term: &str, _query: &SearchParams) -> Result<Vec<RawListing>, StrategyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.listings.clone())
    }

    fn name(&self) -> &str {
        self.name
    }
}

struct FailingStrategy;

#[async_trait]
impl AcquisitionStrategy for FailingStrategy {
    async fn attempt(&self, term: &str, _query: &SearchParams) -> Result<Vec<RawListing>, StrategyError> {
        Err(StrategyError::Timeout(format!("no cards for {}", term)))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Panics for one term, returns listings for the rest.
struct PanickyStrategy {
    bad_term: &'static str,
}

#[async_trait]
impl AcquisitionStrategy for PanickyStrategy {
    async fn attempt(&self, term: &str, _query: &SearchParams) -> Result<Vec<RawListing>, StrategyError> {
        if term == self.bad_term {
            panic!("malformed page for {}", term);
        }
        Ok(vec![listing(&format!("{} Engineer", term), "JetCode", "Remote")])
    }

    fn name(&self) -> &str {
        "panicky"
    }
}

/// Store whose writes always fail.
#[derive(Default)]
struct BrokenStore {
    reads: MemoryJobStore,
}

#[async_trait]
impl JobStore for BrokenStore {
    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        self.reads.exists(id).await
    }

    async fn upsert_if_absent(&self, _record: &JobRecord) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }

    async fn insert_batch(&self, _records: &[JobRecord]) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }

    async fn query(&self, filter: &JobFilter) -> Result<Vec<JobRecord>, StoreError> {
        self.reads.query(filter).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.reads.count().await
    }

    fn name(&self) -> &str {
        "broken"
    }
}

/// Memory store whose `exists` panics on one specific call.
struct PanickyStore {
    inner: MemoryJobStore,
    exists_calls: AtomicUsize,
    panic_on_call: usize,
}

impl PanickyStore {
    fn new(panic_on_call: usize) -> Self {
        Self {
            inner: MemoryJobStore::new(),
            exists_calls: AtomicUsize::new(0),
            panic_on_call,
        }
    }
}

#[async_trait]
impl JobStore for PanickyStore {
    async fn exists(&self, id: &str) -> Result<bool, StoreError> {
        if self.exists_calls.fetch_add(1, Ordering::SeqCst) == self.panic_on_call {
            panic!("index corrupted");
        }
        self.inner.exists(id).await
    }

    async fn upsert_if_absent(&self, record: &JobRecord) -> Result<bool, StoreError> {
        self.inner.upsert_if_absent(record).await
    }

    async fn insert_batch(&self, records: &[JobRecord]) -> Result<usize, StoreError> {
        self.inner.insert_batch(records).await
    }

    async fn query(&self, filter: &JobFilter) -> Result<Vec<JobRecord>, StoreError> {
        self.inner.query(filter).await
    }

    async fn count(&self) -> Result<u64, StoreError> {
        self.inner.count().await
    }

    fn name(&self) -> &str {
        "panicky"
    }
}

fn chain(strategies: &[Arc<dyn AcquisitionStrategy>]) -> Vec<Arc<dyn AcquisitionStrategy>> {
    strategies.to_vec()
}

fn listing(title: &str, company: &str, location: &str) -> RawListing {
    RawListing {
        title: title.to_string(),
        company: company.to_string(),
        location: location.to_string(),
        salary: Some("$220,000 a year".to_string()),
        description: Some("Ship things".to_string()),
        url: format!("https://www.indeed.com/viewjob?jk={}", title.len()),
        date_posted: Utc::now() - Duration::hours(3),
    }
}

fn batch(n: usize) -> Vec<RawListing> {
    (0..n)
        .map(|i| listing(&format!("Platform Engineer {}", i), "OmniTech", "Remote"))
        .collect()
}

fn request(terms: &[&str]) -> IngestionRequest {
    IngestionRequest {
        search_terms: terms.iter().map(|t| t.to_string()).collect(),
        min_salary: 200_000,
        remote_only: true,
        fulltime_only: true,
        days_ago: 1,
    }
}

fn all_jobs() -> JobFilter {
    JobFilter {
        posted_after: Utc::now() - Duration::days(365),
        title_contains: None,
        remote_only: false,
        fulltime_only: false,
    }
}

// ===========================================================================
// TEST 1: first non-empty strategy wins, later ones never run
// ===========================================================================
#[tokio::test]
async fn test_strategy_priority_order() {
    let a = FixedStrategy::new("a", batch(3));
    let b = FixedStrategy::new("b", batch(5));
    let store = Arc::new(MemoryJobStore::new());

    let pipeline = IngestionPipeline::new(chain(&[a.clone(), b.clone()]), store.clone());
    let report = pipeline.run(&request(&["DevOps"])).await.unwrap();

    assert_eq!(report.added_count, 3);
    assert_eq!(report.terms[0].source.as_deref(), Some("a"));
    assert_eq!(a.calls(), 1);
    assert_eq!(b.calls(), 0);
    assert_eq!(store.count().await.unwrap(), 3);
}

// ===========================================================================
// TEST 2: empty and failing strategies fall through to the next
// ===========================================================================
#[tokio::test]
async fn test_falls_through_empty_and_failed_strategies() {
    let empty = FixedStrategy::new("empty", Vec::new());
    let last = FixedStrategy::new("last", batch(2));
    let store = Arc::new(MemoryJobStore::new());

    let pipeline = IngestionPipeline::new(
        chain(&[Arc::new(FailingStrategy), empty.clone(), last.clone()]),
        store.clone(),
    );
    let report = pipeline.run(&request(&["Web Developer"])).await.unwrap();

    assert_eq!(empty.calls(), 1);
    assert_eq!(last.calls(), 1);
    assert_eq!(report.terms[0].source.as_deref(), Some("last"));
    assert_eq!(report.added_count, 2);
}

// ===========================================================================
// TEST 3: all strategies exhausted -> fallback listings
// ===========================================================================
#[tokio::test]
async fn test_fallback_when_all_strategies_fail() {
    let store = Arc::new(MemoryJobStore::new());
    let pipeline = IngestionPipeline::new(chain(&[Arc::new(FailingStrategy)]), store.clone());

    let report = pipeline.run(&request(&["DevOps"])).await.unwrap();

    assert_eq!(report.terms[0].source.as_deref(), Some("fallback"));
    assert!((5..=10).contains(&report.added_count), "got {}", report.added_count);

    let generator = FallbackGenerator::default();
    let titles = generator.titles_for("DevOps");
    for job in &report.added {
        assert_eq!(job.salary.as_deref(), Some("$200000-250000/year"));
        assert!(titles.contains(&job.title), "unexpected title {}", job.title);
        assert!(generator.companies().contains(&job.company));
        assert_eq!(job.location, "Remote");
        assert!(job.is_remote);
        assert!(job.url.starts_with("https://www.indeed.com/viewjob?jk="));
    }
}

// ===========================================================================
// TEST 4: no fallback configured -> term yields nothing
// ===========================================================================
#[tokio::test]
async fn test_no_fallback_adds_nothing() {
    let store = Arc::new(MemoryJobStore::new());
    let pipeline =
        IngestionPipeline::new(chain(&[Arc::new(FailingStrategy)]), store.clone())
            .with_fallback(None);

    let report = pipeline.run(&request(&["DevOps"])).await.unwrap();

    assert_eq!(report.added_count, 0);
    assert_eq!(report.terms[0].source, None);
    assert_eq!(store.count().await.unwrap(), 0);
}

// ===========================================================================
// TEST 5: re-running an unchanged page adds nothing the second time
// ===========================================================================
#[tokio::test]
async fn test_rerun_is_idempotent_with_index_salt() {
    let strategy = FixedStrategy::new("fixed", batch(4));
    let store = Arc::new(MemoryJobStore::new());
    let pipeline = IngestionPipeline::new(chain(&[strategy]), store.clone())
        .with_identity_salt(IdentitySalt::Index);

    let first = pipeline.run(&request(&["DevOps"])).await.unwrap();
    let second = pipeline.run(&request(&["DevOps"])).await.unwrap();

    assert_eq!(first.added_count, 4);
    assert_eq!(second.added_count, 0);
    assert_eq!(store.count().await.unwrap(), 4);
}

// ===========================================================================
// TEST 6: duplicates across terms in one run are staged once
// ===========================================================================
#[tokio::test]
async fn test_same_listing_for_two_terms_staged_once() {
    let strategy = FixedStrategy::new("fixed", batch(2));
    let store = Arc::new(MemoryJobStore::new());
    let pipeline = IngestionPipeline::new(chain(&[strategy]), store.clone())
        .with_identity_salt(IdentitySalt::Index);

    let report = pipeline.run(&request(&["DevOps", "CraftCMS"])).await.unwrap();

    assert_eq!(report.added_count, 2);
    assert_eq!(report.terms[0].added, 2);
    assert_eq!(report.terms[1].added, 0);
    assert_eq!(report.terms[1].fetched, 2);
}

// ===========================================================================
// TEST 7: is_remote derives from location text
// ===========================================================================
#[tokio::test]
async fn test_remote_flag_from_location() {
    let strategy = FixedStrategy::new(
        "fixed",
        vec![
            listing("SRE", "UltraLogic", "Hybrid remote in Austin, TX"),
            listing("Backend Engineer", "JetCode", "New York, NY"),
            listing("Frontend Engineer", "OmniTech", ""),
        ],
    );
    let store = Arc::new(MemoryJobStore::new());
    let pipeline = IngestionPipeline::new(chain(&[strategy]), store.clone());

    let report = pipeline.run(&request(&["Web Developer"])).await.unwrap();
    let by_title = |t: &str| report.added.iter().find(|j| j.title == t).unwrap().clone();

    assert!(by_title("SRE").is_remote);
    assert!(!by_title("Backend Engineer").is_remote);
    let unspecified = by_title("Frontend Engineer");
    assert_eq!(unspecified.location, "Unspecified");
    assert!(!unspecified.is_remote);
    assert!(report.added.iter().all(|j| j.is_fulltime));
}

// ===========================================================================
// TEST 8: store write failure aborts the run
// ===========================================================================
#[tokio::test]
async fn test_persistence_failure_is_run_error() {
    let strategy = FixedStrategy::new("fixed", batch(3));
    let pipeline = IngestionPipeline::new(chain(&[strategy]), Arc::new(BrokenStore::default()));

    let result = pipeline.run(&request(&["DevOps"])).await;
    assert!(matches!(result, Err(PipelineError::Persistence(_))));
}

// ===========================================================================
// TEST 9: a panic while processing one term is isolated
// ===========================================================================
#[tokio::test]
async fn test_panicking_term_does_not_stop_run() {
    let store = Arc::new(PanickyStore::new(1));
    let pipeline = IngestionPipeline::new(
        chain(&[Arc::new(PanickyStrategy { bad_term: "" })]),
        store.clone(),
    );

    let report = pipeline
        .run(&request(&["DevOps", "CraftCMS", "Website Dev"]))
        .await
        .unwrap();

    assert_eq!(report.terms.len(), 3);
    assert!(report.terms[1].error.as_deref().unwrap().contains("index corrupted"));
    assert_eq!(report.terms[1].added, 0);
    assert_eq!(report.added_count, 2);
    assert_eq!(store.count().await.unwrap(), 2);
}

// ===========================================================================
// TEST 10: empty term list touches nothing
// ===========================================================================
#[tokio::test]
async fn test_empty_terms_is_zero() {
    let strategy = FixedStrategy::new("fixed", batch(3));
    let store = Arc::new(BrokenStore::default());
    let pipeline = IngestionPipeline::new(chain(&[strategy.clone()]), store);

    let report = pipeline.run(&request(&[])).await.unwrap();

    assert_eq!(report.added_count, 0);
    assert!(report.terms.is_empty());
    assert_eq!(strategy.calls(), 0);
}

// ===========================================================================
// TEST 11: stored records fall inside the requested window
// ===========================================================================
#[tokio::test]
async fn test_fallback_dates_within_window() {
    let store = Arc::new(MemoryJobStore::new());
    let pipeline = IngestionPipeline::new(Vec::new(), store.clone());
    let mut req = request(&["CraftCMS"]);
    req.days_ago = 3;

    let before = Utc::now();
    pipeline.run(&req).await.unwrap();

    let jobs = store.query(&all_jobs()).await.unwrap();
    assert!(!jobs.is_empty());
    for job in jobs {
        assert!(job.date_posted >= before - Duration::days(3));
        assert!(job.date_posted <= Utc::now() - Duration::hours(1) + Duration::seconds(5));
        assert!(job.date_found >= before);
    }
}

// ===========================================================================
// TEST 12: a panicking strategy falls through to the next one
// ===========================================================================
#[tokio::test]
async fn test_panicking_strategy_falls_through() {
    let fixed = FixedStrategy::new("fixed", batch(3));
    let store = Arc::new(MemoryJobStore::new());
    let pipeline = IngestionPipeline::new(
        chain(&[Arc::new(PanickyStrategy { bad_term: "DevOps" }), fixed.clone()]),
        store.clone(),
    );

    let report = pipeline.run(&request(&["DevOps"])).await.unwrap();

    assert_eq!(fixed.calls(), 1);
    assert_eq!(report.terms[0].source.as_deref(), Some("fixed"));
    assert!(report.terms[0].error.is_none());
    assert_eq!(report.added_count, 3);
    assert_eq!(store.count().await.unwrap(), 3);
}

// ===========================================================================
// TEST 13: a panicking last strategy still reaches the fallback
// ===========================================================================
#[tokio::test]
async fn test_panicking_strategy_reaches_fallback() {
    let store = Arc::new(MemoryJobStore::new());
    let pipeline = IngestionPipeline::new(
        chain(&[Arc::new(PanickyStrategy { bad_term: "DevOps" })]),
        store.clone(),
    );

    let report = pipeline.run(&request(&["DevOps"])).await.unwrap();

    assert_eq!(report.terms[0].source.as_deref(), Some("fallback"));
    assert!((5..=10).contains(&report.added_count));
}
