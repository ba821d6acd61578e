//! Job acquisition and ingestion for Jobwatch.
//!
//! Per search term the pipeline walks an ordered list of acquisition
//! strategies, falls back to synthetic listings when all of them come back
//! empty, normalizes what it got into `JobRecord`s, drops ids the store already
//! knows and commits the rest in one batch.

pub mod fallback;
pub mod normalize;
pub mod params;
pub mod pipeline;
pub mod recency;
pub mod strategy;

pub use fallback::FallbackGenerator;
pub use normalize::{derive_job_id, NormalizeError, Normalizer};
pub use params::{IngestionRequest, SearchParams};
pub use pipeline::{IdentitySalt, IngestionPipeline, IngestionReport, PipelineError, TermOutcome};
pub use strategy::{build_strategies, AcquisitionStrategy, DelayPolicy, StrategyError};
