pub mod config;
pub mod db;
pub mod error;
pub mod ipc;
pub mod models;
pub mod store;

pub use config::{IdentitySalt, JobwatchConfig, DEFAULT_SEARCH_TERMS};
pub use error::JobwatchError;
pub use models::job::{JobRecord, RawListing};
pub use store::{JobFilter, JobStore, MemoryJobStore, PgJobStore, StoreError};
