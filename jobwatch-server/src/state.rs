use std::sync::Arc;

use jobwatch_core::{JobStore, JobwatchConfig};

use crate::subsystems::scheduler::IngestionService;

/// Shared by the IPC server and every HTTP handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    pub ingestion: Arc<IngestionService>,
    pub config: JobwatchConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn JobStore>,
        ingestion: Arc<IngestionService>,
        config: JobwatchConfig,
    ) -> Self {
        Self {
            store,
            ingestion,
            config,
        }
    }
}
