//! API shared state

use std::sync::Arc;

use crate::ingest::Ingestor;
use crate::storage::StorageBackend;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Ingestion pipeline for agent reports
    pub ingestor: Arc<Ingestor>,
}

impl ApiState {
    pub fn new(ingestor: Ingestor) -> Self {
        Self {
            ingestor: Arc::new(ingestor),
        }
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        self.ingestor.storage()
    }
}
