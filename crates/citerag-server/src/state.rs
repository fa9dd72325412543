//! Shared handler state

use citerag_core::{Config, HistoryLog, Ingestor, QueryPipeline, Result};
use std::sync::Arc;

/// Read-only handles shared by every request
#[derive(Clone)]
pub struct AppState {
    pub pipeline: QueryPipeline,
    pub ingestor: Arc<Ingestor>,
    /// Delivery used when a query does not say
    pub stream_by_default: bool,
}

impl AppState {
    pub fn new(pipeline: QueryPipeline, ingestor: Ingestor, stream_by_default: bool) -> Self {
        Self {
            pipeline,
            ingestor: Arc::new(ingestor),
            stream_by_default,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            QueryPipeline::from_config(config)?,
            Ingestor::from_config(config)?,
            config.generation.streaming,
        ))
    }

    pub fn history(&self) -> &Arc<dyn HistoryLog> {
        self.ingestor.history()
    }
}
