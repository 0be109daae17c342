pub mod astra;
pub mod qdrant;
pub mod qdrant_config;
pub mod vector_db;

pub use astra::AstraStore;
pub use qdrant::QdrantStore;
pub use vector_db::{
    insert_batch, CollectionSpec, InsertReport, ScoredChunk, SimilarityMetric, VectorStore,
};

use crate::config::{AppConfig, VectorBackend};
use crate::error::Result;

/// Opens a handle on the configured backend.
pub async fn connect(config: &AppConfig) -> Result<Box<dyn VectorStore>> {
    match config.backend {
        VectorBackend::Astra => Ok(Box::new(AstraStore::connect(&config.astra)?)),
        VectorBackend::Qdrant => Ok(Box::new(QdrantStore::connect(&config.qdrant).await?)),
    }
}
