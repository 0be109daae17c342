use async_trait::async_trait;
use log::debug;
use std::sync::Arc;

use super::embeddings::EmbeddingProvider;
use crate::database::{ScoredChunk, VectorStore};
use crate::error::{RagError, Result};

#[async_trait]
pub trait ContextRetriever: Send + Sync {
    /// Most similar chunks first.
    async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>>;
}

/// Embeds the query and runs a top-k similarity search on one collection.
pub struct VectorRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    collection: String,
    top_k: usize,
}

impl VectorRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            collection: collection.into(),
            top_k,
        }
    }
}

#[async_trait]
impl ContextRetriever for VectorRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<ScoredChunk>> {
        let vector = self.embedder.embed(query)?;
        let hits = self.store.search(&self.collection, &vector, self.top_k).await?;
        debug!("Retrieved {} chunks from {}", hits.len(), self.collection);
        Ok(hits)
    }
}

/// Stands in when the store or embedder could not be set up at startup, so
/// questions still get an answer (the fallback) instead of an error.
pub struct UnavailableRetriever {
    reason: String,
}

impl UnavailableRetriever {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ContextRetriever for UnavailableRetriever {
    async fn retrieve(&self, _query: &str) -> Result<Vec<ScoredChunk>> {
        Err(RagError::VectorStore(format!(
            "Retriever unavailable: {}",
            self.reason
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{chunks, FakeEmbedder, FakeStore};

    #[tokio::test]
    async fn test_returns_top_k_in_rank_order() {
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(FakeEmbedder::new(8));
        let store = Arc::new(FakeStore::new());
        let docs = chunks(10);
        let vectors = embedder
            .embed_batch(&docs.iter().map(|c| c.content.clone()).collect::<Vec<_>>())
            .unwrap();
        store.insert("medical", &docs, &vectors).await.unwrap();

        let retriever = VectorRetriever::new(embedder, store, "medical", 3);
        let hits = retriever.retrieve(&docs[4].content).await.unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].chunk, docs[4]);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_unavailable_retriever_errors() {
        let retriever = UnavailableRetriever::new("ASTRA_TOKEN is not set");
        assert!(retriever.retrieve("acne").await.is_err());
    }
}
