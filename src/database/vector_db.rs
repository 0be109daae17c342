use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::document::TextChunk;
use crate::error::{RagError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    Cosine,
    DotProduct,
    Euclidean,
}

impl SimilarityMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::DotProduct => "dot_product",
            Self::Euclidean => "euclidean",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: SimilarityMetric,
}

impl CollectionSpec {
    pub fn cosine(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric: SimilarityMetric::Cosine,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub chunk: TextChunk,
    pub score: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertReport {
    pub batches: usize,
    pub failed_batches: usize,
    pub inserted: usize,
}

/// A remote collection store. Handles come from `database::connect` and are
/// released with `close`.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates the collection when absent. Returns whether it was created.
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<bool>;

    async fn has_documents(&self, collection: &str) -> Result<bool>;

    /// Inserts one request's worth of chunks and returns the assigned ids.
    async fn insert(
        &self,
        collection: &str,
        chunks: &[TextChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<Vec<String>>;

    /// Nearest chunks first.
    async fn search(&self, collection: &str, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>>;

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str;
}

/// Inserts `chunks` in sequential batches of `batch_size`. A failing batch is
/// logged and skipped; earlier batches stay in place.
pub async fn insert_batch(
    store: &dyn VectorStore,
    collection: &str,
    chunks: &[TextChunk],
    embeddings: &[Vec<f32>],
    batch_size: usize,
) -> Result<InsertReport> {
    if chunks.len() != embeddings.len() {
        return Err(RagError::validation(format!(
            "{} chunks but {} embeddings",
            chunks.len(),
            embeddings.len()
        )));
    }
    let batch_size = batch_size.max(1);
    let total_batches = (chunks.len() + batch_size - 1) / batch_size;

    let pb = ProgressBar::new(total_batches as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("📦 Inserting batches [{bar:30.cyan/blue}] {pos}/{len}")
    {
        pb.set_style(style);
    }

    let mut report = InsertReport::default();
    for (i, (chunk_batch, vector_batch)) in chunks
        .chunks(batch_size)
        .zip(embeddings.chunks(batch_size))
        .enumerate()
    {
        report.batches += 1;
        match store.insert(collection, chunk_batch, vector_batch).await {
            Ok(ids) => report.inserted += ids.len(),
            Err(e) => {
                report.failed_batches += 1;
                warn!("Batch {}/{} failed: {}", i + 1, total_batches, e);
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!("✅ Total inserted: {}", report.inserted);
    Ok(report)
}
