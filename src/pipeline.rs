//! Wires the embedder and vector store together: one-time ingestion of the
//! reference PDF, then retrieval for questions.

use log::{info, warn};
use std::sync::Arc;

use crate::config::{AppConfig, IngestConfig};
use crate::database::{self, insert_batch, CollectionSpec, VectorStore};
use crate::document::{PageSource, PdfLoader, TextSplitter};
use crate::error::{RagError, Result};
use crate::llm::{EmbeddingProvider, OnnxEmbedder, VectorRetriever};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// The collection already held documents; nothing was loaded.
    Skipped,
    Ingested {
        pages: usize,
        chunks: usize,
        inserted: usize,
        failed_batches: usize,
    },
}

pub struct Pipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    collection: String,
    batch_size: usize,
    top_k: usize,
}

impl Pipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
        batch_size: usize,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            collection: collection.into(),
            batch_size,
            top_k,
        }
    }

    /// Connects to the configured store and loads the embedding model,
    /// downloading it into the local cache on first use.
    pub async fn start(config: &AppConfig) -> Result<Self> {
        let collection = config.collection()?.to_string();
        let store: Arc<dyn VectorStore> = Arc::from(database::connect(config).await?);
        info!("🔌 Connected to {} vector store", store.name());

        let embedder = match OnnxEmbedder::load(&config.embedding).await {
            Ok(embedder) => embedder,
            Err(e) => {
                release(store.as_ref()).await;
                return Err(e);
            }
        };
        info!("🧠 Embedding model ready: {}", embedder.name());

        Ok(Self::new(
            Arc::new(embedder),
            store,
            collection,
            config.ingest.batch_size,
            config.top_k,
        ))
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Ingests the configured PDF. Invalid chunking settings fail here, before
    /// the collection is touched.
    pub async fn ingest_pdf(&self, settings: &IngestConfig) -> Result<IngestOutcome> {
        let splitter = TextSplitter::new(settings.chunk_size, settings.chunk_overlap)?;
        let loader = PdfLoader::new(&settings.pdf_path);
        self.ingest(&loader, &splitter).await
    }

    /// Loads, splits, embeds and inserts `source` unless the collection
    /// already has at least one document. Any document counts, so a partially
    /// filled collection is never topped up.
    pub async fn ingest(&self, source: &dyn PageSource, splitter: &TextSplitter) -> Result<IngestOutcome> {
        let spec = CollectionSpec::cosine(self.collection.clone(), self.embedder.dimensions());
        if self.store.ensure_collection(&spec).await? {
            info!("🆕 Created collection {}", self.collection);
        }

        if self.store.has_documents(&self.collection).await? {
            info!("⚠️ Collection already has documents. Skipping insertion.");
            return Ok(IngestOutcome::Skipped);
        }

        info!("📥 Ingesting {}", source.describe());
        let pages = source.load_pages()?;
        let chunks = splitter.split_pages(&pages);
        if chunks.is_empty() {
            return Err(RagError::Document(format!(
                "No text extracted from {}",
                source.describe()
            )));
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;
        info!("🔢 Embedded {} chunks", embeddings.len());

        let report = insert_batch(
            self.store.as_ref(),
            &self.collection,
            &chunks,
            &embeddings,
            self.batch_size,
        )
        .await?;

        Ok(IngestOutcome::Ingested {
            pages: pages.len(),
            chunks: chunks.len(),
            inserted: report.inserted,
            failed_batches: report.failed_batches,
        })
    }

    pub fn retriever(&self) -> VectorRetriever {
        VectorRetriever::new(
            self.embedder.clone(),
            self.store.clone(),
            self.collection.clone(),
            self.top_k,
        )
    }

    pub async fn close(&self) -> Result<()> {
        self.store.close().await
    }
}

/// Closes a handle that is being abandoned; a failure is only logged.
async fn release(store: &dyn VectorStore) {
    if let Err(e) = store.close().await {
        warn!("Failed to close vector store: {}", e);
    }
}
