//! In-memory stand-ins for the embedder, vector store, retriever and model.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::database::{CollectionSpec, ScoredChunk, VectorStore};
use crate::document::TextChunk;
use crate::error::{RagError, Result};
use crate::llm::embeddings::EmbeddingProvider;
use crate::llm::retriever::ContextRetriever;
use crate::providers::traits::{CompletionProvider, StructuredRequest};

pub fn chunks(n: usize) -> Vec<TextChunk> {
    (0..n)
        .map(|i| TextChunk {
            content: format!("Passage {} describes condition-{} and its care.", i, i),
            source: "data/medical_book.pdf".to_string(),
        })
        .collect()
}

/// Bag-of-words embedder: each word contributes a pseudo-random vector seeded
/// by its hash. Output is unit length.
pub struct FakeEmbedder {
    dimensions: usize,
}

impl FakeEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text.split_whitespace() {
            for (j, slot) in vector.iter_mut().enumerate() {
                let mut hasher = DefaultHasher::new();
                (word, j).hash(&mut hasher);
                *slot += (hasher.finish() % 2001) as f32 / 1000.0 - 1.0;
            }
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl EmbeddingProvider for FakeEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "fake"
    }
}

#[derive(Default)]
struct StoreState {
    collections: Vec<CollectionSpec>,
    documents: Vec<(TextChunk, Vec<f32>)>,
    insert_calls: Vec<usize>,
    fail_insert_call: Option<usize>,
    fail_search: bool,
    fail_close: bool,
    close_calls: usize,
}

/// Records every call. Search ranks by cosine similarity over all inserted
/// documents regardless of collection name.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<StoreState>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `n`-th insert call (1-based) fail.
    pub fn fail_insert_call(self, n: usize) -> Self {
        self.state.lock().fail_insert_call = Some(n);
        self
    }

    pub fn failing_search(self) -> Self {
        self.state.lock().fail_search = true;
        self
    }

    pub fn failing_close(self) -> Self {
        self.state.lock().fail_close = true;
        self
    }

    pub fn close_calls(&self) -> usize {
        self.state.lock().close_calls
    }

    pub fn insert_calls(&self) -> Vec<usize> {
        self.state.lock().insert_calls.clone()
    }

    pub fn collections(&self) -> Vec<CollectionSpec> {
        self.state.lock().collections.clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().documents.len()
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

#[async_trait]
impl VectorStore for FakeStore {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<bool> {
        let mut state = self.state.lock();
        if state.collections.iter().any(|c| c.name == spec.name) {
            return Ok(false);
        }
        state.collections.push(spec.clone());
        Ok(true)
    }

    async fn has_documents(&self, _collection: &str) -> Result<bool> {
        Ok(!self.state.lock().documents.is_empty())
    }

    async fn insert(
        &self,
        _collection: &str,
        chunks: &[TextChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<Vec<String>> {
        let mut state = self.state.lock();
        state.insert_calls.push(chunks.len());
        if state.fail_insert_call == Some(state.insert_calls.len()) {
            return Err(RagError::VectorStore("insertMany rejected".to_string()));
        }
        let first = state.documents.len();
        state
            .documents
            .extend(chunks.iter().cloned().zip(embeddings.iter().cloned()));
        Ok((first..state.documents.len()).map(|i| format!("doc-{}", i)).collect())
    }

    async fn search(&self, _collection: &str, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let state = self.state.lock();
        if state.fail_search {
            return Err(RagError::VectorStore("find failed".to_string()));
        }
        let mut hits: Vec<ScoredChunk> = state
            .documents
            .iter()
            .map(|(chunk, vector)| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine(query, vector),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.close_calls += 1;
        if state.fail_close {
            return Err(RagError::VectorStore("connection already dropped".to_string()));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Returns a fixed list of hits, or fails every call.
pub struct FakeRetriever {
    hits: Option<Vec<ScoredChunk>>,
}

impl FakeRetriever {
    pub fn with(hits: Vec<ScoredChunk>) -> Self {
        Self { hits: Some(hits) }
    }

    pub fn failing() -> Self {
        Self { hits: None }
    }
}

#[async_trait]
impl ContextRetriever for FakeRetriever {
    async fn retrieve(&self, _query: &str) -> Result<Vec<ScoredChunk>> {
        self.hits
            .clone()
            .ok_or_else(|| RagError::VectorStore("store unreachable".to_string()))
    }
}

/// Replays one canned reply (or network failure) and keeps the system prompts
/// it was sent.
pub struct FakeProvider {
    reply: std::result::Result<Value, String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeProvider {
    pub fn replying(reply: Value) -> Self {
        Self {
            reply: Ok(reply),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl CompletionProvider for FakeProvider {
    async fn complete_structured(&self, request: &StructuredRequest) -> Result<Value> {
        self.prompts.lock().push(request.system.clone());
        self.reply.clone().map_err(RagError::Network)
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }
}
