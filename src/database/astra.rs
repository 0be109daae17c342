//! Astra DB Data API backend. Each operation is a single JSON command posted
//! to the keyspace or collection endpoint.

use async_trait::async_trait;
use log::{info, warn};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use super::vector_db::{CollectionSpec, ScoredChunk, VectorStore};
use crate::config::AstraConfig;
use crate::document::TextChunk;
use crate::error::{RagError, Result};

pub struct AstraStore {
    client: Client,
    api_base: String,
    token: String,
}

impl AstraStore {
    pub fn connect(config: &AstraConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .as_deref()
            .ok_or_else(|| RagError::config("ASTRADB_ENDPOINT is not set"))?;
        let token = config
            .token
            .clone()
            .ok_or_else(|| RagError::config("ASTRA_TOKEN is not set"))?;

        let api_base = format!(
            "{}/api/json/v1/{}",
            endpoint.trim_end_matches('/'),
            config.namespace
        );
        info!("Using Astra Data API at {}", api_base);

        Ok(Self {
            client: Client::new(),
            api_base,
            token,
        })
    }

    async fn command(&self, collection: Option<&str>, body: Value) -> Result<Value> {
        let url = match collection {
            Some(name) => format!("{}/{}", self.api_base, name),
            None => self.api_base.clone(),
        };

        let response = self
            .client
            .post(&url)
            .header("Token", &self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RagError::config(format!("Astra rejected the token ({})", status)));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RagError::Network(format!("Astra returned {}: {}", status, text)));
        }

        let payload: Value = response.json().await?;
        check_errors(payload)
    }
}

#[async_trait]
impl VectorStore for AstraStore {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<bool> {
        let listing = self.command(None, json!({ "findCollections": {} })).await?;
        if collection_names(&listing).iter().any(|n| n == &spec.name) {
            info!("Collection '{}' already exists", spec.name);
            return Ok(false);
        }

        self.command(None, create_collection_body(spec)).await?;
        info!("* Collection: {}", spec.name);
        Ok(true)
    }

    async fn has_documents(&self, collection: &str) -> Result<bool> {
        let found = self
            .command(Some(collection), json!({ "findOne": { "filter": {} } }))
            .await?;
        Ok(found
            .pointer("/data/document")
            .map(|d| !d.is_null())
            .unwrap_or(false))
    }

    async fn insert(
        &self,
        collection: &str,
        chunks: &[TextChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<Vec<String>> {
        let documents: Vec<Value> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, vector)| document_body(chunk, vector))
            .collect();
        let body = json!({
            "insertMany": {
                "documents": documents,
                "options": { "ordered": false }
            }
        });

        let response = self.command(Some(collection), body).await?;
        Ok(inserted_ids(&response))
    }

    async fn search(&self, collection: &str, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let body = json!({
            "find": {
                "sort": { "$vector": query },
                "projection": { "$vector": 0 },
                "options": { "limit": k, "includeSimilarity": true }
            }
        });
        let response = self.command(Some(collection), body).await?;
        Ok(scored_documents(&response))
    }

    fn name(&self) -> &str {
        "astra"
    }
}

/// Fails on an `errors` array unless the command still reported a result;
/// partial `insertMany` successes are kept and logged.
fn check_errors(payload: Value) -> Result<Value> {
    let messages: Vec<String> = payload
        .get("errors")
        .and_then(|e| e.as_array())
        .map(|errors| {
            errors
                .iter()
                .map(|e| {
                    e.get("message")
                        .and_then(|m| m.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| e.to_string())
                })
                .collect()
        })
        .unwrap_or_default();

    if messages.is_empty() {
        return Ok(payload);
    }
    if payload.get("status").is_some() || payload.get("data").is_some() {
        warn!("Astra reported partial failure: {}", messages.join("; "));
        return Ok(payload);
    }
    Err(RagError::VectorStore(messages.join("; ")))
}

fn create_collection_body(spec: &CollectionSpec) -> Value {
    json!({
        "createCollection": {
            "name": spec.name,
            "options": {
                "vector": {
                    "dimension": spec.dimension,
                    "metric": spec.metric.as_str()
                }
            }
        }
    })
}

fn document_body(chunk: &TextChunk, vector: &[f32]) -> Value {
    json!({
        "content": chunk.content,
        "metadata": { "source": chunk.source },
        "$vector": vector
    })
}

fn collection_names(listing: &Value) -> Vec<String> {
    listing
        .pointer("/status/collections")
        .and_then(|c| c.as_array())
        .map(|names| {
            names
                .iter()
                .filter_map(|n| match n {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(o) => o.get("name").and_then(|v| v.as_str()).map(str::to_string),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

fn inserted_ids(response: &Value) -> Vec<String> {
    response
        .pointer("/status/insertedIds")
        .and_then(|ids| ids.as_array())
        .map(|ids| {
            ids.iter()
                .map(|id| match id {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn scored_documents(response: &Value) -> Vec<ScoredChunk> {
    response
        .pointer("/data/documents")
        .and_then(|d| d.as_array())
        .map(|docs| {
            docs.iter()
                .filter_map(|doc| {
                    let content = doc.get("content")?.as_str()?.to_string();
                    let source = doc
                        .pointer("/metadata/source")
                        .and_then(|s| s.as_str())
                        .unwrap_or_default()
                        .to_string();
                    let score = doc
                        .get("$similarity")
                        .and_then(|s| s.as_f64())
                        .unwrap_or(0.0) as f32;
                    Some(ScoredChunk {
                        chunk: TextChunk { content, source },
                        score,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}
