use async_trait::async_trait;
use qdrant_client::{
    qdrant::{
        point_id::PointIdOptions, vectors_config::Config, with_payload_selector::SelectorOptions,
        CollectionExistsRequest, CountPoints, CreateCollection, Distance, PointId, PointStruct,
        SearchPoints, UpsertPoints, Value, VectorParams, VectorsConfig, WithPayloadSelector,
    },
    Qdrant,
};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::qdrant_config::create_qdrant_client;
use super::vector_db::{CollectionSpec, ScoredChunk, SimilarityMetric, VectorStore};
use crate::config::QdrantSettings;
use crate::document::TextChunk;
use crate::error::{RagError, Result};

#[derive(Clone)]
pub struct QdrantStore {
    client: Arc<Qdrant>,
}

impl QdrantStore {
    pub async fn connect(settings: &QdrantSettings) -> Result<Self> {
        let client = create_qdrant_client(settings).await?;
        Ok(Self {
            client: Arc::new(client),
        })
    }
}

fn distance(metric: SimilarityMetric) -> Distance {
    match metric {
        SimilarityMetric::Cosine => Distance::Cosine,
        SimilarityMetric::DotProduct => Distance::Dot,
        SimilarityMetric::Euclidean => Distance::Euclid,
    }
}

fn store_error(e: impl std::fmt::Display) -> RagError {
    RagError::VectorStore(e.to_string())
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<bool> {
        if self
            .client
            .collection_exists(CollectionExistsRequest {
                collection_name: spec.name.clone(),
            })
            .await
            .map_err(store_error)?
        {
            log::info!("Collection {} already exists, skipping creation", spec.name);
            return Ok(false);
        }

        let vectors_config = VectorParams {
            size: spec.dimension as u64,
            distance: distance(spec.metric).into(),
            ..Default::default()
        };

        let create_collection = CreateCollection {
            collection_name: spec.name.clone(),
            vectors_config: Some(VectorsConfig {
                config: Some(Config::Params(vectors_config)),
            }),
            ..Default::default()
        };

        self.client
            .create_collection(create_collection)
            .await
            .map_err(store_error)?;
        log::info!("* Collection: {}", spec.name);
        Ok(true)
    }

    async fn has_documents(&self, collection: &str) -> Result<bool> {
        let request = CountPoints {
            collection_name: collection.to_string(),
            exact: Some(false),
            ..Default::default()
        };
        let response = self.client.count(request).await.map_err(store_error)?;
        Ok(response.result.map(|r| r.count).unwrap_or(0) > 0)
    }

    async fn insert(
        &self,
        collection: &str,
        chunks: &[TextChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(chunks.len());
        let points: Vec<PointStruct> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, vector)| {
                let point_id = Uuid::new_v4().to_string();
                ids.push(point_id.clone());

                let mut payload: HashMap<String, Value> = HashMap::new();
                payload.insert("content".to_string(), Value::from(chunk.content.clone()));
                payload.insert("source".to_string(), Value::from(chunk.source.clone()));

                PointStruct {
                    id: Some(PointId {
                        point_id_options: Some(PointIdOptions::Uuid(point_id)),
                    }),
                    vectors: Some(vector.clone().into()),
                    payload,
                }
            })
            .collect();

        let upsert_points = UpsertPoints {
            collection_name: collection.to_string(),
            wait: Some(true),
            points,
            ..Default::default()
        };

        self.client
            .upsert_points(upsert_points)
            .await
            .map_err(store_error)?;

        Ok(ids)
    }

    async fn search(&self, collection: &str, query: &[f32], k: usize) -> Result<Vec<ScoredChunk>> {
        let request = SearchPoints {
            collection_name: collection.to_string(),
            vector: query.to_vec(),
            limit: k as u64,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(SelectorOptions::Enable(true)),
            }),
            ..Default::default()
        };

        let results = self.client.search_points(request).await.map_err(store_error)?;

        Ok(results
            .result
            .into_iter()
            .filter_map(|point| {
                let content = point.payload.get("content")?.as_str()?.to_string();
                let source = point
                    .payload
                    .get("source")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                Some(ScoredChunk {
                    chunk: TextChunk { content, source },
                    score: point.score,
                })
            })
            .collect())
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}
