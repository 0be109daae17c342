use std::env;
use std::path::PathBuf;

use crate::error::{RagError, Result};

pub const EMBEDDING_DIMENSION: usize = 384;
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_NAMESPACE: &str = "default_keyspace";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorBackend {
    Astra,
    Qdrant,
}

#[derive(Debug, Clone)]
pub struct AstraConfig {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub namespace: String,
}

#[derive(Debug, Clone)]
pub struct QdrantSettings {
    pub url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Hugging Face repository the ONNX export and tokenizer are fetched from.
    pub model: String,
    pub cache_dir: PathBuf,
    pub dimensions: usize,
    pub max_length: usize,
    pub batch_size: usize,
}

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub pdf_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub batch_size: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: VectorBackend,
    pub collection_name: Option<String>,
    pub astra: AstraConfig,
    pub qdrant: QdrantSettings,
    pub gemini: GeminiConfig,
    pub embedding: EmbeddingConfig,
    pub ingest: IngestConfig,
    pub top_k: usize,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Credentials are
    /// kept optional here; the clients that need them report their absence.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let number = |key: &str, default: usize| {
            get(key)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(default)
        };

        let backend = match get("VECTOR_BACKEND").map(|b| b.to_lowercase()) {
            Some(b) if b == "qdrant" => VectorBackend::Qdrant,
            _ => VectorBackend::Astra,
        };

        let embedding_model =
            get("EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
        let cache_dir = get("RAG_MODEL_DIR").map(PathBuf::from).unwrap_or_else(|| {
            let short = embedding_model.rsplit('/').next().unwrap_or(&embedding_model);
            PathBuf::from("./hf_models").join(short)
        });

        Self {
            backend,
            collection_name: get("DB_COLLECTION_NAME"),
            astra: AstraConfig {
                endpoint: get("ASTRADB_ENDPOINT"),
                token: get("ASTRA_TOKEN"),
                namespace: get("ASTRA_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            },
            qdrant: QdrantSettings {
                url: get("QDRANT_URL").unwrap_or_else(|| "http://localhost:6334".to_string()),
                api_key: get("QDRANT_API_KEY"),
            },
            gemini: GeminiConfig {
                api_key: get("GEMINI_KEY"),
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                api_base: get("GEMINI_API_URL").unwrap_or_else(|| {
                    "https://generativelanguage.googleapis.com/v1beta".to_string()
                }),
                temperature: get("GEMINI_TEMPERATURE")
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(0.2),
                max_retries: 2,
            },
            embedding: EmbeddingConfig {
                model: embedding_model,
                cache_dir,
                dimensions: EMBEDDING_DIMENSION,
                max_length: 256,
                batch_size: 32,
            },
            ingest: IngestConfig {
                pdf_path: get("RAG_PDF_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("data/medical_book_fixed.pdf")),
                chunk_size: number("RAG_CHUNK_SIZE", 1000),
                chunk_overlap: number("RAG_CHUNK_OVERLAP", 100),
                batch_size: number("RAG_BATCH_SIZE", 100).max(1),
            },
            top_k: number("RAG_TOP_K", 3).max(1),
        }
    }

    pub fn collection(&self) -> Result<&str> {
        self.collection_name
            .as_deref()
            .ok_or_else(|| RagError::config("DB_COLLECTION_NAME is not set"))
    }
}
