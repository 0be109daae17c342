pub mod answer;
pub mod embeddings;
pub mod medical;
pub mod model_cache;
pub mod retriever;

pub use answer::{AnswerGenerator, AnswerStage};
pub use embeddings::{EmbeddingProvider, OnnxEmbedder};
pub use medical::MedicalResponse;
pub use model_cache::{CachedModel, ModelCache};
pub use retriever::{ContextRetriever, UnavailableRetriever, VectorRetriever};
