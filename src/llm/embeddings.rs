//! Text embeddings with the all-MiniLM-L6-v2 ONNX export (384 dimensions).

use log::info;
use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use tokenizers::Tokenizer;

use super::model_cache::{CachedModel, ModelCache};
use crate::config::EmbeddingConfig;
use crate::error::{RagError, Result};

/// Anything that turns text into fixed-length vectors.
pub trait EmbeddingProvider: Send + Sync {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("Empty embedding result".to_string()))
    }

    fn dimensions(&self) -> usize;

    fn name(&self) -> &str;
}

pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    model: String,
    dimensions: usize,
    max_length: usize,
    batch_size: usize,
}

impl OnnxEmbedder {
    /// Fetches the model into the local cache if needed, then loads it.
    pub async fn load(config: &EmbeddingConfig) -> Result<Self> {
        let files = ModelCache::new(config).acquire().await?;
        Self::from_files(config, &files)
    }

    pub fn from_files(config: &EmbeddingConfig, files: &CachedModel) -> Result<Self> {
        let cuda = CUDAExecutionProvider::default();
        let device = if cuda.is_available().unwrap_or(false) {
            "cuda"
        } else {
            "cpu"
        };
        info!("Using device: {}", device);

        // CUDA registration falls back to CPU when the runtime lacks it.
        let session = Session::builder()
            .map_err(|e| RagError::Embedding(format!("Failed to create session builder: {}", e)))?
            .with_execution_providers([cuda.build()])
            .map_err(|e| RagError::Embedding(format!("Failed to register device: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| RagError::Embedding(format!("Failed to set optimization level: {}", e)))?
            .commit_from_file(&files.model_path)
            .map_err(|e| RagError::Embedding(format!("Failed to load model: {}", e)))?;

        let tokenizer = Tokenizer::from_file(&files.tokenizer_path)
            .map_err(|e| RagError::Embedding(format!("Failed to load tokenizer: {}", e)))?;

        info!("Embedder ready ({})", config.model);
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            model: config.model.clone(),
            dimensions: config.dimensions,
            max_length: config.max_length,
            batch_size: config.batch_size.max(1),
        })
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let batch = texts.len();
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| RagError::Embedding(format!("Tokenization failed: {}", e)))?;

        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.max_length);

        let mut input_ids = vec![0i64; batch * seq_len];
        let mut attention_mask = vec![0i64; batch * seq_len];
        let mut token_type_ids = vec![0i64; batch * seq_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();
            for j in 0..ids.len().min(seq_len) {
                input_ids[i * seq_len + j] = ids[j] as i64;
                attention_mask[i * seq_len + j] = mask[j] as i64;
                token_type_ids[i * seq_len + j] = types[j] as i64;
            }
        }

        let shape = vec![batch, seq_len];
        let ids_tensor = Tensor::from_array((shape.clone(), input_ids.into_boxed_slice()))
            .map_err(|e| RagError::Embedding(format!("Input tensor creation failed: {}", e)))?;
        let mask_tensor = Tensor::from_array((shape.clone(), attention_mask.clone().into_boxed_slice()))
            .map_err(|e| RagError::Embedding(format!("Mask tensor creation failed: {}", e)))?;
        let types_tensor = Tensor::from_array((shape, token_type_ids.into_boxed_slice()))
            .map_err(|e| RagError::Embedding(format!("Type tensor creation failed: {}", e)))?;

        let inputs = vec![
            ("input_ids", ids_tensor.into_dyn()),
            ("attention_mask", mask_tensor.into_dyn()),
            ("token_type_ids", types_tensor.into_dyn()),
        ];

        let mut session = self.session.lock();
        let outputs = session
            .run(inputs)
            .map_err(|e| RagError::Embedding(format!("Inference failed: {}", e)))?;

        let output_iter: Vec<_> = outputs.iter().collect();
        let output = output_iter
            .iter()
            .find(|(name, _)| *name == "last_hidden_state")
            .or_else(|| output_iter.first())
            .map(|(_, v)| v)
            .ok_or_else(|| RagError::Embedding("No output tensor".to_string()))?;

        let (tensor_shape, hidden) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| RagError::Embedding(format!("Failed to extract tensor: {}", e)))?;
        let hidden_size = tensor_shape
            .iter()
            .nth(2)
            .map(|&d| d as usize)
            .unwrap_or(self.dimensions);
        if hidden.len() < batch * seq_len * hidden_size {
            return Err(RagError::Embedding(format!(
                "Output tensor holds {} values, expected {}",
                hidden.len(),
                batch * seq_len * hidden_size
            )));
        }

        let mut embeddings = Vec::with_capacity(batch);
        for i in 0..batch {
            let mask = &attention_mask[i * seq_len..(i + 1) * seq_len];
            let offset = i * seq_len * hidden_size;
            embeddings.push(mean_pool(
                &hidden[offset..offset + seq_len * hidden_size],
                mask,
                hidden_size,
            ));
        }

        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimensions) {
            return Err(RagError::Embedding(format!(
                "Model produced {} dimensions (expected {})",
                bad.len(),
                self.dimensions
            )));
        }
        Ok(embeddings)
    }
}

impl EmbeddingProvider for OnnxEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut all = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            all.extend(self.embed_chunk(chunk)?);
        }
        Ok(all)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Attention-masked mean over token states followed by L2 normalisation.
/// `hidden` holds `mask.len()` rows of `hidden_size` values.
pub fn mean_pool(hidden: &[f32], mask: &[i64], hidden_size: usize) -> Vec<f32> {
    let mut sum = vec![0.0f32; hidden_size];
    let mut count = 0.0f32;

    for (j, &m) in mask.iter().enumerate() {
        if m == 0 {
            continue;
        }
        let row = &hidden[j * hidden_size..(j + 1) * hidden_size];
        for (acc, value) in sum.iter_mut().zip(row) {
            *acc += value;
        }
        count += 1.0;
    }

    if count > 0.0 {
        for v in &mut sum {
            *v /= count;
        }
    }

    let norm: f32 = sum.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut sum {
            *v /= norm;
        }
    }
    sum
}
