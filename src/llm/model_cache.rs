use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info};
use reqwest::Client;
use tempfile::NamedTempFile;

use crate::config::EmbeddingConfig;
use crate::error::{RagError, Result};

const HUB_URL: &str = "https://huggingface.co";
const MODEL_FILE: &str = "model.onnx";
const TOKENIZER_FILE: &str = "tokenizer.json";

/// Local copies of the embedding model files. Only handed out once both files
/// are complete on disk.
#[derive(Debug, Clone)]
pub struct CachedModel {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
}

pub struct ModelCache {
    dir: PathBuf,
    repo: String,
    hub_url: String,
    client: Client,
}

impl ModelCache {
    pub fn new(config: &EmbeddingConfig) -> Self {
        Self {
            dir: config.cache_dir.clone(),
            repo: config.model.clone(),
            hub_url: HUB_URL.to_string(),
            client: Client::new(),
        }
    }

    pub fn with_hub_url(mut self, url: impl Into<String>) -> Self {
        self.hub_url = url.into();
        self
    }

    /// Returns the cached files, downloading whichever are missing first.
    pub async fn acquire(&self) -> Result<CachedModel> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            RagError::config(format!(
                "Failed to create model cache {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let model = CachedModel {
            model_path: self.dir.join(MODEL_FILE),
            tokenizer_path: self.dir.join(TOKENIZER_FILE),
        };

        let wanted = [
            ("onnx/model.onnx", &model.model_path),
            (TOKENIZER_FILE, &model.tokenizer_path),
        ];
        let mut fetched = false;
        for (remote, local) in wanted {
            if is_complete(local) {
                debug!("Using cached {}", local.display());
                continue;
            }
            self.fetch(remote, local).await?;
            fetched = true;
        }

        if fetched {
            info!("Model saved to {}", self.dir.display());
        } else {
            info!("Model already downloaded");
        }
        Ok(model)
    }

    async fn fetch(&self, remote: &str, target: &Path) -> Result<()> {
        let url = format!(
            "{}/{}/resolve/main/{}",
            self.hub_url.trim_end_matches('/'),
            self.repo,
            remote
        );
        info!("Downloading {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(RagError::Network(format!(
                "Download of {} failed: HTTP {}",
                url,
                response.status()
            )));
        }
        let bytes = response.bytes().await?;
        self.persist(&bytes, target)?;
        info!("Saved {} ({} bytes)", target.display(), bytes.len());
        Ok(())
    }

    /// Writes through a temporary file in the cache directory. The temporary
    /// is removed on every early return, so `target` is either absent or whole.
    fn persist(&self, bytes: &[u8], target: &Path) -> Result<()> {
        if bytes.is_empty() {
            return Err(RagError::Embedding(format!(
                "Refusing to cache empty file {}",
                target.display()
            )));
        }
        let mut staged = NamedTempFile::new_in(&self.dir)?;
        staged.write_all(bytes)?;
        staged.as_file().sync_all()?;
        staged.persist(target).map_err(|e| RagError::Io(e.error))?;
        Ok(())
    }
}

fn is_complete(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}
