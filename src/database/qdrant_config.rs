use qdrant_client::{config::QdrantConfig, Qdrant};
use std::time::Duration;

use crate::config::QdrantSettings;
use crate::error::{RagError, Result};

/// Normalises a Qdrant URL to the gRPC port the client speaks.
pub fn grpc_url(url: &str) -> String {
    let clean_url = if url.contains("://") {
        url.split("://").nth(1).unwrap_or(url).to_string()
    } else {
        url.to_string()
    };
    let clean_url = clean_url.trim_end_matches('/');

    let grpc_url = if clean_url.ends_with(":6333") {
        clean_url.replace(":6333", ":6334")
    } else {
        clean_url.to_string()
    };

    let scheme = if url.starts_with("https://") { "https" } else { "http" };
    format!("{}://{}", scheme, grpc_url)
}

pub async fn create_qdrant_client(settings: &QdrantSettings) -> Result<Qdrant> {
    let url = grpc_url(&settings.url);
    log::info!("Attempting to connect to Qdrant with URL: {}", url);

    let mut config = QdrantConfig::from_url(&url);
    config.check_compatibility = false;
    config.timeout = Duration::from_secs(30);
    config.connect_timeout = Duration::from_secs(10);
    config.api_key = settings.api_key.clone();

    let client = Qdrant::new(config)
        .map_err(|e| RagError::config(format!("Invalid Qdrant configuration: {}", e)))?;

    match client.list_collections().await {
        Ok(_) => {
            log::info!("Successfully connected to Qdrant");
            Ok(client)
        }
        Err(e) => {
            log::error!("Connection test failed: {}", e);
            Err(RagError::Network(format!("Failed to connect to Qdrant: {}", e)))
        }
    }
}
