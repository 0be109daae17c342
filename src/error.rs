use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Document error: {0}")]
    Document(String),
    #[error("Embedding error: {0}")]
    Embedding(String),
    #[error("Vector store error: {0}")]
    VectorStore(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Transient failures worth another attempt. Configuration problems never are.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Validation(_))
    }
}

impl From<reqwest::Error> for RagError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

impl From<serde_json::Error> for RagError {
    fn from(e: serde_json::Error) -> Self {
        Self::Validation(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(RagError::Network("reset".into()).is_retryable());
        assert!(RagError::validation("missing field").is_retryable());
        assert!(!RagError::config("GEMINI_KEY not set").is_retryable());
        assert!(!RagError::Document("corrupt".into()).is_retryable());
    }

    #[test]
    fn test_json_errors_are_validation() {
        let err: RagError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, RagError::Validation(_)));
    }
}
