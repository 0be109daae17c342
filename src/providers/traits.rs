use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// A prompt for a model that must answer with JSON matching `schema`.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub system: String,
    pub user: String,
    pub schema: Value,
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Returns the decoded JSON object. Implementations reject replies that
    /// lack any of the schema's `required` properties.
    async fn complete_structured(&self, request: &StructuredRequest) -> Result<Value>;

    fn name(&self) -> &str;

    fn model(&self) -> &str;
}
