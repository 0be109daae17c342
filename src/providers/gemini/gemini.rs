use async_trait::async_trait;
use log::warn;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

use crate::config::GeminiConfig;
use crate::error::{RagError, Result};
use crate::providers::traits::{CompletionProvider, StructuredRequest};

#[derive(Clone)]
pub struct GeminiProvider {
    api_key: Option<String>,
    client: Client,
    model: String,
    api_base: String,
    temperature: f32,
    max_retries: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    temperature: f32,
    response_mime_type: &'a str,
    response_schema: &'a Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiProvider {
    pub fn new(config: &GeminiConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            client: Client::new(),
            model: config.model.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            max_retries: config.max_retries,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    fn build_body<'a>(&self, request: &'a StructuredRequest) -> GenerateRequest<'a> {
        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: &request.system,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: &request.user,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                response_mime_type: "application/json",
                response_schema: &request.schema,
            },
        }
    }

    async fn generate_once(&self, request: &StructuredRequest) -> Result<Value> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| RagError::config("GEMINI_KEY is not set"))?;

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&self.build_body(request))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RagError::config(format!("Gemini rejected the API key ({})", status)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Network(format!("Gemini returned {}: {}", status, body)));
        }

        let parsed: GenerateResponse = response.json().await?;
        let reply = reply_text(parsed)?;
        let value: Value = serde_json::from_str(strip_code_fence(&reply))?;
        check_required(&value, &request.schema)?;
        Ok(value)
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    async fn complete_structured(&self, request: &StructuredRequest) -> Result<Value> {
        with_retries(self.max_retries, Duration::from_millis(500), || {
            self.generate_once(request)
        })
        .await
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Runs `op` once plus up to `max_retries` more times while it fails with a
/// retryable error, doubling the pause between attempts.
pub async fn with_retries<T, F, Fut>(max_retries: u32, base_delay: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                attempt += 1;
                warn!("Generation attempt {} failed, retrying: {}", attempt, e);
                tokio::time::sleep(base_delay * 2u32.pow(attempt - 1)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

fn reply_text(response: GenerateResponse) -> Result<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(RagError::validation(format!("Prompt blocked: {}", reason)));
    }
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| RagError::validation("No text in Gemini response"))
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => rest
            .trim_start_matches("json")
            .trim_start_matches("JSON")
            .trim_end()
            .trim_end_matches("```")
            .trim(),
        None => trimmed,
    }
}

fn check_required(value: &Value, schema: &Value) -> Result<()> {
    let object = value
        .as_object()
        .ok_or_else(|| RagError::validation("Model reply is not a JSON object"))?;
    let missing: Vec<&str> = schema
        .get("required")
        .and_then(|r| r.as_array())
        .map(|required| {
            required
                .iter()
                .filter_map(|k| k.as_str())
                .filter(|k| object.get(*k).map(Value::is_null).unwrap_or(true))
                .collect()
        })
        .unwrap_or_default();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(RagError::validation(format!(
            "Model reply is missing required fields: {}",
            missing.join(", ")
        )))
    }
}
