//! Question answering: retrieve context, prompt the model for the structured
//! medical schema, clean the reply. Any failure collapses into
//! `MedicalResponse::fallback()` when going through [`AnswerGenerator::answer`].

use log::{debug, warn};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::medical::MedicalResponse;
use super::retriever::ContextRetriever;
use crate::database::ScoredChunk;
use crate::error::RagError;
use crate::providers::traits::{CompletionProvider, StructuredRequest};

const HUMAN_TURN: &str = "Answer the question above in the exact plain-text structured format.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerStage {
    Retrieve,
    Prompt,
    Generate,
    Normalize,
    Done,
    Fallback,
}

impl fmt::Display for AnswerStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Retrieve => "retrieve",
            Self::Prompt => "prompt",
            Self::Generate => "generate",
            Self::Normalize => "normalize",
            Self::Done => "done",
            Self::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct AnswerError {
    pub stage: AnswerStage,
    #[source]
    pub source: RagError,
}

impl AnswerError {
    fn at(stage: AnswerStage) -> impl FnOnce(RagError) -> Self {
        move |source| Self { stage, source }
    }
}

pub struct AnswerGenerator {
    retriever: Arc<dyn ContextRetriever>,
    provider: Arc<dyn CompletionProvider>,
}

impl AnswerGenerator {
    pub fn new(retriever: Arc<dyn ContextRetriever>, provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            retriever,
            provider,
        }
    }

    /// Never fails: errors are logged and replaced by the fallback response.
    pub async fn answer(&self, question: &str) -> MedicalResponse {
        match self.try_answer(question).await {
            Ok(response) => response,
            Err(e) => {
                warn!("⚠️ Error in structured output: {}", e);
                debug!("entering {} after {}", AnswerStage::Fallback, e.stage);
                MedicalResponse::fallback()
            }
        }
    }

    pub async fn try_answer(&self, question: &str) -> Result<MedicalResponse, AnswerError> {
        debug!("{}", AnswerStage::Retrieve);
        let hits = self
            .retriever
            .retrieve(question)
            .await
            .map_err(AnswerError::at(AnswerStage::Retrieve))?;
        let context = build_context(&hits);

        debug!("{} ({} context chars)", AnswerStage::Prompt, context.len());
        let request = render_prompt(&context, question);

        debug!("{} via {}/{}", AnswerStage::Generate, self.provider.name(), self.provider.model());
        let reply = self
            .provider
            .complete_structured(&request)
            .await
            .map_err(AnswerError::at(AnswerStage::Generate))?;
        let response: MedicalResponse = serde_json::from_value(reply)
            .map_err(|e| AnswerError::at(AnswerStage::Generate)(e.into()))?;

        debug!("{}", AnswerStage::Normalize);
        let response = response.strip_all_markdown();

        debug!("{}", AnswerStage::Done);
        Ok(response)
    }
}

/// Chunk contents in rank order, separated by a blank line.
pub fn build_context(hits: &[ScoredChunk]) -> String {
    hits.iter()
        .map(|hit| hit.chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_prompt(context: &str, question: &str) -> StructuredRequest {
    let system = format!(
        r#"You are a highly knowledgeable medical AI assistant.
Always output in plain text only (NO markdown, no asterisks, no bold, no headings).
Use simple numbered or bulleted lists when needed.

Required fields (always output all):
1. Definition
2. Causes & Risk Factors
3. Symptoms
4. Diagnosis
5. Treatment / Cure
6. Prognosis / Complications
7. Prevention & Lifestyle Advice
8. Additional Notes

---
Context:
{}

Question:
{}

Structured Medical Response:
"#,
        context, question
    );

    StructuredRequest {
        system,
        user: HUMAN_TURN.to_string(),
        schema: MedicalResponse::schema(),
    }
}
