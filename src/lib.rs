pub mod commands;
pub mod config;
pub mod database;
pub mod document;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod providers;

#[cfg(test)]
mod testing;

pub use config::AppConfig;
pub use error::{RagError, Result};
pub use llm::{AnswerGenerator, MedicalResponse};
pub use pipeline::{IngestOutcome, Pipeline};
