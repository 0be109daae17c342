use std::sync::Arc;

use colored::Colorize;
use dotenv::dotenv;
use log::{error, info, warn};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;

use medrag::commands::{CommandHandler, Flow};
use medrag::llm::{AnswerGenerator, ContextRetriever, UnavailableRetriever};
use medrag::pipeline::{IngestOutcome, Pipeline};
use medrag::providers::gemini::GeminiProvider;
use medrag::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env();
    let pipeline = match Pipeline::start(&config).await {
        Ok(pipeline) => Some(pipeline),
        Err(e) => {
            error!("Startup failed, answers will fall back: {}", e);
            None
        }
    };

    if let Some(pipeline) = &pipeline {
        match pipeline.ingest_pdf(&config.ingest).await {
            Ok(IngestOutcome::Ingested {
                inserted,
                failed_batches,
                ..
            }) if failed_batches > 0 => {
                warn!("Ingested {} chunks, {} batches failed", inserted, failed_batches);
            }
            Ok(_) => {}
            Err(e) => error!("Ingestion into {} failed: {}", pipeline.collection(), e),
        }
    }

    let retriever: Arc<dyn ContextRetriever> = match &pipeline {
        Some(pipeline) => Arc::new(pipeline.retriever()),
        None => Arc::new(UnavailableRetriever::new("vector store or embedder not initialised")),
    };
    let provider = Arc::new(GeminiProvider::new(&config.gemini));
    info!("Using {} for answers", config.gemini.model);

    let mut command_handler = CommandHandler::new(AnswerGenerator::new(retriever, provider));

    println!("\n{}", "=== Medical AI Assistant ===".bold());
    println!("Type 'exit' to quit.\n");

    let mut rl = Editor::<(), DefaultHistory>::new()?;
    loop {
        match rl.readline("Enter your medical question: ") {
            Ok(line) => {
                let input = line.trim();
                if !input.is_empty() {
                    let _ = rl.add_history_entry(input);
                }

                match command_handler.handle_command(input).await {
                    Ok(Flow::Exit) => break,
                    Ok(Flow::Continue) => {}
                    Err(e) => println!("{}", e.red()),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("{}", "👋 Exiting Medical Assistant. Stay healthy!".green());
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    if let Some(pipeline) = pipeline {
        if let Err(e) = pipeline.close().await {
            warn!("Failed to close vector store: {}", e);
        }
    }
    Ok(())
}
