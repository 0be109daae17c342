use colored::Colorize;

use crate::llm::{AnswerGenerator, MedicalResponse};

mod system;

/// What the input loop should do after a line has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct CommandHandler {
    generator: AnswerGenerator,
}

impl CommandHandler {
    pub fn new(generator: AnswerGenerator) -> Self {
        Self { generator }
    }

    pub async fn handle_command(&mut self, input: &str) -> Result<Flow, String> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Flow::Continue);
        }

        match input.to_lowercase().as_str() {
            "help" | "exit" | "quit" => return system::handle_command(input),
            _ => {}
        }

        let response = self.generator.answer(input).await;
        print_response(&response)?;
        Ok(Flow::Continue)
    }
}

fn print_response(response: &MedicalResponse) -> Result<(), String> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| format!("Failed to render response: {}", e))?;
    println!("{}", json.truecolor(255, 236, 179));

    println!("\n{}\n", summary(response).cyan());
    Ok(())
}

fn summary(response: &MedicalResponse) -> String {
    format!(
        "Definition: {}\nSymptoms: {}",
        response.definition,
        response.symptoms.join(", ")
    )
}
