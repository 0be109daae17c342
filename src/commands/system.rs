use colored::Colorize;

use super::Flow;

pub fn handle_command(input: &str) -> Result<Flow, String> {
    match input.to_lowercase().as_str() {
        "help" => {
            println!("\n🩺 Medical Assistant Commands:");
            println!("  Just type your medical question");
            println!("  Examples:");
            println!("    - What is acne?");
            println!("    - What are the symptoms of asthma?");
            println!();

            println!("⚙️ System Commands:");
            println!("  help  - Show this help menu");
            println!("  exit  - Exit the program (also: quit)");
            println!();
            Ok(Flow::Continue)
        }
        "exit" | "quit" => {
            println!("{}", "👋 Exiting Medical Assistant. Stay healthy!".green());
            Ok(Flow::Exit)
        }
        _ => Err("Unknown system command. Type 'help' for available commands.".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_words_any_case() {
        for word in ["exit", "quit", "EXIT", "Quit"] {
            assert_eq!(handle_command(word), Ok(Flow::Exit));
        }
    }

    #[test]
    fn test_help_continues() {
        assert_eq!(handle_command("help"), Ok(Flow::Continue));
        assert!(handle_command("reboot").is_err());
    }
}
