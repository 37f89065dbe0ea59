//! Operator interaction.

use console::style;
use dialoguer::{Confirm, Select};

#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("prompt failed: {0}")]
    Terminal(#[from] dialoguer::Error),

    /// A scripted prompter ran out of answers
    #[error("no answer scripted for prompt '{0}'")]
    Exhausted(String),
}

/// Yes/no and single-choice questions plus status reporting.
pub trait Prompter {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, PromptError>;

    /// Index into `items` of the chosen entry.
    fn select(&mut self, message: &str, items: &[String]) -> Result<usize, PromptError>;

    fn info(&mut self, message: &str);
    fn error(&mut self, message: &str);
    fn success(&mut self, message: &str);
}

/// Interactive terminal prompts.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, message: &str, default: bool) -> Result<bool, PromptError> {
        Ok(Confirm::new()
            .with_prompt(message)
            .default(default)
            .interact()?)
    }

    fn select(&mut self, message: &str, items: &[String]) -> Result<usize, PromptError> {
        Ok(Select::new()
            .with_prompt(message)
            .items(items)
            .default(0)
            .interact()?)
    }

    fn info(&mut self, message: &str) {
        println!("{}", message);
    }

    fn error(&mut self, message: &str) {
        eprintln!("{} {}", style("✗").red().bold(), message);
    }

    fn success(&mut self, message: &str) {
        println!("{} {}", style("✓").green().bold(), message);
    }
}
