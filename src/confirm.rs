//! User confirmation prompts
//!
//! Mutating actions ask before sending anything. [`Confirm`] covers both
//! prompt styles: a yes/no question, and free text the caller compares
//! against a literal.

use async_trait::async_trait;
use std::io::{BufRead, Write};

#[async_trait]
pub trait Confirm: Send + Sync {
    /// Yes/no question; `false` on anything but an explicit yes
    async fn confirm(&self, question: &str) -> bool;

    /// Free-text answer; `None` when the user dismissed the prompt
    async fn prompt(&self, message: &str) -> Option<String>;
}

/// Interactive prompts on stderr/stdin
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirm;

fn read_answer(message: String, suffix: &'static str) -> Option<String> {
    let mut stderr = std::io::stderr().lock();
    // A failed write still lets the user answer
    let _ = write!(stderr, "{}{}", message, suffix);
    let _ = stderr.flush();

    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read answer from stdin");
            None
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "s" | "si" | "sí" | "y" | "yes"
    )
}

#[async_trait]
impl Confirm for TerminalConfirm {
    async fn confirm(&self, question: &str) -> bool {
        let question = question.to_string();
        match tokio::task::spawn_blocking(move || read_answer(question, " [s/N] ")).await {
            Ok(Some(answer)) => is_yes(&answer),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Confirmation prompt task failed");
                false
            }
        }
    }

    async fn prompt(&self, message: &str) -> Option<String> {
        let message = message.to_string();
        match tokio::task::spawn_blocking(move || read_answer(message, "\n> ")).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "Prompt task failed");
                None
            }
        }
    }
}

/// Answers yes to every question, for `--yes`. Free-text prompts are still
/// dismissed, so literal confirmations can never be skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

#[async_trait]
impl Confirm for AssumeYes {
    async fn confirm(&self, question: &str) -> bool {
        tracing::debug!(question, "Assuming yes");
        true
    }

    async fn prompt(&self, _message: &str) -> Option<String> {
        None
    }
}
