//! Confirmation and alert prompts
//!
//! Components never talk to the terminal directly; they ask a [`Prompter`].

use crate::core::error::{Error, Result};
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::collections::VecDeque;

pub trait Prompter {
    /// Ask a yes/no question
    fn confirm(&mut self, message: &str) -> Result<bool>;

    /// Show a blocking notice
    fn alert(&mut self, message: &str);
}

/// Interactive prompts on the controlling terminal
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, message: &str) -> Result<bool> {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(message)
            .default(false)
            .interact()
            .map_err(|e| Error::Prompt {
                message: format!("Confirmation failed: {}", e),
            })
    }

    fn alert(&mut self, message: &str) {
        eprintln!("! {}", message);
    }
}

/// Answers from a queue, then a fixed default (`--yes`, scripts, tests)
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<bool>,
    fallback: bool,
    /// Every message shown, confirmations and alerts alike
    pub transcript: Vec<String>,
}

impl ScriptedPrompter {
    /// Always answer `answer`
    pub fn always(answer: bool) -> Self {
        Self {
            fallback: answer,
            ..Self::default()
        }
    }

    /// Answer from `answers` in order, then `false`
    pub fn answers(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn asked(&self) -> usize {
        self.transcript.len()
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, message: &str) -> Result<bool> {
        self.transcript.push(message.to_string());
        Ok(self.answers.pop_front().unwrap_or(self.fallback))
    }

    fn alert(&mut self, message: &str) {
        self.transcript.push(message.to_string());
    }
}
