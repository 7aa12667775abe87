//! Interactive prompt capability
//!
//! Commands ask for omitted arguments through this trait. The REPL implements
//! it with its line editor; [`ScriptedPrompt`] answers from a fixed list.

use crate::error::{Result, ShellError};
use async_trait::async_trait;
use std::collections::VecDeque;

/// Source of operator-supplied strings
#[async_trait]
pub trait Prompt: Send {
    /// Ask for a value labelled `label`, blocking until one is supplied
    async fn prompt_for_string(&mut self, label: &str) -> Result<String>;
}

/// Prompt answering from a predefined queue
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompt {
    /// Create a prompt that will answer with `answers` in order
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// Labels asked so far
    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

#[async_trait]
impl Prompt for ScriptedPrompt {
    async fn prompt_for_string(&mut self, label: &str) -> Result<String> {
        self.asked.push(label.to_string());
        self.answers.pop_front().ok_or(ShellError::PromptCancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_prompt_runs_out() {
        let mut prompt = ScriptedPrompt::new(["shop"]);
        assert_eq!(prompt.prompt_for_string("Catalog name:").await.unwrap(), "shop");
        assert!(matches!(
            prompt.prompt_for_string("Catalog name:").await,
            Err(ShellError::PromptCancelled)
        ));
        assert_eq!(prompt.asked().len(), 2);
    }
}
