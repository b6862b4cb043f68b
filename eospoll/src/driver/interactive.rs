//! Commands that may raise an interactive question.
//!
//! Some commands stop mid-way and wait for input:
//! - `enable` asks for a password when one is configured
//! - `copy running-config startup-config` may ask for confirmation
//! - `reload` asks `Proceed with reload? [confirm]`
//!
//! A [`PromptedCommand`] carries the question pattern and the answer to give.
//! The answer is written at most once; the command then completes on the
//! normal CLI prompt like any other.

use std::time::Duration;

use regex::bytes::Regex;

/// A command plus an optional `(prompt, answer)` pair.
#[derive(Debug, Clone)]
pub struct PromptedCommand {
    /// The command line to send.
    pub command: String,

    /// Pattern of the question the device may ask.
    pub prompt: Option<Regex>,

    /// Answer written when `prompt` is seen.
    pub answer: Option<String>,

    /// Whether the answer should be masked in logs (e.g., passwords).
    pub hidden: bool,

    /// Optional timeout override for this command.
    pub timeout: Option<Duration>,
}

impl PromptedCommand {
    /// A plain command with no expected question.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            prompt: None,
            answer: None,
            hidden: false,
            timeout: None,
        }
    }

    /// Answer `prompt` with `answer`, returning an error if the pattern is invalid.
    pub fn with_answer(
        self,
        prompt: &str,
        answer: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        Ok(self.with_answer_regex(Regex::new(prompt)?, answer))
    }

    /// Answer an already compiled prompt pattern.
    pub fn with_answer_regex(mut self, prompt: Regex, answer: impl Into<String>) -> Self {
        self.prompt = Some(prompt);
        self.answer = Some(answer.into());
        self
    }

    /// Mask the answer in logs.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Set a custom timeout for this command.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The answer to write if `tail` ends with this command's question.
    pub(crate) fn answer_for(&self, tail: &[u8]) -> Option<&str> {
        match (&self.prompt, &self.answer) {
            (Some(prompt), Some(answer)) if prompt.is_match(tail) => Some(answer.as_str()),
            _ => None,
        }
    }

    /// The answer as it may appear in logs.
    pub(crate) fn loggable_answer(&self) -> &str {
        match &self.answer {
            Some(_) if self.hidden => "********",
            Some(answer) => answer,
            None => "",
        }
    }
}

impl From<&str> for PromptedCommand {
    fn from(command: &str) -> Self {
        PromptedCommand::new(command)
    }
}

impl From<String> for PromptedCommand {
    fn from(command: String) -> Self {
        PromptedCommand::new(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_command() {
        let cmd = PromptedCommand::new("show version");
        assert_eq!(cmd.command, "show version");
        assert!(cmd.answer_for(b"Password: ").is_none());
        assert!(!cmd.hidden);
        assert!(cmd.timeout.is_none());
    }

    #[test]
    fn test_answer_matches_tail() {
        let cmd = PromptedCommand::new("write memory")
            .with_answer(r"\[y/n\]:\s*$", "y")
            .unwrap();
        assert_eq!(cmd.answer_for(b"Overwrite? [y/n]: "), Some("y"));
        assert_eq!(cmd.answer_for(b"Copy completed successfully."), None);
    }

    #[test]
    fn test_hidden_answer_is_masked() {
        let cmd = PromptedCommand::new("enable")
            .with_answer(r"(?i)password: ?$", "s3cret")
            .unwrap()
            .hidden();
        assert_eq!(cmd.loggable_answer(), "********");
        assert_eq!(cmd.answer_for(b"Password: "), Some("s3cret"));
    }

    #[test]
    fn test_invalid_prompt_pattern() {
        assert!(PromptedCommand::new("x").with_answer("(", "y").is_err());
    }
}
