//! Platform definition for vendor-specific CLI behavior.

use regex::bytes::Regex;

use crate::channel::{CompiledPattern, PatternMatch, PatternSet};
use crate::error::{PlatformError, Result};

/// Everything the session controller needs to know about one CLI dialect.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g., "arista_eos").
    pub name: String,

    /// Ordered patterns recognized as "command complete, awaiting input".
    pub prompt_patterns: PatternSet,

    /// Ordered patterns recognized as "command failed".
    pub error_patterns: PatternSet,

    /// Commands to run when the session is opened.
    pub on_open_commands: Vec<String>,

    /// Question the device may ask right after login.
    pub initial_prompt: Option<Regex>,

    /// Answer to `initial_prompt`.
    pub initial_answer: Option<String>,

    /// Command that raises the session to privileged mode.
    pub escalate_command: String,

    /// Password prompt raised by `escalate_command`.
    pub escalate_prompt: Option<Regex>,

    /// Command that drops privileged mode.
    pub deescalate_command: String,

    /// Command that enters configuration mode.
    pub config_command: String,

    /// Command that leaves any configuration context.
    pub config_exit_command: String,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,
}

impl PlatformDefinition {
    /// Create a new platform definition with minimal required fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt_patterns: PatternSet::new(),
            error_patterns: PatternSet::new(),
            on_open_commands: vec![],
            initial_prompt: None,
            initial_answer: None,
            escalate_command: "enable".to_string(),
            escalate_prompt: None,
            deescalate_command: "disable".to_string(),
            config_command: "configure terminal".to_string(),
            config_exit_command: "end".to_string(),
            terminal_width: 511,
            terminal_height: 24,
        }
    }

    /// Add a prompt pattern at the lowest priority.
    pub fn with_prompt_pattern(mut self, pattern: &str) -> std::result::Result<Self, regex::Error> {
        self.prompt_patterns.push(CompiledPattern::new(pattern)?);
        Ok(self)
    }

    /// Add an error pattern at the lowest priority.
    pub fn with_error_pattern(mut self, pattern: &str) -> std::result::Result<Self, regex::Error> {
        self.error_patterns.push(CompiledPattern::new(pattern)?);
        Ok(self)
    }

    /// Add an error pattern whose matches are ignored when they contain any of `excluded`.
    pub fn with_error_pattern_excluding(
        mut self,
        pattern: &str,
        excluded: &[&str],
    ) -> std::result::Result<Self, regex::Error> {
        self.error_patterns.push(CompiledPattern::with_not_contains(
            pattern,
            excluded.iter().copied(),
        )?);
        Ok(self)
    }

    /// Add an on_open command.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// Answer `pattern` with `answer` if the device asks it right after login.
    pub fn with_initial_prompt(
        mut self,
        pattern: &str,
        answer: impl Into<String>,
    ) -> std::result::Result<Self, regex::Error> {
        self.initial_prompt = Some(Regex::new(pattern)?);
        self.initial_answer = Some(answer.into());
        Ok(self)
    }

    /// Set the escalation command and its password prompt.
    pub fn with_escalate(
        mut self,
        command: impl Into<String>,
        auth_prompt: &str,
    ) -> std::result::Result<Self, regex::Error> {
        self.escalate_command = command.into();
        self.escalate_prompt = Some(Regex::new(auth_prompt)?);
        Ok(self)
    }

    /// Set the de-escalation command.
    pub fn with_deescalate(mut self, command: impl Into<String>) -> Self {
        self.deescalate_command = command.into();
        self
    }

    /// Set terminal dimensions.
    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Scan `data` against the prompt patterns; first match wins.
    pub fn detect_prompt(&self, data: &[u8]) -> Option<PatternMatch> {
        self.prompt_patterns.first_match(data)
    }

    /// Scan `data` against the error patterns; first match wins.
    pub fn detect_error(&self, data: &[u8]) -> Option<PatternMatch> {
        self.error_patterns.first_match(data)
    }

    /// Check that the definition can drive a session.
    pub fn validate(&self) -> Result<()> {
        if self.prompt_patterns.is_empty() {
            return Err(PlatformError::InvalidDefinition {
                message: format!("platform '{}' has no prompt patterns", self.name),
            }
            .into());
        }
        if self.initial_prompt.is_some() != self.initial_answer.is_some() {
            return Err(PlatformError::InvalidDefinition {
                message: format!(
                    "platform '{}' must set initial prompt and answer together",
                    self.name
                ),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let platform = PlatformDefinition::new("test");
        assert_eq!(platform.escalate_command, "enable");
        assert_eq!(platform.deescalate_command, "disable");
        assert_eq!(platform.config_exit_command, "end");
        assert!(platform.escalate_prompt.is_none());
    }

    #[test]
    fn test_validate_requires_prompt() {
        let platform = PlatformDefinition::new("empty");
        assert!(platform.validate().is_err());

        let platform = PlatformDefinition::new("ok")
            .with_prompt_pattern(r"[>#]\s*$")
            .unwrap();
        assert!(platform.validate().is_ok());
    }

    #[test]
    fn test_error_pattern_excluding() {
        let platform = PlatformDefinition::new("test")
            .with_error_pattern_excluding(r"% Error:[^\n]*\n", &["already exists"])
            .unwrap();

        assert!(platform.detect_error(b"% Error: vlan already exists\n").is_none());
        assert!(platform.detect_error(b"% Error: disk full\n").is_some());
    }
}
