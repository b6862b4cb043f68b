//! Response type for command execution results.

use std::time::Duration;

/// Response from a completed command.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// The command output (echo and trailing prompt removed, `\r\n` folded to `\n`).
    pub result: String,

    /// Everything received for this command, prompt included.
    pub raw_result: String,

    /// The prompt that completed the command.
    pub prompt: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,
}

impl Response {
    /// Create a new response.
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        raw_result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            raw_result: raw_result.into(),
            prompt: prompt.into(),
            elapsed,
        }
    }

    /// Get the result lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.result.lines()
    }

    /// Check if the result contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.result.contains(pattern)
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}

/// Strip the command echo and surrounding blank lines from the text that
/// preceded the prompt.
pub(crate) fn normalize_output(raw: &str, command: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "");
    let text = text.trim_start_matches('\n');
    let text = if command.is_empty() {
        text
    } else {
        text.strip_prefix(command).unwrap_or(text)
    };
    text.trim_matches('\n').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_echo() {
        let raw = "show clock\r\nFri Oct 17 10:00:00 2026\r\nTimezone: UTC\r";
        assert_eq!(
            normalize_output(raw, "show clock"),
            "Fri Oct 17 10:00:00 2026\nTimezone: UTC"
        );
    }

    #[test]
    fn test_normalize_without_echo() {
        assert_eq!(normalize_output("\r\n{}\r\n", "show version | json"), "{}");
        assert_eq!(normalize_output("", "terminal length 0"), "");
    }

    #[test]
    fn test_response_helpers() {
        let response = Response::new(
            "show hostname",
            "Hostname: sw1\nFQDN: sw1.lab",
            "raw",
            "sw1#",
            Duration::from_millis(5),
        );
        assert_eq!(response.lines().count(), 2);
        assert!(response.contains("FQDN"));
        assert_eq!(response.to_string(), "Hostname: sw1\nFQDN: sw1.lab");
    }
}
