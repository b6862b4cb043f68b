//! JSON parsing with lenient or strict failure handling.

use log::warn;
use serde_json::{Map, Value};

use crate::error::{FactsError, Result};

/// Parse state shared by the batteries of one gather.
///
/// In lenient mode (the default) a reply that is not valid JSON parses as an
/// empty object and a warning is recorded. In strict mode it is an error.
#[derive(Debug, Default)]
pub struct ParseContext {
    strict: bool,
    warnings: Vec<String>,
}

impl ParseContext {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            warnings: Vec::new(),
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Parse the reply of `command`.
    pub fn parse_json(&mut self, command: &str, text: &str) -> Result<Value> {
        match serde_json::from_str(text) {
            Ok(value) => Ok(value),
            Err(source) if self.strict => Err(FactsError::Parse {
                command: command.to_string(),
                source,
            }
            .into()),
            Err(e) => {
                self.warn(format!("Unable to parse output of '{}' as JSON: {}", command, e));
                Ok(Value::Object(Map::new()))
            }
        }
    }

    /// Record a warning for the caller.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_valid_json() {
        let mut ctx = ParseContext::default();
        let value = assert_ok!(ctx.parse_json("show version | json", r#"{"version": "4.30.1F"}"#));
        assert_eq!(value, json!({"version": "4.30.1F"}));
        assert!(ctx.warnings().is_empty());
    }

    #[test]
    fn test_lenient_failure_is_empty_object() {
        let mut ctx = ParseContext::new(false);
        let value = assert_ok!(ctx.parse_json("show vlan | json", "% Unavailable command"));
        assert_eq!(value, json!({}));
        assert_eq!(ctx.warnings().len(), 1);
        assert!(ctx.warnings()[0].contains("show vlan | json"));
    }

    #[test]
    fn test_strict_failure_is_error() {
        let mut ctx = ParseContext::new(true);
        let err = assert_err!(ctx.parse_json("show vlan | json", "{"));
        assert!(matches!(err, Error::Facts(FactsError::Parse { .. })));
        assert!(ctx.into_warnings().is_empty());
    }
}
