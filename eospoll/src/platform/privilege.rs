//! Privilege mode inferred from the CLI prompt.

use std::fmt;

/// Privilege level of a CLI session.
///
/// Derived from the trailing character of the last prompt seen:
/// `#` means privileged (enable) mode, `>` or `$` means user mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrivilegeMode {
    /// User EXEC mode (`switch>`).
    User,
    /// Privileged EXEC mode, including configuration contexts (`switch#`).
    Privileged,
}

impl PrivilegeMode {
    /// Infer the privilege mode from a prompt.
    ///
    /// Returns `None` when the prompt has no recognizable trailing character.
    pub fn from_prompt(prompt: &str) -> Option<Self> {
        match prompt.trim_end().chars().last()? {
            '#' => Some(PrivilegeMode::Privileged),
            '>' | '$' => Some(PrivilegeMode::User),
            _ => None,
        }
    }

    /// The mode name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivilegeMode::User => "user",
            PrivilegeMode::Privileged => "privileged",
        }
    }
}

impl fmt::Display for PrivilegeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the prompt shows a nested configuration context, e.g. `switch(config-if-Et1)#`.
pub fn is_config_context(prompt: &str) -> bool {
    prompt.trim().ends_with(")#")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_prompt() {
        assert_eq!(PrivilegeMode::from_prompt("switch>"), Some(PrivilegeMode::User));
        assert_eq!(PrivilegeMode::from_prompt("switch> "), Some(PrivilegeMode::User));
        assert_eq!(
            PrivilegeMode::from_prompt("switch#"),
            Some(PrivilegeMode::Privileged)
        );
        assert_eq!(
            PrivilegeMode::from_prompt("switch(config-if-Et1)#"),
            Some(PrivilegeMode::Privileged)
        );
        assert_eq!(
            PrivilegeMode::from_prompt("[admin@switch ~]$ "),
            Some(PrivilegeMode::User)
        );
        assert_eq!(PrivilegeMode::from_prompt("Password: "), None);
        assert_eq!(PrivilegeMode::from_prompt(""), None);
    }

    #[test]
    fn test_config_context() {
        assert!(is_config_context("switch(config)#"));
        assert!(is_config_context("switch(config-if-Et1)# "));
        assert!(!is_config_context("switch#"));
        assert!(!is_config_context("switch>"));
    }
}
