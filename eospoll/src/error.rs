//! Error types for eospoll.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for eospoll operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Session-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Platform definition errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Fact gathering errors
    #[error("Facts error: {0}")]
    Facts(#[from] FactsError),

    /// Configuration push errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Whether this error is a device-reported command failure.
    pub fn is_command_error(&self) -> bool {
        matches!(self, Error::Driver(DriverError::Command { .. }))
    }

    /// Whether this error is a command deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Error::Driver(DriverError::Timeout { .. }) | Error::Transport(TransportError::Timeout(_))
        )
    }
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Host is not in known_hosts and strict checking is enabled
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Channel layer errors (PTY operations, pattern compilation).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to open PTY channel
    #[error("Failed to open PTY channel: {0}")]
    PtyOpenFailed(russh::Error),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Session errors (command execution, privilege changes).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Session not connected
    #[error("Session not connected")]
    NotConnected,

    /// Session already opened
    #[error("Session already opened")]
    AlreadyConnected,

    /// Terminal setup after login failed
    #[error("unable to set terminal parameters: {message}")]
    ConnectionSetup { message: String },

    /// `enable` did not reach a privileged prompt
    #[error("unable to elevate privilege to enable mode: {message}")]
    PrivilegeEscalation { message: String },

    /// The device classified the command output as an error
    #[error("Command '{command}' failed: {message}")]
    Command { command: String, message: String },

    /// No prompt or error pattern was seen before the deadline
    #[error("Command '{command}' timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    /// Invalid configuration in the session builder
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Platform definition errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Invalid platform definition
    #[error("Invalid platform definition: {message}")]
    InvalidDefinition { message: String },
}

/// Fact gathering errors.
#[derive(Error, Debug)]
pub enum FactsError {
    /// A gather_subset token names no known category
    #[error("Bad subset '{subset}'")]
    InvalidSubset { subset: String },

    /// Device returned malformed JSON and strict parsing was requested
    #[error("Unable to parse output of '{command}' as JSON: {source}")]
    Parse {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    /// A fact battery failed; no facts are returned for the invocation
    #[error("Failed to gather '{category}' facts: {source}")]
    GatherFailed {
        category: String,
        #[source]
        source: Box<Error>,
    },

    /// Fact records could not be converted into JSON values
    #[error("Unable to serialize facts: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Configuration push errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Writing the running-config backup failed
    #[error("Unable to write backup to {}: {source}", .path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The interactive prompt of a config request is not a valid pattern
    #[error("Invalid prompt pattern '{prompt}': {source}")]
    InvalidPrompt {
        prompt: String,
        #[source]
        source: regex::Error,
    },

    /// The candidate configuration file could not be read
    #[error("Unable to read configuration source {}: {source}", .path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// `src` was combined with inline `lines` or `parents`
    #[error("'src' cannot be combined with 'lines' or 'parents'")]
    ConflictingSource,
}

/// Result type alias using eospoll's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_classification() {
        let err: Error = DriverError::Command {
            command: "show foo".into(),
            message: "% Invalid input".into(),
        }
        .into();
        assert!(err.is_command_error());
        assert!(!err.is_timeout());
        assert_eq!(
            err.to_string(),
            "Driver error: Command 'show foo' failed: % Invalid input"
        );
    }

    #[test]
    fn test_timeout_classification() {
        let err: Error = DriverError::Timeout {
            command: "show version".into(),
            timeout: Duration::from_secs(5),
        }
        .into();
        assert!(err.is_timeout());

        let err: Error = TransportError::Timeout(Duration::from_secs(1)).into();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_gather_failed_keeps_cause() {
        let cause: Error = DriverError::NotConnected.into();
        let err = FactsError::GatherFailed {
            category: "routing".into(),
            source: Box::new(cause),
        };
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("Driver error: Session not connected"));
    }
}
