//! Login settings for one switch.
//!
//! An [`SshLogin`] is normally produced by
//! [`SessionBuilder`](crate::driver::SessionBuilder), either directly or from a
//! fleet [`DeviceTarget`](crate::poller::DeviceTarget).

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

/// Standard SSH port.
pub const SSH_PORT: u16 = 22;

/// PTY columns and rows when the platform does not say otherwise. The width
/// matches the `terminal width 32767` EOS is told on open, so the PTY never
/// wraps long `| json` lines.
pub const DEFAULT_PTY_SIZE: (u32, u32) = (32767, 24);

/// Default limit for TCP connect plus SSH handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// How the switch's host key is checked against known_hosts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKeyPolicy {
    /// Only switches already in known_hosts are accepted.
    Strict,
    /// Unknown switches are recorded on first contact; a changed key is refused.
    #[default]
    AcceptNew,
    /// No checking. Lab switches only.
    #[serde(alias = "insecure")]
    Disabled,
}

/// How the login authenticates.
#[derive(Debug, Clone)]
pub enum Credentials {
    Password(SecretString),
    Key {
        path: PathBuf,
        passphrase: Option<SecretString>,
    },
}

/// Everything needed to reach one switch CLI over SSH.
#[derive(Debug, Clone)]
pub struct SshLogin {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub credentials: Credentials,
    pub connect_timeout: Duration,
    pub pty_size: (u32, u32),
    pub host_keys: HostKeyPolicy,
    /// known_hosts file; `~/.ssh/known_hosts` when unset.
    pub known_hosts: Option<PathBuf>,
}

impl SshLogin {
    /// A login on port 22 with default timeouts and PTY size.
    pub fn new(host: impl Into<String>, username: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            port: SSH_PORT,
            username: username.into(),
            credentials,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            pty_size: DEFAULT_PTY_SIZE,
            host_keys: HostKeyPolicy::default(),
            known_hosts: None,
        }
    }
}

impl fmt::Display for SshLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_defaults() {
        let login = SshLogin::new("leaf1", "admin", Credentials::Password("pw".to_string().into()));
        assert_eq!(login.port, 22);
        assert_eq!(login.pty_size.0, 32767);
        assert_eq!(login.host_keys, HostKeyPolicy::AcceptNew);
        assert_eq!(login.to_string(), "admin@leaf1:22");
    }

    #[test]
    fn test_host_key_policy_names() {
        let policy: HostKeyPolicy = serde_json::from_str(r#""accept_new""#).unwrap();
        assert_eq!(policy, HostKeyPolicy::AcceptNew);
        let policy: HostKeyPolicy = serde_json::from_str(r#""insecure""#).unwrap();
        assert_eq!(policy, HostKeyPolicy::Disabled);
    }
}
