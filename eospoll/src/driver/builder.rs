//! Builder for SSH sessions.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use super::Driver;
use super::session::{DEFAULT_TIMEOUT, Session};
use crate::error::{DriverError, Result};
use crate::platform::PlatformDefinition;
use crate::platform::vendors::arista_eos;
use crate::transport::{Credentials, HostKeyPolicy, SSH_PORT, SshLogin, SshTransport};

/// Builder for opened SSH sessions.
///
/// # Example
///
/// ```rust,no_run
/// use eospoll::driver::SessionBuilder;
///
/// # async fn example() -> Result<(), eospoll::Error> {
/// let session = SessionBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .connect()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SessionBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    credentials: Option<Credentials>,
    custom_platform: Option<PlatformDefinition>,
    timeout: Duration,
    pty_size: Option<(u32, u32)>,
    host_keys: HostKeyPolicy,
    known_hosts: Option<PathBuf>,
}

impl SessionBuilder {
    /// Create a new builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: SSH_PORT,
            username: None,
            credentials: None,
            custom_platform: None,
            timeout: DEFAULT_TIMEOUT,
            pty_size: None,
            host_keys: HostKeyPolicy::default(),
            known_hosts: None,
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set password authentication.
    pub fn password(self, password: impl Into<String>) -> Self {
        self.password_secret(SecretString::from(password.into()))
    }

    /// Set password authentication from an existing secret.
    pub fn password_secret(mut self, password: SecretString) -> Self {
        self.credentials = Some(Credentials::Password(password));
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.credentials = Some(Credentials::Key {
            path: key_path.into(),
            passphrase: None,
        });
        self
    }

    /// Set private key authentication with passphrase.
    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        self.credentials = Some(Credentials::Key {
            path: key_path.into(),
            passphrase: Some(SecretString::from(passphrase.into())),
        });
        self
    }

    /// Use a platform other than Arista EOS.
    pub fn custom_platform(mut self, platform: PlatformDefinition) -> Self {
        self.custom_platform = Some(platform);
        self
    }

    /// Set the connection and per-command timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the platform's terminal dimensions.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.pty_size = Some((width, height));
        self
    }

    /// How the host key is checked (default: accept new).
    pub fn host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_keys = policy;
        self
    }

    /// Use a known_hosts file other than `~/.ssh/known_hosts`.
    pub fn known_hosts(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts = Some(path.into());
        self
    }

    /// Resolve the platform and login without connecting.
    pub(crate) fn into_parts(self) -> Result<(SshLogin, PlatformDefinition, Duration)> {
        let username = self.username.ok_or_else(|| DriverError::InvalidConfig {
            message: "username is required".to_string(),
        })?;
        let credentials = self.credentials.ok_or_else(|| DriverError::InvalidConfig {
            message: format!("no password or private key for {}", self.host),
        })?;

        let platform = match self.custom_platform {
            Some(platform) => platform,
            None => arista_eos::platform().map_err(|e| DriverError::InvalidConfig {
                message: e.to_string(),
            })?,
        };
        platform.validate()?;

        let mut login = SshLogin::new(self.host, username, credentials);
        login.port = self.port;
        login.connect_timeout = self.timeout;
        login.pty_size = self
            .pty_size
            .unwrap_or((platform.terminal_width, platform.terminal_height));
        login.host_keys = self.host_keys;
        login.known_hosts = self.known_hosts;
        Ok((login, platform, self.timeout))
    }

    /// Connect, open the PTY shell and run the session's on-open sequence.
    pub async fn connect(self) -> Result<Session<SshTransport>> {
        let (login, platform, timeout) = self.into_parts()?;
        let transport = SshTransport::connect(login).await?;

        let mut session = Session::new(transport, platform).with_timeout(timeout);
        session.open().await?;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, PlatformError};

    #[test]
    fn test_username_required() {
        let err = SessionBuilder::new("sw1").password("admin").into_parts().unwrap_err();
        assert!(matches!(err, Error::Driver(DriverError::InvalidConfig { .. })));
    }

    #[test]
    fn test_credentials_required() {
        let err = SessionBuilder::new("sw1").username("admin").into_parts().unwrap_err();
        assert!(err.to_string().contains("no password or private key for sw1"));
    }

    #[test]
    fn test_defaults_to_eos_terminal_size() {
        let (login, platform, timeout) = SessionBuilder::new("sw1")
            .username("admin")
            .password("admin")
            .into_parts()
            .unwrap();

        assert_eq!(platform.name, "arista_eos");
        assert_eq!(login.port, 22);
        assert_eq!(login.pty_size, (32767, 24));
        assert_eq!(login.to_string(), "admin@sw1:22");
        assert_eq!(timeout, DEFAULT_TIMEOUT);
        assert!(matches!(login.credentials, Credentials::Password(_)));
    }

    #[test]
    fn test_overrides() {
        let (login, _, timeout) = SessionBuilder::new("10.0.0.1")
            .port(2222)
            .username("admin")
            .private_key("/tmp/id_ed25519")
            .terminal_size(200, 50)
            .timeout(Duration::from_secs(5))
            .host_key_policy(HostKeyPolicy::Strict)
            .known_hosts("/tmp/known_hosts")
            .into_parts()
            .unwrap();

        assert_eq!(login.pty_size, (200, 50));
        assert_eq!(login.host_keys, HostKeyPolicy::Strict);
        assert_eq!(login.known_hosts, Some(PathBuf::from("/tmp/known_hosts")));
        assert_eq!(login.connect_timeout, Duration::from_secs(5));
        assert_eq!(timeout, Duration::from_secs(5));
        assert!(matches!(login.credentials, Credentials::Key { .. }));
    }

    #[test]
    fn test_invalid_custom_platform() {
        let err = SessionBuilder::new("sw1")
            .username("admin")
            .password("admin")
            .custom_platform(PlatformDefinition::new("bare"))
            .into_parts()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Platform(PlatformError::InvalidDefinition { .. })
        ));
    }
}
