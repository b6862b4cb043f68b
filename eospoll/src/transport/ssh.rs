//! SSH PTY transport using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::{debug, trace, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::{PrivateKeyWithHashAlg, PublicKey, load_secret_key};
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;

use super::Transport;
use super::config::{Credentials, HostKeyPolicy, SshLogin};
use crate::error::{ChannelError, Result, TransportError};

/// Interactive SSH shell on a PTY, exposed as a [`Transport`].
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// The shell channel carrying the CLI.
    channel: Channel<Msg>,

    /// Cleared once the remote side closes the channel.
    open: bool,

    /// Login this connection was made with.
    login: SshLogin,
}

impl SshTransport {
    /// Connect, authenticate and start an interactive shell.
    pub async fn connect(login: SshLogin) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(login.connect_timeout),
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: login.host.clone(),
            port: login.port,
            host_keys: login.host_keys,
            known_hosts: login.known_hosts.clone(),
            host_key_error: host_key_error.clone(),
        };

        debug!("connecting to {}", login);

        let mut session = tokio::time::timeout(
            login.connect_timeout,
            client::connect(ssh_config, (login.host.as_str(), login.port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(login.connect_timeout))?
        .map_err(|e| {
            // Prefer the detailed host-key error over russh's generic one.
            let stored = host_key_error.lock().ok().and_then(|mut slot| slot.take());
            stored.unwrap_or(TransportError::Ssh(e))
        })?;

        Self::authenticate(&mut session, &login).await?;

        let channel = Self::open_shell(&session, &login).await?;

        Ok(Self {
            session,
            channel,
            open: true,
            login,
        })
    }

    /// Open a session channel with a PTY and request a shell on it.
    async fn open_shell(session: &Handle<SshHandler>, login: &SshLogin) -> Result<Channel<Msg>> {
        let channel = session
            .channel_open_session()
            .await
            .map_err(ChannelError::PtyOpenFailed)?;

        channel
            .request_pty(
                true,
                "xterm",
                login.pty_size.0,
                login.pty_size.1,
                0,
                0,
                &[],
            )
            .await
            .map_err(ChannelError::PtyOpenFailed)?;

        channel
            .request_shell(true)
            .await
            .map_err(ChannelError::PtyOpenFailed)?;

        Ok(channel)
    }

    /// Authenticate with the server.
    async fn authenticate(session: &mut Handle<SshHandler>, login: &SshLogin) -> Result<()> {
        let success = match &login.credentials {
            Credentials::Password(password) => session
                .authenticate_password(&login.username, password.expose_secret())
                .await
                .map_err(TransportError::Ssh)?
                .success(),
            Credentials::Key { path, passphrase } => {
                let key = load_secret_key(path, passphrase.as_ref().map(|p| p.expose_secret()))
                    .map_err(|e| TransportError::Key(e.to_string()))?;

                let hash_alg = session
                    .best_supported_rsa_hash()
                    .await
                    .map_err(TransportError::Ssh)?
                    .flatten();

                session
                    .authenticate_publickey(
                        &login.username,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await
                    .map_err(TransportError::Ssh)?
                    .success()
            }
        };

        if !success {
            return Err(TransportError::AuthenticationFailed {
                user: login.username.clone(),
            }
            .into());
        }

        Ok(())
    }

    /// The login this transport was made with.
    pub fn login(&self) -> &SshLogin {
        &self.login
    }
}

impl Transport for SshTransport {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        if !self.open {
            return Err(ChannelError::Closed.into());
        }
        self.channel.data(data).await.map_err(ChannelError::Ssh)?;
        Ok(())
    }

    async fn read_increment(&mut self) -> Result<Vec<u8>> {
        loop {
            match self.channel.wait().await {
                Some(ChannelMsg::Data { data }) => return Ok(data.to_vec()),
                Some(ChannelMsg::ExtendedData { data, .. }) => return Ok(data.to_vec()),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    self.open = false;
                    return Err(ChannelError::Closed.into());
                }
                Some(other) => trace!("ignoring channel message {:?}", other),
            }
        }
    }

    fn is_open(&self) -> bool {
        self.open && !self.session.is_closed()
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        if let Err(e) = self.channel.eof().await {
            debug!("eof on close failed: {}", e);
        }
        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await
            .map_err(TransportError::Ssh)?;
        Ok(())
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_keys: HostKeyPolicy,
    known_hosts: Option<PathBuf>,
    /// Detailed host-key error surfaced by connect().
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> std::result::Result<bool, TransportError> {
        let result = if let Some(ref path) = self.known_hosts {
            russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::check_known_hosts(&self.host, self.port, pubkey)
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = if let Some(ref path) = self.known_hosts {
            russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
        } else {
            russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey)
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, err: TransportError) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(err);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let accepted = match self.host_keys {
            HostKeyPolicy::Disabled => true,
            HostKeyPolicy::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key: {}", e);
                    }
                    true
                }
                Err(e) => self.reject(e),
            },
            HostKeyPolicy::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                }),
                Err(e) => self.reject(e),
            },
        };
        Ok(accepted)
    }
}
