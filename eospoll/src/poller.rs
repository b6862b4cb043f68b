//! Polling facts from many devices at once.
//!
//! Every device gets its own session, so devices share no state. The number of
//! sessions in flight is capped by the poller's concurrency limit.

use std::collections::BTreeSet;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use log::{info, warn};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::driver::{Driver, Session, SessionBuilder};
use crate::error::Result;
use crate::facts::{FactGatherer, FactSubset, GatheredFacts, resolve_subsets};
use crate::transport::{HostKeyPolicy, SSH_PORT, SshTransport};

fn default_port() -> u16 {
    SSH_PORT
}

fn default_timeout_secs() -> u64 {
    30
}

/// One device to poll.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceTarget {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub username: String,
    #[serde(default)]
    pub password: Option<SecretString>,
    #[serde(default)]
    pub private_key: Option<PathBuf>,
    /// Password for `enable`, when the account does not land in privileged mode.
    #[serde(default)]
    pub enable_password: Option<SecretString>,
    /// Connection and per-command timeout, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub host_key_policy: HostKeyPolicy,
    /// known_hosts file; `~/.ssh/known_hosts` when unset.
    #[serde(default)]
    pub known_hosts: Option<PathBuf>,
}

impl DeviceTarget {
    /// A target with password authentication and default settings.
    pub fn new(host: impl Into<String>, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            username: username.into(),
            password: Some(SecretString::from(password.into())),
            private_key: None,
            enable_password: None,
            timeout_secs: default_timeout_secs(),
            host_key_policy: HostKeyPolicy::default(),
            known_hosts: None,
        }
    }

    /// A session builder for this target.
    pub fn session_builder(&self) -> SessionBuilder {
        let mut builder = SessionBuilder::new(self.host.clone())
            .port(self.port)
            .username(self.username.clone())
            .timeout(Duration::from_secs(self.timeout_secs))
            .host_key_policy(self.host_key_policy);
        if let Some(ref path) = self.known_hosts {
            builder = builder.known_hosts(path.clone());
        }
        if let Some(ref key) = self.private_key {
            builder = builder.private_key(key.clone());
        } else if let Some(ref password) = self.password {
            builder = builder.password_secret(password.clone());
        }
        builder
    }

    /// Connect and open an SSH session.
    pub async fn connect(&self) -> Result<Session<SshTransport>> {
        self.session_builder().connect().await
    }
}

/// Outcome for one device.
#[derive(Debug)]
pub struct PollOutcome {
    pub host: String,
    pub result: Result<GatheredFacts>,
}

/// Gathers facts from many devices concurrently.
#[derive(Debug, Clone)]
pub struct FleetPoller {
    subsets: BTreeSet<FactSubset>,
    concurrency: usize,
    strict: bool,
}

impl FleetPoller {
    /// Resolve `spec` once for the whole fleet. At most `concurrency`
    /// sessions are open at a time.
    pub fn new<S: AsRef<str>>(spec: &[S], concurrency: usize) -> Result<Self> {
        Ok(Self {
            subsets: resolve_subsets(spec)?,
            concurrency: concurrency.max(1),
            strict: false,
        })
    }

    /// Treat unparsable JSON replies as fatal.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn subsets(&self) -> &BTreeSet<FactSubset> {
        &self.subsets
    }

    /// Poll every target over SSH. Outcomes are returned in target order.
    pub async fn poll(&self, targets: &[DeviceTarget]) -> Vec<PollOutcome> {
        self.poll_with(targets, |target| async move { target.connect().await })
            .await
    }

    /// Poll every target using `connect` to obtain an opened session.
    pub async fn poll_with<F, Fut, D>(&self, targets: &[DeviceTarget], connect: F) -> Vec<PollOutcome>
    where
        F: Fn(DeviceTarget) -> Fut,
        Fut: Future<Output = Result<D>>,
        D: Driver,
    {
        info!(
            "polling {} devices, {} at a time",
            targets.len(),
            self.concurrency
        );

        let polls = targets.iter().enumerate().map(|(index, target)| {
            let connecting = connect(target.clone());
            async move {
                let result = self.poll_one(target, connecting).await;
                if let Err(ref e) = result {
                    warn!("{}: {}", target.host, e);
                }
                (
                    index,
                    PollOutcome {
                        host: target.host.clone(),
                        result,
                    },
                )
            }
        });

        let mut outcomes: Vec<(usize, PollOutcome)> = stream::iter(polls)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        outcomes.sort_by_key(|(index, _)| *index);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }

    async fn poll_one<Fut, D>(&self, target: &DeviceTarget, connecting: Fut) -> Result<GatheredFacts>
    where
        Fut: Future<Output = Result<D>>,
        D: Driver,
    {
        let mut driver = connecting.await?;

        let enable = target.enable_password.as_ref().map(|p| p.expose_secret());
        let result = match driver.escalate(enable).await {
            Ok(()) => {
                FactGatherer::new()
                    .strict(self.strict)
                    .gather_subsets(&mut driver, &self.subsets)
                    .await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = driver.close().await {
            warn!("{}: close failed: {}", target.host, e);
        }
        result
    }
}
