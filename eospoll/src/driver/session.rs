//! Interactive CLI session over any [`Transport`].
//!
//! The transport is an unframed character stream, so command boundaries are
//! recovered by pattern matching: a command is complete when a prompt pattern
//! matches the tail of the accumulated output, and failed when an error
//! pattern matches anywhere in it. Errors are checked first.

use std::time::Duration;

use log::{debug, trace, warn};
use tokio::time::Instant;

use super::Driver;
use super::interactive::PromptedCommand;
use super::response::{Response, normalize_output};
use crate::channel::{PatternBuffer, PatternMatch};
use crate::error::{DriverError, Error, Result};
use crate::platform::{PlatformDefinition, PrivilegeMode, is_config_context};
use crate::transport::Transport;

/// Default per-command timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-command state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No command outstanding.
    Idle,
    /// Command bytes are being written.
    Sending,
    /// Waiting for output to reach a prompt or an error.
    Accumulating,
    /// The command ended on a prompt; the session returns to `Idle` as the
    /// reply is handed back.
    Completed,
    /// The stream is out of step with the commands sent: a deadline expired,
    /// a reply was never drained, or the transport failed. The next command
    /// resynchronizes first.
    Failed,
}

impl SessionState {
    /// Whether a command is outstanding.
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionState::Sending | SessionState::Accumulating)
    }
}

/// One interactive CLI session to a single device.
///
/// A session has exactly one outstanding command at a time. Each operation
/// takes `&mut self`, so the borrow checker rules out pipelining.
pub struct Session<T: Transport> {
    transport: T,
    platform: PlatformDefinition,
    buffer: PatternBuffer,
    state: SessionState,
    prompt: Option<String>,
    mode: Option<PrivilegeMode>,
    timeout: Duration,
    opened: bool,
    resyncs: u64,
}

impl<T: Transport> Session<T> {
    /// Wrap an already connected transport.
    ///
    /// Nothing is read or written until [`Driver::open`] is called.
    pub fn new(transport: T, platform: PlatformDefinition) -> Self {
        Self {
            transport,
            platform,
            buffer: PatternBuffer::default(),
            state: SessionState::Idle,
            prompt: None,
            mode: None,
            timeout: DEFAULT_TIMEOUT,
            opened: false,
            resyncs: 0,
        }
    }

    /// Set the default per-command timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the default per-command timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// The default per-command timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Current per-command state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The last prompt seen, trimmed.
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    /// The platform this session speaks.
    pub fn platform(&self) -> &PlatformDefinition {
        &self.platform
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Scan `data` against the platform's prompt patterns.
    pub fn detect_prompt(&self, data: &[u8]) -> Option<PatternMatch> {
        self.platform.detect_prompt(data)
    }

    /// Scan `data` against the platform's error patterns.
    pub fn detect_error(&self, data: &[u8]) -> Option<PatternMatch> {
        self.platform.detect_error(data)
    }

    /// Send `command` and wait for it to finish before `deadline`.
    pub async fn send_command_until(&mut self, command: &str, deadline: Instant) -> Result<Response> {
        self.send_prompted_until(&PromptedCommand::new(command), deadline)
            .await
    }

    /// Send `command`, answering its question if one is raised, and wait for
    /// it to finish before `deadline`.
    ///
    /// On expiry the session moves to [`SessionState::Failed`] and a
    /// [`DriverError::Timeout`] is returned. Whatever the device still sends
    /// for that command is discarded before the next one is written.
    pub async fn send_prompted_until(
        &mut self,
        command: &PromptedCommand,
        deadline: Instant,
    ) -> Result<Response> {
        if !self.opened {
            return Err(DriverError::NotConnected.into());
        }
        self.execute(command, deadline).await
    }

    async fn execute(&mut self, command: &PromptedCommand, deadline: Instant) -> Result<Response> {
        if !self.transport.is_open() {
            return Err(DriverError::NotConnected.into());
        }
        if self.state.is_busy() || self.state == SessionState::Failed {
            self.resync(&command.command, deadline).await?;
        }

        let budget = deadline.saturating_duration_since(Instant::now());
        let started = std::time::Instant::now();

        self.buffer.clear();
        self.set_state(SessionState::Sending);
        debug!("sending {:?}", command.command);
        let line = format!("{}\n", command.command);
        if let Err(e) = self.transport.write(line.as_bytes()).await {
            self.set_state(SessionState::Failed);
            return Err(e);
        }
        self.set_state(SessionState::Accumulating);

        let mut answered = false;
        loop {
            let chunk = self.read_chunk(&command.command, deadline, budget).await?;
            self.buffer.extend(&chunk);

            if let Some(err) = self.platform.detect_error(self.buffer.unscanned()) {
                return Err(self.fail_command(&command.command, err, deadline).await);
            }
            self.buffer.mark_scanned();

            if !answered {
                if let Some(answer) = command.answer_for(self.buffer.tail()) {
                    debug!(
                        "answering prompt for {:?} with {:?}",
                        command.command,
                        command.loggable_answer()
                    );
                    let answer = format!("{}\n", answer);
                    if let Err(e) = self.transport.write(answer.as_bytes()).await {
                        self.set_state(SessionState::Failed);
                        return Err(e);
                    }
                    answered = true;
                    continue;
                }
            }

            if let Some(found) = self.platform.detect_prompt(self.buffer.tail()) {
                let prompt_start = self.buffer.tail_start() + found.span.start;
                let raw = self.buffer.take();
                let before_prompt = String::from_utf8_lossy(&raw[..prompt_start]);
                let result = normalize_output(&before_prompt, &command.command);
                let raw_result = String::from_utf8_lossy(&raw).into_owned();

                let prompt = found.text.trim().to_string();
                self.record_prompt(&prompt);
                self.set_state(SessionState::Completed);
                self.set_state(SessionState::Idle);

                return Ok(Response::new(
                    command.command.clone(),
                    result,
                    raw_result,
                    prompt,
                    started.elapsed(),
                ));
            }
        }
    }

    /// Discard output left over from an abandoned or expired command.
    ///
    /// Writes a `!` comment carrying a fresh marker and drops everything up
    /// to the prompt that follows its echo.
    async fn resync(&mut self, command: &str, deadline: Instant) -> Result<()> {
        warn!(
            "session out of step ({:?}); discarding stale output before {:?}",
            self.state, command
        );
        self.resyncs += 1;
        let marker = format!("! eospoll resync {}", self.resyncs);
        let budget = deadline.saturating_duration_since(Instant::now());

        self.buffer.clear();
        self.set_state(SessionState::Sending);
        let line = format!("{}\n", marker);
        if let Err(e) = self.transport.write(line.as_bytes()).await {
            self.set_state(SessionState::Failed);
            return Err(e);
        }
        self.set_state(SessionState::Accumulating);

        loop {
            let chunk = self.read_chunk(command, deadline, budget).await?;
            self.buffer.extend(&chunk);

            let data = self.buffer.as_slice();
            let Some(at) = memchr::memmem::find(data, marker.as_bytes()) else {
                continue;
            };
            if let Some(found) = self.platform.detect_prompt(&data[at + marker.len()..]) {
                debug!("resynchronized after discarding {} bytes", at);
                self.record_prompt(&found.text);
                self.buffer.clear();
                self.set_state(SessionState::Idle);
                return Ok(());
            }
        }
    }

    /// Read the first prompt after login, answering the initial question if
    /// the platform defines one.
    async fn read_initial_prompt(&mut self, deadline: Instant) -> Result<()> {
        let budget = deadline.saturating_duration_since(Instant::now());
        self.buffer.clear();
        self.set_state(SessionState::Accumulating);

        let mut answered = false;
        loop {
            let chunk = self.read_chunk("<login>", deadline, budget).await?;
            self.buffer.extend(&chunk);

            if !answered {
                let answer = match (&self.platform.initial_prompt, &self.platform.initial_answer) {
                    (Some(question), Some(answer)) if self.buffer.tail_contains(question) => {
                        Some(format!("{}\n", answer))
                    }
                    _ => None,
                };
                if let Some(answer) = answer {
                    debug!("answering initial prompt");
                    self.transport.write(answer.as_bytes()).await?;
                    self.buffer.clear();
                    answered = true;
                    continue;
                }
            }

            if let Some(found) = self.platform.detect_prompt(self.buffer.tail()) {
                self.record_prompt(&found.text);
                self.buffer.clear();
                self.set_state(SessionState::Idle);
                return Ok(());
            }
        }
    }

    async fn read_chunk(&mut self, command: &str, deadline: Instant, budget: Duration) -> Result<Vec<u8>> {
        match tokio::time::timeout_at(deadline, self.transport.read_increment()).await {
            Ok(Ok(chunk)) => {
                trace!("received {} bytes", chunk.len());
                Ok(chunk)
            }
            Ok(Err(e)) => {
                self.set_state(SessionState::Failed);
                Err(e)
            }
            Err(_) => {
                self.set_state(SessionState::Failed);
                Err(DriverError::Timeout {
                    command: command.to_string(),
                    timeout: budget,
                }
                .into())
            }
        }
    }

    /// Mark the command failed and consume output up to the next prompt so
    /// the following command starts on a clean stream.
    async fn fail_command(&mut self, command: &str, found: PatternMatch, deadline: Instant) -> Error {
        self.set_state(SessionState::Failed);
        debug!("{:?} matched error pattern {}", command, found.index);

        loop {
            if let Some(prompt) = self.platform.detect_prompt(self.buffer.tail()) {
                self.record_prompt(&prompt.text);
                self.set_state(SessionState::Idle);
                break;
            }
            match tokio::time::timeout_at(deadline, self.transport.read_increment()).await {
                Ok(Ok(chunk)) => self.buffer.extend(&chunk),
                Ok(Err(e)) => {
                    debug!("stream ended while draining after error: {}", e);
                    break;
                }
                Err(_) => {
                    debug!("no prompt after error before deadline");
                    break;
                }
            }
        }
        self.buffer.clear();

        DriverError::Command {
            command: command.to_string(),
            message: found.text.trim().to_string(),
        }
        .into()
    }

    fn record_prompt(&mut self, prompt: &str) {
        let prompt = prompt.trim();
        debug!("matched prompt {:?}", prompt);
        self.mode = PrivilegeMode::from_prompt(prompt);
        self.prompt = Some(prompt.to_string());
    }

    fn set_state(&mut self, state: SessionState) {
        trace!("session state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn deadline_for(&self, command: &PromptedCommand) -> Instant {
        Instant::now() + command.timeout.unwrap_or(self.timeout)
    }
}

impl<T: Transport> Driver for Session<T> {
    async fn open(&mut self) -> Result<()> {
        if self.opened {
            return Err(DriverError::AlreadyConnected.into());
        }
        if !self.transport.is_open() {
            return Err(DriverError::NotConnected.into());
        }

        let deadline = Instant::now() + self.timeout;
        self.read_initial_prompt(deadline).await?;

        for command in self.platform.on_open_commands.clone() {
            let deadline = Instant::now() + self.timeout;
            if let Err(e) = self.execute(&PromptedCommand::new(command.as_str()), deadline).await {
                // without paging disabled the session can block on --More--
                self.set_state(SessionState::Failed);
                if let Err(close_err) = self.transport.close().await {
                    debug!("close after failed setup: {}", close_err);
                }
                return Err(DriverError::ConnectionSetup {
                    message: format!("'{}': {}", command, e),
                }
                .into());
            }
        }
        self.opened = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.opened && self.transport.is_open() && !self.state.is_busy() {
            if let Err(e) = self.deescalate().await {
                warn!("failed to drop privileges before close: {}", e);
            }
        }
        self.opened = false;
        self.set_state(SessionState::Idle);
        self.transport.close().await
    }

    async fn send_command(&mut self, command: &str) -> Result<Response> {
        let deadline = Instant::now() + self.timeout;
        self.send_command_until(command, deadline).await
    }

    async fn send_prompted(&mut self, command: &PromptedCommand) -> Result<Response> {
        let deadline = self.deadline_for(command);
        self.send_prompted_until(command, deadline).await
    }

    async fn send_config(&mut self, commands: &[PromptedCommand]) -> Result<Vec<Response>> {
        if commands.is_empty() {
            return Ok(vec![]);
        }

        let enter = self.platform.config_command.clone();
        let exit = self.platform.config_exit_command.clone();
        self.send_command(&enter).await?;

        let mut responses = Vec::with_capacity(commands.len());
        for command in commands {
            match self.send_prompted(command).await {
                Ok(response) => responses.push(response),
                Err(e) => {
                    if !self.state.is_busy() && self.transport.is_open() {
                        if let Err(exit_err) = self.send_command(&exit).await {
                            warn!("failed to leave configuration mode: {}", exit_err);
                        }
                    }
                    return Err(e);
                }
            }
        }

        self.send_command(&exit).await?;
        Ok(responses)
    }

    async fn escalate(&mut self, password: Option<&str>) -> Result<()> {
        if self.mode == Some(PrivilegeMode::Privileged) {
            return Ok(());
        }

        let mut command = PromptedCommand::new(self.platform.escalate_command.clone());
        if let (Some(password), Some(auth_prompt)) = (password, &self.platform.escalate_prompt) {
            command = command
                .with_answer_regex(auth_prompt.clone(), password)
                .hidden();
        }

        let response = self.send_prompted(&command).await.map_err(|e| {
            DriverError::PrivilegeEscalation {
                message: e.to_string(),
            }
        })?;

        if PrivilegeMode::from_prompt(&response.prompt) != Some(PrivilegeMode::Privileged) {
            return Err(DriverError::PrivilegeEscalation {
                message: format!("prompt '{}' is not privileged", response.prompt),
            }
            .into());
        }
        Ok(())
    }

    async fn deescalate(&mut self) -> Result<()> {
        let Some(prompt) = self.prompt.clone() else {
            debug!("prompt unknown; not de-escalating");
            return Ok(());
        };

        if is_config_context(&prompt) {
            let exit = self.platform.config_exit_command.clone();
            self.send_command(&exit).await?;
        } else if PrivilegeMode::from_prompt(&prompt) != Some(PrivilegeMode::Privileged) {
            return Ok(());
        }

        let disable = self.platform.deescalate_command.clone();
        self.send_command(&disable).await?;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.opened && self.transport.is_open()
    }

    fn current_privilege(&self) -> Option<PrivilegeMode> {
        self.mode
    }
}
