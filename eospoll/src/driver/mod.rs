//! High-level session API.
//!
//! [`Session`] drives one interactive CLI over any transport. The [`Driver`]
//! trait is what the fact gatherer and the config push are written against,
//! so they run unchanged over SSH or a scripted transport.

mod builder;
pub mod config_push;
mod interactive;
pub(crate) mod response;
mod session;

pub use builder::SessionBuilder;
pub use config_push::{BackupOptions, ConfigRequest, PromptAnswer, PushResult, UpdateMode, push_config};
pub use interactive::PromptedCommand;
pub use response::Response;
pub use session::{DEFAULT_TIMEOUT, Session, SessionState};

use std::future::Future;

use crate::error::Result;
use crate::platform::PrivilegeMode;

/// Operations on one device CLI session.
pub trait Driver: Send {
    /// Read the first prompt and run the platform's on-open commands.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Drop privileges (best-effort) and close the transport.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Send a command and wait for the prompt.
    fn send_command(&mut self, command: &str) -> impl Future<Output = Result<Response>> + Send;

    /// Send multiple commands sequentially, stopping at the first failure.
    fn send_commands(
        &mut self,
        commands: &[&str],
    ) -> impl Future<Output = Result<Vec<Response>>> + Send {
        async move {
            let mut responses = Vec::with_capacity(commands.len());
            for cmd in commands {
                responses.push(self.send_command(cmd).await?);
            }
            Ok(responses)
        }
    }

    /// Send a command that may raise a question, answering it once.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use eospoll::driver::{Driver, PromptedCommand};
    /// use eospoll::error::ChannelError;
    ///
    /// # async fn example(driver: &mut impl Driver) -> Result<(), eospoll::Error> {
    /// let save = PromptedCommand::new("copy running-config startup-config")
    ///     .with_answer(r"\[confirm\]", "y")
    ///     .map_err(ChannelError::from)?;
    /// driver.send_prompted(&save).await?;
    /// # Ok(())
    /// # }
    /// ```
    fn send_prompted(
        &mut self,
        command: &PromptedCommand,
    ) -> impl Future<Output = Result<Response>> + Send;

    /// Send commands in configuration mode.
    ///
    /// Enters configuration mode, sends every command, then leaves it again.
    /// An empty slice writes nothing.
    fn send_config(
        &mut self,
        commands: &[PromptedCommand],
    ) -> impl Future<Output = Result<Vec<Response>>> + Send;

    /// Raise the session to privileged mode. A no-op when already privileged.
    fn escalate(&mut self, password: Option<&str>) -> impl Future<Output = Result<()>> + Send;

    /// Leave any configuration context and drop to user mode.
    ///
    /// A no-op when the current prompt is unknown.
    fn deescalate(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Whether the session is open and its transport alive.
    fn is_open(&self) -> bool;

    /// Privilege mode read from the last prompt.
    fn current_privilege(&self) -> Option<PrivilegeMode>;
}
