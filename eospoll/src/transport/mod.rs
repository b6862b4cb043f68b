//! Transport layer.
//!
//! The session controller only needs a raw, unframed character stream: it
//! writes bytes and reads whatever arrives next. [`Transport`] captures that
//! contract; [`SshTransport`] implements it over an interactive SSH PTY.

pub mod config;
#[cfg(test)]
pub(crate) mod mock;
mod ssh;

use std::future::Future;

pub use config::{Credentials, HostKeyPolicy, SSH_PORT, SshLogin};
pub use ssh::SshTransport;

use crate::error::Result;

/// A bidirectional byte stream to one device CLI.
pub trait Transport: Send {
    /// Write raw bytes to the device.
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait for the next increment of output.
    ///
    /// Blocks until data arrives. Returns `ChannelError::Closed` once the
    /// remote end has gone away.
    fn read_increment(&mut self) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Whether the stream can still carry commands.
    fn is_open(&self) -> bool;

    /// Shut the stream down.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }
}
