//! Push a block of configuration lines to a device.
//!
//! The command list is `before`, then `parents`, then `lines`, then `after`;
//! `before` and `after` are only emitted when there are lines to apply.
//! The lines come either inline or from a `src` file.
//! In [`UpdateMode::Check`] nothing at all is written to the session.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};
use serde::Deserialize;

use super::Driver;
use super::interactive::PromptedCommand;
use crate::error::{ConfigError, Error, Result};

/// Command that persists the running configuration.
pub const SAVE_COMMAND: &str = "copy running-config startup-config";

const RUNNING_CONFIG_COMMAND: &str = "show running-config";

/// How the request is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// Apply the commands.
    #[default]
    Merge,
    /// Report the commands without sending them.
    Check,
}

/// A question the device raises while the block is applied, and its answer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PromptAnswer {
    pub prompt: String,
    pub answer: String,
}

/// Where the pre-change running configuration is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackupOptions {
    /// Directory for the backup file (default: `backup`).
    pub dir_path: Option<PathBuf>,
    /// File name (default: `running-config.<unix seconds>`).
    pub filename: Option<String>,
}

impl BackupOptions {
    fn path(&self) -> PathBuf {
        let dir = self
            .dir_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("backup"));
        let filename = self.filename.clone().unwrap_or_else(|| {
            let secs = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default();
            format!("running-config.{}", secs)
        });
        dir.join(filename)
    }
}

/// A configuration change to apply.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigRequest {
    /// Configuration lines, in order.
    pub lines: Vec<String>,
    /// File holding the configuration lines instead. Exclusive with `lines`
    /// and `parents`. Blank lines, `!` comments and `end` are skipped.
    pub src: Option<PathBuf>,
    /// Context lines entered before `lines`, e.g. `interface Ethernet1`.
    pub parents: Vec<String>,
    /// Sent ahead of the block when it is applied.
    pub before: Vec<String>,
    /// Sent after the block when it is applied.
    pub after: Vec<String>,
    /// Confirmation the device may ask while a line is applied.
    pub prompt: Option<PromptAnswer>,
    pub update: UpdateMode,
    /// Persist the running configuration after a merge.
    pub save: bool,
    /// Back up the running configuration before a merge.
    pub backup: Option<BackupOptions>,
}

impl ConfigRequest {
    /// A merge of `lines` with no context.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// The full command list for the inline lines, or nothing when there are none.
    pub fn commands(&self) -> Vec<String> {
        self.wrap(&self.lines)
    }

    /// The full command list, reading `src` when it is set.
    pub async fn load_commands(&self) -> Result<Vec<String>> {
        let Some(ref path) = self.src else {
            return Ok(self.commands());
        };
        if !self.lines.is_empty() || !self.parents.is_empty() {
            return Err(ConfigError::ConflictingSource.into());
        }

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Source {
                path: path.clone(),
                source,
            })?;
        let lines: Vec<String> = text
            .lines()
            .map(str::trim_end)
            .filter(|line| {
                let line = line.trim_start();
                !line.is_empty() && !line.starts_with('!') && line != "end"
            })
            .map(String::from)
            .collect();
        debug!("read {} lines from {}", lines.len(), path.display());
        Ok(self.wrap(&lines))
    }

    fn wrap(&self, lines: &[String]) -> Vec<String> {
        if lines.is_empty() {
            return vec![];
        }
        self.before
            .iter()
            .chain(&self.parents)
            .chain(lines)
            .chain(&self.after)
            .cloned()
            .collect()
    }

    fn prompted_commands(&self, commands: &[String]) -> Result<Vec<PromptedCommand>> {
        commands
            .iter()
            .map(|line| {
                let command = PromptedCommand::new(line.as_str());
                match &self.prompt {
                    Some(p) => command.with_answer(&p.prompt, p.answer.as_str()).map_err(|source| {
                        Error::from(ConfigError::InvalidPrompt {
                            prompt: p.prompt.clone(),
                            source,
                        })
                    }),
                    None => Ok(command),
                }
            })
            .collect()
    }
}

/// Outcome of [`push_config`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushResult {
    /// Whether there was anything to apply (in either mode).
    pub changed: bool,
    /// The command list derived from the request.
    pub commands: Vec<String>,
    /// The commands applied, or that would be applied in check mode.
    pub updates: Vec<String>,
    /// Whether the configuration was persisted.
    pub saved: bool,
    /// Where the running configuration was backed up.
    pub backup_path: Option<PathBuf>,
}

/// Apply `request` through `driver`.
///
/// The session must already be privileged.
pub async fn push_config<D: Driver>(driver: &mut D, request: &ConfigRequest) -> Result<PushResult> {
    let commands = request.load_commands().await?;
    if commands.is_empty() {
        debug!("no configuration lines to apply");
        return Ok(PushResult::default());
    }

    let mut result = PushResult {
        changed: true,
        commands: commands.clone(),
        updates: commands.clone(),
        ..Default::default()
    };
    if request.update == UpdateMode::Check {
        debug!("check mode: {} commands not sent", commands.len());
        return Ok(result);
    }

    let prompted = request.prompted_commands(&commands)?;

    if let Some(ref backup) = request.backup {
        result.backup_path = Some(write_backup(driver, backup).await?);
    }

    driver.send_config(&prompted).await?;
    info!("applied {} configuration commands", commands.len());

    if request.save {
        driver.send_command(SAVE_COMMAND).await?;
        result.saved = true;
    }
    Ok(result)
}

async fn write_backup<D: Driver>(driver: &mut D, options: &BackupOptions) -> Result<PathBuf> {
    let running = driver.send_command(RUNNING_CONFIG_COMMAND).await?;
    let path = options.path();

    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| ConfigError::Backup {
                path: path.clone(),
                source,
            })?;
    }
    tokio::fs::write(&path, running.result.as_bytes())
        .await
        .map_err(|source| ConfigError::Backup {
            path: path.clone(),
            source,
        })?;

    debug!("running configuration backed up to {}", path.display());
    Ok(path)
}
