//! Scripted in-memory transport emulating an EOS CLI, for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use super::Transport;
use crate::error::{ChannelError, Result};

#[derive(Debug, Clone, Default)]
struct MockReply {
    output: String,
    next_prompt: Option<String>,
    question: Option<String>,
    silent: bool,
    closes: bool,
    delay: Option<Duration>,
}

/// Output waiting to be read, held back until `ready_at` if set.
#[derive(Debug)]
struct Pending {
    data: Vec<u8>,
    ready_at: Option<Instant>,
}

/// Echoes each command, then answers with canned output and the current prompt.
///
/// Commands without a registered reply produce no output. Every write is
/// recorded (without the trailing newline) and can be inspected through
/// [`writes`](Self::writes) after the transport has been moved into a session.
pub(crate) struct MockTransport {
    prompt: String,
    replies: HashMap<String, MockReply>,
    pending: VecDeque<Pending>,
    awaiting_answer: Option<MockReply>,
    chunk_size: Option<usize>,
    writes: Arc<Mutex<Vec<String>>>,
    open: bool,
}

impl MockTransport {
    /// A device that greets with `prompt`.
    pub(crate) fn new(prompt: &str) -> Self {
        let mut mock = Self::silent_start(prompt);
        mock.queue(format!("Last login: Mon Oct 13\r\n{}", prompt), None);
        mock
    }

    /// A device whose first output is `question`; the prompt follows once answered.
    pub(crate) fn with_initial_question(prompt: &str, question: &str) -> Self {
        let mut mock = Self::silent_start(prompt);
        mock.queue(question.to_string(), None);
        mock.awaiting_answer = Some(MockReply::default());
        mock
    }

    /// An EOS device with the usual privilege transitions registered.
    pub(crate) fn eos(hostname: &str, privileged: bool) -> Self {
        let prompt = if privileged {
            format!("{}#", hostname)
        } else {
            format!("{}>", hostname)
        };
        Self::new(&prompt)
            .reply_with_prompt("enable", "", &format!("{}#", hostname))
            .reply_with_prompt("disable", "", &format!("{}>", hostname))
            .reply_with_prompt("configure terminal", "", &format!("{}(config)#", hostname))
            .reply_with_prompt("end", "", &format!("{}#", hostname))
            .reply("terminal length 0", "Pagination disabled.")
    }

    fn silent_start(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            replies: HashMap::new(),
            pending: VecDeque::new(),
            awaiting_answer: None,
            chunk_size: None,
            writes: Arc::new(Mutex::new(Vec::new())),
            open: true,
        }
    }

    pub(crate) fn reply(mut self, command: &str, output: &str) -> Self {
        self.replies.insert(
            command.to_string(),
            MockReply {
                output: output.to_string(),
                ..Default::default()
            },
        );
        self
    }

    pub(crate) fn reply_with_prompt(mut self, command: &str, output: &str, prompt: &str) -> Self {
        self.replies.insert(
            command.to_string(),
            MockReply {
                output: output.to_string(),
                next_prompt: Some(prompt.to_string()),
                ..Default::default()
            },
        );
        self
    }

    /// `command` raises `question`; once answered, `output` and `prompt` follow.
    pub(crate) fn ask(mut self, command: &str, question: &str, output: &str, prompt: &str) -> Self {
        self.replies.insert(
            command.to_string(),
            MockReply {
                output: output.to_string(),
                next_prompt: Some(prompt.to_string()),
                question: Some(question.to_string()),
                ..Default::default()
            },
        );
        self
    }

    /// `command` is echoed at once; its output and prompt only after `delay`.
    pub(crate) fn reply_late(mut self, command: &str, output: &str, delay: Duration) -> Self {
        self.replies.insert(
            command.to_string(),
            MockReply {
                output: output.to_string(),
                delay: Some(delay),
                ..Default::default()
            },
        );
        self
    }

    /// `command` is echoed but never completes.
    pub(crate) fn hang_on(mut self, command: &str) -> Self {
        self.replies.insert(
            command.to_string(),
            MockReply {
                silent: true,
                ..Default::default()
            },
        );
        self
    }

    /// The remote side hangs up when `command` is received.
    pub(crate) fn close_on(mut self, command: &str) -> Self {
        self.replies.insert(
            command.to_string(),
            MockReply {
                closes: true,
                ..Default::default()
            },
        );
        self
    }

    /// Deliver output in increments of at most `size` bytes.
    pub(crate) fn chunked(mut self, size: usize) -> Self {
        self.chunk_size = Some(size);
        self
    }

    /// Shared handle to the recorded writes.
    pub(crate) fn writes(&self) -> Arc<Mutex<Vec<String>>> {
        self.writes.clone()
    }

    fn queue(&mut self, text: String, ready_at: Option<Instant>) {
        let bytes = text.into_bytes();
        match self.chunk_size {
            Some(size) if size > 0 => {
                for chunk in bytes.chunks(size) {
                    self.pending.push_back(Pending {
                        data: chunk.to_vec(),
                        ready_at,
                    });
                }
            }
            _ => self.pending.push_back(Pending {
                data: bytes,
                ready_at,
            }),
        }
    }

    fn finish(&mut self, reply: &MockReply) {
        if let Some(ref prompt) = reply.next_prompt {
            self.prompt = prompt.clone();
        }
        let mut text = String::from("\r\n");
        if !reply.output.is_empty() {
            text.push_str(&reply.output.replace('\n', "\r\n"));
            text.push_str("\r\n");
        }
        text.push_str(&self.prompt);
        let ready_at = reply.delay.map(|delay| Instant::now() + delay);
        self.queue(text, ready_at);
    }
}

impl Transport for MockTransport {
    async fn write(&mut self, data: &[u8]) -> Result<()> {
        if !self.open {
            return Err(ChannelError::Closed.into());
        }

        let text = String::from_utf8_lossy(data)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        self.writes.lock().unwrap().push(text.clone());

        if let Some(reply) = self.awaiting_answer.take() {
            self.finish(&reply);
            return Ok(());
        }

        let reply = self.replies.get(&text).cloned().unwrap_or_default();
        if reply.closes {
            self.open = false;
            return Ok(());
        }

        self.queue(text, None);
        if reply.silent {
            return Ok(());
        }
        if let Some(ref question) = reply.question {
            self.queue(format!("\r\n{}", question), None);
            self.awaiting_answer = Some(reply);
            return Ok(());
        }
        self.finish(&reply);
        Ok(())
    }

    async fn read_increment(&mut self) -> Result<Vec<u8>> {
        // the chunk stays queued while waiting, so a cancelled read loses nothing
        if let Some(ready_at) = self.pending.front().and_then(|p| p.ready_at) {
            tokio::time::sleep_until(ready_at).await;
        }
        if let Some(pending) = self.pending.pop_front() {
            return Ok(pending.data);
        }
        if !self.open {
            return Err(ChannelError::Closed.into());
        }
        std::future::pending::<Result<Vec<u8>>>().await
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }
}
