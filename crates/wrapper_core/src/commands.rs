//! Outbound server commands.
//!
//! The server has no interactive console, so commands are queued here and
//! handed to the companion mod through a side channel, one at a time. The
//! default channel is a file in the world directory that the mod reads and
//! deletes; a new command is only written once the previous file is gone.

use async_trait::async_trait;
use crossbeam::queue::ArrayQueue;
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::WrapperError;

/// Result of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Written,
    /// The previous command has not been consumed yet.
    Busy,
}

/// Side channel carrying commands into the server.
#[async_trait]
pub trait CommandChannel: Send + Sync {
    async fn deliver(&self, command: &str) -> Result<Delivery, WrapperError>;
}

/// Single-slot file handshake: the command file is only created when it does
/// not already exist.
#[derive(Debug, Clone)]
pub struct FileCommandChannel {
    path: PathBuf,
}

impl FileCommandChannel {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CommandChannel for FileCommandChannel {
    async fn deliver(&self, command: &str) -> Result<Delivery, WrapperError> {
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await;

        let mut file = match file {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(Delivery::Busy),
            Err(e) => return Err(e.into()),
        };

        file.write_all(command.as_bytes()).await?;
        file.flush().await?;
        Ok(Delivery::Written)
    }
}

/// Bounded FIFO of pending commands.
///
/// Any number of producers may push. Delivery is done by a single consumer
/// (the task loop); the command being delivered sits in a one-element slot
/// until the channel accepts it, so ordering survives a busy channel.
pub struct CommandQueue {
    queue: ArrayQueue<String>,
    in_flight: Mutex<Option<String>>,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: ArrayQueue::new(capacity.max(1)),
            in_flight: Mutex::new(None),
        }
    }

    /// Appends a command.
    ///
    /// # Errors
    ///
    /// [`WrapperError::CommandQueueFull`] when the queue is at capacity; the
    /// command is not queued.
    pub fn push(&self, command: impl Into<String>) -> Result<(), WrapperError> {
        self.queue.push(command.into()).map_err(WrapperError::CommandQueueFull)
    }

    /// Queues `command` followed by space-separated `params`.
    ///
    /// # Arguments
    /// * `command` - Command name, e.g. `#join_url` or a chat command
    /// * `params` - Parameters appended after the name
    ///
    /// # Returns
    /// * `Result<(), WrapperError>` - `CommandQueueFull` when the queue has no room
    ///
    /// # Examples
    /// ```
    /// use wrapper_core::CommandQueue;
    ///
    /// let queue = CommandQueue::new(8);
    /// queue
    ///     .push_command("#join_url", &["https://minepass.net/join/abc"])
    ///     .expect("queue has room");
    /// assert_eq!(queue.len(), 1);
    /// ```
    pub fn push_command(&self, command: &str, params: &[&str]) -> Result<(), WrapperError> {
        let mut line = command.to_string();
        for p in params {
            line.push(' ');
            line.push_str(p);
        }
        self.push(line)
    }

    /// Number of commands waiting, including one awaiting delivery.
    pub fn len(&self) -> usize {
        self.queue.len() + usize::from(self.in_flight.lock().is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Tries to deliver the next command.
    ///
    /// The command stays in the in-flight slot until the channel accepts it,
    /// so a busy channel keeps it for the next call and ordering is kept.
    ///
    /// # Arguments
    /// * `channel` - Side channel the command is written to
    ///
    /// # Returns
    /// * `Ok(None)` - Nothing is queued
    /// * `Ok(Some(Delivery::Written))` - The command was handed over and removed
    /// * `Ok(Some(Delivery::Busy))` - The previous command is still pending
    /// * `Err(_)` - The channel failed; the command is kept
    pub async fn deliver_next(&self, channel: &dyn CommandChannel) -> Result<Option<Delivery>, WrapperError> {
        let command = {
            let mut slot = self.in_flight.lock();
            if slot.is_none() {
                *slot = self.queue.pop();
            }
            match slot.as_ref() {
                Some(c) => c.clone(),
                None => return Ok(None),
            }
        };

        let delivery = channel.deliver(&command).await?;
        if delivery == Delivery::Written {
            debug!("Delivered server command: {}", command);
            self.in_flight.lock().take();
        }
        Ok(Some(delivery))
    }

    #[cfg(test)]
    pub(crate) fn drain(&self) -> Vec<String> {
        let mut out: Vec<String> = self.in_flight.lock().take().into_iter().collect();
        while let Some(c) = self.queue.pop() {
            out.push(c);
        }
        out
    }
}
