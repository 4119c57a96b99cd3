//! Operator console.
//!
//! Lines typed on the wrapper's own standard input are forwarded to the
//! server as commands through the shared command queue.

use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, info, warn};

use crate::commands::CommandQueue;
use crate::shutdown::ShutdownSignal;

/// Reads operator commands from `input` until end of input or shutdown.
/// Returns the number of commands queued.
pub async fn run_console<R>(input: R, queue: Arc<CommandQueue>, mut shutdown: ShutdownSignal) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut queued = 0;

    loop {
        let line = tokio::select! {
            biased;
            _ = shutdown.wait() => break,
            line = lines.next_line() => line,
        };

        match line {
            Ok(Some(line)) => {
                let command = line.trim();
                if command.is_empty() {
                    continue;
                }
                match queue.push(command) {
                    Ok(()) => {
                        debug!("Queued console command: {}", command);
                        queued += 1;
                    }
                    Err(e) => warn!("{}", e),
                }
            }
            Ok(None) => {
                debug!("Console input closed");
                break;
            }
            Err(e) => {
                error!("Failed to read console input: {}", e);
                break;
            }
        }
    }

    info!("Console reader stopped");
    queued
}
