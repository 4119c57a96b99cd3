//! Server log dispatcher.
//!
//! Reads the merged output of the server process one line at a time,
//! classifies it, and routes the message either to the matcher holding the
//! line's thread or through the ordered matcher scan.

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::hold::{HoldBudget, HoldTable};
use crate::log_line::{LogLevel, LogLine};
use crate::matcher::{EventMatcher, MatchContext, MatchStatus, MatcherKind};
use crate::shutdown::ShutdownSignal;

/// What happened to one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Not in the server log format; logged and dropped.
    Unclassified,
    /// No enabled matcher wanted the message.
    Dropped,
    /// A matcher consumed the message in the ordered scan.
    Handled(MatcherKind),
    /// A matcher started holding the line's thread.
    Held(MatcherKind),
    /// Continuation line consumed; the hold stays in place.
    Continued(MatcherKind),
    /// Continuation line consumed and the hold was released.
    Released(MatcherKind),
    /// The matcher failed on this line. Any hold it had is released.
    Failed(MatcherKind),
}

/// Why [`Dispatcher::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchEnd {
    /// The output stream closed, meaning the server exited.
    StreamClosed,
    Shutdown,
}

pub struct Dispatcher {
    matchers: Vec<EventMatcher>,
    holds: HoldTable,
    ctx: MatchContext,
}

impl Dispatcher {
    /// Creates a dispatcher with the standard matcher set.
    pub fn new(ctx: MatchContext, max_hold_lines: usize) -> Self {
        Self::with_matchers(ctx, EventMatcher::standard_set(), max_hold_lines)
    }

    /// Creates a dispatcher with an explicit matcher list. The order of
    /// `matchers` is the scan priority.
    pub fn with_matchers(ctx: MatchContext, matchers: Vec<EventMatcher>, max_hold_lines: usize) -> Self {
        Self {
            matchers,
            holds: HoldTable::new(max_hold_lines),
            ctx,
        }
    }

    pub fn context(&self) -> &MatchContext {
        &self.ctx
    }

    pub fn holds(&self) -> &HoldTable {
        &self.holds
    }

    /// Consumes lines until the stream closes or shutdown is requested.
    ///
    /// Each line is handled to completion before the next is read, so a
    /// matcher that sleeps (the login delay) holds up the lines behind it.
    /// Holds still open when the loop ends are logged as warnings.
    ///
    /// # Arguments
    /// * `lines` - Merged stdout and stderr of the server process
    /// * `shutdown` - Stops the loop without draining buffered lines
    ///
    /// # Returns
    /// * `DispatchEnd::StreamClosed` - The server closed its output
    /// * `DispatchEnd::Shutdown` - Shutdown was requested first
    pub async fn run(mut self, mut lines: mpsc::Receiver<String>, mut shutdown: ShutdownSignal) -> DispatchEnd {
        info!("Log dispatcher started with {} matchers", self.matchers.len());

        let end = loop {
            let line = tokio::select! {
                biased;
                _ = shutdown.wait() => break DispatchEnd::Shutdown,
                line = lines.recv() => line,
            };

            match line {
                Some(line) => {
                    self.dispatch_line(&line).await;
                }
                None => break DispatchEnd::StreamClosed,
            }
        };

        for (thread, index) in self.holds.held_threads() {
            warn!(
                "Thread {} still held by {} matcher at end of stream",
                thread,
                self.matchers[index].kind().name()
            );
        }
        info!("Log dispatcher stopped ({:?})", end);
        end
    }

    /// Processes a single raw line.
    ///
    /// Lines outside the server log format are logged and dropped. A thread
    /// held by a matcher sends its lines to that matcher only; otherwise the
    /// enabled matchers are tried in order and the first to handle the line
    /// wins.
    pub async fn dispatch_line(&mut self, raw: &str) -> LineOutcome {
        let Some(line) = LogLine::classify(raw) else {
            info!(target: "server", "*{}", raw.trim_end_matches(['\r', '\n']));
            return LineOutcome::Unclassified;
        };

        match line.level {
            LogLevel::Error => error!(target: "server", "{}", line.output),
            LogLevel::Warning => warn!(target: "server", "{}", line.output),
            _ => info!(target: "server", "{}", line.output),
        }

        match self.holds.holder(&line.thread) {
            Some(index) => self.continue_hold(index, &line).await,
            None => self.scan(&line).await,
        }
    }

    async fn continue_hold(&mut self, index: usize, line: &LogLine) -> LineOutcome {
        let matcher = &mut self.matchers[index];
        let kind = matcher.kind();

        match matcher.accept(&line.message, true, &self.ctx).await {
            Ok(MatchStatus::Hold) => {
                if self.holds.record_line(&line.thread) == HoldBudget::Exhausted {
                    warn!(
                        "Releasing thread {} from {} matcher after too many continuation lines",
                        line.thread,
                        kind.name()
                    );
                    self.holds.release(&line.thread);
                    return LineOutcome::Released(kind);
                }
                LineOutcome::Continued(kind)
            }
            Ok(_) => {
                debug!("Thread {} released by {} matcher", line.thread, kind.name());
                self.holds.release(&line.thread);
                LineOutcome::Released(kind)
            }
            Err(e) => {
                error!("{} matcher failed on held line: {}", kind.name(), e);
                self.holds.release(&line.thread);
                LineOutcome::Failed(kind)
            }
        }
    }

    async fn scan(&mut self, line: &LogLine) -> LineOutcome {
        for index in 0..self.matchers.len() {
            let matcher = &mut self.matchers[index];
            if !matcher.is_enabled(&self.ctx.state)
                || !matcher.accepts_level(&line.level)
                || !matcher.accepts_thread(&line.thread)
            {
                continue;
            }

            let kind = matcher.kind();
            match matcher.accept(&line.message, false, &self.ctx).await {
                Ok(MatchStatus::Ignored) => continue,
                Ok(MatchStatus::Handled) => return LineOutcome::Handled(kind),
                Ok(MatchStatus::Hold) => {
                    debug!("Thread {} held by {} matcher", line.thread, kind.name());
                    self.holds.hold(&line.thread, index);
                    return LineOutcome::Held(kind);
                }
                Err(e) => {
                    error!("{} matcher failed: {}", kind.name(), e);
                    return LineOutcome::Failed(kind);
                }
            }
        }

        LineOutcome::Dropped
    }
}
