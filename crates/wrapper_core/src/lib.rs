//! # MinePass Wrapper Core
//!
//! Supervision and log-event dispatch for a Minetest server that has no
//! plugin API of its own. The wrapper launches the server, reads its log
//! output line by line, and turns recognised lines into state changes and
//! authorization calls.
//!
//! ## Architecture Overview
//!
//! * **Log classification** - [`LogLine::classify`] splits a raw line into
//!   timestamp, level, thread and message; anything else is passed through.
//! * **Matchers** - [`EventMatcher`] pairs a pattern with a handler. Matchers
//!   are scanned in order and the first to handle a message wins. A matcher
//!   may *hold* a thread to consume its continuation lines.
//! * **Dispatcher** - [`Dispatcher`] routes each line either to the matcher
//!   holding its thread or through the scan.
//! * **Shared state** - [`SharedState`] is the concurrency-safe fact store:
//!   the login cache, online players, server version and mod list.
//! * **Commands** - the server has no console, so [`CommandQueue`] feeds a
//!   [`CommandChannel`] (by default a file handshake in the world directory).
//! * **Scheduled tasks** - once the server is ready, [`GameserverTasks`] run
//!   on a fixed interval through [`ServerControl`].
//!
//! ### Line Flow
//!
//! ```text
//! server stdout/stderr -> ServerProcess -> mpsc -> Dispatcher
//!     -> HoldTable owner, or ordered EventMatcher scan
//!     -> SharedState / AuthDirectory / LifecycleHook
//! ```
//!
//! [`Supervisor`] wires all of it together for one server run.

pub mod auth;
pub mod commands;
pub mod config;
pub mod console;
pub mod dispatcher;
pub mod error;
pub mod hold;
pub mod log_line;
pub mod matcher;
pub mod process;
pub mod shutdown;
pub mod state;
pub mod supervisor;
pub mod tasks;
pub mod version;

pub use auth::{AuthDirectory, PlayerRecord, PluginEntry, ServerDetails};
pub use commands::{CommandChannel, CommandQueue, Delivery, FileCommandChannel};
pub use config::WrapperConfig;
pub use dispatcher::{DispatchEnd, Dispatcher, LineOutcome};
pub use error::{VersionError, WrapperError};
pub use hold::HoldTable;
pub use log_line::{LogLevel, LogLine};
pub use matcher::{EventMatcher, LifecycleHook, MatchContext, MatchStatus, MatcherKind};
pub use process::{ServerLaunch, ServerProcess};
pub use shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
pub use state::SharedState;
pub use supervisor::{Activation, Supervisor};
pub use tasks::{GameserverTasks, ServerControl};
pub use version::compare_versions;
