//! Server supervision.
//!
//! Owns the launch sequence: console reader, launch delay, child process,
//! log dispatcher, and the scheduled task loop, which only starts once the
//! server reports it is ready.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::sync::Arc;
use tokio::io::AsyncBufRead;
use tokio::sync::Notify;
use tracing::{error, info};

use crate::auth::{AuthDirectory, ServerDetails};
use crate::commands::{CommandChannel, CommandQueue, FileCommandChannel};
use crate::config::WrapperConfig;
use crate::console::run_console;
use crate::dispatcher::{DispatchEnd, Dispatcher};
use crate::error::WrapperError;
use crate::matcher::{LifecycleHook, MatchContext};
use crate::process::{ServerLaunch, ServerProcess};
use crate::shutdown::{shutdown_channel, ShutdownSignal};
use crate::state::SharedState;
use crate::tasks::{run_task_loop, GameserverTasks, ServerControl};

const READY_BANNER: [&str; 5] = [
    r"  __  __ _            ___              ",
    r" |  \/  (_)_ _  ___  | _ \__ _ ______  ",
    r" | |\/| | | ' \/ -_) |  _/ _` (_-<_-<  ",
    r" |_|  |_|_|_||_\___| |_| \__,_/__/__/  ",
    r"            System Ready               ",
];

/// One-time activation, run when the startup matcher sees the ready
/// sentinel.
pub struct Activation {
    queue: Arc<CommandQueue>,
    directory: Arc<dyn AuthDirectory>,
    wrapper_version: String,
    import_path: PathBuf,
    ready: Arc<Notify>,
}

impl Activation {
    pub fn new(
        queue: Arc<CommandQueue>,
        directory: Arc<dyn AuthDirectory>,
        wrapper_version: impl Into<String>,
        import_path: PathBuf,
        ready: Arc<Notify>,
    ) -> Self {
        Self {
            queue,
            directory,
            wrapper_version: wrapper_version.into(),
            import_path,
            ready,
        }
    }

    /// Server details describing the running server.
    pub fn server_details(&self, state: &SharedState) -> ServerDetails {
        let mut details = ServerDetails::new(&self.wrapper_version, state.server_version());
        for (name, version) in state.mods() {
            details.add_plugin(&name, &version);
        }
        if !self.directory.whitelist_imported() {
            details.whitelist_import = Some(self.import_path.clone());
        }
        details
    }
}

#[async_trait]
impl LifecycleHook for Activation {
    async fn server_started(&self, state: &SharedState) -> Result<(), WrapperError> {
        // Release the scheduled task loop first; it is the only thing that
        // drains the queue.
        self.ready.notify_one();

        let join_url = self.directory.server_join_url();
        let founder = self.directory.founder_name();
        for (command, arg) in [("#join_url", join_url.as_str()), ("#founder_name", founder.as_str())] {
            if let Err(e) = self.queue.push_command(command, &[arg]) {
                error!("Failed to queue {}: {}", command, e);
            }
        }

        for line in READY_BANNER {
            info!("{}", line);
        }

        let details = self.server_details(state);
        self.directory.send_server_details(&details).await?;
        info!(
            "Sent server details: {} with {} mods",
            details.game_version_raw,
            details.plugins.len()
        );
        Ok(())
    }
}

/// Runs one server from launch to exit.
pub struct Supervisor {
    config: WrapperConfig,
    state: Arc<SharedState>,
    queue: Arc<CommandQueue>,
    directory: Arc<dyn AuthDirectory>,
    tasks: Arc<dyn GameserverTasks>,
    channel: Arc<dyn CommandChannel>,
}

impl Supervisor {
    /// Creates a supervisor delivering commands through the world's command
    /// file.
    pub fn new(config: WrapperConfig, directory: Arc<dyn AuthDirectory>, tasks: Arc<dyn GameserverTasks>) -> Self {
        let channel = Arc::new(FileCommandChannel::new(config.command_file_path()));
        let queue = Arc::new(CommandQueue::new(config.command_queue_capacity));
        Self {
            config,
            state: Arc::new(SharedState::new()),
            queue,
            directory,
            tasks,
            channel,
        }
    }

    pub fn with_channel(mut self, channel: Arc<dyn CommandChannel>) -> Self {
        self.channel = channel;
        self
    }

    pub fn state(&self) -> Arc<SharedState> {
        self.state.clone()
    }

    pub fn queue(&self) -> Arc<CommandQueue> {
        self.queue.clone()
    }

    /// Launches the server and supervises it until it exits or `shutdown`
    /// fires.
    ///
    /// The console reader starts at once. After the launch delay the server
    /// is spawned and its output dispatched; the scheduled task loop waits
    /// for activation. On shutdown the server is killed and reaped.
    ///
    /// # Arguments
    /// * `console` - Operator input, forwarded line by line to the command queue
    /// * `shutdown` - Termination request, usually wired to OS signals
    ///
    /// # Returns
    /// * `Ok(Some(status))` - The server ran and exited with `status`
    /// * `Ok(None)` - Shutdown arrived before the server was started
    /// * `Err(_)` - Launch validation or spawning failed
    pub async fn run<R>(self, console: R, mut shutdown: ShutdownSignal) -> Result<Option<ExitStatus>, WrapperError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let launch = ServerLaunch::from_config(&self.config);
        let binary = launch.validate()?;

        // Stops the console reader and task loop once the server is gone.
        let (stop, stop_signal) = shutdown_channel();
        let console_handle = tokio::spawn(run_console(console, self.queue.clone(), stop_signal.clone()));

        if !self.config.launch_delay.is_zero() {
            tokio::select! {
                biased;
                _ = shutdown.wait() => {
                    info!("Shutdown requested before server launch");
                    stop.trigger();
                    let _ = console_handle.await;
                    return Ok(None);
                }
                _ = tokio::time::sleep(self.config.launch_delay) => {}
            }
        }

        let (mut process, lines) = match ServerProcess::spawn(&launch, &binary) {
            Ok(spawned) => spawned,
            Err(e) => {
                stop.trigger();
                let _ = console_handle.await;
                return Err(e);
            }
        };
        info!("Server started with pid {:?}", process.id());

        let ready = Arc::new(Notify::new());
        let control = ServerControl::new(self.state.clone(), self.queue.clone(), self.directory.clone());
        let tasks_handle = {
            let ready = ready.clone();
            let mut gate = stop_signal.clone();
            let tasks = self.tasks.clone();
            let channel = self.channel.clone();
            let interval = self.config.task_interval;
            let signal = stop_signal.clone();
            tokio::spawn(async move {
                tokio::select! {
                    biased;
                    _ = gate.wait() => return,
                    _ = ready.notified() => {}
                }
                run_task_loop(tasks, control, channel, interval, signal).await;
            })
        };

        let hook = Arc::new(Activation::new(
            self.queue.clone(),
            self.directory.clone(),
            self.config.wrapper_version.clone(),
            self.config.auth_import_path(),
            ready,
        ));
        let ctx = MatchContext {
            state: self.state.clone(),
            directory: self.directory.clone(),
            hook,
            wrapper_version: self.config.wrapper_version.clone(),
            login_delay: self.config.login_delay,
        };

        let dispatcher = Dispatcher::new(ctx, self.config.max_hold_lines);
        if dispatcher.run(lines, shutdown.clone()).await == DispatchEnd::Shutdown {
            info!("Stopping server");
            if let Err(e) = process.kill().await {
                error!("Failed to stop server: {}", e);
            }
        }

        let status = process.wait().await;
        match &status {
            Ok(status) => info!("Server exited ({})", status),
            Err(e) => error!("Server exited, status unavailable: {}", e),
        }

        self.state.mark_stopped();
        stop.trigger();
        let _ = tasks_handle.await;
        let _ = console_handle.await;

        status.map(Some)
    }
}
