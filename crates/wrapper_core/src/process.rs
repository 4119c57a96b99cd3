//! Server child process.
//!
//! Launch validation, spawning, and forwarding of the child's stdout and
//! stderr into one line channel for the dispatcher.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::WrapperConfig;
use crate::error::WrapperError;

/// Buffered lines between the output readers and the dispatcher.
const LINE_BUFFER: usize = 1024;

/// What to launch and where.
#[derive(Debug, Clone)]
pub struct ServerLaunch {
    pub binary: PathBuf,
    pub world: PathBuf,
    pub args: Vec<String>,
    pub ignore_missing_world: bool,
}

impl ServerLaunch {
    pub fn from_config(config: &WrapperConfig) -> Self {
        Self {
            binary: config.server_binary.clone(),
            world: config.world_path.clone(),
            args: config.server_args.clone(),
            ignore_missing_world: config.ignore_missing_world,
        }
    }

    /// Checks the binary and world directory before anything is started.
    /// Returns the resolved binary path.
    pub fn validate(&self) -> Result<PathBuf, WrapperError> {
        let binary = resolve_binary(&self.binary)
            .ok_or_else(|| WrapperError::Launch(self.binary.clone(), "server binary not found".to_string()))?;
        if !is_executable(&binary) {
            return Err(WrapperError::Launch(binary, "server binary is not executable".to_string()));
        }

        let meta = std::fs::metadata(&self.world).map_err(|e| {
            WrapperError::World(format!("world directory {}: {}", self.world.display(), e))
        })?;
        if !meta.is_dir() {
            return Err(WrapperError::World(format!(
                "world path {} is not a directory",
                self.world.display()
            )));
        }
        if meta.permissions().readonly() {
            return Err(WrapperError::World(format!(
                "world directory {} is not writable",
                self.world.display()
            )));
        }

        let world_mt = self.world.join("world.mt");
        if !world_mt.is_file() {
            if self.ignore_missing_world {
                warn!("{} not found, continuing anyway", world_mt.display());
            } else {
                return Err(WrapperError::World(format!(
                    "{} not found (use --ignore-missing-world to start a new world)",
                    world_mt.display()
                )));
            }
        }

        Ok(binary)
    }

    /// Arguments passed to the server binary.
    pub fn command_line(&self) -> Vec<String> {
        let mut args = vec![
            "--server".to_string(),
            "--world".to_string(),
            self.world.display().to_string(),
        ];
        args.extend(self.args.iter().cloned());
        args
    }
}

/// Looks a bare command name up on `PATH`; paths with a directory part are
/// taken as given.
fn resolve_binary(binary: &Path) -> Option<PathBuf> {
    if binary.components().count() > 1 || binary.is_absolute() {
        return binary.is_file().then(|| binary.to_path_buf());
    }
    if binary.is_file() {
        return Some(binary.to_path_buf());
    }
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// A running server with its output forwarding tasks.
pub struct ServerProcess {
    child: Child,
    readers: Vec<JoinHandle<()>>,
}

impl ServerProcess {
    /// Starts the server. Returns the process and the receiving end of its
    /// merged output; the channel closes once both streams reach EOF.
    pub fn spawn(launch: &ServerLaunch, binary: &Path) -> Result<(Self, mpsc::Receiver<String>), WrapperError> {
        let args = launch.command_line();
        info!("Launching server: {} {}", binary.display(), args.join(" "));

        let mut child = Command::new(binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| WrapperError::Launch(binary.to_path_buf(), e.to_string()))?;

        let (tx, rx) = mpsc::channel(LINE_BUFFER);
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(forward_lines(stdout, tx.clone(), "stdout")));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(forward_lines(stderr, tx, "stderr")));
        }

        Ok((Self { child, readers }, rx))
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Waits for the server to exit and for its output to be drained.
    pub async fn wait(&mut self) -> Result<ExitStatus, WrapperError> {
        let status = self.child.wait().await?;
        for reader in self.readers.drain(..) {
            let _ = reader.await;
        }
        Ok(status)
    }

    pub async fn kill(&mut self) -> Result<(), WrapperError> {
        self.child.kill().await?;
        Ok(())
    }
}

/// Copies lines from one output stream into the shared channel. Invalid
/// UTF-8 is replaced rather than ending the stream.
pub(crate) async fn forward_lines<R>(stream: R, tx: mpsc::Sender<String>, name: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\r', '\n']).to_string();
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("Failed to read server {}: {}", name, e);
                break;
            }
        }
    }
    debug!("Server {} closed", name);
}
