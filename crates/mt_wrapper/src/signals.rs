//! Signal handling for graceful shutdown.

use anyhow::Result;
use tokio::signal;
use tracing::{error, info};

use wrapper_core::ShutdownTrigger;

/// Waits for SIGINT or SIGTERM (Ctrl+C on Windows).
pub async fn wait_for_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
        }
    }

    #[cfg(windows)]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}

/// Triggers `trigger` on the first termination signal.
///
/// # Arguments
/// * `trigger` - Shutdown trigger handed to the supervisor's signal
///
/// If signal handling cannot be installed the trigger is kept alive, so the
/// wrapper keeps running until the server exits on its own.
pub fn spawn_signal_handler(trigger: ShutdownTrigger) {
    tokio::spawn(async move {
        if let Err(e) = wait_for_signal().await {
            error!("Signal handling unavailable: {}", e);
            // Dropping the trigger would count as a shutdown request.
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested, stopping server");
        trigger.trigger();
    });
}
