//! Process termination signals.
//!
//! [`wait_for_shutdown_signal`] completes on SIGINT, SIGTERM or SIGQUIT
//! (Ctrl-C only on non-Unix targets).

#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv() => tracing::info!(signal = "SIGINT", "shutdown signal received"),
        _ = sigterm.recv() => tracing::info!(signal = "SIGTERM", "shutdown signal received"),
        _ = sigquit.recv() => tracing::info!(signal = "SIGQUIT", "shutdown signal received"),
    }
    Ok(())
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!(signal = "ctrl-c", "shutdown signal received");
    Ok(())
}
