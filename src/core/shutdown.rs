//! # Cross-platform interrupt handling.
//!
//! Provides [`wait_for_interrupt`], an async helper that completes when the
//! process is asked to stop. Only used when
//! [`Config::catch_interrupt`](crate::Config::catch_interrupt) is set.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by CI runners and containers)
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]

/// Waits for an interrupt.
///
/// Returns `Err` if signal registration fails.
#[cfg(unix)]
pub async fn wait_for_interrupt() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        res = tokio::signal::ctrl_c() => res?,
    }
    Ok(())
}

/// Waits for an interrupt.
///
/// Returns `Err` if signal registration fails.
#[cfg(not(unix))]
pub async fn wait_for_interrupt() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
