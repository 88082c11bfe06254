//! # Captured reporter output.
//!
//! Reporters never write to the process stdout. Each sink hands its reporter
//! a [`ReporterOutput`]; every `line()` call is sent to the [`OutputRelay`],
//! a single task that owns the real writer and writes each line whole, so
//! output from concurrent reporters never interleaves mid-line.
//!
//! ```text
//! Sink R1 ── line() ──┐
//! Sink R2 ── line() ──┼──► OutputRelay ──► writer (stdout by default)
//! Sink RN ── line() ──┘
//! ```

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Line sink handed to a reporter.
#[derive(Clone, Debug)]
pub struct ReporterOutput {
    reporter: Arc<str>,
    tx: mpsc::UnboundedSender<String>,
}

impl ReporterOutput {
    /// Writes one line. Dropped with a debug trace once the relay is closed.
    pub fn line(&self, line: impl Into<String>) {
        if self.tx.send(line.into()).is_err() {
            debug!(reporter = %self.reporter, "output relay closed; line dropped");
        }
    }

    /// Name of the reporter this handle belongs to.
    pub fn reporter(&self) -> &str {
        &self.reporter
    }
}

/// Task owning the real writer.
pub struct OutputRelay<W> {
    tx: mpsc::UnboundedSender<String>,
    closing: CancellationToken,
    join: JoinHandle<io::Result<W>>,
}

impl OutputRelay<tokio::io::Stdout> {
    /// Relays to the process stdout.
    pub fn stdout() -> Self {
        Self::spawn(tokio::io::stdout())
    }
}

impl<W> OutputRelay<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Spawns the relay task over `writer`.
    pub fn spawn(writer: W) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let closing = CancellationToken::new();
        let join = tokio::spawn(write_lines(rx, writer, closing.clone()));
        Self { tx, closing, join }
    }

    /// Creates an output handle for `reporter`.
    pub fn handle(&self, reporter: &str) -> ReporterOutput {
        ReporterOutput {
            reporter: Arc::from(reporter),
            tx: self.tx.clone(),
        }
    }

    /// Writes what is already queued, closes the relay and returns the writer.
    ///
    /// Handles still held elsewhere (an abandoned sink) do not hold it open;
    /// their later lines are dropped.
    pub async fn finish(self) -> io::Result<W> {
        drop(self.tx);
        self.closing.cancel();
        match self.join.await {
            Ok(res) => res,
            Err(e) => Err(io::Error::other(e)),
        }
    }
}

async fn write_lines<W>(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut writer: W,
    closing: CancellationToken,
) -> io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let line = tokio::select! {
            biased;
            line = rx.recv() => line,
            _ = closing.cancelled() => rx.try_recv().ok(),
        };
        let Some(line) = line else { break };
        write_line(&mut writer, line).await?;
    }
    rx.close();
    Ok(writer)
}

async fn write_line<W>(writer: &mut W, mut line: String) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    line.push('\n');
    if let Err(e) = writer.write_all(line.as_bytes()).await {
        warn!(error = %e, "reporter output write failed");
        return Err(e);
    }
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lines_are_written_in_order() {
        let relay = OutputRelay::spawn(Vec::<u8>::new());
        let out = relay.handle("console");
        out.line("first");
        out.line(String::from("second"));
        assert_eq!(out.reporter(), "console");
        drop(out);

        let buf = relay.finish().await.unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "first\nsecond\n");
    }

    #[tokio::test]
    async fn finish_does_not_wait_for_lingering_handles() {
        let relay = OutputRelay::spawn(Vec::<u8>::new());
        let out = relay.handle("abandoned");
        out.line("queued");

        let buf = tokio::time::timeout(std::time::Duration::from_secs(1), relay.finish())
            .await
            .expect("finish returned")
            .unwrap();
        assert_eq!(buf, b"queued\n");

        // Relay is gone; the late line is dropped quietly.
        out.line("late");
    }
}
