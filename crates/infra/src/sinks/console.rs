use std::io::{self, Stdout, Write};
use std::sync::Mutex;

use async_trait::async_trait;
use metricsink_core::ports::{BulkWriter, WriteResult};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

/// Writes rendered text to stdout or any other [`Write`]
pub struct ConsoleWriter<W: Write + Send = Stdout> {
    out: Mutex<W>,
}

impl ConsoleWriter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, payload: &str) -> io::Result<()> {
        let mut out = self.out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        out.write_all(payload.as_bytes())?;
        if !payload.ends_with('\n') {
            out.write_all(b"\n")?;
        }
        out.flush()
    }
}

#[async_trait]
impl<W: Write + Send> BulkWriter for ConsoleWriter<W> {
    fn target(&self) -> &str {
        "console"
    }

    async fn write(&self, payload: &str, cancel: &CancellationToken) -> WriteResult {
        if payload.trim().is_empty() {
            return WriteResult::ok();
        }
        if cancel.is_cancelled() {
            return WriteResult::failed("Write to console cancelled");
        }

        match self.emit(payload) {
            Ok(()) => {
                trace!(bytes = payload.len(), "wrote report to console");
                WriteResult::ok()
            }
            Err(err) => {
                warn!(error = %err, "failed to write report to console");
                WriteResult::failed(format!("Failed to write to console - {err}"))
            }
        }
    }
}
