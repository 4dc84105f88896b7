use std::path::{Path, PathBuf};

use async_trait::async_trait;
use metricsink_core::config::TextFileSettings;
use metricsink_core::ports::{BulkWriter, WriteResult};
use metricsink_domain::MetricSinkError;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::errors::InfraError;

/// Writes each report to a file, replacing or appending
#[derive(Debug, Clone)]
pub struct TextFileWriter {
    path: PathBuf,
    append: bool,
}

impl TextFileWriter {
    pub fn new(path: impl Into<PathBuf>, append: bool) -> Self {
        Self { path: path.into(), append }
    }

    pub fn from_settings(settings: &TextFileSettings) -> Self {
        Self::new(settings.file_name.clone(), settings.append)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn emit(&self, payload: &str) -> Result<(), MetricSinkError> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(InfraError::from)?;
        }

        let mut options = OpenOptions::new();
        options.create(true);
        if self.append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }

        let mut file = options.open(&self.path).await.map_err(InfraError::from)?;
        file.write_all(payload.as_bytes()).await.map_err(InfraError::from)?;
        if !payload.ends_with('\n') {
            file.write_all(b"\n").await.map_err(InfraError::from)?;
        }
        file.flush().await.map_err(InfraError::from)?;
        Ok(())
    }
}

#[async_trait]
impl BulkWriter for TextFileWriter {
    fn target(&self) -> &str {
        "text file"
    }

    async fn write(&self, payload: &str, cancel: &CancellationToken) -> WriteResult {
        if payload.trim().is_empty() {
            return WriteResult::ok();
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return WriteResult::failed(format!("Write to {} cancelled", self.path.display()));
            }
            outcome = self.emit(payload) => outcome,
        };

        match outcome {
            Ok(()) => {
                trace!(path = %self.path.display(), bytes = payload.len(), "wrote report file");
                WriteResult::ok()
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to write report file");
                WriteResult::failed(format!(
                    "Failed to write to {} - {err}",
                    self.path.display()
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn overwrites_by_default() {
        let dir = tempdir().unwrap();
        let writer = TextFileWriter::new(dir.path().join("metrics.txt"), false);
        let cancel = CancellationToken::new();

        assert!(writer.write("first", &cancel).await.success);
        assert!(writer.write("second", &cancel).await.success);

        let contents = std::fs::read_to_string(writer.path()).unwrap();
        assert_eq!(contents, "second\n");
    }

    #[tokio::test]
    async fn appends_when_configured() {
        let dir = tempdir().unwrap();
        let writer = TextFileWriter::new(dir.path().join("metrics.txt"), true);
        let cancel = CancellationToken::new();

        writer.write("first\n", &cancel).await;
        writer.write("second\n", &cancel).await;

        let contents = std::fs::read_to_string(writer.path()).unwrap();
        assert_eq!(contents, "first\nsecond\n");
    }

    #[tokio::test]
    async fn creates_missing_directories() {
        let dir = tempdir().unwrap();
        let writer = TextFileWriter::new(dir.path().join("reports/daily/metrics.txt"), false);

        assert!(writer.write("payload", &CancellationToken::new()).await.success);
        assert!(writer.path().exists());
    }

    #[tokio::test]
    async fn directory_path_fails_without_panicking() {
        let dir = tempdir().unwrap();
        let writer = TextFileWriter::new(dir.path(), false);

        let result = writer.write("payload", &CancellationToken::new()).await;
        assert!(!result.success);
        assert!(result.message().starts_with("Failed to write to"));
    }

    #[tokio::test]
    async fn blank_payload_creates_no_file() {
        let dir = tempdir().unwrap();
        let writer = TextFileWriter::new(dir.path().join("metrics.txt"), false);

        assert!(writer.write("", &CancellationToken::new()).await.success);
        assert!(!writer.path().exists());
    }
}
