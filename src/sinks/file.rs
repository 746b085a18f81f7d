use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::SinkError;
use crate::sample::MetricSample;

use super::Sink;

/// Appends one line per sample to a file, creating it on first use.
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSink { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Sink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn on_update(&self, sample: &MetricSample) -> Result<(), SinkError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{sample}\n").as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_appends_one_line_per_sample() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("metrics_log.txt"));

        sink.on_update(&MetricSample::new(0.5, 0.3, 0.2)).await.unwrap();
        sink.on_update(&MetricSample::new(0.25, 0.5, 0.75)).await.unwrap();

        let contents = tokio::fs::read_to_string(sink.path()).await.unwrap();
        assert_eq!(
            contents,
            "CPU: 50.00% | RAM: 30.00% | Disk: 20.00%\nCPU: 25.00% | RAM: 50.00% | Disk: 75.00%\n"
        );
    }

    #[tokio::test]
    async fn test_unwritable_path_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("missing").join("metrics_log.txt"));

        let err = sink.on_update(&MetricSample::new(0.5, 0.3, 0.2)).await.unwrap_err();
        assert!(matches!(err, SinkError::Io(_)));
    }
}
