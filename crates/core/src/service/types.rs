//! Types for the service module.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};

use crate::format::FormatToken;
use crate::workspace::TempGuard;

/// Stage a request has reached, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStage {
    Received,
    Resolved,
    Executing,
    Verified,
    Completed,
    Rejected,
    Failed,
}

impl ConversionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Resolved => "resolved",
            Self::Executing => "executing",
            Self::Verified => "verified",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finished conversion.
///
/// Owns both the working input and the output; both are removed when the
/// value (or the reader returned by [`ConvertedFile::open`]) is dropped.
#[derive(Debug)]
pub struct ConvertedFile {
    path: PathBuf,
    file_name: String,
    format: FormatToken,
    converter: String,
    guard: TempGuard,
}

impl ConvertedFile {
    pub(crate) fn new(
        path: PathBuf,
        original_stem: &str,
        format: FormatToken,
        converter: impl Into<String>,
        guard: TempGuard,
    ) -> Self {
        Self {
            file_name: download_name(original_stem, &format),
            path,
            format,
            converter: converter.into(),
            guard,
        }
    }

    /// Where the output currently lives.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Name to offer the client, `converted_<stem>.<target>`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn format(&self) -> &FormatToken {
        &self.format
    }

    /// Name of the converter that produced the output.
    pub fn converter(&self) -> &str {
        &self.converter
    }

    /// Opens the output for streaming.
    ///
    /// Cleanup moves into the reader: the output and the working input are
    /// removed once the reader is dropped, after the last byte is sent.
    pub async fn open(self) -> io::Result<ConvertedReader> {
        let file = File::open(&self.path).await?;
        let len = file.metadata().await?.len();
        Ok(ConvertedReader {
            file,
            len,
            _guard: self.guard,
        })
    }
}

/// Reader over a converted output that deletes its artifacts on drop.
#[derive(Debug)]
pub struct ConvertedReader {
    // Declared before the guard so the handle is closed before removal.
    file: File,
    len: u64,
    _guard: TempGuard,
}

impl ConvertedReader {
    /// Size of the output in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl AsyncRead for ConvertedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.file).poll_read(cx, buf)
    }
}

fn download_name(stem: &str, format: &FormatToken) -> String {
    let stem = if stem.is_empty() { "file" } else { stem };
    format!("converted_{}.{}", stem, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    #[test]
    fn test_download_name() {
        assert_eq!(download_name("report", &"pdf".into()), "converted_report.pdf");
        assert_eq!(download_name("", &"png".into()), "converted_file.png");
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(ConversionStage::Executing.to_string(), "executing");
        assert_eq!(ConversionStage::Rejected.as_str(), "rejected");
    }

    #[tokio::test]
    async fn test_reader_removes_artifacts_once_dropped() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in.txt");
        let output = temp.path().join("in_converted.pdf");
        std::fs::write(&input, b"in").unwrap();
        std::fs::write(&output, b"out").unwrap();

        let mut guard = TempGuard::for_path(&input);
        guard.track(&output);
        let converted = ConvertedFile::new(output.clone(), "in", "pdf".into(), "mock", guard);
        assert_eq!(converted.file_name(), "converted_in.pdf");

        let mut reader = converted.open().await.unwrap();
        assert_eq!(reader.len(), 3);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await.unwrap();
        assert_eq!(bytes, b"out");

        // Still present while the reader is alive.
        assert!(input.exists());
        assert!(output.exists());

        drop(reader);
        assert!(!input.exists());
        assert!(!output.exists());
    }

    #[test]
    fn test_drop_removes_artifacts() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("a_converted.png");
        std::fs::write(&output, b"png").unwrap();

        let converted = ConvertedFile::new(
            output.clone(),
            "a",
            "png".into(),
            "mock",
            TempGuard::for_path(&output),
        );
        drop(converted);
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_open_missing_output_still_cleans_up() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in.txt");
        std::fs::write(&input, b"in").unwrap();
        let output = temp.path().join("in_converted.pdf");

        let mut guard = TempGuard::for_path(&input);
        guard.track(&output);
        let converted = ConvertedFile::new(output, "in", "pdf".into(), "mock", guard);

        assert!(converted.open().await.is_err());
        assert!(!input.exists());
    }
}
