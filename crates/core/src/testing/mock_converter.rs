//! Mock converter for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::converter::{output_path_for, Converter, ConverterDescriptor, ConverterError};
use crate::format::FormatToken;

/// A recorded conversion call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedConversion {
    /// The input path the converter was handed.
    pub input_path: PathBuf,
    /// The requested output format.
    pub output_format: FormatToken,
    /// Whether the input file existed when `convert` was called.
    pub input_existed: bool,
    /// Whether the conversion succeeded.
    pub success: bool,
}

/// What a successful mock conversion leaves on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutput {
    /// Writes these bytes at the canonical output path.
    Bytes(Vec<u8>),
    /// Returns the canonical output path without writing anything.
    Nothing,
}

/// Mock implementation of the Converter trait.
///
/// Provides controllable behavior for testing:
/// - Track conversion calls for assertions
/// - Simulate success, a missing output file, or an injected error
/// - Simulate slow conversions
///
/// # Example
///
/// ```rust,ignore
/// use transmute_core::testing::{MockConverter, MockOutput};
///
/// let converter = MockConverter::named("stub", &["txt"], &["pdf"]);
/// converter.set_output(MockOutput::Nothing).await;
///
/// // The service will now report OutputMissing
/// let result = service.submit(b"hello", "notes.txt", "pdf").await;
///
/// let conversions = converter.recorded_conversions().await;
/// assert_eq!(conversions.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockConverter {
    name: String,
    descriptor: ConverterDescriptor,
    /// Recorded conversions.
    conversions: Arc<RwLock<Vec<RecordedConversion>>>,
    /// If set, the next conversion will fail with this error.
    next_error: Arc<RwLock<Option<ConverterError>>>,
    /// What successful conversions write.
    output: Arc<RwLock<MockOutput>>,
    /// Simulated conversion duration.
    conversion_delay: Arc<RwLock<Duration>>,
}

impl Default for MockConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConverter {
    /// Create a mock claiming `txt` to `pdf`.
    pub fn new() -> Self {
        Self::named("mock", &["txt"], &["pdf"])
    }

    /// Create a mock with its own name and capability sets.
    pub fn named(name: &str, inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            descriptor: ConverterDescriptor::new(inputs, outputs),
            conversions: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            output: Arc::new(RwLock::new(MockOutput::Bytes(b"converted".to_vec()))),
            conversion_delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Get all recorded conversions.
    pub async fn recorded_conversions(&self) -> Vec<RecordedConversion> {
        self.conversions.read().await.clone()
    }

    /// Get the number of conversions performed.
    pub async fn conversion_count(&self) -> usize {
        self.conversions.read().await.len()
    }

    /// Configure the next conversion to fail with the given error.
    pub async fn set_next_error(&self, error: ConverterError) {
        *self.next_error.write().await = Some(error);
    }

    /// Configure what successful conversions leave on disk.
    pub async fn set_output(&self, output: MockOutput) {
        *self.output.write().await = output;
    }

    /// Set the simulated conversion duration.
    pub async fn set_conversion_delay(&self, delay: Duration) {
        *self.conversion_delay.write().await = delay;
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<ConverterError> {
        self.next_error.write().await.take()
    }

    async fn record(&self, input_path: &Path, output_format: &FormatToken, input_existed: bool, success: bool) {
        self.conversions.write().await.push(RecordedConversion {
            input_path: input_path.to_path_buf(),
            output_format: output_format.clone(),
            input_existed,
            success,
        });
    }
}

#[async_trait]
impl Converter for MockConverter {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &ConverterDescriptor {
        &self.descriptor
    }

    async fn convert(
        &self,
        input_path: &Path,
        output_format: &FormatToken,
    ) -> Result<PathBuf, ConverterError> {
        let input_existed = input_path.is_file();

        // Simulate conversion time
        let delay = *self.conversion_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.take_error().await {
            self.record(input_path, output_format, input_existed, false).await;
            return Err(err);
        }

        let output_path = output_path_for(input_path, output_format);
        if let MockOutput::Bytes(bytes) = &*self.output.read().await {
            tokio::fs::write(&output_path, bytes).await?;
        }

        self.record(input_path, output_format, input_existed, true).await;
        Ok(output_path)
    }
}
