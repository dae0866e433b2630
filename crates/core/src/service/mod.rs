//! Conversion service: dispatch and execution of single-file conversions.
//!
//! The service is the entry point for callers. For each request it:
//! 1. Normalizes the source and target format tokens
//! 2. Resolves a converter from the registry (rejecting before any file I/O)
//! 3. Waits for a conversion permit
//! 4. Writes the upload to a unique working path and runs the converter
//! 5. Verifies the returned output exists
//!
//! Working files are tracked by a [`TempGuard`] from the moment they are
//! created. On failure the guard drops and removes them; on success the
//! guard moves into the returned [`ConvertedFile`], which removes the input
//! and the output once the caller is done with it.

mod error;
mod types;

pub use error::ServiceError;
pub use types::{ConversionStage, ConvertedFile, ConvertedReader};

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::converter::Converter;
use crate::format::FormatToken;
use crate::metrics::{CONVERSIONS_TOTAL, CONVERSION_DURATION};
use crate::registry::{ConverterRegistry, FormatCatalog};
use crate::workspace::{sanitize_filename, TempGuard, WorkDir};

/// Dispatches conversion requests to registered converters.
#[derive(Clone)]
pub struct ConversionService {
    registry: Arc<ConverterRegistry>,
    workdir: Arc<WorkDir>,
    permits: Arc<Semaphore>,
}

impl ConversionService {
    /// Creates a service that runs at most `max_parallel` conversions at once.
    pub fn new(registry: Arc<ConverterRegistry>, workdir: Arc<WorkDir>, max_parallel: usize) -> Self {
        Self {
            registry,
            workdir,
            permits: Arc::new(Semaphore::new(max_parallel.max(1))),
        }
    }

    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    pub fn workdir(&self) -> &WorkDir {
        &self.workdir
    }

    /// Number of conversions that could start right now.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Every format any converter accepts or produces.
    pub fn list_all_formats(&self) -> FormatCatalog {
        self.registry.all_formats()
    }

    /// Formats the given input format can be converted into.
    pub fn list_targets_for(&self, input_format: &str) -> Vec<FormatToken> {
        self.registry
            .available_targets(&FormatToken::new(input_format))
    }

    /// The converter that would handle the pair.
    pub fn resolve(
        &self,
        input: &FormatToken,
        output: &FormatToken,
    ) -> Result<Arc<dyn Converter>, ServiceError> {
        self.registry
            .resolve(input, output)
            .ok_or_else(|| ServiceError::UnsupportedFormatPair {
                input: input.clone(),
                output: output.clone(),
            })
    }

    /// Converts uploaded bytes into `target_format`.
    ///
    /// The source format is taken from the extension of `original_filename`.
    /// Nothing is written to disk when the request is invalid or no
    /// converter claims the pair.
    pub async fn submit(
        &self,
        bytes: &[u8],
        original_filename: &str,
        target_format: &str,
    ) -> Result<ConvertedFile, ServiceError> {
        let request_id = Uuid::new_v4().simple().to_string();
        let safe_name = sanitize_filename(original_filename);
        debug!(
            request_id = %request_id,
            stage = %ConversionStage::Received,
            file_name = %safe_name,
            target_format,
            size_bytes = bytes.len(),
            "Conversion request received"
        );

        let (input_format, output_format) = match normalize(&safe_name, target_format) {
            Ok(pair) => pair,
            Err(e) => {
                info!(request_id = %request_id, stage = %ConversionStage::Rejected, error = %e, "Conversion request rejected");
                CONVERSIONS_TOTAL
                    .with_label_values(&["none", e.kind().as_str()])
                    .inc();
                return Err(e);
            }
        };

        let converter = match self.resolve(&input_format, &output_format) {
            Ok(converter) => converter,
            Err(e) => {
                info!(
                    request_id = %request_id,
                    stage = %ConversionStage::Rejected,
                    input_format = %input_format,
                    output_format = %output_format,
                    "No converter for format pair"
                );
                CONVERSIONS_TOTAL
                    .with_label_values(&["none", e.kind().as_str()])
                    .inc();
                return Err(e);
            }
        };
        debug!(
            request_id = %request_id,
            stage = %ConversionStage::Resolved,
            converter = converter.name(),
            input_format = %input_format,
            output_format = %output_format,
            "Converter resolved"
        );

        let result = self
            .execute(&request_id, converter.as_ref(), bytes, &safe_name, output_format)
            .await;

        match &result {
            Ok(converted) => {
                info!(
                    request_id = %request_id,
                    stage = %ConversionStage::Completed,
                    converter = converter.name(),
                    input_format = %input_format,
                    output_format = %converted.format(),
                    "Conversion completed"
                );
                CONVERSIONS_TOTAL
                    .with_label_values(&[converter.name(), "completed"])
                    .inc();
            }
            Err(e) => {
                warn!(
                    request_id = %request_id,
                    stage = %ConversionStage::Failed,
                    converter = converter.name(),
                    input_format = %input_format,
                    kind = %e.kind(),
                    error = %e,
                    "Conversion failed"
                );
                CONVERSIONS_TOTAL
                    .with_label_values(&[converter.name(), e.kind().as_str()])
                    .inc();
            }
        }

        result
    }

    async fn execute(
        &self,
        request_id: &str,
        converter: &dyn Converter,
        bytes: &[u8],
        safe_name: &str,
        output_format: FormatToken,
    ) -> Result<ConvertedFile, ServiceError> {
        let _permit = self.permits.acquire().await.map_err(|_| {
            ServiceError::Io(std::io::Error::other("conversion service is shutting down"))
        })?;

        let input_path = self.workdir.allocate(safe_name);
        let mut guard = TempGuard::for_path(&input_path);
        tokio::fs::write(&input_path, bytes).await?;

        debug!(
            request_id,
            stage = %ConversionStage::Executing,
            converter = converter.name(),
            "Running converter"
        );
        let start = Instant::now();
        let result = converter.convert(&input_path, &output_format).await;
        CONVERSION_DURATION
            .with_label_values(&[converter.name()])
            .observe(start.elapsed().as_secs_f64());
        let output_path = result?;
        guard.track(&output_path);

        if !tokio::fs::try_exists(&output_path).await? {
            return Err(ServiceError::OutputMissing {
                converter: converter.name().to_string(),
            });
        }
        debug!(
            request_id,
            stage = %ConversionStage::Verified,
            duration_ms = start.elapsed().as_millis() as u64,
            "Output verified"
        );

        let stem = Path::new(safe_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(ConvertedFile::new(
            output_path,
            &stem,
            output_format,
            converter.name(),
            guard,
        ))
    }
}

/// Extracts and normalizes the source and target tokens.
fn normalize(
    file_name: &str,
    target_format: &str,
) -> Result<(FormatToken, FormatToken), ServiceError> {
    let output = FormatToken::new(target_format);
    if output.is_empty() {
        return Err(ServiceError::invalid_request("target format is empty"));
    }
    let input = FormatToken::from_path(Path::new(file_name))
        .ok_or_else(|| ServiceError::invalid_request("uploaded file has no extension"))?;
    Ok((input, output))
}
