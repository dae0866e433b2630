//! Trait definitions for the converter module.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::error::ConverterError;
use crate::format::{FormatSet, FormatToken};

/// Suffix appended to the input stem when naming a converter's output.
pub const OUTPUT_SUFFIX: &str = "_converted";

/// The fixed input and output format sets a converter advertises.
#[derive(Debug, Clone)]
pub struct ConverterDescriptor {
    inputs: FormatSet,
    outputs: FormatSet,
}

impl ConverterDescriptor {
    pub fn new(inputs: &[&str], outputs: &[&str]) -> Self {
        Self {
            inputs: FormatSet::from_tokens(inputs),
            outputs: FormatSet::from_tokens(outputs),
        }
    }

    pub fn inputs(&self) -> &FormatSet {
        &self.inputs
    }

    pub fn outputs(&self) -> &FormatSet {
        &self.outputs
    }
}

/// A converter that turns a file of one format into another.
///
/// `can_convert` is a coarse capability check over the advertised sets; a
/// converter may still reject a specific pair in `convert` with
/// [`ConverterError::UnsupportedPair`].
#[async_trait]
pub trait Converter: Send + Sync {
    /// Returns the name of this converter implementation.
    fn name(&self) -> &str;

    /// Returns the advertised capability sets.
    fn descriptor(&self) -> &ConverterDescriptor;

    /// Converts `input_path` into `output_format`, returning the output path.
    ///
    /// The output is written next to the input as
    /// `<input stem>_converted.<output format>`; the input is never modified.
    async fn convert(
        &self,
        input_path: &Path,
        output_format: &FormatToken,
    ) -> Result<PathBuf, ConverterError>;

    /// Returns the supported input formats.
    fn supported_input_formats(&self) -> &FormatSet {
        self.descriptor().inputs()
    }

    /// Returns the supported output formats.
    fn supported_output_formats(&self) -> &FormatSet {
        self.descriptor().outputs()
    }

    /// Whether both formats fall inside the advertised sets.
    fn can_convert(&self, input: &FormatToken, output: &FormatToken) -> bool {
        self.supported_input_formats().contains(input)
            && self.supported_output_formats().contains(output)
    }
}

/// Derives the canonical output path for a conversion of `input_path`.
pub fn output_path_for(input_path: &Path, output_format: &FormatToken) -> PathBuf {
    let stem = input_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input_path.with_file_name(format!("{stem}{OUTPUT_SUFFIX}.{output_format}"))
}

/// Path for an intermediate artifact derived from `path`.
///
/// Lives next to `path` so it shares the request's working directory.
pub fn scratch_path_for(path: &Path, label: &str, extension: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{stem}_{label}.{extension}"))
}
