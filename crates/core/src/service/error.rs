//! Error types for the conversion service.

use std::path::Path;
use thiserror::Error;

use crate::converter::ConverterError;
use crate::error::ErrorKind;
use crate::format::FormatToken;

/// Errors that can occur while handling a conversion request.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request is malformed (no extension on the upload, empty target).
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// No registered converter claims the pair.
    #[error("Conversion from '{input}' to '{output}' is not supported")]
    UnsupportedFormatPair {
        input: FormatToken,
        output: FormatToken,
    },

    /// The converter returned a path with nothing behind it.
    #[error("The {converter} converter reported success but produced no output file")]
    OutputMissing { converter: String },

    /// Writing the upload or reading the result failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Converter(#[from] ConverterError),
}

impl ServiceError {
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::UnsupportedFormatPair { .. } => ErrorKind::UnsupportedFormatPair,
            Self::OutputMissing { .. } => ErrorKind::OutputMissing,
            Self::Io(_) => ErrorKind::IoFailure,
            Self::Converter(e) => e.kind(),
        }
    }

    /// Message safe to hand to remote callers.
    ///
    /// Working file paths under `workdir_root` are replaced by `<file>`;
    /// raw I/O errors are reduced to a generic message.
    pub fn public_message(&self, workdir_root: &Path) -> String {
        match self {
            Self::Io(_) | Self::Converter(ConverterError::Io(_)) => {
                "Failed to read or write working files".to_string()
            }
            other => redact_paths(&other.to_string(), workdir_root),
        }
    }
}

fn redact_paths(message: &str, root: &Path) -> String {
    let root = root.to_string_lossy();
    if root.is_empty() {
        return message.to_string();
    }
    let pattern = format!(r#"{}[^\s'"]*"#, regex_lite::escape(&root));
    match regex_lite::Regex::new(&pattern) {
        Ok(re) => re.replace_all(message, "<file>").into_owned(),
        Err(_) => message.replace(root.as_ref(), "<file>"),
    }
}
