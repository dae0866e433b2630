//! Error types for the converter module.

use thiserror::Error;

use crate::error::ErrorKind;
use crate::format::FormatToken;

/// Errors that can occur during conversion.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// The converter advertises both formats but has no routine for the pair.
    #[error("Conversion from '{input}' to '{output}' is not supported by the {converter} converter")]
    UnsupportedPair {
        converter: String,
        input: FormatToken,
        output: FormatToken,
    },

    /// None of the engines able to perform the routine could be located.
    #[error("{routine} requires {} to be installed. {hint}", .engines.join(" or "))]
    EngineNotInstalled {
        routine: String,
        engines: Vec<String>,
        hint: String,
    },

    /// The engine ran but the conversion failed.
    #[error("{engine} failed: {reason}")]
    EngineFailed {
        engine: String,
        reason: String,
        stderr: Option<String>,
    },

    /// The engine process exceeded its time budget and was killed.
    #[error("{engine} timed out after {timeout_secs} seconds")]
    Timeout { engine: String, timeout_secs: u64 },

    /// I/O error while preparing or finalizing artifacts.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConverterError {
    /// Creates an engine failure with optional captured stderr.
    pub fn engine_failed(
        engine: impl Into<String>,
        reason: impl Into<String>,
        stderr: Option<String>,
    ) -> Self {
        Self::EngineFailed {
            engine: engine.into(),
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates an unsupported pair error for the named converter.
    pub fn unsupported_pair(
        converter: impl Into<String>,
        input: FormatToken,
        output: FormatToken,
    ) -> Self {
        Self::UnsupportedPair {
            converter: converter.into(),
            input,
            output,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedPair { .. } => ErrorKind::UnsupportedFormatPair,
            Self::EngineNotInstalled { .. } => ErrorKind::EngineNotInstalled,
            Self::EngineFailed { .. } => ErrorKind::EngineExecutionFailed,
            Self::Timeout { .. } => ErrorKind::EngineTimeout,
            Self::Io(_) => ErrorKind::IoFailure,
        }
    }
}
