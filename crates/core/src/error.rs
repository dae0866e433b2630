//! Stable error classification shared by every layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of a conversion failure, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No converter handles the requested pair.
    UnsupportedFormatPair,
    /// The request itself is malformed (no file, no extension, no target).
    InvalidRequest,
    /// A required engine or library could not be located.
    EngineNotInstalled,
    /// The engine ran but the conversion failed.
    EngineExecutionFailed,
    /// The engine did not finish within the configured timeout.
    EngineTimeout,
    /// The converter returned a path with no file behind it.
    OutputMissing,
    /// Reading or writing working files failed.
    IoFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedFormatPair => "unsupported_format_pair",
            Self::InvalidRequest => "invalid_request",
            Self::EngineNotInstalled => "engine_not_installed",
            Self::EngineExecutionFailed => "engine_execution_failed",
            Self::EngineTimeout => "engine_timeout",
            Self::OutputMissing => "output_missing",
            Self::IoFailure => "io_failure",
        }
    }

    /// Whether the failure was caused by the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnsupportedFormatPair | Self::InvalidRequest)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_kind_matches_as_str() {
        for kind in [
            ErrorKind::UnsupportedFormatPair,
            ErrorKind::InvalidRequest,
            ErrorKind::EngineNotInstalled,
            ErrorKind::EngineExecutionFailed,
            ErrorKind::EngineTimeout,
            ErrorKind::OutputMissing,
            ErrorKind::IoFailure,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_client_errors() {
        assert!(ErrorKind::UnsupportedFormatPair.is_client_error());
        assert!(ErrorKind::InvalidRequest.is_client_error());
        assert!(!ErrorKind::OutputMissing.is_client_error());
        assert!(!ErrorKind::EngineNotInstalled.is_client_error());
    }
}
