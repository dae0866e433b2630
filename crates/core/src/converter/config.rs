//! Configuration for conversion engines.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Locations and tuning for the engines the converters invoke.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// LibreOffice executable (`soffice` on some systems).
    #[serde(default = "default_libreoffice_path")]
    pub libreoffice_path: PathBuf,

    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// libheif command line decoder.
    #[serde(default = "default_heif_convert_path")]
    pub heif_convert_path: PathBuf,

    /// ImageMagick 7 entry point.
    #[serde(default = "default_magick_path")]
    pub magick_path: PathBuf,

    /// pdf2docx command line tool.
    #[serde(default = "default_pdf2docx_path")]
    pub pdf2docx_path: PathBuf,

    /// WeasyPrint command line tool.
    #[serde(default = "default_weasyprint_path")]
    pub weasyprint_path: PathBuf,

    /// PowerShell, used to drive Office automation on Windows.
    #[serde(default = "default_powershell_path")]
    pub powershell_path: PathBuf,

    /// Timeout for a single engine invocation in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// JPEG encoder quality (1-100).
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub ffmpeg_log_level: String,
}

fn default_libreoffice_path() -> PathBuf {
    PathBuf::from("libreoffice")
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_heif_convert_path() -> PathBuf {
    PathBuf::from("heif-convert")
}

fn default_magick_path() -> PathBuf {
    PathBuf::from("magick")
}

fn default_pdf2docx_path() -> PathBuf {
    PathBuf::from("pdf2docx")
}

fn default_weasyprint_path() -> PathBuf {
    PathBuf::from("weasyprint")
}

fn default_powershell_path() -> PathBuf {
    PathBuf::from("powershell")
}

fn default_timeout() -> u64 {
    600 // 10 minutes
}

fn default_jpeg_quality() -> u8 {
    95
}

fn default_log_level() -> String {
    "error".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            libreoffice_path: default_libreoffice_path(),
            ffmpeg_path: default_ffmpeg_path(),
            heif_convert_path: default_heif_convert_path(),
            magick_path: default_magick_path(),
            pdf2docx_path: default_pdf2docx_path(),
            weasyprint_path: default_weasyprint_path(),
            powershell_path: default_powershell_path(),
            timeout_secs: default_timeout(),
            jpeg_quality: default_jpeg_quality(),
            ffmpeg_log_level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Per-invocation timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Sets the timeout in seconds.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the LibreOffice executable.
    pub fn with_libreoffice(mut self, path: impl Into<PathBuf>) -> Self {
        self.libreoffice_path = path.into();
        self
    }

    /// Sets the ffmpeg executable.
    pub fn with_ffmpeg(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    /// Sets both HEIF decoders at once.
    pub fn with_heif_decoders(
        mut self,
        heif_convert: impl Into<PathBuf>,
        magick: impl Into<PathBuf>,
    ) -> Self {
        self.heif_convert_path = heif_convert.into();
        self.magick_path = magick.into();
        self
    }

    /// Sets the pdf2docx executable.
    pub fn with_pdf2docx(mut self, path: impl Into<PathBuf>) -> Self {
        self.pdf2docx_path = path.into();
        self
    }

    /// Sets the WeasyPrint executable.
    pub fn with_weasyprint(mut self, path: impl Into<PathBuf>) -> Self {
        self.weasyprint_path = path.into();
        self
    }

    /// Sets the JPEG quality.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }
}
