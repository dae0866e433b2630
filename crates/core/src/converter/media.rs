//! FFmpeg-based audio and video converter.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::config::EngineConfig;
use super::error::ConverterError;
use super::process::EngineCommand;
use super::strategy::{expect_output, run_chain, Strategy};
use super::traits::{output_path_for, Converter, ConverterDescriptor};
use crate::format::FormatToken;
use crate::workspace::discard;

const MEDIA_FORMATS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "webm", "mp3", "wav", "flac", "ogg", "aac",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    fn of(format: &FormatToken) -> Option<Self> {
        match format.as_str() {
            "mp4" | "avi" | "mkv" | "mov" | "webm" => Some(Self::Video),
            "mp3" | "wav" | "flac" | "ogg" | "aac" => Some(Self::Audio),
            _ => None,
        }
    }
}

/// Video and audio encoders for a video container.
fn video_codecs(container: &str) -> (&'static str, &'static str) {
    match container {
        "avi" => ("mpeg4", "libmp3lame"),
        "webm" => ("libvpx", "libvorbis"),
        _ => ("libx264", "aac"),
    }
}

/// Audio encoder for an audio-only format.
fn audio_codec(format: &str) -> &'static str {
    match format {
        "mp3" => "libmp3lame",
        "wav" => "pcm_s16le",
        "flac" => "flac",
        "ogg" => "libvorbis",
        _ => "aac",
    }
}

/// A media conversion the converter knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaRoutine {
    Transcode,
    ExtractAudio,
    AudioToAudio,
}

impl MediaRoutine {
    fn resolve(input: &FormatToken, output: &FormatToken) -> Option<Self> {
        match (MediaKind::of(input)?, MediaKind::of(output)?) {
            (MediaKind::Video, MediaKind::Video) => Some(Self::Transcode),
            (MediaKind::Video, MediaKind::Audio) => Some(Self::ExtractAudio),
            (MediaKind::Audio, MediaKind::Audio) => Some(Self::AudioToAudio),
            (MediaKind::Audio, MediaKind::Video) => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Transcode => "Video conversion",
            Self::ExtractAudio => "Audio extraction",
            Self::AudioToAudio => "Audio conversion",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Ffmpeg;

impl Strategy for Ffmpeg {
    fn engine(&self) -> &'static str {
        "FFmpeg"
    }

    fn install_hint(&self) -> &'static str {
        "Install FFmpeg."
    }
}

/// Converts between audio and video containers with FFmpeg.
pub struct MediaConverter {
    config: EngineConfig,
    descriptor: ConverterDescriptor,
}

impl MediaConverter {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            descriptor: ConverterDescriptor::new(MEDIA_FORMATS, MEDIA_FORMATS),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Builds ffmpeg arguments for one conversion.
    fn build_args(
        &self,
        routine: MediaRoutine,
        input_path: &Path,
        output_path: &Path,
        output_format: &FormatToken,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-y".into(), // Overwrite output
            "-loglevel".into(),
            self.config.ffmpeg_log_level.as_str().into(),
            "-i".into(),
            input_path.into(),
        ];

        match routine {
            MediaRoutine::Transcode => {
                let (video, audio) = video_codecs(output_format.as_str());
                args.extend(["-c:v".into(), video.into(), "-c:a".into(), audio.into()]);
            }
            MediaRoutine::ExtractAudio | MediaRoutine::AudioToAudio => {
                // Drop any video stream, including embedded cover art
                args.push("-vn".into());
                args.extend(["-c:a".into(), audio_codec(output_format.as_str()).into()]);
            }
        }

        args.push(output_path.into());
        args
    }
}

#[async_trait]
impl Converter for MediaConverter {
    fn name(&self) -> &str {
        "media"
    }

    fn descriptor(&self) -> &ConverterDescriptor {
        &self.descriptor
    }

    async fn convert(
        &self,
        input_path: &Path,
        output_format: &FormatToken,
    ) -> Result<PathBuf, ConverterError> {
        let input_format =
            FormatToken::from_path(input_path).unwrap_or_else(|| FormatToken::new(""));
        let Some(routine) = MediaRoutine::resolve(&input_format, output_format) else {
            return Err(ConverterError::unsupported_pair(
                self.name(),
                input_format,
                output_format.clone(),
            ));
        };

        let output_path = output_path_for(input_path, output_format);
        let command = EngineCommand::new(
            Ffmpeg.engine(),
            &self.config.ffmpeg_path,
            self.config.timeout(),
        )
        .args(self.build_args(routine, input_path, &output_path, output_format));
        debug!(routine = routine.label(), args = ?command.argv(), "Running ffmpeg");

        let result = run_chain(routine.label(), &[Ffmpeg], |engine| {
            let command = command.clone();
            let output_path = output_path.clone();
            async move {
                command
                    .run()
                    .await
                    .and_then(|_| expect_output(engine.engine(), &output_path))
            }
        })
        .await;

        if result.is_err() {
            discard(&output_path);
        }
        result
    }
}
