use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::converter::EngineConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
    #[serde(default)]
    pub engines: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted upload in megabytes.
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_mb: default_max_upload_mb(),
        }
    }
}

impl ServerConfig {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_mb() -> usize {
    100
}

/// Working directory configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    /// Directory for per-request files. Emptied at startup, removed at shutdown.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
    /// Conversions allowed to execute at once; further requests wait.
    #[serde(default = "default_max_parallel_conversions")]
    pub max_parallel_conversions: usize,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            max_parallel_conversions: default_max_parallel_conversions(),
        }
    }
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("transmute")
}

fn default_max_parallel_conversions() -> usize {
    4
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

/// Sanitized config for API responses (filesystem paths omitted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub workspace: SanitizedWorkspaceConfig,
    pub engines: SanitizedEngineConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedWorkspaceConfig {
    pub max_parallel_conversions: usize,
}

/// Engine tuning without the configured executable locations.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedEngineConfig {
    pub timeout_secs: u64,
    pub jpeg_quality: u8,
    pub ffmpeg_log_level: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            workspace: SanitizedWorkspaceConfig {
                max_parallel_conversions: config.workspace.max_parallel_conversions,
            },
            engines: SanitizedEngineConfig {
                timeout_secs: config.engines.timeout_secs,
                jpeg_quality: config.engines.jpeg_quality,
                ffmpeg_log_level: config.engines.ffmpeg_log_level.clone(),
            },
        }
    }
}
